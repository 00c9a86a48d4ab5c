use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future used by collaborator traits and the write path.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// External factory owning creation and teardown of the context handle.
///
/// Invoked by activate/deactivate/dispose; both calls may be slow and are
/// awaited while the host holds its transition lock, so the factory is
/// invoked at most once per transition.
pub trait ContextFactory: Send + Sync + 'static {
    type Context: Send + 'static;
    type Error: fmt::Display + Send + Sync + 'static;

    fn create_context(&self) -> BoxFuture<'_, Result<Self::Context, Self::Error>>;

    fn release_context(&self, context: Self::Context) -> BoxFuture<'_, Result<(), Self::Error>>;
}

/// Progress/version side-channel, notified after each committed write.
///
/// Fire-and-forget: the host never reads anything back, and a slow sink must
/// not be able to stall the write path, so the call is synchronous and
/// implementations should hand off work they cannot do cheaply.
pub trait CommitSink: Send + Sync + 'static {
    fn committed(&self, generation: u64, version: u64);
}
