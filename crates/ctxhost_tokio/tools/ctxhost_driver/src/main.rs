use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing::info;

use ctxhost_driver::config::Config;
use ctxhost_tokio::util::log_core_error;
use ctxhost_tokio::{
    BoxFuture, CommitSink, ContextFactory, ContextHost, DebounceScheduler, Outcome,
};

/// Simulated workspace model: creation is slow, the way a real language
/// service handle would be.
struct SimModel {
    entries: Vec<String>,
}

struct SimFactory {
    create_delay: Duration,
}

impl ContextFactory for SimFactory {
    type Context = SimModel;
    type Error = Infallible;

    fn create_context(&self) -> BoxFuture<'_, Result<SimModel, Infallible>> {
        Box::pin(async move {
            tokio::time::sleep(self.create_delay).await;
            Ok(SimModel { entries: Vec::new() })
        })
    }

    fn release_context(&self, context: SimModel) -> BoxFuture<'_, Result<(), Infallible>> {
        Box::pin(async move {
            info!(entries = context.entries.len(), "releasing context");
            Ok(())
        })
    }
}

struct LogSink;

impl CommitSink for LogSink {
    fn committed(&self, generation: u64, version: u64) {
        info!(generation, version, "commit");
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_args();
    info!(
        host = %config.host_name,
        cycles = config.cycles,
        writers = config.writers,
        burst = config.burst,
        delay_ms = config.delay.as_millis() as u64,
        "driver started"
    );

    let factory = Arc::new(SimFactory {
        create_delay: Duration::from_millis(20),
    });
    let host = Arc::new(
        ContextHost::new(config.host_name.clone(), factory)
            .context("create context host")?
            .with_commit_sink(Arc::new(LogSink)),
    );

    for cycle in 0..config.cycles {
        host.activate().await.context("activate")?;
        info!(cycle, generation = host.generation(), "activated");

        // Writers race a debounced burst; only the last request of each
        // burst commits.
        let mut writers = Vec::new();
        for writer in 0..config.writers {
            let host = Arc::clone(&host);
            let delay = config.delay;
            let burst = config.burst;
            writers.push(tokio::spawn(async move {
                let scheduler = DebounceScheduler::unowned(delay);
                let mut committed = 0u32;
                for shot in 0..burst {
                    let pending = scheduler.schedule(|_ct| async {
                        host.with_write(|model| {
                            Box::pin(async move {
                                model.entries.push(format!("writer-{writer}-shot-{shot}"));
                                Ok(())
                            })
                        })
                        .await
                    });
                    // Only the final shot outlives the burst cadence.
                    if shot + 1 == burst {
                        match pending.await {
                            Outcome::Completed(Ok(())) => committed += 1,
                            Outcome::Completed(Err(err)) => log_core_error(&err),
                            Outcome::Skipped => {}
                        }
                    } else {
                        tokio::select! {
                            outcome = pending => {
                                if matches!(outcome, Outcome::Completed(Ok(()))) {
                                    committed += 1;
                                }
                            }
                            _ = tokio::time::sleep(delay / 4) => {}
                        }
                    }
                }
                committed
            }));
        }

        host.published().await.context("wait for first commit")?;
        info!(cycle, "published");

        let mut committed = 0u32;
        for writer in writers {
            committed += writer.await.context("writer task")?;
        }
        info!(
            cycle,
            committed,
            version = host.committed_version(),
            "cycle writes settled"
        );

        host.deactivate().await.context("deactivate")?;
        info!(cycle, "deactivated");
    }

    host.dispose().await;
    info!(version = host.committed_version(), "driver finished");
    Ok(())
}
