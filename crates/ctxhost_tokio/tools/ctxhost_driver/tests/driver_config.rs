use std::env;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use ctxhost_driver::config::{Config, DEFAULT_BURST, DEFAULT_CYCLES, DEFAULT_WRITERS};

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().expect("lock")
}

fn clear_env() {
    env::remove_var("CTXHOST_NAME");
    env::remove_var("CTXHOST_CYCLES");
    env::remove_var("CTXHOST_WRITERS");
    env::remove_var("CTXHOST_BURST");
    env::remove_var("CTXHOST_DELAY_MS");
}

#[test]
fn defaults_apply_without_env_or_flags() {
    let _guard = env_lock();
    clear_env();

    let config = Config::from_args_iter(["bin"]);
    assert_eq!(config.host_name, "ctxhost_driver");
    assert_eq!(config.cycles, DEFAULT_CYCLES);
    assert_eq!(config.writers, DEFAULT_WRITERS);
    assert_eq!(config.burst, DEFAULT_BURST);
    assert_eq!(config.delay, Duration::from_millis(50));
}

#[test]
fn flags_override_defaults() {
    let _guard = env_lock();
    clear_env();

    let config = Config::from_args_iter([
        "bin",
        "--host-name",
        "bench",
        "--cycles=7",
        "--writers",
        "2",
        "--delay-ms=125",
    ]);
    assert_eq!(config.host_name, "bench");
    assert_eq!(config.cycles, 7);
    assert_eq!(config.writers, 2);
    assert_eq!(config.delay, Duration::from_millis(125));
}

#[test]
fn env_overrides_defaults_and_flags_override_env() {
    let _guard = env_lock();
    clear_env();
    env::set_var("CTXHOST_CYCLES", "9");
    env::set_var("CTXHOST_BURST", "11");

    let config = Config::from_args_iter(["bin", "--burst=2"]);
    assert_eq!(config.cycles, 9);
    assert_eq!(config.burst, 2);

    clear_env();
}

#[test]
fn malformed_values_fall_back() {
    let _guard = env_lock();
    clear_env();
    env::set_var("CTXHOST_WRITERS", "lots");

    let config = Config::from_args_iter(["bin", "--cycles=many"]);
    assert_eq!(config.writers, DEFAULT_WRITERS);
    assert_eq!(config.cycles, DEFAULT_CYCLES);

    clear_env();
}
