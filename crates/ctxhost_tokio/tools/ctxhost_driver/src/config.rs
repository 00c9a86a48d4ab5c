use std::env;
use std::time::Duration;

pub const DEFAULT_HOST_NAME: &str = "ctxhost_driver";
pub const DEFAULT_CYCLES: u32 = 3;
pub const DEFAULT_WRITERS: u32 = 4;
pub const DEFAULT_BURST: u32 = 5;
pub const DEFAULT_DELAY_MS: u64 = 50;

pub struct Config {
    pub host_name: String,
    pub cycles: u32,
    pub writers: u32,
    pub burst: u32,
    pub delay: Duration,
}

impl Config {
    pub fn from_args() -> Self {
        Self::from_args_iter(env::args())
    }

    pub fn from_args_iter<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut host_name =
            env::var("CTXHOST_NAME").unwrap_or_else(|_| DEFAULT_HOST_NAME.to_string());
        let mut cycles = env::var("CTXHOST_CYCLES")
            .ok()
            .and_then(parse_u32)
            .unwrap_or(DEFAULT_CYCLES);
        let mut writers = env::var("CTXHOST_WRITERS")
            .ok()
            .and_then(parse_u32)
            .unwrap_or(DEFAULT_WRITERS);
        let mut burst = env::var("CTXHOST_BURST")
            .ok()
            .and_then(parse_u32)
            .unwrap_or(DEFAULT_BURST);
        let mut delay_ms = env::var("CTXHOST_DELAY_MS")
            .ok()
            .and_then(parse_u64)
            .unwrap_or(DEFAULT_DELAY_MS);

        let mut args = iter.into_iter();
        let _ = args.next();
        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            match arg {
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                "--host-name" => {
                    if let Some(value) = args.next() {
                        host_name = value.as_ref().to_string();
                    }
                }
                "--cycles" => {
                    if let Some(value) = args.next().as_ref().map(|v| v.as_ref().to_string()) {
                        cycles = parse_u32(value).unwrap_or(cycles);
                    }
                }
                "--writers" => {
                    if let Some(value) = args.next().as_ref().map(|v| v.as_ref().to_string()) {
                        writers = parse_u32(value).unwrap_or(writers);
                    }
                }
                "--burst" => {
                    if let Some(value) = args.next().as_ref().map(|v| v.as_ref().to_string()) {
                        burst = parse_u32(value).unwrap_or(burst);
                    }
                }
                "--delay-ms" => {
                    if let Some(value) = args.next().as_ref().map(|v| v.as_ref().to_string()) {
                        delay_ms = parse_u64(value).unwrap_or(delay_ms);
                    }
                }
                _ if arg.starts_with("--host-name=") => {
                    host_name = arg["--host-name=".len()..].to_string();
                }
                _ if arg.starts_with("--cycles=") => {
                    cycles = parse_u32(arg["--cycles=".len()..].to_string()).unwrap_or(cycles);
                }
                _ if arg.starts_with("--writers=") => {
                    writers = parse_u32(arg["--writers=".len()..].to_string()).unwrap_or(writers);
                }
                _ if arg.starts_with("--burst=") => {
                    burst = parse_u32(arg["--burst=".len()..].to_string()).unwrap_or(burst);
                }
                _ if arg.starts_with("--delay-ms=") => {
                    delay_ms =
                        parse_u64(arg["--delay-ms=".len()..].to_string()).unwrap_or(delay_ms);
                }
                _ => {}
            }
        }

        Self {
            host_name,
            cycles,
            writers,
            burst,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

fn print_usage() {
    println!(
        "ctxhost_driver [--host-name <name>] [--cycles <n>] [--writers <n>] [--burst <n>] [--delay-ms <n>]"
    );
}

fn parse_u32(value: String) -> Option<u32> {
    value.trim().parse().ok()
}

fn parse_u64(value: String) -> Option<u64> {
    value.trim().parse().ok()
}
