//! dictd - a DICT protocol server
//!
//! Serves the built-in command surface of dictd-engine. Useful for checking
//! clients against a live server; dictionary content comes from handlers
//! registered by embedding applications.

use dictd_engine::settings::DEFAULT_WELCOME_TEXT;
use dictd_engine::{parse_port, DictServer};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Text for the 220 banner
    welcome: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: dictd_engine::DEFAULT_HOST.to_string(),
            port: dictd_engine::DEFAULT_PORT,
            welcome: DEFAULT_WELCOME_TEXT.to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    config.host = value_of(&args, i, "--host").to_string();
                    i += 2;
                }
                "--port" | "-p" => {
                    config.port = parse_port(value_of(&args, i, "--port")).unwrap_or_else(|e| {
                        eprintln!("Error: {e}");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--welcome" => {
                    config.welcome = value_of(&args, i, "--welcome").to_string();
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("dictd version {}", dictd_engine::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

/// The argument following `args[i]`, or exit with an error.
fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("Error: {flag} requires a value");
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
dictd - RFC 2229 DICT protocol server

USAGE:
    dictd [OPTIONS]

OPTIONS:
    -h, --host <HOST>       Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>       Port to listen on (default: 2628)
        --welcome <TEXT>    Text for the 220 greeting (default: welcome)
    -v, --version           Print version information
        --help              Print this help message

EXAMPLES:
    dictd                          # Start on 127.0.0.1:2628
    dictd --port 2629              # Start on port 2629
    dictd --host 0.0.0.0           # Listen on all interfaces

CONNECTING:
    Use the dict client or plain telnet:
    $ telnet 127.0.0.1 2628
    220 welcome <mime> <12345.1234.1234567890@host.org>
    SHOW SERVER
    114 server information follows
    ...
"#
    );
}

fn print_banner(addr: &std::net::SocketAddr) {
    println!(
        r#"
dictd v{} - RFC 2229 DICT protocol server
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        dictd_engine::VERSION,
        addr
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging; RUST_LOG overrides the default level
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let mut server = DictServer::new();
    server
        .set_host(config.host.clone())
        .set_welcome_text(config.welcome.clone())
        .set_server_info(format!("dictd-engine {}", dictd_engine::VERSION));

    let addr = server.listen(config.port).await?;

    // Print the banner
    print_banner(&addr);
    info!("Listening on {}", addr);

    signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping server...");

    server.shutdown().await?;
    info!(
        connections = server
            .stats()
            .connections_accepted
            .load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}
