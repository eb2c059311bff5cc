use clap::Parser;
use tracing_subscriber::EnvFilter;

use tinysquid::run_proxy;

/// Concurrent HTTP/1.0 forward proxy with an in-memory object cache.
#[derive(Parser, Debug)]
#[command(name = "proxy", version, about)]
struct Args {
    /// TCP port to listen on.
    port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if let Err(err) = run_proxy(args.port).await {
        tracing::error!(error = %err, "proxy exited");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
