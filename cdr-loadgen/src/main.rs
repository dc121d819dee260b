use std::process::ExitCode;

use cdr_loadgen::GenArgs;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "cdr-loadgen",
    version,
    about = "Posts synthetic FreeSWITCH CDRs to an HTTP endpoint"
)]
struct Cli {
    #[command(flatten)]
    args: GenArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    ExitCode::from(cdr_loadgen::execute(&cli.args, std::io::stdout(), shutdown_signal()).await)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("interrupted"),
        _ = terminate => tracing::info!("terminated"),
    }
}
