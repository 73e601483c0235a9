use anyhow::{Context, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use debtplan::api::{Cli, Command, render_command, run_http_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_http_server(args.port)
            .await
            .with_context(|| format!("HTTP server on port {} failed", args.port))?,
        command => {
            let report = render_command(command).map_err(|e| anyhow!(e))?;
            println!("{report}");
        }
    }

    Ok(())
}
