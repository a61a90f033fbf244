use anyhow::Result;
use clap::Parser;
use sentinel::app::{init_tracing, SentinelApp};
use sentinel::cli::CliArgs;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    info!("Starting sentinel");
    let app = SentinelApp::new(args)?;

    if let Err(e) = app.run().await {
        error!("Application error: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("sentinel shut down cleanly");
    Ok(())
}
