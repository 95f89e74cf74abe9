use clap::Parser;

use shadow_agents::cli::{self, Cli, Console};
use shadow_agents::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.runtime_config()?;

    // Held until exit so buffered file logs are flushed
    let _guard = logging::init_logging(&config.logging)?;

    tracing::info!("=== shadow-agents {} ===", env!("CARGO_PKG_VERSION"));

    let console = Console::new();
    if let Err(e) = cli::run(cli.command, &config, &console).await {
        console.print_error(&e.to_string());
        return Err(e.into());
    }

    Ok(())
}
