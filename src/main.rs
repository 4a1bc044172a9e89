use anyhow::Result;
use clap::Parser;
use lambdamap::cli::{Cli, Commands};
use lambdamap::commands::{handle_discover, init_config, DiscoverConfig};
use lambdamap::observability::{init_tracing, install_panic_hook};

fn main() -> Result<()> {
    install_panic_hook();
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover {
            inventory,
            config,
            format,
            output,
            no_code_analysis,
            no_layout,
            page_size,
            plain,
            verbosity,
        } => {
            init_tracing(verbosity);
            let succeeded = handle_discover(DiscoverConfig {
                inventory,
                config_path: config,
                format: format.map(Into::into),
                output,
                no_code_analysis,
                no_layout,
                page_size,
                plain,
            })?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Commands::Init { force } => init_config(force)?,
    }

    Ok(())
}
