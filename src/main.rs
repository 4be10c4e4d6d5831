use clap::Parser;
use form_autofill::cli::commands::{cmd_fill, cmd_recall, cmd_remember, cmd_scan, cmd_validate};
use form_autofill::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Scan { page, format } => {
            cmd_scan(&page, &format)?;
        }
        Commands::Fill {
            page,
            profile,
            analyzer,
            output,
            no_delay,
            store,
        } => {
            let report = cmd_fill(
                &page,
                &profile,
                analyzer.as_deref(),
                output.as_deref(),
                no_delay,
                store.as_deref(),
                &config,
                cli.api_key.as_deref(),
            )?;
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Validate { profile } => {
            let report = cmd_validate(&profile)?;
            if !report.is_valid {
                std::process::exit(1);
            }
        }
        Commands::Remember {
            store,
            question,
            answer,
        } => {
            cmd_remember(&store, &question, &answer)?;
        }
        Commands::Recall { store, question } => {
            if cmd_recall(&store, &question)?.is_none() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
