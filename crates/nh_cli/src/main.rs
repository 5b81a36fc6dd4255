use anyhow::Context;
use clap::Parser;
use nh_core::Settings;
use nh_scrapers::cli::{handle_command, ScraperArgs, ScraperCommands};
use nh_scrapers::logging::init_logging;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "News article harvester", long_about = None)]
pub struct Cli {
    /// YAML file overriding the built-in settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: ScraperCommands,
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::from_yaml_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let settings = load_settings(cli.config.as_ref())?;
    info!("Loaded {} sources", settings.sources.len());

    handle_command(ScraperArgs { command: cli.command }, settings).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["nh", "scrape", "--site", "habr", "--config", "nh.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("nh.yaml")));
        assert_eq!(cli.log_level, "info");
        assert!(matches!(cli.command, ScraperCommands::Scrape(ref o) if o.site == "habr"));
    }

    #[test]
    fn test_load_settings() {
        assert_eq!(load_settings(None).unwrap(), Settings::default());
        let missing = PathBuf::from("/nonexistent/nh.yaml");
        assert!(load_settings(Some(&missing)).is_err());
    }
}
