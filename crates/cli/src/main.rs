use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use options_bot_alpaca::{AlpacaClient, AlpacaClientConfig};
use options_bot_core::{AlpacaEnv, ConfigLoader, Settings, TelegramEnv, DEFAULT_SETTINGS_PATH};
use options_bot_scheduler::OptionsBot;
use options_bot_telegram::TelegramNotifier;

mod logging;

#[derive(Parser)]
#[command(name = "options-bot")]
#[command(about = "Covered calls and cash-secured puts on a schedule", long_about = None)]
struct Cli {
    /// Settings file path
    #[arg(short, long, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,

    /// Directory for monthly log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Run the trade and check jobs on their schedules (default)
    Run,
    /// Report positions and portfolio value once
    Check,
    /// Run one trade attempt
    Trade,
    /// Load and validate settings, then exit
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = logging::init(&cli.log_dir)?;

    let settings = ConfigLoader::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Validate => {
            println!("{settings:#?}");
            println!("settings OK: {}", cli.config.display());
        }
        Commands::Run => {
            let bot = build_bot(settings)?;
            options_bot_scheduler::run(Arc::new(bot)).await?;
        }
        Commands::Check => {
            let bot = build_bot(settings)?;
            let notify = bot.settings().notify_on_check;
            let positions = bot.report_positions(notify).await?;
            let value = bot.report_value(notify).await?;
            println!("positions: {positions}");
            println!("portfolio value: {}", options_bot_scheduler::format_usd(value));
        }
        Commands::Trade => {
            let bot = build_bot(settings)?;
            let notify = bot.settings().notify_on_trade;
            match bot.trade_options(notify).await? {
                Some(trade) => println!("{trade}"),
                None => println!("no trade placed"),
            }
        }
    }

    Ok(())
}

fn build_bot(settings: Settings) -> anyhow::Result<OptionsBot> {
    let alpaca_env = AlpacaEnv::from_env()?;
    let telegram_env = TelegramEnv::from_env()?;

    let alpaca_config = AlpacaClientConfig::for_mode(alpaca_env, settings.paper_trading);
    tracing::info!(
        "Starting {} for {} ({} trading)",
        settings.bot_name,
        settings.ticker,
        if alpaca_config.is_paper() { "paper" } else { "live" }
    );

    let broker = Arc::new(AlpacaClient::new(alpaca_config)?);
    let notifier = Arc::new(TelegramNotifier::new(telegram_env));

    OptionsBot::new(settings, broker, notifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["options-bot"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("settings.yaml"));
        assert_eq!(cli.log_dir, PathBuf::from("logs"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_subcommand_and_paths() {
        let cli = Cli::try_parse_from([
            "options-bot",
            "--config",
            "conf/bot.yaml",
            "--log-dir",
            "/tmp/bot-logs",
            "trade",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("conf/bot.yaml"));
        assert_eq!(cli.log_dir, PathBuf::from("/tmp/bot-logs"));
        assert_eq!(cli.command, Some(Commands::Trade));
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["options-bot", "backtest"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
