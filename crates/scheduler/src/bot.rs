use std::sync::Arc;

use anyhow::{Context, Result};
use options_bot_core::{Brokerage, Notifier, Settings};
use options_bot_options_manager::{OptionsTrader, Positions, TradeResult, TraderConfig};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::format::format_usd;

/// Trade and report jobs, with their outcomes sent to the notifier.
///
/// Jobs share one lock. A job that fires while another is running is skipped.
pub struct OptionsBot {
    settings: Settings,
    trader: OptionsTrader,
    notifier: Arc<dyn Notifier>,
    job_lock: Mutex<()>,
}

impl OptionsBot {
    /// Creates a bot from validated settings.
    ///
    /// # Errors
    /// Returns an error if the settings timezone does not parse.
    pub fn new(
        settings: Settings,
        broker: Arc<dyn Brokerage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let config = TraderConfig::from_settings(&settings)?;
        Ok(Self::with_trader(
            settings,
            OptionsTrader::new(broker, config),
            notifier,
        ))
    }

    /// Creates a bot around an already configured trader.
    pub fn with_trader(
        settings: Settings,
        trader: OptionsTrader,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            trader,
            notifier,
            job_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Tells the chat the bot is up.
    pub async fn announce(&self) {
        info!("{} is running", self.settings.bot_name);
        self.notifier
            .send_message(&format!("🔆 {} is running!", self.settings.bot_name), false)
            .await;
    }

    // =========================================================================
    // Scheduled Jobs
    // =========================================================================

    /// Scheduled entry point for the trade job. Never fails.
    pub async fn run_trade_options(&self) {
        let Ok(_guard) = self.job_lock.try_lock() else {
            warn!("Skipping trade_options: another job is still running");
            return;
        };
        info!("Running trade_options");
        if let Err(e) = self.trade_options(self.settings.notify_on_trade).await {
            self.report_error("trade_options", &e).await;
        }
    }

    /// Scheduled entry point for the value check job. Never fails.
    pub async fn run_check_value(&self) {
        let Ok(_guard) = self.job_lock.try_lock() else {
            warn!("Skipping check_value: another job is still running");
            return;
        };
        info!("Running check_value");
        if let Err(e) = self.check_value(self.settings.notify_on_check).await {
            self.report_error("check_value", &e).await;
        }
    }

    async fn report_error(&self, job: &str, e: &anyhow::Error) {
        let msg = format!("Error during {job}: {e:#}");
        error!("{}", msg);
        self.notifier.send_message(&format!("⚠️ {msg}"), false).await;
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Reports positions and portfolio value.
    pub async fn check_value(&self, notify: bool) -> Result<()> {
        self.report_positions(notify).await?;
        self.report_value(notify).await?;
        Ok(())
    }

    /// Runs one trade attempt and reports the outcome.
    ///
    /// After a trade, positions and value follow the trade summary.
    pub async fn trade_options(&self, notify: bool) -> Result<Option<TradeResult>> {
        let result = self.trader.trade_options().await?;

        match &result {
            Some(trade) => {
                info!("Trade placed: {}", trade);
                if notify {
                    self.notifier
                        .send_message(&format!("📈 {trade}"), false)
                        .await;
                }
                self.report_positions(notify).await?;
                self.report_value(notify).await?;
            }
            None => {
                info!("No trade placed for {}", self.settings.ticker);
                if notify {
                    self.notifier
                        .send_message(
                            &format!("💤 no trade placed for {}", self.settings.ticker),
                            true,
                        )
                        .await;
                }
            }
        }

        Ok(result)
    }

    /// Logs the current positions and optionally sends them to the chat.
    pub async fn report_positions(&self, notify: bool) -> Result<Positions> {
        let positions = self
            .trader
            .positions()
            .await
            .context("failed to read positions")?;
        info!("positions: {}", positions);
        if notify {
            self.notifier
                .send_message(&format!("📑 positions: {positions}"), false)
                .await;
        }
        Ok(positions)
    }

    /// Logs the portfolio value and optionally sends it to the chat.
    pub async fn report_value(&self, notify: bool) -> Result<Decimal> {
        let value = self
            .trader
            .portfolio_value()
            .await
            .context("failed to read portfolio value")?;
        let formatted = format_usd(value);
        info!("portfolio value: {}", formatted);
        if notify {
            self.notifier
                .send_message(&format!("💰 portfolio value: {formatted}"), false)
                .await;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNotifier;
    use options_bot_core::ConfigLoader;
    use options_bot_options_manager::testing::FakeBroker;
    use rust_decimal_macros::dec;

    fn settings(notify_on_check: bool) -> Settings {
        let mut settings = ConfigLoader::from_yaml_str(
            r#"
bot_name: covered-bot
ticker: AAPL
otm_margin_call: 0.05
otm_margin_put: 0.05
trade_schedule: "59 9 * * 1-5"
check_schedule: "0 10-16 * * 1-5"
post_trade_delay: 0
fill_timeout: 4
"#,
        )
        .unwrap();
        settings.notify_on_check = notify_on_check;
        settings
    }

    fn bot(broker: FakeBroker, notify_on_check: bool) -> (OptionsBot, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let bot = OptionsBot::new(settings(notify_on_check), Arc::new(broker), notifier.clone())
            .unwrap();
        (bot, notifier)
    }

    #[tokio::test]
    async fn announce_names_bot() {
        let (bot, notifier) = bot(FakeBroker::new(), false);
        bot.announce().await;
        assert_eq!(
            notifier.messages(),
            vec![("🔆 covered-bot is running!".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn check_value_reports_when_enabled() {
        let (bot, notifier) = bot(FakeBroker::new().with_shares("AAPL", dec!(300)), true);
        bot.run_check_value().await;

        let texts = notifier.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "📑 positions: USD 50000 @ 1.00, AAPL 300 @ 200.0");
        assert_eq!(texts[1], "💰 portfolio value: $103,245.80");
    }

    #[tokio::test]
    async fn check_value_quiet_by_default() {
        let (bot, notifier) = bot(FakeBroker::new(), false);
        bot.run_check_value().await;
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn check_value_failure_becomes_one_warning() {
        let broker = FakeBroker::new();
        broker.state.lock().account.equity = None;
        let (bot, notifier) = bot(broker, false);

        bot.run_check_value().await;

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.starts_with("⚠️ Error during check_value: "));
        assert!(messages[0].0.contains("portfolio value is unavailable"));
        assert!(!messages[0].1);
    }

    #[tokio::test(start_paused = true)]
    async fn trade_reports_result_positions_and_value() {
        let (bot, notifier) = bot(FakeBroker::new().with_shares("AAPL", dec!(200)), false);
        bot.run_trade_options().await;

        let texts = notifier.texts();
        assert_eq!(texts.len(), 3, "{texts:?}");
        assert!(texts[0].starts_with("📈 sold 2 call AAPL"));
        assert!(texts[0].ends_with("@ 1.42 [filled]"));
        assert!(texts[1].starts_with("📑 positions: "));
        assert!(texts[2].starts_with("💰 portfolio value: $"));
    }

    #[tokio::test]
    async fn no_trade_sends_silent_note() {
        let broker = FakeBroker::new().with_option_position("AAPL250926C00210000");
        let (bot, notifier) = bot(broker, false);
        let result = bot.trade_options(true).await.unwrap();

        assert!(result.is_none());
        assert_eq!(
            notifier.messages(),
            vec![("💤 no trade placed for AAPL".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn trade_failure_becomes_one_warning() {
        let broker = FakeBroker::new();
        broker.state.lock().price = None;
        let (bot, notifier) = bot(broker, false);

        bot.run_trade_options().await;

        assert_eq!(
            notifier.texts(),
            vec!["⚠️ Error during trade_options: ticker price is unavailable for AAPL".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_job_does_not_block_next_job() {
        let broker = FakeBroker::new();
        broker.state.lock().price = None;
        let (bot, notifier) = bot(broker, true);

        bot.run_trade_options().await;
        bot.run_check_value().await;

        assert_eq!(notifier.texts().len(), 3);
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let (bot, notifier) = bot(FakeBroker::new(), true);

        let guard = bot.job_lock.lock().await;
        bot.run_check_value().await;
        bot.run_trade_options().await;
        assert!(notifier.messages().is_empty());

        drop(guard);
        bot.run_check_value().await;
        assert_eq!(notifier.texts().len(), 2);
    }

    #[tokio::test]
    async fn report_value_returns_equity() {
        let (bot, _) = bot(FakeBroker::new(), false);
        assert_eq!(bot.report_value(false).await.unwrap(), dec!(103245.8));
    }
}
