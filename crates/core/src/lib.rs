pub mod config;
pub mod config_loader;
pub mod cron;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{AlpacaEnv, Settings, TelegramEnv};
pub use config_loader::{ConfigLoader, DEFAULT_SETTINGS_PATH, ENV_PREFIX};
pub use cron::CronSchedule;
pub use error::ConfigError;
pub use traits::{Brokerage, Notifier};
pub use types::{
    AccountSnapshot, AssetClass, ContractQuery, OptionContract, OptionType, Order, OrderRequest,
    OrderSide, OrderStatus, Position, TimeInForce, CONTRACT_MULTIPLIER,
};
