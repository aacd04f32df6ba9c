use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use log::*;

const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_secs(30);
const DEFAULT_REQUIRED_CONFIRMATIONS: i64 = 10;
const DEFAULT_INVOICE_LIFETIME_MINS: i64 = 30;
const DEFAULT_PAGE_SIZE: i64 = 100;

/// Everything the watcher needs besides the wallet RPC connection (see
/// [`xmr_wallet_rpc::WalletRpcConfig::try_from_env`] for that half).
#[derive(Clone, Debug)]
pub struct WatcherConfig {
    pub database_url: String,
    /// Time between poll cycles. The next cycle's sleep starts only after the previous cycle
    /// has fully completed.
    pub poll_interval: StdDuration,
    /// Used when an invoice row carries no usable per-invoice override.
    pub default_required_confirmations: i64,
    /// Wallet account whose subaddresses receive invoice payments.
    pub account_index: u32,
    /// How long a `Pending` invoice may wait for its first payment before it expires.
    pub invoice_lifetime: Duration,
    /// Upper bound on the number of open invoices examined per cycle.
    pub page_size: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            account_index: 0,
            invoice_lifetime: Duration::minutes(DEFAULT_INVOICE_LIFETIME_MINS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl WatcherConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("XSG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ XSG_DATABASE_URL is not set. Please set it to the URL for the settlement database.");
            String::default()
        });
        let poll_interval = parse_env("XSG_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL.as_secs(), StdDuration::from_secs);
        let default_required_confirmations =
            parse_env("XSG_REQUIRED_CONFIRMATIONS", DEFAULT_REQUIRED_CONFIRMATIONS, |n| n);
        let account_index = parse_env("XSG_WALLET_ACCOUNT_INDEX", 0u32, |n| n);
        let invoice_lifetime = parse_env("XSG_INVOICE_LIFETIME_MINS", DEFAULT_INVOICE_LIFETIME_MINS, Duration::minutes);
        let page_size = parse_env("XSG_INVOICE_PAGE_SIZE", DEFAULT_PAGE_SIZE, |n| n);
        Self {
            database_url,
            poll_interval,
            default_required_confirmations,
            account_index,
            invoice_lifetime,
            page_size,
        }
    }
}

/// Reads and parses an environment variable, logging and falling back to the default on any
/// missing or invalid value. Configuration mistakes must never panic a long-lived daemon.
fn parse_env<N, T>(var: &str, default: N, convert: impl Fn(N) -> T) -> T
where N: std::str::FromStr + std::fmt::Display + Copy
{
    let value = match env::var(var) {
        Ok(s) => s.parse::<N>().unwrap_or_else(|_| {
            warn!("🪛️ {s} is not a valid value for {var}. Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {var} is not set. Using the default value of {default}.");
            default
        },
    };
    convert(value)
}
