use std::{env, time::Duration};

use log::*;
use xsg_common::Secret;

/// Applied to every wallet RPC request so that one stalled call cannot hang a poll cycle.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RpcCredentials {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct WalletRpcConfig {
    /// Base URL of the wallet RPC daemon, e.g. `http://127.0.0.1:18083`.
    pub url: String,
    /// Optional HTTP Basic credentials, sent with every request when present.
    pub credentials: Option<RpcCredentials>,
    pub timeout: Duration,
}

impl WalletRpcConfig {
    pub fn new(url: &str) -> Self {
        Self { url: url.trim_end_matches('/').to_string(), credentials: None, timeout: DEFAULT_RPC_TIMEOUT }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials =
            Some(RpcCredentials { username: username.to_string(), password: Secret::new(password.to_string()) });
        self
    }

    /// Builds the configuration from environment variables.
    ///
    /// Returns `None` when `XSG_WALLET_RPC_URL` is unset. The caller is expected to treat this as
    /// "watcher disabled", not as a fatal error.
    pub fn try_from_env() -> Option<Self> {
        let url = env::var("XSG_WALLET_RPC_URL").ok()?;
        let mut config = Self::new(&url);
        match (env::var("XSG_WALLET_RPC_USERNAME"), env::var("XSG_WALLET_RPC_PASSWORD")) {
            (Ok(username), Ok(password)) => {
                config = config.with_credentials(&username, &password);
            },
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                warn!(
                    "🔌️ Only one of XSG_WALLET_RPC_USERNAME / XSG_WALLET_RPC_PASSWORD is set. Both are required to \
                     enable authentication, so the wallet RPC client will connect unauthenticated."
                );
            },
            (Err(_), Err(_)) => {},
        }
        if let Ok(s) = env::var("XSG_WALLET_RPC_TIMEOUT_SECS") {
            match s.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(e) => warn!(
                    "🔌️ {s} is not a valid value for XSG_WALLET_RPC_TIMEOUT_SECS. {e}. Using the default of {}s.",
                    DEFAULT_RPC_TIMEOUT.as_secs()
                ),
            }
        }
        Some(config)
    }

    pub fn json_rpc_url(&self) -> String {
        format!("{}/json_rpc", self.url)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn json_rpc_url_handles_trailing_slash() {
        let config = WalletRpcConfig::new("http://localhost:18083/");
        assert_eq!(config.json_rpc_url(), "http://localhost:18083/json_rpc");
    }
}
