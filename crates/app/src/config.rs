//! Kiosk Config

use std::time::Duration;

use clap::Parser;

use crate::i18n::Locale;

/// Runtime configuration for one kiosk, from flags or environment.
#[derive(Debug, Parser)]
#[command(name = "borne", about = "Self-service ordering kiosk runtime")]
pub struct KioskConfig {
    /// Backend API base URL
    #[arg(long, env = "BORNE_API_URL", default_value = "http://localhost:4001/api")]
    pub api_url: String,

    /// Backend request timeout in seconds
    #[arg(long, env = "BORNE_API_TIMEOUT_SECS", default_value = "5")]
    pub api_timeout_secs: u64,

    /// Display locale for tickets and labels
    #[arg(long, env = "BORNE_LOCALE", value_enum, default_value_t = Locale::Fr)]
    pub locale: Locale,

    /// Kiosk name used in logs
    #[arg(long, env = "BORNE_KIOSK_NAME", default_value = "borne-01")]
    pub kiosk_name: String,

    /// Run from the embedded menu without a backend
    #[arg(long, env = "BORNE_OFFLINE", default_value_t = false)]
    pub offline: bool,
}

impl KioskConfig {
    /// Backend request timeout as a duration.
    #[must_use]
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}
