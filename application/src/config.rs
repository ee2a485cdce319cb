//! [`Config`]-related definitions.

use std::{path::PathBuf, time};

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Payment providers configuration.
    pub payments: Payments,

    /// Dialog sessions configuration.
    pub sessions: Sessions,

    /// Directory rendered contract documents are stored under.
    #[default(PathBuf::from("contracts"))]
    pub contracts_dir: PathBuf,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            payments:
                Payments {
                    link_pay,
                    card_gate,
                    bank_qr,
                },
            sessions,
            contracts_dir: _,
        } = value;
        Self {
            gateway: service::gateway::Config {
                link_pay: service::gateway::link_pay::Config {
                    merchant_id: link_pay.merchant_id,
                    secret_out: link_pay.secret_out,
                    secret_in: link_pay.secret_in,
                    base_url: link_pay.base_url,
                },
                card_gate: service::gateway::card_gate::Config {
                    secret: card_gate.secret,
                    base_url: card_gate.base_url,
                },
                bank_qr: service::gateway::bank_qr::Config {
                    recipient: bank_qr.recipient,
                    account: bank_qr.account,
                },
            },
            expire_stale_sessions:
                service::task::expire_stale_sessions::Config {
                    interval: sessions.sweep_interval,
                    ttl: sessions.ttl,
                },
        }
    }
}

/// Payment providers configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Payments {
    /// LinkPay provider configuration.
    pub link_pay: LinkPay,

    /// CardGate provider configuration.
    pub card_gate: CardGate,

    /// BankQr provider configuration.
    pub bank_qr: BankQr,
}

/// LinkPay provider configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct LinkPay {
    /// Merchant ID assigned by the provider.
    pub merchant_id: String,

    /// Secret signing outbound payment links.
    #[default(SecretString::from(String::new()))]
    pub secret_out: SecretString,

    /// Secret verifying inbound callbacks.
    #[default(SecretString::from(String::new()))]
    pub secret_in: SecretString,

    /// Base URL of the hosted payment page.
    #[default("https://pay.linkpay.example/".to_owned())]
    pub base_url: String,
}

/// CardGate provider configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct CardGate {
    /// Shared secret signing checkout links and callbacks.
    #[default(SecretString::from(String::new()))]
    pub secret: SecretString,

    /// Base URL of the hosted checkout page.
    #[default("https://checkout.cardgate.example/pay".to_owned())]
    pub base_url: String,
}

/// BankQr provider configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BankQr {
    /// Name of the transfer recipient.
    pub recipient: String,

    /// Bank account number of the recipient.
    pub account: String,
}

/// Dialog sessions configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Sessions {
    /// Idle time after which a session is considered abandoned.
    #[default(time::Duration::from_secs(30 * 60))]
    #[serde(with = "humantime_serde")]
    pub ttl: time::Duration,

    /// Interval between expiry sweeps.
    #[default(time::Duration::from_secs(5 * 60))]
    #[serde(with = "humantime_serde")]
    pub sweep_interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use super::Config;

    #[test]
    fn defaults_are_complete() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.service.sessions.ttl,
            std::time::Duration::from_secs(30 * 60),
        );

        // The service-level config derives cleanly from the defaults.
        let service: service::Config = config.service.into();
        assert_eq!(
            service.expire_stale_sessions.interval,
            std::time::Duration::from_secs(5 * 60),
        );
    }
}
