use std::env;

use gateway_tools::GatewayConfig;
use log::*;
use mse_common::Secret;
use settlement_engine::order_flow::{FeeRate, RailRegistry};

const DEFAULT_MSE_HOST: &str = "127.0.0.1";
const DEFAULT_MSE_PORT: u16 = 8380;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/marketplace.db";
const DEFAULT_PLATFORM_FEE: &str = "0.05";
const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_WEBHOOK_SIGNATURE_HEADER: &str = "X-Gateway-Signature";
pub const DEFAULT_PROFILE_HEADER: &str = "X-Profile-Id";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub platform_fee: FeeRate,
    /// Every order must be priced in this currency.
    pub currency: String,
    pub rails: RailRegistry,
    pub gateway: GatewayConfig,
    pub webhook_secret: Secret<String>,
    pub options: ServerOptions,
}

/// The request-level settings that route handlers need. Added to the app as `web::Data<ServerOptions>`.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// The header that the upstream authentication layer uses to pass on the caller's profile id.
    pub profile_header: String,
    /// The header in which the payment gateway sends its webhook signature.
    pub webhook_signature_header: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            profile_header: DEFAULT_PROFILE_HEADER.to_string(),
            webhook_signature_header: DEFAULT_WEBHOOK_SIGNATURE_HEADER.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MSE_HOST.to_string(),
            port: DEFAULT_MSE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            platform_fee: default_fee(),
            currency: DEFAULT_CURRENCY.to_string(),
            rails: RailRegistry::default(),
            gateway: GatewayConfig::default(),
            webhook_secret: Secret::default(),
            options: ServerOptions::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MSE_HOST").ok().unwrap_or_else(|| DEFAULT_MSE_HOST.into());
        let port = env::var("MSE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MSE_PORT. {e} Using the default, {DEFAULT_MSE_PORT}, instead."
                    );
                    DEFAULT_MSE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MSE_PORT);
        let database_url = env::var("MSE_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MSE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let platform_fee = configure_platform_fee(env::var("MSE_PLATFORM_FEE").ok());
        let currency = env::var("MSE_CURRENCY")
            .map(|s| s.trim().to_ascii_uppercase())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                info!("🪛️ MSE_CURRENCY is not set. Orders will be priced in {DEFAULT_CURRENCY}");
                DEFAULT_CURRENCY.to_string()
            });
        let rails = configure_rails(env::var("MSE_RAIL_MAP").ok());
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook_secret = env::var("MSE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ MSE_WEBHOOK_SECRET is not set. Every gateway webhook will be rejected until it is set to the \
                 signing secret of your gateway account."
            );
            String::default()
        });
        let webhook_secret = Secret::new(webhook_secret);
        let options = ServerOptions::from_env_or_default();
        Self { host, port, database_url, platform_fee, currency, rails, gateway, webhook_secret, options }
    }
}

impl ServerOptions {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let profile_header = header_name_from_env("MSE_PROFILE_HEADER", defaults.profile_header);
        let webhook_signature_header =
            header_name_from_env("MSE_WEBHOOK_SIGNATURE_HEADER", defaults.webhook_signature_header);
        Self { profile_header, webhook_signature_header }
    }
}

fn header_name_from_env(var: &str, default: String) -> String {
    match env::var(var).map(|s| s.trim().to_string()) {
        Ok(s) if !s.is_empty() => {
            info!("🪛️ Using {s} as {var}");
            s
        },
        _ => {
            debug!("🪛️ {var} is not set. Using {default}");
            default
        },
    }
}

fn default_fee() -> FeeRate {
    // 0.05 is 500 basis points
    FeeRate::from_basis_points(500).unwrap_or_default()
}

fn configure_platform_fee(value: Option<String>) -> FeeRate {
    match value {
        None => {
            info!("🪛️ MSE_PLATFORM_FEE is not set. Using the default fee of {DEFAULT_PLATFORM_FEE}");
            default_fee()
        },
        Some(s) => s.parse::<FeeRate>().unwrap_or_else(|e| {
            error!("🪛️ Invalid value for MSE_PLATFORM_FEE. {e}. Using the default fee of {DEFAULT_PLATFORM_FEE}");
            default_fee()
        }),
    }
}

fn configure_rails(value: Option<String>) -> RailRegistry {
    let rails = match value {
        None => RailRegistry::default(),
        Some(s) => RailRegistry::from_config_str(&s).unwrap_or_else(|e| {
            error!("🪛️ Ignoring MSE_RAIL_MAP. {e}");
            RailRegistry::default()
        }),
    };
    let mut kinds = rails.kinds().map(|(k, r)| format!("{k}={r}")).collect::<Vec<_>>();
    kinds.sort();
    info!("🪛️ Payment rails: {}", kinds.join(", "));
    rails
}

#[cfg(test)]
mod test {
    use settlement_engine::order_flow::PaymentRail;

    use super::*;

    #[test]
    fn platform_fee() {
        assert_eq!(configure_platform_fee(None).basis_points(), 500);
        assert_eq!(configure_platform_fee(Some("0.1".into())).basis_points(), 1_000);
        assert_eq!(configure_platform_fee(Some("0".into())).basis_points(), 0);
        assert_eq!(configure_platform_fee(Some("-0.2".into())).basis_points(), 500);
        assert_eq!(configure_platform_fee(Some("lots".into())).basis_points(), 500);
    }

    #[test]
    fn rail_map() {
        let rails = configure_rails(Some("paypal=automated, cash=manual".into()));
        assert_eq!(rails.rail_for("paypal"), Some(PaymentRail::Automated));
        assert_eq!(rails.rail_for("cash"), Some(PaymentRail::Manual));
        assert_eq!(rails.rail_for("card"), Some(PaymentRail::Automated));
        let rails = configure_rails(Some("paypal".into()));
        assert_eq!(rails.rail_for("paypal"), None);
        assert_eq!(rails.rail_for("bank_transfer"), Some(PaymentRail::Manual));
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.options.profile_header, "X-Profile-Id");
        assert_eq!(config.options.webhook_signature_header, "X-Gateway-Signature");
        assert_eq!(format!("{:?}", config.webhook_secret), "****");
    }
}
