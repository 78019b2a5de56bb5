use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Cart-stage hold TTL. Observed policy: 15 minutes.
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_seconds: u64,
    /// How often the expiry sweeper runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// How long an unpaid booking may stay PENDING before the sweeper
    /// cancels it and releases the spot.
    #[serde(default = "default_payment_grace")]
    pub payment_grace_seconds: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_hold_ttl() -> u64 {
    900
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_payment_grace() -> u64 {
    1800
}

fn default_currency() -> String {
    "KES".to_string()
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_ttl_seconds: default_hold_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
            payment_grace_seconds: default_payment_grace(),
            currency: default_currency(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // Environment-specific overrides, optional.
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `LOTWISE__SERVER__PORT=8080`.
            .add_source(config::Environment::with_prefix("LOTWISE").separator("__"))
            .set_default("server.port", 8080)?
            .set_default("business_rules.hold_ttl_seconds", 900)?
            .set_default("business_rules.sweep_interval_seconds", 60)?
            .set_default("business_rules.payment_grace_seconds", 1800)?
            .set_default("business_rules.currency", "KES")?
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_files() {
        let config = Config::load().expect("defaults should load");
        assert_eq!(config.business_rules.hold_ttl_seconds, 900);
        assert_eq!(config.business_rules.sweep_interval_seconds, 60);
    }
}
