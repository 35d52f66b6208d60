use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::delivery::DeliveryConfig;
use crate::report::Branding;

const DEFAULT_PLACEHOLDER: &str = "Pelican Panache AI";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Fetching
    pub fetch_timeout: Duration,
    pub probe_timeout: Duration,

    // Narrative delegate
    pub narrative_timeout: Duration,

    // Output
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,

    // Intake: business names treated as missing
    pub placeholder_names: Vec<String>,

    // Delivery
    pub delivery: DeliveryConfig,

    // Report footer
    pub branding: Branding,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let seconds = |key: &str, default: u64| {
            let secs = match optional(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!(key, value = %raw, default, "Invalid number; using default");
                    default
                }),
                None => default,
            };
            Duration::from_secs(secs)
        };

        Self {
            fetch_timeout: seconds("AUDIT_FETCH_TIMEOUT_SECS", 10),
            probe_timeout: seconds("AUDIT_PROBE_TIMEOUT_SECS", 5),
            narrative_timeout: seconds("AUDIT_NARRATIVE_TIMEOUT_SECS", 20),
            data_dir: optional("AUDIT_DATA_DIR").unwrap_or_else(|| "data".to_string()).into(),
            reports_dir: optional("AUDIT_REPORTS_DIR")
                .unwrap_or_else(|| "reports".to_string())
                .into(),
            placeholder_names: optional("AUDIT_PLACEHOLDER_NAMES")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_else(|| vec![DEFAULT_PLACEHOLDER.to_string()]),
            delivery: DeliveryConfig {
                api_key: optional("SENDGRID_API_KEY"),
                from_email: optional("FROM_EMAIL"),
                endpoint: optional("SENDGRID_ENDPOINT"),
            },
            branding: Branding {
                contact_name: optional("BRAND_CONTACT_NAME"),
                contact_title: optional("BRAND_CONTACT_TITLE"),
                contact_phone: optional("BRAND_CONTACT_PHONE"),
                contact_email: optional("BRAND_CONTACT_EMAIL"),
                ..Branding::default()
            },
        }
    }

    pub fn log_redacted(&self) {
        info!(
            fetch_timeout = ?self.fetch_timeout,
            probe_timeout = ?self.probe_timeout,
            narrative_timeout = ?self.narrative_timeout,
            data_dir = %self.data_dir.display(),
            reports_dir = %self.reports_dir.display(),
            email_configured = self.delivery.is_configured(),
            "Configuration loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.narrative_timeout, Duration::from_secs(20));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
        assert!(!config.delivery.is_configured());
        assert!(config.branding.contact_name.is_none());
        assert_eq!(config.placeholder_names, vec!["Pelican Panache AI"]);
    }

    #[test]
    fn reads_overrides_and_ignores_bad_numbers() {
        let config = config(&[
            ("AUDIT_FETCH_TIMEOUT_SECS", "3"),
            ("AUDIT_PROBE_TIMEOUT_SECS", "soon"),
            ("AUDIT_DATA_DIR", "/var/lib/audits"),
            ("SENDGRID_API_KEY", "SG.key"),
            ("FROM_EMAIL", "audits@agency.example"),
            ("SENDGRID_ENDPOINT", "http://127.0.0.1:8025/send"),
            ("AUDIT_PLACEHOLDER_NAMES", "Acme Agency, test "),
            ("BRAND_CONTACT_NAME", "Dana Cole"),
            ("BRAND_CONTACT_PHONE", " "),
        ]);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/audits"));
        assert!(config.delivery.is_configured());
        assert_eq!(config.delivery.endpoint.as_deref(), Some("http://127.0.0.1:8025/send"));
        assert_eq!(config.placeholder_names, vec!["Acme Agency", "test"]);
        assert_eq!(config.branding.contact_name.as_deref(), Some("Dana Cole"));
        assert!(config.branding.contact_phone.is_none());
    }
}
