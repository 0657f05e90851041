use crate::host_comm::{OriginPattern, parse_allowed_origins};
use crate::widgets::Platform;
use url::Url;

pub const DEFAULT_OUTBOUND_QUEUE_CAP: usize = 256;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8501/";

const OUTBOUND_QUEUE_CAP_VAR: &str = "WIDGET_HOST_OUTBOUND_QUEUE_CAP";
const ALLOWED_ORIGINS_VAR: &str = "WIDGET_HOST_ALLOWED_ORIGINS";
const BASE_URL_VAR: &str = "WIDGET_HOST_BASE_URL";
const PLATFORM_VAR: &str = "WIDGET_HOST_PLATFORM";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub outbound_queue_cap: usize,
    pub allowed_origins: Vec<OriginPattern>,
    pub base_url: Url,
    pub platform: Platform,
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Bad values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            outbound_queue_cap: parse_outbound_queue_capacity(lookup(OUTBOUND_QUEUE_CAP_VAR)),
            allowed_origins: lookup(ALLOWED_ORIGINS_VAR)
                .map(|list| parse_allowed_origins(&list))
                .unwrap_or_default(),
            base_url: parse_base_url(lookup(BASE_URL_VAR)),
            platform: lookup(PLATFORM_VAR)
                .map(|name| Platform::from_name(&name))
                .unwrap_or_default(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_outbound_queue_capacity(raw: Option<String>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_OUTBOUND_QUEUE_CAP;
    };

    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => value,
        _ => {
            log::warn!(
                "invalid {OUTBOUND_QUEUE_CAP_VAR}={raw:?}; using {DEFAULT_OUTBOUND_QUEUE_CAP}"
            );
            DEFAULT_OUTBOUND_QUEUE_CAP
        }
    }
}

fn parse_base_url(raw: Option<String>) -> Url {
    let fallback = || Url::parse(DEFAULT_BASE_URL).expect("default base url parses");

    let Some(raw) = raw else {
        return fallback();
    };

    match Url::parse(raw.trim()) {
        Ok(url) if !url.cannot_be_a_base() => url,
        _ => {
            log::warn!("invalid {BASE_URL_VAR}={raw:?}; using {DEFAULT_BASE_URL}");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> HostConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        HostConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[]);
        assert_eq!(config.outbound_queue_cap, DEFAULT_OUTBOUND_QUEUE_CAP);
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.platform, Platform::Other);
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            (OUTBOUND_QUEUE_CAP_VAR, "32"),
            (ALLOWED_ORIGINS_VAR, "https://*.streamlit.app, http://localhost:3000"),
            (BASE_URL_VAR, "https://apps.example.com/team/"),
            (PLATFORM_VAR, "Mac"),
        ]);
        assert_eq!(config.outbound_queue_cap, 32);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.base_url.as_str(), "https://apps.example.com/team/");
        assert_eq!(config.platform, Platform::Mac);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let zero = config(&[(OUTBOUND_QUEUE_CAP_VAR, "0"), (BASE_URL_VAR, "not a url")]);
        assert_eq!(zero.outbound_queue_cap, DEFAULT_OUTBOUND_QUEUE_CAP);
        assert_eq!(zero.base_url.as_str(), DEFAULT_BASE_URL);

        let lots = config(&[(OUTBOUND_QUEUE_CAP_VAR, "lots")]);
        assert_eq!(lots.outbound_queue_cap, DEFAULT_OUTBOUND_QUEUE_CAP);
    }
}
