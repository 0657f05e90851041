use url::Url;

/// Allowed-origin entry such as `https://*.example.com` or
/// `http://localhost:3000`. A `*` label matches exactly one host label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPattern {
    scheme: String,
    host_labels: Vec<String>,
    port: Option<u16>,
}

impl OriginPattern {
    pub fn parse(pattern: &str) -> Option<Self> {
        let (scheme, rest) = pattern.trim().split_once("://")?;
        let authority = rest.trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') {
            return None;
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port.parse().ok()?)),
            None => (authority, None),
        };

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host_labels: host.split('.').map(str::to_ascii_lowercase).collect(),
            port,
        })
    }

    pub fn matches(&self, origin: &Url) -> bool {
        if origin.scheme() != self.scheme {
            return false;
        }

        let port = self.port.or_else(|| default_port(&self.scheme));
        if origin.port_or_known_default() != port {
            return false;
        }

        let Some(host) = origin.host_str() else {
            return false;
        };
        let labels: Vec<&str> = host.split('.').collect();
        labels.len() == self.host_labels.len()
            && labels
                .iter()
                .zip(&self.host_labels)
                .all(|(label, allowed)| allowed == "*" || allowed == label)
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}

/// True if `origin` is accepted by any of the allowed patterns.
pub fn is_allowed_origin(allowed: &[OriginPattern], origin: &str) -> bool {
    let Ok(origin) = Url::parse(origin) else {
        return false;
    };
    allowed.iter().any(|pattern| pattern.matches(&origin))
}

/// Parses a comma separated allow list, skipping entries that do not parse.
pub fn parse_allowed_origins(list: &str) -> Vec<OriginPattern> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let pattern = OriginPattern::parse(entry);
            if pattern.is_none() {
                log::warn!("ignoring malformed allowed origin {entry:?}");
            }
            pattern
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(list: &str) -> Vec<OriginPattern> {
        parse_allowed_origins(list)
    }

    #[test]
    fn exact_origin_matches() {
        let list = allowed("https://devel.streamlit.test");
        assert!(is_allowed_origin(&list, "https://devel.streamlit.test"));
        assert!(!is_allowed_origin(&list, "http://devel.streamlit.test"));
        assert!(!is_allowed_origin(&list, "https://other.streamlit.test"));
    }

    #[test]
    fn wildcard_matches_one_label() {
        let list = allowed("https://*.streamlit.app");
        assert!(is_allowed_origin(&list, "https://share.streamlit.app"));
        assert!(!is_allowed_origin(&list, "https://streamlit.app"));
        assert!(!is_allowed_origin(&list, "https://a.b.streamlit.app"));
    }

    #[test]
    fn ports_must_agree() {
        let list = allowed("http://localhost:3000, https://example.com");
        assert!(is_allowed_origin(&list, "http://localhost:3000"));
        assert!(!is_allowed_origin(&list, "http://localhost:8501"));
        assert!(is_allowed_origin(&list, "https://example.com:443"));
    }

    #[test]
    fn malformed_entries_and_origins_are_rejected() {
        let list = allowed("not a url, https://ok.test");
        assert_eq!(list.len(), 1);
        assert!(!is_allowed_origin(&list, "garbage"));
    }
}
