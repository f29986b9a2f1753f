//! URL validation against the allowed-domain list.
//!
//! A URL is accepted when it parses as an absolute URL, has a host, and that
//! host contains one of the configured domains as a substring. The substring
//! match is intentionally loose so that every subdomain of an allowed site
//! passes without enumeration; see DESIGN.md for the tradeoff.

use tracing::debug;
use url::Url;

/// Validates submitted URLs against a fixed set of allowed domains.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_domains: Vec<String>,
}

impl UrlValidator {
    /// Creates a validator accepting hosts that contain any of `allowed_domains`.
    #[must_use]
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self { allowed_domains }
    }

    /// Returns `true` if `raw` parses as a URL whose host matches an allowed domain.
    ///
    /// URLs without a host component (e.g. `mailto:`) are rejected.
    #[must_use]
    pub fn is_valid(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            debug!(url = raw, "rejected unparseable url");
            return false;
        };

        let Some(host) = url.host_str() else {
            debug!(url = raw, "rejected url without host");
            return false;
        };

        let accepted = self
            .allowed_domains
            .iter()
            .any(|domain| host.contains(domain.as_str()));

        if !accepted {
            debug!(url = raw, host, "rejected url outside allowed domains");
        }

        accepted
    }

    /// Returns the configured domain list.
    #[must_use]
    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }
}
