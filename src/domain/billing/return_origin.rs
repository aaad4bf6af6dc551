//! Return-origin allow-list.
//!
//! After payment the gateway sends the buyer back to a page we name. The
//! caller may suggest the origin (preview deployments, local development),
//! but only hosts on the allow-list are honored; anything else collapses to
//! the fallback origin.

use url::Url;

use crate::domain::foundation::ValidationError;

/// Path appended to the resolved origin after a payment.
pub const POST_PAYMENT_PATH: &str = "/main";

/// Resolves caller-suggested return origins against an allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOriginPolicy {
    exact_hosts: Vec<String>,
    host_suffixes: Vec<String>,
    fallback_origin: String,
}

impl ReturnOriginPolicy {
    pub fn new(
        exact_hosts: Vec<String>,
        host_suffixes: Vec<String>,
        fallback_origin: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let fallback = fallback_origin.into();
        let fallback_origin = origin_of(&fallback).ok_or_else(|| {
            ValidationError::invalid_format("fallback_origin", "must be an absolute http(s) URL")
        })?;

        Ok(Self {
            exact_hosts: exact_hosts.into_iter().map(|h| h.to_lowercase()).collect(),
            host_suffixes: host_suffixes
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            fallback_origin,
        })
    }

    pub fn fallback_origin(&self) -> &str {
        &self.fallback_origin
    }

    /// Returns `scheme://host[:port]` of the candidate if its host is
    /// allowed, otherwise the fallback origin.
    pub fn resolve(&self, candidate: Option<&str>) -> String {
        candidate
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| Url::parse(raw).ok())
            .filter(|url| self.is_allowed(url))
            .and_then(|url| origin_of(url.as_str()))
            .unwrap_or_else(|| self.fallback_origin.clone())
    }

    /// Where the buyer lands after the return page.
    pub fn post_payment_target(&self, candidate: Option<&str>) -> String {
        format!("{}{}", self.resolve(candidate), POST_PAYMENT_PATH)
    }

    fn is_allowed(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => return false,
        };
        self.exact_hosts.iter().any(|allowed| *allowed == host)
            || self
                .host_suffixes
                .iter()
                .any(|suffix| host.ends_with(suffix.as_str()))
    }
}

fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.origin().ascii_serialization()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReturnOriginPolicy {
        ReturnOriginPolicy::new(
            vec![
                "www.gotohome.com.ua".to_string(),
                "gotohome.com.ua".to_string(),
                "localhost".to_string(),
            ],
            vec![".lovable.app".to_string(), ".localhost".to_string()],
            "https://www.gotohome.com.ua",
        )
        .unwrap()
    }

    #[test]
    fn allowed_hosts_resolve_to_their_origin() {
        let p = policy();
        assert_eq!(
            p.resolve(Some("https://gotohome.com.ua/subscription?x=1")),
            "https://gotohome.com.ua"
        );
        assert_eq!(
            p.resolve(Some("https://preview-42.lovable.app/any/path")),
            "https://preview-42.lovable.app"
        );
        assert_eq!(
            p.resolve(Some("http://localhost:5173")),
            "http://localhost:5173"
        );
        assert_eq!(
            p.resolve(Some("http://app.localhost:8080/")),
            "http://app.localhost:8080"
        );
    }

    #[test]
    fn host_match_ignores_case() {
        assert_eq!(
            policy().resolve(Some("https://WWW.GoToHome.com.ua")),
            "https://www.gotohome.com.ua"
        );
    }

    #[test]
    fn foreign_host_falls_back() {
        let p = policy();
        assert_eq!(p.resolve(Some("https://evil.example")), "https://www.gotohome.com.ua");
        assert_eq!(
            p.resolve(Some("https://gotohome.com.ua.evil.example")),
            "https://www.gotohome.com.ua"
        );
        assert_eq!(
            p.resolve(Some("https://lovable.app.evil.example")),
            "https://www.gotohome.com.ua"
        );
    }

    #[test]
    fn unparseable_or_missing_candidate_falls_back() {
        let p = policy();
        assert_eq!(p.resolve(None), "https://www.gotohome.com.ua");
        assert_eq!(p.resolve(Some("")), "https://www.gotohome.com.ua");
        assert_eq!(p.resolve(Some("gotohome.com.ua")), "https://www.gotohome.com.ua");
        assert_eq!(
            p.resolve(Some("javascript:alert(1)")),
            "https://www.gotohome.com.ua"
        );
    }

    #[test]
    fn post_payment_target_appends_main() {
        assert_eq!(
            policy().post_payment_target(Some("https://gotohome.com.ua")),
            "https://gotohome.com.ua/main"
        );
    }

    #[test]
    fn invalid_fallback_is_rejected() {
        assert!(ReturnOriginPolicy::new(vec![], vec![], "not a url").is_err());
    }
}
