//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::error::ValidationError;

/// Payment configuration (WayForPay merchant)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Merchant account login issued by the gateway
    #[serde(default)]
    pub merchant_account: String,

    /// Merchant domain registered with the gateway
    #[serde(default = "default_merchant_domain")]
    pub merchant_domain: String,

    /// Merchant secret key used for request and callback signatures
    #[serde(default = "empty_secret")]
    pub secret_key: SecretString,

    /// Public URL of the callback endpoint
    pub service_url: String,

    /// Public URL of the return-redirect endpoint
    pub return_url: String,

    /// Gateway page language
    #[serde(default = "default_language")]
    pub language: String,

    /// Reject callbacks that carry no `merchantSignature`
    #[serde(default = "default_require_callback_signature")]
    pub require_callback_signature: bool,

    /// Exact hosts accepted as return origins (comma-separated)
    #[serde(default = "default_return_hosts")]
    pub return_hosts: String,

    /// Host suffixes accepted as return origins (comma-separated)
    #[serde(default = "default_return_host_suffixes")]
    pub return_host_suffixes: String,

    /// Origin used when the caller's return domain is not allowed
    #[serde(default = "default_fallback_origin")]
    pub fallback_origin: String,
}

impl PaymentConfig {
    pub fn return_hosts_list(&self) -> Vec<String> {
        split_list(&self.return_hosts)
    }

    pub fn return_host_suffixes_list(&self) -> Vec<String> {
        split_list(&self.return_host_suffixes)
    }

    /// Validate payment configuration
    ///
    /// A missing merchant account or secret aborts startup; there is no mode
    /// that runs unsigned.
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.merchant_account.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GOTOHOME__PAYMENT__MERCHANT_ACCOUNT"));
        }
        if self.secret_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("GOTOHOME__PAYMENT__SECRET_KEY"));
        }
        if self.merchant_domain.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GOTOHOME__PAYMENT__MERCHANT_DOMAIN"));
        }

        let service_url =
            Url::parse(&self.service_url).map_err(|_| ValidationError::InvalidUrl("service_url"))?;
        let return_url =
            Url::parse(&self.return_url).map_err(|_| ValidationError::InvalidUrl("return_url"))?;
        if Url::parse(&self.fallback_origin).is_err() {
            return Err(ValidationError::InvalidUrl("fallback_origin"));
        }

        if production {
            if service_url.scheme() != "https" {
                return Err(ValidationError::MustBeHttps("service_url"));
            }
            if return_url.scheme() != "https" {
                return Err(ValidationError::MustBeHttps("return_url"));
            }
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn default_merchant_domain() -> String {
    "gotohome.com.ua".to_string()
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_language() -> String {
    "UA".to_string()
}

fn default_require_callback_signature() -> bool {
    true
}

fn default_return_hosts() -> String {
    "www.gotohome.com.ua,gotohome.com.ua,localhost".to_string()
}

fn default_return_host_suffixes() -> String {
    ".lovable.app,.localhost".to_string()
}

fn default_fallback_origin() -> String {
    "https://www.gotohome.com.ua".to_string()
}
