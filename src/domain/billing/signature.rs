//! Gateway request signing.
//!
//! The gateway authenticates both directions with HMAC-MD5 over an ordered
//! list of fields joined by `;`, hex encoded. The digest is dictated by the
//! gateway protocol.

use hmac::{Hmac, Mac};
use md5::Md5;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use super::errors::BillingError;

type HmacMd5 = Hmac<Md5>;

/// Separator placed between signed fields.
pub const FIELD_DELIMITER: &str = ";";

/// Merchant secret shared with the gateway.
///
/// Cannot be constructed from an empty secret, so an unconfigured deployment
/// fails at startup instead of accepting unsigned traffic.
#[derive(Clone)]
pub struct SigningKey {
    secret: SecretString,
}

impl SigningKey {
    pub fn new(secret: impl Into<String>) -> Result<Self, BillingError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(BillingError::Configuration(
                "payment signing secret is not set".to_string(),
            ));
        }
        Ok(Self {
            secret: SecretString::new(secret),
        })
    }

    /// Signs the fields in the given order, returning lowercase hex.
    pub fn sign<I, S>(&self, fields: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        hex::encode(self.digest(fields))
    }

    /// Recomputes the signature and compares it in constant time.
    ///
    /// Hex case is ignored. A candidate that is not hex never verifies.
    pub fn verify<I, S>(&self, fields: I, candidate: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let provided = match hex::decode(candidate.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let expected = self.digest(fields);
        expected.as_slice().ct_eq(provided.as_slice()).into()
    }

    fn digest<I, S>(&self, fields: I) -> Vec<u8>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mac = HmacMd5::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any length");
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                mac.update(FIELD_DELIMITER.as_bytes());
            }
            mac.update(field.as_ref().as_bytes());
        }
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}
