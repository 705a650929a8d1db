use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

pub const PASS_LINK_TTL_HOURS: i64 = 24;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks expiring links to stored pass artifacts. The signature
/// is `hex(HMAC-SHA256(secret, "{name}:{expires}"))`.
#[derive(Clone)]
pub struct PassLinkSigner {
    key: HmacSha256,
    ttl: Duration,
}

impl PassLinkSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: HmacSha256::new_from_slice(secret.as_ref()).expect("HMAC accepts keys of any length"),
            ttl: Duration::hours(PASS_LINK_TTL_HOURS),
        }
    }

    fn mac(&self, name: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.key.clone();
        mac.update(name.as_bytes());
        mac.update(b":");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    /// Appends `expires` and `sig` to `url`, which must point at `name`.
    pub fn sign(&self, url: &str, name: &str, now: DateTime<Utc>) -> String {
        let expires = (now + self.ttl).timestamp();
        let sig = hex::encode(self.mac(name, expires).finalize().into_bytes());
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{}{}expires={}&sig={}", url, sep, expires, sig)
    }

    pub fn verify(&self, name: &str, expires: i64, sig: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        if now.timestamp() > expires {
            return Err(AppError::Forbidden("Link expired".into()));
        }
        let provided = hex::decode(sig).map_err(|_| AppError::Forbidden("Invalid signature".into()))?;
        self.mac(name, expires)
            .verify_slice(&provided)
            .map_err(|_| AppError::Forbidden("Invalid signature".into()))
    }
}
