use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Mints HMAC-SHA256 signed read URLs of the form
/// `{base_url}/{key}?expires={unix_secs}&signature={hex}`.
///
/// The signature covers `"{key}\n{expires}"`, so a URL is valid for exactly
/// one key and one expiry instant.
pub struct UrlSigner {
    base_url: String,
    secret: Vec<u8>,
}

impl UrlSigner {
    pub fn new(base_url: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            secret: secret.into(),
        }
    }

    pub fn sign(&self, key: &str, ttl: Duration) -> String {
        let expires = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        let signature = self.signature(key, expires);
        format!(
            "{}/{key}?expires={expires}&signature={signature}",
            self.base_url
        )
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
