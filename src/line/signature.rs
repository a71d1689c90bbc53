use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Verifies an `x-line-signature` header value: the base64-encoded
/// HMAC-SHA256 digest of the raw request body, keyed by the channel secret.
/// The digest comparison is constant-time via `Mac::verify_slice`.
pub fn verify_signature(channel_secret: &str, signature: &str, body: &[u8]) -> bool {
    let expected = match general_purpose::STANDARD.decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Computes the signature a sender would attach for `body`.
#[cfg(test)]
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(body);
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
