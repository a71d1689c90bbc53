mod client;
pub mod flex;
mod signature;
mod types;

pub use client::{LineClient, ReplyMessage};
pub use signature::verify_signature;
pub use types::{WebhookEnvelope, WebhookEvent};

#[cfg(test)]
pub use signature::sign;

/// Header carrying the base64 HMAC-SHA256 signature of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-line-signature";
