//! Inbound webhook credential gate.

use anyhow::{bail, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the webhook credential on inbound notifications.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-desk-webhook-signature";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `WebhookVerificationMode` values.
///
/// `Disabled` is an explicit configuration choice, never an implicit
/// fallback; the serving process logs the selected mode at startup so an
/// unauthenticated ingestion endpoint is always a visible decision.
pub enum WebhookVerificationMode {
    Disabled,
    SharedToken { secret: String },
    HmacSha256 { secret: String },
}

impl WebhookVerificationMode {
    pub fn shared_token(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            bail!("shared-token webhook verification requires a non-empty secret");
        }
        Ok(Self::SharedToken { secret })
    }

    pub fn hmac_sha256(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            bail!("hmac-sha256 webhook verification requires a non-empty secret");
        }
        Ok(Self::HmacSha256 { secret })
    }

    pub fn mode_label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::SharedToken { .. } => "shared-token",
            Self::HmacSha256 { .. } => "hmac-sha256",
        }
    }

    /// Returns true when the notification carries a valid credential.
    ///
    /// Purely a gate over the raw body and the signature header; payload
    /// semantics are never inspected here.
    pub fn verify(&self, raw_body: &[u8], signature_header: Option<&str>) -> bool {
        match self {
            Self::Disabled => true,
            Self::SharedToken { secret } => {
                matches!(signature_header.map(str::trim), Some(header) if header == secret)
            }
            Self::HmacSha256 { secret } => signature_header
                .map(str::trim)
                .map(|header| verify_hmac_sha256(raw_body, header, secret))
                .unwrap_or(false),
        }
    }
}

fn verify_hmac_sha256(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Some(digest_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Some(signature_bytes) = decode_hex(digest_hex) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&signature_bytes).is_ok()
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() % 2 != 0 || !trimmed.is_ascii() {
        return None;
    }
    (0..trimmed.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(&trimmed[index..index + 2], 16).ok())
        .collect()
}
