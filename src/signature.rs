// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook signature verification.
//!
//! Senders sign the raw request body with a shared secret using HMAC. The
//! hash function (SHA-1 or SHA-256) and the digest encoding (base64 or hex)
//! vary between providers, so both are configuration. Comparison is
//! constant-time over the encoded digest.

use crate::config::{SignatureAlgorithm, SignatureConfig, SignatureEncoding};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Signature verification failures.
///
/// Variants never carry the presented or expected digest.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    #[error("No webhook secret configured")]
    MissingSecret,

    #[error("Signature does not match request body")]
    Mismatch,
}

/// Verifies webhook signatures against a shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    algorithm: SignatureAlgorithm,
    encoding: SignatureEncoding,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl SignatureVerifier {
    /// Create a verifier from the signature configuration.
    pub fn new(config: &SignatureConfig) -> Self {
        Self {
            secret: config.secret.as_bytes().to_vec(),
            algorithm: config.algorithm,
            encoding: config.encoding,
        }
    }

    /// Compute the encoded signature for `body`, as a sender would.
    pub fn sign(&self, body: &[u8]) -> Result<String, SignatureError> {
        if self.secret.is_empty() {
            return Err(SignatureError::MissingSecret);
        }

        let digest = match self.algorithm {
            SignatureAlgorithm::Sha1 => {
                let mut mac = <HmacSha1 as Mac>::new_from_slice(&self.secret)
                    .map_err(|_| SignatureError::MissingSecret)?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
            SignatureAlgorithm::Sha256 => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
                    .map_err(|_| SignatureError::MissingSecret)?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
        };

        Ok(match self.encoding {
            SignatureEncoding::Base64 => STANDARD.encode(digest),
            SignatureEncoding::Hex => hex::encode(digest),
        })
    }

    /// Check a signature header value against the raw body.
    pub fn check(&self, header: &str, body: &[u8]) -> Result<(), SignatureError> {
        let expected = self.sign(body)?;
        let presented = self.normalize_header(header);

        // ct_eq on slices of different lengths is false without inspecting bytes
        if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            debug!(algorithm = %self.algorithm, "Signature mismatch");
            Err(SignatureError::Mismatch)
        }
    }

    /// Boolean form of [`check`](Self::check); never panics or errors.
    pub fn verify(&self, header: &str, body: &[u8]) -> bool {
        self.check(header, body).is_ok()
    }

    /// Strip an optional `<algorithm>=` prefix and canonicalize hex case.
    fn normalize_header(&self, header: &str) -> String {
        let trimmed = header.trim();
        let prefix = format!("{}=", self.algorithm);
        let value = match trimmed.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(&prefix) => &trimmed[prefix.len()..],
            _ => trimmed,
        };

        match self.encoding {
            SignatureEncoding::Hex => value.to_ascii_lowercase(),
            SignatureEncoding::Base64 => value.to_string(),
        }
    }
}

/// Verify `header` over `body` with `secret` using the given algorithm/encoding pair.
pub fn verify(
    header: &str,
    body: &[u8],
    secret: &str,
    algorithm: SignatureAlgorithm,
    encoding: SignatureEncoding,
) -> bool {
    SignatureVerifier::new(&SignatureConfig {
        secret: secret.to_string(),
        algorithm,
        encoding,
        ..Default::default()
    })
    .verify(header, body)
}
