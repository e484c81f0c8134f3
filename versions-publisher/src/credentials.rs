//! Deploy key handling.
//!
//! `DEPLOY_KEY` holds a base64-encoded JSON web key. It is decoded once at
//! startup and passed explicitly to whatever needs it. Only the derived owner
//! address is ever logged or sent over the wire.

use crate::utils::errors::{PublishError, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Environment variable carrying the encoded key.
pub const DEPLOY_KEY_ENV: &str = "DEPLOY_KEY";

#[derive(Clone)]
pub struct DeployKey {
    jwk: Map<String, Value>,
    address: String,
}

impl DeployKey {
    /// Decode a base64 (standard alphabet) JSON web key.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(PublishError::MissingCredential);
        }

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| PublishError::InvalidCredential(format!("not base64: {}", e)))?;

        let jwk: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| PublishError::InvalidCredential(format!("not a JSON key: {}", e)))?;

        let modulus = jwk
            .get("n")
            .and_then(Value::as_str)
            .ok_or_else(|| PublishError::InvalidCredential("missing modulus \"n\"".to_string()))?;

        let address = owner_address(modulus)?;

        Ok(Self { jwk, address })
    }

    /// Read and decode the key from `DEPLOY_KEY`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(DEPLOY_KEY_ENV) {
            Ok(value) => Self::from_base64(&value),
            Err(_) => Err(PublishError::MissingCredential),
        }
    }

    /// Wallet address owning uploads and record updates.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Key type, e.g. `RSA`.
    pub fn key_type(&self) -> Option<&str> {
        self.jwk.get("kty").and_then(Value::as_str)
    }
}

impl fmt::Debug for DeployKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployKey")
            .field("address", &self.address)
            .field("kty", &self.key_type())
            .finish_non_exhaustive()
    }
}

/// `base64url(sha256(n))` where `n` is the base64url key modulus.
fn owner_address(modulus: &str) -> Result<String> {
    let modulus = URL_SAFE_NO_PAD
        .decode(modulus.trim_end_matches('='))
        .map_err(|e| PublishError::InvalidCredential(format!("invalid modulus: {}", e)))?;

    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(&modulus)))
}
