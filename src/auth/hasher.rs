//! Password Hashing
//!
//! Argon2id digests in PHC string format. Each digest carries its own salt and
//! cost parameters, so verification keeps working after the configured work
//! factor is raised.

use crate::config::HashingConfig;
use crate::error::{AuthError, AuthResult};
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use tracing::debug;

/// Salted, adaptive-cost password hasher
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Digest of a random secret at the configured cost, verified against
    /// when there is no stored digest to check
    decoy: Arc<str>,
}

impl PasswordHasher {
    /// Create a hasher with the given work factor
    pub fn new(config: &HashingConfig) -> AuthResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Hashing(format!("invalid work factor: {}", e)))?;

        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        let decoy = digest_with(&params, &secret)?;

        Ok(Self {
            params,
            decoy: decoy.into(),
        })
    }

    /// Hash a plaintext password with a freshly generated salt
    pub fn hash(&self, plaintext: &str) -> AuthResult<String> {
        digest_with(&self.params, plaintext.as_bytes())
    }

    /// Verify a plaintext password against a stored digest
    ///
    /// The salt and cost are read from `digest`; the final comparison is
    /// constant time. A digest that does not parse is a failed verification.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Stored digest could not be parsed: {}", e);
                return false;
            }
        };
        argon2(&self.params)
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend one full verification without a stored digest
    ///
    /// Lets a lookup miss cost the same as a wrong password.
    pub fn verify_decoy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.decoy);
    }
}

fn argon2(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn digest_with(params: &Params, secret: &[u8]) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = argon2(params)
        .hash_password(secret, &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(digest.to_string())
}
