//! Master-password hashing using Argon2id.
//!
//! Every account gets its own random salt, and the Argon2id output is
//! stored next to it.  Parameters are configurable via `Argon2Params`
//! (loaded from `safepass.toml` or sensible defaults) and are recorded
//! with each account so later logins verify with the same settings.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::errors::{Result, SafePassError};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the password hash in bytes (256 bits).
pub const HASH_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject parameter sets that would make the hash trivially cheap.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(SafePassError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(SafePassError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(SafePassError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Hash a master password with the given salt and Argon2id parameters.
///
/// The same password + salt + params always produce the same hash.
pub fn hash_password(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<[u8; HASH_LEN]> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(HASH_LEN),
    )
    .map_err(|e| SafePassError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut hash = [0u8; HASH_LEN];
    argon2
        .hash_password_into(password, salt, &mut hash)
        .map_err(|e| SafePassError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(hash)
}

/// Check `password` against a stored hash.
///
/// The comparison is constant-time with respect to the hash bytes.
pub fn verify_password(
    password: &[u8],
    salt: &[u8],
    expected_hash: &[u8],
    argon2_params: &Argon2Params,
) -> Result<bool> {
    let mut actual = hash_password(password, salt, argon2_params)?;
    let matches: bool = actual.as_slice().ct_eq(expected_hash).into();
    actual.zeroize();
    Ok(matches)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Argon2Params {
        Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn same_inputs_same_hash() {
        let salt = [3u8; SALT_LEN];
        let a = hash_password(b"Secret1!", &salt, &fast()).unwrap();
        let b = hash_password(b"Secret1!", &salt, &fast()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salt_different_hash() {
        let a = hash_password(b"Secret1!", &[1u8; SALT_LEN], &fast()).unwrap();
        let b = hash_password(b"Secret1!", &[2u8; SALT_LEN], &fast()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_accepts_right_and_rejects_wrong() {
        let salt = generate_salt();
        let hash = hash_password(b"pw-right", &salt, &fast()).unwrap();
        assert!(verify_password(b"pw-right", &salt, &hash, &fast()).unwrap());
        assert!(!verify_password(b"pw-wrong", &salt, &hash, &fast()).unwrap());
    }

    #[test]
    fn verify_rejects_truncated_hash() {
        let salt = generate_salt();
        let hash = hash_password(b"pw", &salt, &fast()).unwrap();
        assert!(!verify_password(b"pw", &salt, &hash[..16], &fast()).unwrap());
    }

    #[test]
    fn weak_params_rejected() {
        let weak = Argon2Params {
            memory_kib: 1_024,
            ..fast()
        };
        assert!(hash_password(b"pw", &[0u8; SALT_LEN], &weak).is_err());

        let zero_iter = Argon2Params {
            iterations: 0,
            ..fast()
        };
        assert!(zero_iter.validate().is_err());
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
