// =====================================================================================
// PASSWORD SERVICE - ARGON2 HASHING AND STRENGTH RULES
// =====================================================================================

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use tracing::{debug, instrument};

use crate::models::AdminError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct PasswordService;

impl PasswordService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, AdminError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// A hash that fails to parse counts as a mismatch.
    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Stored password hash is unreadable: {}", e);
                return false;
            }
        };

        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    }

    pub fn validate_strength(password: &str) -> Result<(), AdminError> {
        let mut issues = Vec::new();

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            issues.push(format!("at least {} characters", MIN_PASSWORD_LENGTH));
        }
        if !password.chars().any(|c| c.is_alphabetic()) {
            issues.push("a letter".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            issues.push("a digit".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(AdminError::Validation(format!("Password needs {}", issues.join(", "))))
        }
    }
}
