//! Narrow interfaces to the password hasher and phone-number validator,
//! with the default implementations the server binary wires in.

use crate::error::AppError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use regex::Regex;
use std::sync::OnceLock;

pub trait Hasher: Send + Sync {
    /// One-way digest of `plaintext`. May be slow; callers run it off the async runtime.
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;
}

pub trait PhoneValidator: Send + Sync {
    fn is_valid(&self, value: &str) -> bool;
}

/// Argon2id with the crate's default parameters, PHC string output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Argon2Hasher;

impl Hasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
    }
}

/// International format: `+`, a non-zero country digit, 7 to 15 digits in total.
#[derive(Clone, Copy, Debug, Default)]
pub struct E164PhoneValidator;

impl PhoneValidator for E164PhoneValidator {
    fn is_valid(&self, value: &str) -> bool {
        static E164: OnceLock<Option<Regex>> = OnceLock::new();
        E164.get_or_init(|| Regex::new(r"^\+[1-9]\d{6,14}$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(value))
    }
}
