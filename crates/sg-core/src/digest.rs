//! Password digest for seeded accounts.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a password; an empty password stays empty
pub fn hash_password(password: &str) -> String {
    if password.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
