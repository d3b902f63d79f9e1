//! Password hashing utilities

use bcrypt::{hash, verify};

use crate::domain::HashedSecret;
use crate::shared::HashError;

/// Lowest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;
/// Highest cost bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// Known-plaintext input for the decoy hash. Its value is irrelevant.
const DECOY_INPUT: &str = "authgate-decoy-password";

/// Salted, cost-tunable one-way password hashing (bcrypt).
///
/// Every `hash` call draws a fresh random salt, so hashing the same
/// password twice yields different outputs.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy: HashedSecret,
}

impl PasswordHasher {
    /// Builds a hasher for the given bcrypt cost.
    ///
    /// Also prepares a decoy hash at the same cost, used to equalize the
    /// work done for logins against unknown usernames.
    pub fn new(cost: u32) -> Result<Self, HashError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(HashError::new(format!(
                "bcrypt cost {} outside {}..={}",
                cost,
                MIN_COST,
                MAX_COST
            )));
        }
        let decoy = HashedSecret::from_stored(hash(DECOY_INPUT, cost)?);
        Ok(Self { cost, decoy })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password using bcrypt
    pub fn hash(&self, password: &str) -> Result<HashedSecret, HashError> {
        Ok(HashedSecret::from_stored(hash(password, self.cost)?))
    }

    /// Verify a password against a stored hash.
    ///
    /// Malformed stored hashes count as a mismatch. The comparison itself
    /// is constant-time inside the bcrypt crate.
    pub fn verify(&self, password: &str, hashed: &HashedSecret) -> bool {
        verify(password, hashed.as_str()).unwrap_or(false)
    }

    /// Burns one verification's worth of work; always `false`.
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.decoy);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let password = "secure_password_123";
        let hashed = hasher.hash(password).unwrap();

        assert!(hasher.verify(password, &hashed));
        assert!(!hasher.verify("wrong_password", &hashed));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hasher = hasher();
        let a = hasher.hash("password1").unwrap();
        let b = hasher.hash("password1").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("password1", &a));
        assert!(hasher.verify("password1", &b));
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hashed = hasher().hash("hunter2hunter2").unwrap();
        assert!(!hashed.as_str().contains("hunter2"));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let hasher = hasher();
        let garbage = HashedSecret::from_stored("not-a-bcrypt-hash".to_string());
        assert!(!hasher.verify("password1", &garbage));
    }

    #[test]
    fn older_cost_hashes_still_verify() {
        let old = hasher().hash("password1").unwrap();
        let newer = PasswordHasher::new(MIN_COST + 1).unwrap();
        assert!(newer.verify("password1", &old));
    }

    #[test]
    fn rejects_out_of_range_cost() {
        assert!(PasswordHasher::new(MIN_COST - 1).is_err());
        assert!(PasswordHasher::new(MAX_COST + 1).is_err());
    }

    #[test]
    fn decoy_never_matches() {
        assert!(!hasher().verify_decoy(DECOY_INPUT));
    }
}
