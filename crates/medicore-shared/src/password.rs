use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::constants::{KDF_CONTEXT_PASSWORD, PASSWORD_SALT_SIZE};

/// Salted password digest stored with a directory account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    salt: [u8; PASSWORD_SALT_SIZE],
    digest: [u8; 32],
}

impl PasswordHash {
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; PASSWORD_SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self {
            salt,
            digest: derive(&salt, password),
        }
    }

    pub fn verify(&self, password: &str) -> bool {
        let candidate = derive(&self.salt, password);
        candidate.ct_eq(&self.digest).into()
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

fn derive(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_PASSWORD);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_matches_only_original() {
        let hash = PasswordHash::new("correct horse");
        assert!(hash.verify("correct horse"));
        assert!(!hash.verify("correct horse "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_salted() {
        let a = PasswordHash::new("same");
        let b = PasswordHash::new("same");
        assert_ne!(a, b);
        assert!(a.verify("same") && b.verify("same"));
    }
}
