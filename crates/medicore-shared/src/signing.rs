use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::SessionDecodeError;

/// Per-installation Ed25519 key that signs session tokens.
///
/// The secret is persisted in the durable storage tier so tokens issued with
/// "remember me" keep verifying across restarts.
#[derive(Clone)]
pub struct TokenSigner {
    signing_key: SigningKey,
}

impl TokenSigner {
    /// Generate a new random signing key
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Restore from secret key bytes
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        Self { signing_key }
    }

    /// Restore from the hex form kept in storage
    pub fn from_hex(secret_hex: &str) -> Option<Self> {
        let bytes = hex::decode(secret_hex.trim()).ok()?;
        let secret: [u8; 32] = bytes.try_into().ok()?;
        Some(Self::from_secret_bytes(&secret))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.as_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("public_key", &hex::encode(self.verifying_key().to_bytes()))
            .finish()
    }
}

/// Verify a detached signature against a public key
pub fn verify_signature(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SessionDecodeError> {
    let signature =
        Signature::from_slice(signature).map_err(|_| SessionDecodeError::InvalidSignature)?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| SessionDecodeError::InvalidSignature)
}
