use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::error::{MedicoreError, SessionDecodeError};
use crate::signing::{verify_signature, TokenSigner};
use crate::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: UserId,
    /// Expiry in milliseconds since the Unix epoch.
    pub exp: i64,
}

/// Bearer value binding a user id to an expiry instant.
///
/// Encoded as base64url over a bincode body; the claims are signed so a
/// holder cannot swap in another user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub claims: TokenClaims,
    pub signature: Vec<u8>,
}

impl SessionToken {
    /// Issue a token for `user_id` that expires `ttl` from now.
    pub fn issue(signer: &TokenSigner, user_id: UserId, ttl: Duration) -> Result<Self, MedicoreError> {
        Self::issue_until(signer, user_id, Utc::now() + ttl)
    }

    pub fn issue_until(
        signer: &TokenSigner,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, MedicoreError> {
        let claims = TokenClaims {
            user_id,
            exp: expires_at.timestamp_millis(),
        };
        let claims_bytes = bincode::serialize(&claims)
            .map_err(|e| MedicoreError::Serialization(e.to_string()))?;
        let signature = signer.sign(&claims_bytes);

        Ok(Self {
            claims,
            signature: signature.to_bytes().to_vec(),
        })
    }

    /// Encode as the opaque string kept in storage.
    pub fn encode(&self) -> Result<String, MedicoreError> {
        let bytes =
            bincode::serialize(self).map_err(|e| MedicoreError::Serialization(e.to_string()))?;
        Ok(base64_url_encode(&bytes))
    }

    pub fn decode(code: &str) -> Result<Self, SessionDecodeError> {
        let bytes = base64_url_decode(code)?;
        bincode::deserialize(&bytes).map_err(|_| SessionDecodeError::InvalidFormat)
    }

    /// Check signature and expiry against the current time.
    pub fn verify(&self, key: &VerifyingKey) -> Result<(), SessionDecodeError> {
        self.verify_at(key, Utc::now())
    }

    pub fn verify_at(&self, key: &VerifyingKey, now: DateTime<Utc>) -> Result<(), SessionDecodeError> {
        let claims_bytes =
            bincode::serialize(&self.claims).map_err(|_| SessionDecodeError::InvalidFormat)?;
        verify_signature(key, &claims_bytes, &self.signature)?;

        // valid only while expiry is strictly in the future
        if self.claims.exp <= now.timestamp_millis() {
            return Err(SessionDecodeError::Expired);
        }
        Ok(())
    }

    pub fn user_id(&self) -> &UserId {
        &self.claims.user_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.claims.exp).unwrap_or_default()
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, SessionDecodeError> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD
        .decode(s.trim())
        .map_err(|_| SessionDecodeError::Base64Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_encode_decode_verify() {
        let signer = TokenSigner::generate();
        let before = Utc::now();
        let token = SessionToken::issue(&signer, UserId::from("2"), Duration::hours(24)).unwrap();

        let code = token.encode().unwrap();
        let decoded = SessionToken::decode(&code).expect("decode should work");
        decoded.verify(&signer.verifying_key()).expect("verify should pass");

        assert_eq!(decoded.user_id(), &UserId::from("2"));
        assert!(decoded.expires_at() > before);
        assert!(decoded.expires_at() <= Utc::now() + Duration::hours(24));
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = TokenSigner::generate();
        let token =
            SessionToken::issue_until(&signer, UserId::from("1"), Utc::now() - Duration::seconds(1))
                .unwrap();
        assert_eq!(
            token.verify(&signer.verifying_key()),
            Err(SessionDecodeError::Expired)
        );
    }

    #[test]
    fn test_expiry_equal_to_now_is_expired() {
        let signer = TokenSigner::generate();
        let now = Utc::now();
        let token = SessionToken::issue_until(&signer, UserId::from("1"), now).unwrap();
        assert_eq!(
            token.verify_at(&signer.verifying_key(), now),
            Err(SessionDecodeError::Expired)
        );
    }

    #[test]
    fn test_forged_user_id_fails() {
        let signer = TokenSigner::generate();
        let mut token = SessionToken::issue(&signer, UserId::from("1"), Duration::hours(1)).unwrap();
        token.claims.user_id = UserId::from("4");
        assert_eq!(
            token.verify(&signer.verifying_key()),
            Err(SessionDecodeError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert_eq!(
            SessionToken::decode("%%% not base64 %%%").unwrap_err(),
            SessionDecodeError::Base64Decode
        );
        assert_eq!(
            SessionToken::decode("aGVsbG8").unwrap_err(),
            SessionDecodeError::InvalidFormat
        );
    }
}
