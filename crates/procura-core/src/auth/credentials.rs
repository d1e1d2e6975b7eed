//! Persisted credential record: bearer token plus the denormalized
//! user snapshot adopted on the last successful login or verification.
//!
//! Both live in one JSON record file, so clearing removes them together
//! and a reader can never observe a token without its user or vice
//! versa surviving a clear.

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::UserRecord;

/// Credential record file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub token: Option<String>,
    #[serde(rename = "userInfo")]
    pub user_info: Option<UserRecord>,
}

/// JWT payload fields we care about.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    exp: Option<i64>,
}

pub struct CredentialStore {
    data_dir: PathBuf,
}

impl CredentialStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create credential directory: {}", data_dir.display()))?;
        Ok(Self { data_dir })
    }

    fn record_path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE)
    }

    /// Load the persisted record. A missing or unreadable file is an
    /// empty record - a corrupt credential file must not wedge startup.
    fn load_record(&self) -> CredentialRecord {
        let path = self.record_path();
        if !path.exists() {
            return CredentialRecord::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Malformed credential record, treating as empty");
                    CredentialRecord::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to read credential record, treating as empty");
                CredentialRecord::default()
            }
        }
    }

    fn save_record(&self, record: &CredentialRecord) -> Result<()> {
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(self.record_path(), contents)
            .context("Failed to write credential record")?;
        Ok(())
    }

    /// Get the persisted bearer token, if any
    pub fn token(&self) -> Option<String> {
        self.load_record().token
    }

    /// Overwrite the persisted token unconditionally
    pub fn set_token(&self, token: &str) -> Result<()> {
        let mut record = self.load_record();
        record.token = Some(token.to_string());
        self.save_record(&record)
    }

    /// Get the persisted user snapshot, if any
    pub fn user_info(&self) -> Option<UserRecord> {
        self.load_record().user_info
    }

    /// Overwrite the persisted user snapshot unconditionally
    pub fn set_user_info(&self, user: &UserRecord) -> Result<()> {
        let mut record = self.load_record();
        record.user_info = Some(user.clone());
        self.save_record(&record)
    }

    /// Remove token and user info together.
    /// Idempotent - clearing an already-empty store succeeds.
    pub fn clear_all(&self) -> Result<()> {
        let path = self.record_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove credential record")?;
        }
        Ok(())
    }

    /// Whether the token's `exp` claim is absent or in the past.
    ///
    /// Anything that cannot be decoded as a JWT with a numeric `exp`
    /// counts as expired - the check fails closed, never open.
    pub fn is_token_expired(token: &str) -> bool {
        match Self::decode_expiry(token) {
            Some(expiry) => Utc::now() >= expiry,
            None => true,
        }
    }

    fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
        let mut parts = token.split('.');
        let _header = parts.next()?;
        let claims_b64 = parts.next()?;
        let _signature = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let claims_bytes = Base64UrlUnpadded::decode_vec(claims_b64).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&claims_bytes).ok()?;
        DateTime::from_timestamp(claims.exp?, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Build a structurally valid unsigned JWT with the given claims.
    fn make_token(claims: &serde_json::Value) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
        format!("{}.{}.sig", header, payload)
    }

    fn temp_store(name: &str) -> CredentialStore {
        let dir = std::env::temp_dir().join(format!(
            "procura-credstore-{}-{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&dir);
        CredentialStore::new(dir).unwrap()
    }

    fn user() -> UserRecord {
        UserRecord {
            id: 1,
            email: "a@b.com".to_string(),
            role: "buyer".to_string(),
            permissions: Default::default(),
            session_timeout_minutes: Some(30),
            email_verified: true,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let store = temp_store("token-round-trip");
        assert!(store.token().is_none());
        store.set_token("tok").unwrap();
        assert_eq!(store.token().as_deref(), Some("tok"));
    }

    #[test]
    fn test_user_info_round_trip() {
        let store = temp_store("user-round-trip");
        assert!(store.user_info().is_none());
        store.set_user_info(&user()).unwrap();
        assert_eq!(store.user_info().unwrap().id, 1);
    }

    #[test]
    fn test_clear_all_removes_both() {
        let store = temp_store("clear-all");
        store.set_token("tok").unwrap();
        store.set_user_info(&user()).unwrap();
        store.clear_all().unwrap();
        assert!(store.token().is_none());
        assert!(store.user_info().is_none());
        // Second clear is a no-op, not an error
        store.clear_all().unwrap();
    }

    #[test]
    fn test_malformed_record_treated_as_empty() {
        let store = temp_store("malformed");
        std::fs::write(store.record_path(), "not json").unwrap();
        assert!(store.token().is_none());
        assert!(store.user_info().is_none());
    }

    #[test]
    fn test_unexpired_token() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = make_token(&serde_json::json!({ "sub": "1", "exp": exp }));
        assert!(!CredentialStore::is_token_expired(&token));
    }

    #[test]
    fn test_expired_token() {
        let exp = (Utc::now() - Duration::hours(1)).timestamp();
        let token = make_token(&serde_json::json!({ "sub": "1", "exp": exp }));
        assert!(CredentialStore::is_token_expired(&token));
    }

    #[test]
    fn test_missing_exp_claim_is_expired() {
        let token = make_token(&serde_json::json!({ "sub": "1" }));
        assert!(CredentialStore::is_token_expired(&token));
    }

    #[test]
    fn test_garbage_token_is_expired() {
        assert!(CredentialStore::is_token_expired("not-a-jwt"));
        assert!(CredentialStore::is_token_expired("a.b"));
        assert!(CredentialStore::is_token_expired("a.%%%.c"));
        assert!(CredentialStore::is_token_expired(""));
    }
}
