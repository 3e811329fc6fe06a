//! The two retention tiers the portal persists sessions into.
//!
//! Each tier holds at most one `{token, user}` pair under fixed keys. The
//! durable tier additionally keeps the token signing key and the settings
//! blob.

use medicore_shared::constants::{
    SETTINGS_STORAGE_KEY, SIGNING_KEY_STORAGE_KEY, TOKEN_STORAGE_KEY, USER_STORAGE_KEY,
};
use medicore_shared::user::User;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::kv::{KeyValueStore, MemoryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTier {
    /// Survives restarts ("remember me").
    Durable,
    /// Dropped when the process exits.
    Session,
}

/// Raw stored pair. The token and the user JSON are each read durable-first,
/// so they may come from different tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub user_json: String,
}

pub struct SessionStorage {
    durable: Box<dyn KeyValueStore>,
    session: MemoryStore,
}

impl SessionStorage {
    pub fn new(durable: Box<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            session: MemoryStore::new(),
        }
    }

    /// Both tiers in memory.
    pub fn ephemeral() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn tier(&self, tier: StorageTier) -> &dyn KeyValueStore {
        match tier {
            StorageTier::Durable => self.durable.as_ref(),
            StorageTier::Session => &self.session,
        }
    }

    fn tier_mut(&mut self, tier: StorageTier) -> &mut dyn KeyValueStore {
        match tier {
            StorageTier::Durable => self.durable.as_mut(),
            StorageTier::Session => &mut self.session,
        }
    }

    pub fn save(&mut self, tier: StorageTier, token: &str, user: &User) -> Result<()> {
        let user_json = serde_json::to_string(user)?;
        let store = self.tier_mut(tier);
        store.set(TOKEN_STORAGE_KEY, token)?;
        store.set(USER_STORAGE_KEY, &user_json)?;
        tracing::debug!(?tier, user = %user.id, "session persisted");
        Ok(())
    }

    /// The stored pair, or `None` unless both halves are present.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        let token = self.first_of(TOKEN_STORAGE_KEY)?;
        let user_json = self.first_of(USER_STORAGE_KEY)?;
        Ok(match (token, user_json) {
            (Some(token), Some(user_json)) => Some(StoredSession { token, user_json }),
            _ => None,
        })
    }

    /// Remove the session pair from both tiers, whichever was written.
    pub fn purge(&mut self) -> Result<()> {
        for tier in [StorageTier::Durable, StorageTier::Session] {
            let store = self.tier_mut(tier);
            store.remove(TOKEN_STORAGE_KEY)?;
            store.remove(USER_STORAGE_KEY)?;
        }
        tracing::debug!("session storage purged");
        Ok(())
    }

    pub fn has_session_data(&self) -> Result<bool> {
        for tier in [StorageTier::Durable, StorageTier::Session] {
            let store = self.tier(tier);
            if store.get(TOKEN_STORAGE_KEY)?.is_some() || store.get(USER_STORAGE_KEY)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn signing_key(&self) -> Result<Option<String>> {
        self.durable.get(SIGNING_KEY_STORAGE_KEY)
    }

    pub fn set_signing_key(&mut self, secret_hex: &str) -> Result<()> {
        self.durable.set(SIGNING_KEY_STORAGE_KEY, secret_hex)
    }

    /// Settings blob from the durable tier. A corrupt blob is reported as an
    /// error rather than silently replaced.
    pub fn load_settings<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.durable.get(SETTINGS_STORAGE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_settings<T: Serialize>(&mut self, settings: &T) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.durable.set(SETTINGS_STORAGE_KEY, &json)
    }

    fn first_of(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.durable.get(key)? {
            return Ok(Some(value));
        }
        self.session.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use medicore_shared::catalog::seed_users;

    #[test]
    fn test_save_then_load_from_each_tier() {
        let user = seed_users().remove(0);

        for tier in [StorageTier::Durable, StorageTier::Session] {
            let mut storage = SessionStorage::ephemeral();
            storage.save(tier, "tok", &user).unwrap();

            let stored = storage.load().unwrap().expect("pair present");
            assert_eq!(stored.token, "tok");
            let back: User = serde_json::from_str(&stored.user_json).unwrap();
            assert_eq!(back, user);
            assert!(storage.tier(tier).get(TOKEN_STORAGE_KEY).unwrap().is_some());
        }
    }

    #[test]
    fn test_durable_tier_wins() {
        let users = seed_users();
        let mut storage = SessionStorage::ephemeral();
        storage.save(StorageTier::Session, "session-tok", &users[0]).unwrap();
        storage.save(StorageTier::Durable, "durable-tok", &users[1]).unwrap();

        let stored = storage.load().unwrap().unwrap();
        assert_eq!(stored.token, "durable-tok");
        assert!(stored.user_json.contains("dr.wilson@medicore.com"));
    }

    #[test]
    fn test_half_a_pair_is_no_session() {
        let mut storage = SessionStorage::ephemeral();
        storage
            .tier_mut(StorageTier::Session)
            .set(TOKEN_STORAGE_KEY, "orphan")
            .unwrap();
        assert_eq!(storage.load().unwrap(), None);
        assert!(storage.has_session_data().unwrap());
    }

    #[test]
    fn test_purge_clears_both_tiers_but_keeps_signing_key() {
        let user = seed_users().remove(0);
        let mut storage = SessionStorage::new(Box::new(Database::open_in_memory().unwrap()));
        storage.set_signing_key("00ff").unwrap();
        storage.save(StorageTier::Durable, "a", &user).unwrap();
        storage.save(StorageTier::Session, "b", &user).unwrap();

        storage.purge().unwrap();

        assert_eq!(storage.load().unwrap(), None);
        assert!(!storage.has_session_data().unwrap());
        assert_eq!(storage.signing_key().unwrap().as_deref(), Some("00ff"));
    }

    #[test]
    fn test_settings_roundtrip_and_corruption() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Prefs {
            theme: String,
        }

        let mut storage = SessionStorage::ephemeral();
        assert_eq!(storage.load_settings::<Prefs>().unwrap(), None);

        let prefs = Prefs { theme: "dark".into() };
        storage.save_settings(&prefs).unwrap();
        assert_eq!(storage.load_settings::<Prefs>().unwrap(), Some(prefs));

        storage
            .tier_mut(StorageTier::Durable)
            .set(SETTINGS_STORAGE_KEY, "{not json")
            .unwrap();
        assert!(storage.load_settings::<Prefs>().is_err());
    }
}
