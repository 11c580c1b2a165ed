//! crates/task_dashboard_core/src/session.rs
//!
//! The explicit session context: typed access to the durable session fields
//! on top of any `SessionStore`. Everything that reads or writes session state
//! receives one of these instead of reaching for global storage.

use crate::domain::{Role, UserProfile};
use crate::ports::{CredentialStore, PortError, PortResult, SessionStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

/// Keys of the durable session fields.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Identity-provider session, owned by the credential provider adapter.
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const ROLE: &str = "role";
    pub const USER_ID: &str = "userId";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const USER_EMAIL: &str = "userEmail";
    /// Last viewed project; picks the leader dashboard endpoint.
    pub const PROJECT_ID: &str = "projectId";
}

//=========================================================================================
// SessionContext
//=========================================================================================

/// Typed view over the durable session. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// A context backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::default()))
    }

    fn read(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self
            .store
            .get(key)?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()))
    }

    pub fn access_token(&self) -> PortResult<Option<String>> {
        self.read(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> PortResult<Option<String>> {
        self.read(keys::REFRESH_TOKEN)
    }

    pub fn set_refresh_token(&self, token: &str) -> PortResult<()> {
        self.store.set(keys::REFRESH_TOKEN, token)
    }

    pub fn role(&self) -> PortResult<Option<Role>> {
        let Some(raw) = self.read(keys::ROLE)? else {
            return Ok(None);
        };
        match raw.parse::<Role>() {
            Ok(role) => Ok(Some(role)),
            Err(e) => {
                warn!("ignoring stored session role: {e}");
                Ok(None)
            }
        }
    }

    pub fn user_id(&self) -> PortResult<Option<Uuid>> {
        self.read_uuid(keys::USER_ID)
    }

    pub fn display_name(&self) -> PortResult<Option<String>> {
        self.read(keys::DISPLAY_NAME)
    }

    pub fn email(&self) -> PortResult<Option<String>> {
        self.read(keys::USER_EMAIL)
    }

    pub fn project_id(&self) -> PortResult<Option<Uuid>> {
        self.read_uuid(keys::PROJECT_ID)
    }

    /// Remembers the project the user last opened.
    pub fn remember_project(&self, project_id: Uuid) -> PortResult<()> {
        self.store.set(keys::PROJECT_ID, &project_id.to_string())
    }

    /// Persists the token and profile obtained from a login exchange.
    pub fn store_profile(&self, profile: &UserProfile, access_token: &str) -> PortResult<()> {
        self.store.set(keys::ACCESS_TOKEN, access_token)?;
        self.store.set(keys::ROLE, profile.role.as_str())?;
        self.store.set(keys::USER_ID, &profile.id.to_string())?;
        self.store.set(keys::DISPLAY_NAME, &profile.display_name)?;
        self.store.set(keys::USER_EMAIL, &profile.email)?;
        Ok(())
    }

    pub fn is_signed_in(&self) -> PortResult<bool> {
        Ok(self.access_token()?.is_some())
    }

    /// Drops all durable session state.
    pub fn clear(&self) -> PortResult<()> {
        self.store.clear()
    }

    fn read_uuid(&self, key: &str) -> PortResult<Option<Uuid>> {
        let Some(raw) = self.read(key)? else {
            return Ok(None);
        };
        match Uuid::parse_str(&raw) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                warn!(key, "ignoring malformed id in session: {e}");
                Ok(None)
            }
        }
    }
}

impl CredentialStore for SessionContext {
    fn get_token(&self) -> PortResult<Option<String>> {
        self.access_token()
    }

    fn set_token(&self, token: &str) -> PortResult<()> {
        self.store.set(keys::ACCESS_TOKEN, token)
    }

    fn clear_token(&self) -> PortResult<()> {
        self.store.remove(keys::ACCESS_TOKEN)
    }
}

//=========================================================================================
// In-memory Store
//=========================================================================================

/// A `SessionStore` that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| PortError::Storage("session store lock poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::from_u128(7),
            email: "lead@example.com".to_string(),
            display_name: "Lead".to_string(),
            photo_url: None,
            role: Role::Leader,
        }
    }

    #[test]
    fn store_profile_populates_every_field() {
        let session = SessionContext::in_memory();
        session.store_profile(&profile(), "tok-1").unwrap();

        assert_eq!(session.access_token().unwrap().as_deref(), Some("tok-1"));
        assert_eq!(session.role().unwrap(), Some(Role::Leader));
        assert_eq!(session.user_id().unwrap(), Some(Uuid::from_u128(7)));
        assert_eq!(session.display_name().unwrap().as_deref(), Some("Lead"));
        assert_eq!(session.email().unwrap().as_deref(), Some("lead@example.com"));
        assert!(session.is_signed_in().unwrap());
    }

    #[test]
    fn clear_removes_everything() {
        let session = SessionContext::in_memory();
        session.store_profile(&profile(), "tok-1").unwrap();
        session.set_refresh_token("refresh").unwrap();
        session.remember_project(Uuid::from_u128(3)).unwrap();

        session.clear().unwrap();

        assert!(!session.is_signed_in().unwrap());
        assert_eq!(session.refresh_token().unwrap(), None);
        assert_eq!(session.project_id().unwrap(), None);
        assert_eq!(session.role().unwrap(), None);
    }

    #[test]
    fn blank_and_malformed_values_read_as_absent() {
        let store = Arc::new(MemorySessionStore::default());
        store.set(keys::ACCESS_TOKEN, "   ").unwrap();
        store.set(keys::ROLE, "OWNER").unwrap();
        store.set(keys::PROJECT_ID, "not-a-uuid").unwrap();
        let session = SessionContext::new(store);

        assert_eq!(session.access_token().unwrap(), None);
        assert_eq!(session.role().unwrap(), None);
        assert_eq!(session.project_id().unwrap(), None);
    }

    #[test]
    fn credential_store_shares_the_access_token_key() {
        let session = SessionContext::in_memory();
        session.set_token("abc").unwrap();
        assert_eq!(session.access_token().unwrap().as_deref(), Some("abc"));

        let clone = session.clone();
        clone.clear_token().unwrap();
        assert_eq!(session.get_token().unwrap(), None);
    }
}
