//! Session and authentication manager.
//!
//! [`AuthManager`] owns the user directory, the current user and the token
//! signer. It is created once at startup and shared by reference with every
//! command handler.
//!
//! Login, register and logout each take a ticket from a monotonically
//! increasing counter before their simulated latency. When a login or
//! register resumes and its ticket is no longer the newest, a later request
//! has already decided the session and the stale result is dropped with
//! [`AuthError::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use medicore_shared::constants::{
    LOGIN_LATENCY_MS, REGISTER_LATENCY_MS, RESET_PASSWORD_LATENCY_MS, SESSION_TTL_HOURS,
};
use medicore_shared::error::{AuthError, SessionDecodeError};
use medicore_shared::password::PasswordHash;
use medicore_shared::signing::TokenSigner;
use medicore_shared::token::SessionToken;
use medicore_shared::types::UserId;
use medicore_shared::user::{
    default_permissions, Action, ChangePasswordData, LoginCredentials, RegisterData, User,
};
use medicore_store::{SessionStorage, StorageTier, StoredSession};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::directory::UserDirectory;

/// How login treats the submitted password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicy {
    /// Any non-empty password is accepted.
    AcceptAny,
    /// The account must have a stored password and it must match.
    Verify,
}

impl std::str::FromStr for PasswordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "accept-any" => Ok(Self::AcceptAny),
            "verify" => Ok(Self::Verify),
            other => Err(format!("unknown password policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub login_latency: Duration,
    pub register_latency: Duration,
    pub reset_latency: Duration,
    pub session_ttl: chrono::Duration,
    pub password_policy: PasswordPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_latency: Duration::from_millis(LOGIN_LATENCY_MS),
            register_latency: Duration::from_millis(REGISTER_LATENCY_MS),
            reset_latency: Duration::from_millis(RESET_PASSWORD_LATENCY_MS),
            session_ttl: chrono::Duration::hours(SESSION_TTL_HOURS),
            password_policy: PasswordPolicy::AcceptAny,
        }
    }
}

impl AuthConfig {
    /// Defaults without the simulated latency.
    pub fn instant() -> Self {
        Self {
            login_latency: Duration::ZERO,
            register_latency: Duration::ZERO,
            reset_latency: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Result of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

struct AuthInner {
    directory: UserDirectory,
    current: Option<User>,
}

pub struct AuthManager {
    inner: tokio::sync::Mutex<AuthInner>,
    storage: Arc<Mutex<SessionStorage>>,
    signer: TokenSigner,
    generation: AtomicU64,
    config: AuthConfig,
}

impl AuthManager {
    /// Build the manager, loading the token signing key from the durable
    /// tier or generating and persisting a fresh one.
    pub fn new(
        storage: Arc<Mutex<SessionStorage>>,
        directory: UserDirectory,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let signer = {
            let mut guard = lock_storage(&storage)?;
            let stored = guard.signing_key().map_err(storage_error)?;
            match stored.as_deref().and_then(TokenSigner::from_hex) {
                Some(signer) => signer,
                None => {
                    if stored.is_some() {
                        warn!("Stored signing key is unreadable, generating a new one");
                    }
                    let signer = TokenSigner::generate();
                    guard.set_signing_key(&signer.to_hex()).map_err(storage_error)?;
                    debug!("Generated token signing key");
                    signer
                }
            }
        };

        Ok(Self {
            inner: tokio::sync::Mutex::new(AuthInner {
                directory,
                current: None,
            }),
            storage,
            signer,
            generation: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        let ticket = self.take_ticket();
        tokio::time::sleep(self.config.login_latency).await;

        let mut inner = self.inner.lock().await;
        self.ensure_current(ticket, "login")?;

        let email = credentials.email.trim();
        let entry = inner
            .directory
            .find_by_email(email)
            .ok_or(AuthError::InvalidCredentials)?;
        if !entry.user.is_active {
            warn!(user = %entry.user.id, "Login attempt on deactivated account");
            return Err(AuthError::AccountDeactivated);
        }
        if credentials.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        if self.config.password_policy == PasswordPolicy::Verify {
            let matches = entry
                .password
                .as_ref()
                .is_some_and(|hash| hash.verify(&credentials.password));
            if !matches {
                return Err(AuthError::InvalidCredentials);
            }
        }

        let mut user = entry.user.clone();
        user.last_login = Some(Utc::now());

        let tier = if credentials.remember_me {
            StorageTier::Durable
        } else {
            StorageTier::Session
        };
        let token = self.mint(&user.id)?;
        self.persist(tier, &token, &user)?;

        if let Some(entry) = inner.directory.find_mut(&user.id) {
            entry.user.last_login = user.last_login;
        }
        inner.current = Some(user.clone());

        info!(user = %user.id, role = %user.role, ?tier, "User logged in");
        Ok(AuthSession { user, token })
    }

    pub async fn register(&self, data: &RegisterData) -> Result<AuthSession, AuthError> {
        let ticket = self.take_ticket();
        tokio::time::sleep(self.config.register_latency).await;

        let mut inner = self.inner.lock().await;
        self.ensure_current(ticket, "register")?;

        let email = data.email.trim();
        for (field, value) in [
            ("firstName", data.first_name.as_str()),
            ("lastName", data.last_name.as_str()),
            ("email", email),
            ("password", data.password.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::MissingField(field));
            }
        }
        if inner.directory.find_by_email(email).is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        if data.password != data.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let user = User {
            id: inner.directory.next_id(),
            email: email.to_string(),
            first_name: data.first_name.trim().to_string(),
            last_name: data.last_name.trim().to_string(),
            role: data.role,
            department: non_empty(&data.department),
            specialization: non_empty(&data.specialization),
            license_number: non_empty(&data.license_number),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
            permissions: default_permissions(data.role),
        };

        let token = self.mint(&user.id)?;
        self.persist(StorageTier::Session, &token, &user)?;

        inner
            .directory
            .insert(user.clone(), Some(PasswordHash::new(&data.password)));
        inner.current = Some(user.clone());

        info!(user = %user.id, role = %user.role, "User registered");
        Ok(AuthSession { user, token })
    }

    /// Clear the current user and both storage tiers. Any login or register
    /// still in flight is superseded.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.take_ticket();
        let mut inner = self.inner.lock().await;
        let previous = inner.current.take();
        lock_storage(&self.storage)?.purge().map_err(storage_error)?;
        info!(user = ?previous.map(|u| u.id), "User logged out");
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        tokio::time::sleep(self.config.reset_latency).await;

        let inner = self.inner.lock().await;
        let entry = inner
            .directory
            .find_by_email(email.trim())
            .ok_or(AuthError::EmailNotFound)?;
        info!(user = %entry.user.id, "Password reset link sent");
        Ok(())
    }

    /// The signed-in user, restoring it from storage when nothing is held in
    /// memory. A stored session that fails verification is purged.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = &inner.current {
            return Ok(Some(user.clone()));
        }

        let mut storage = lock_storage(&self.storage)?;
        let Some(stored) = storage.load().map_err(storage_error)? else {
            return Ok(None);
        };

        match self.restore(&stored) {
            Ok(user) => {
                info!(user = %user.id, "Session restored");
                inner.current = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "Discarding stored session");
                storage.purge().map_err(storage_error)?;
                Ok(None)
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.current.is_some()
    }

    pub async fn has_permission(&self, resource: &str, action: Action) -> bool {
        self.inner
            .lock()
            .await
            .current
            .as_ref()
            .is_some_and(|user| user.has_permission(resource, action))
    }

    pub async fn change_password(&self, data: &ChangePasswordData) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().await;
        let user_id = inner
            .current
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or(AuthError::InvalidCredentials)?;

        if data.new_password.is_empty() {
            return Err(AuthError::MissingField("newPassword"));
        }
        if data.new_password != data.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let entry = inner
            .directory
            .find_mut(&user_id)
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))?;
        let current_ok = match &entry.password {
            Some(hash) => hash.verify(&data.current_password),
            None => !data.current_password.is_empty(),
        };
        if !current_ok {
            return Err(AuthError::InvalidCredentials);
        }

        entry.password = Some(PasswordHash::new(&data.new_password));
        info!(user = %user_id, "Password changed");
        Ok(())
    }

    /// Activate or deactivate an account. Requires `users:update`.
    pub async fn set_user_active(&self, id: &UserId, active: bool) -> Result<User, AuthError> {
        let mut inner = self.inner.lock().await;
        require(&inner.current, "users", Action::Update)?;

        let entry = inner
            .directory
            .find_mut(id)
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;
        entry.user.is_active = active;
        info!(user = %id, active, "Account status changed");
        Ok(entry.user.clone())
    }

    /// Every directory account. Requires `users:read`.
    pub async fn users(&self) -> Result<Vec<User>, AuthError> {
        let inner = self.inner.lock().await;
        require(&inner.current, "users", Action::Read)?;
        Ok(inner.directory.users().cloned().collect())
    }

    fn take_ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn ensure_current(&self, ticket: u64, request: &'static str) -> Result<(), AuthError> {
        let newest = self.generation.load(Ordering::SeqCst);
        if ticket == newest {
            Ok(())
        } else {
            debug!(request, ticket, newest, "Dropping superseded auth response");
            Err(AuthError::Superseded)
        }
    }

    fn mint(&self, user_id: &UserId) -> Result<String, AuthError> {
        SessionToken::issue(&self.signer, user_id.clone(), self.config.session_ttl)
            .and_then(|token| token.encode())
            .map_err(|e| AuthError::Storage(e.to_string()))
    }

    /// Replace whatever pair is stored with this one.
    fn persist(&self, tier: StorageTier, token: &str, user: &User) -> Result<(), AuthError> {
        let mut storage = lock_storage(&self.storage)?;
        storage.purge().map_err(storage_error)?;
        storage.save(tier, token, user).map_err(storage_error)
    }

    fn restore(&self, stored: &StoredSession) -> Result<User, SessionDecodeError> {
        let token = SessionToken::decode(&stored.token)?;
        token.verify(&self.signer.verifying_key())?;

        let user: User =
            serde_json::from_str(&stored.user_json).map_err(|_| SessionDecodeError::InvalidFormat)?;
        if &user.id != token.user_id() {
            return Err(SessionDecodeError::UserMismatch);
        }
        Ok(user)
    }
}

fn require(current: &Option<User>, resource: &str, action: Action) -> Result<(), AuthError> {
    match current {
        Some(user) if user.has_permission(resource, action) => Ok(()),
        _ => Err(AuthError::Forbidden(format!("{resource}:{action:?}").to_lowercase())),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lock_storage(
    storage: &Mutex<SessionStorage>,
) -> Result<std::sync::MutexGuard<'_, SessionStorage>, AuthError> {
    storage
        .lock()
        .map_err(|e| AuthError::Storage(format!("Lock poisoned: {e}")))
}

fn storage_error(e: medicore_store::StoreError) -> AuthError {
    AuthError::Storage(e.to_string())
}
