use medicore_shared::catalog::seed_users;
use medicore_shared::types::UserId;
use medicore_shared::user::{Action, ChangePasswordData, LoginCredentials, RegisterData, Role, User};
use serde::Serialize;
use tracing::info;

use crate::auth::AuthSession;
use crate::pages::{view_for, Page, View};
use crate::state::SharedState;

/// Password the demo buttons submit.
pub const DEMO_PASSWORD: &str = "demo123";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub view: View,
}

pub async fn login(state: &SharedState, credentials: LoginCredentials) -> Result<AuthResponse, String> {
    let auth = state.lock().await.auth.clone();
    let session = auth.login(&credentials).await.map_err(|e| e.to_string())?;
    Ok(enter_portal(state, session).await)
}

/// One-click login as the seeded account for `role`.
pub async fn demo_login(state: &SharedState, role: Role) -> Result<AuthResponse, String> {
    let email = seed_users()
        .into_iter()
        .find(|u| u.role == role)
        .map(|u| u.email)
        .ok_or_else(|| format!("No demo account for role {role}"))?;
    login(state, LoginCredentials::new(&email, DEMO_PASSWORD, false)).await
}

pub async fn register(state: &SharedState, data: RegisterData) -> Result<AuthResponse, String> {
    let auth = state.lock().await.auth.clone();
    let session = auth.register(&data).await.map_err(|e| e.to_string())?;
    Ok(enter_portal(state, session).await)
}

pub async fn logout(state: &SharedState) -> Result<View, String> {
    let auth = state.lock().await.auth.clone();
    auth.logout().await.map_err(|e| e.to_string())?;

    let mut guard = state.lock().await;
    guard.flow = None;
    guard.page = Page::Welcome;
    Ok(View::Auth)
}

pub async fn reset_password(state: &SharedState, email: String) -> Result<String, String> {
    let auth = state.lock().await.auth.clone();
    auth.reset_password(&email).await.map_err(|e| e.to_string())?;
    Ok(format!("Password reset link sent to {}", email.trim()))
}

/// Startup check for a stored session. A restored user lands on the
/// dashboard.
pub async fn restore_session(state: &SharedState) -> Result<Option<User>, String> {
    let auth = state.lock().await.auth.clone();
    let user = auth.current_user().await.map_err(|e| e.to_string())?;
    if let Some(user) = &user {
        state.lock().await.page = Page::Dashboard;
        info!(user = %user.id, "Resumed portal session");
    }
    Ok(user)
}

pub async fn current_user(state: &SharedState) -> Result<Option<User>, String> {
    let auth = state.lock().await.auth.clone();
    auth.current_user().await.map_err(|e| e.to_string())
}

pub async fn has_permission(state: &SharedState, resource: String, action: String) -> Result<bool, String> {
    let action: Action = action.parse()?;
    let auth = state.lock().await.auth.clone();
    Ok(auth.has_permission(&resource, action).await)
}

pub async fn change_password(state: &SharedState, data: ChangePasswordData) -> Result<(), String> {
    let auth = state.lock().await.auth.clone();
    auth.change_password(&data).await.map_err(|e| e.to_string())
}

pub async fn list_users(state: &SharedState) -> Result<Vec<User>, String> {
    let auth = state.lock().await.auth.clone();
    auth.users().await.map_err(|e| e.to_string())
}

pub async fn set_user_active(state: &SharedState, id: String, active: bool) -> Result<User, String> {
    let auth = state.lock().await.auth.clone();
    auth.set_user_active(&UserId::new(id), active)
        .await
        .map_err(|e| e.to_string())
}

async fn enter_portal(state: &SharedState, session: AuthSession) -> AuthResponse {
    let mut guard = state.lock().await;
    guard.flow = None;
    guard.page = Page::Dashboard;
    AuthResponse {
        view: view_for(Some(&session.user), guard.page),
        user: session.user,
        token: session.token,
    }
}
