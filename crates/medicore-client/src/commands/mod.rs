//! Command handlers behind the portal UI.
//!
//! Each sub-module groups related commands by domain. Handlers take the
//! shared [`AppState`](crate::state::AppState) and return
//! `Result<T, String>`; the error string is shown to the user as is.

pub mod auth;
pub mod catalog;
pub mod navigation;
pub mod settings;
pub mod telemedicine;

use medicore_shared::user::User;

use crate::state::SharedState;

/// The signed-in user, or an error when nobody is.
pub(crate) async fn require_user(state: &SharedState) -> Result<User, String> {
    let auth = state.lock().await.auth.clone();
    auth.current_user()
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "Please sign in first".to_string())
}
