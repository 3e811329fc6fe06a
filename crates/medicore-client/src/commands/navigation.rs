use std::time::Duration;

use medicore_media::FlowStage;
use medicore_shared::user::User;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::pages::{route, view_for, Page, Route, View};
use crate::state::{AppState, SharedState};

pub async fn navigate(state: &SharedState, target: &str) -> Result<View, String> {
    let page = match route(target) {
        Route::Logout => return super::auth::logout(state).await,
        Route::Page(page) => page,
    };

    let auth = state.lock().await.auth.clone();
    let Some(user) = auth.current_user().await.map_err(|e| e.to_string())? else {
        return Ok(View::Auth);
    };

    let mut guard = state.lock().await;
    open_page(&mut guard, &user, page);
    Ok(view_for(Some(&user), page))
}

pub async fn current_view(state: &SharedState) -> Result<View, String> {
    let auth = state.lock().await.auth.clone();
    let user = auth.current_user().await.map_err(|e| e.to_string())?;
    let page = state.lock().await.page;
    Ok(view_for(user.as_ref(), page))
}

/// Switch pages. The telemedicine flow lives only as long as the visit to
/// its page.
pub(crate) fn open_page(state: &mut AppState, user: &User, page: Page) {
    if page == Page::Telemedicine {
        if state.flow.is_none() {
            state.flow = Some(state.new_flow(user));
            debug!(user = %user.id, "Telemedicine flow started");
        }
    } else if state.flow.take().is_some() {
        debug!("Telemedicine flow discarded");
    }
    state.page = page;
    info!(%page, "Navigated");
}

/// Once the ended view has been up for `delay`, go back to the dashboard,
/// unless the user already moved on.
pub(crate) fn schedule_return_to_dashboard(state: SharedState, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let mut guard = state.lock().await;
        let ended = guard
            .flow
            .as_ref()
            .is_some_and(|flow| flow.stage() == FlowStage::Ended);
        if guard.page == Page::Telemedicine && ended {
            guard.flow = None;
            guard.page = Page::Dashboard;
            info!("Returned to dashboard after call");
        }
    })
}
