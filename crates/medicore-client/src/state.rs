//! Application state shared across all commands.
//!
//! The [`AppState`] struct is wrapped in `Arc<tokio::sync::Mutex<>>` so that
//! every command handler and the delayed navigation task can reach it.

use std::sync::{Arc, Mutex};

use medicore_media::{
    DeviceProbe, LocalParticipant, ParticipantRole, RemoteParty, SimulatedDevices, SimulatedRemote,
    TelemedicineFlow,
};
use medicore_shared::appointment::Appointment;
use medicore_shared::catalog::seed_appointments;
use medicore_shared::error::AuthError;
use medicore_shared::user::User;
use medicore_store::SessionStorage;

use crate::auth::AuthManager;
use crate::config::ClientConfig;
use crate::directory::UserDirectory;
use crate::pages::Page;

pub type SharedState = Arc<tokio::sync::Mutex<AppState>>;

pub struct AppState {
    pub config: ClientConfig,

    /// Session context. Handlers clone it out and release the state lock
    /// before awaiting auth calls.
    pub auth: Arc<AuthManager>,

    /// Both storage tiers; the auth manager holds the same handle.
    pub storage: Arc<Mutex<SessionStorage>>,

    pub page: Page,

    /// Telemedicine flow for the current visit to the telemedicine page.
    pub flow: Option<TelemedicineFlow>,

    /// Appointment book, seeded at startup.
    pub appointments: Vec<Appointment>,

    probe: Arc<dyn DeviceProbe>,
    remote: Arc<dyn RemoteParty>,
}

impl AppState {
    /// State with simulated devices and a simulated doctor.
    pub fn new(config: ClientConfig, storage: SessionStorage) -> Result<Self, AuthError> {
        let remote = Arc::new(SimulatedRemote::new(config.doctor_ready));
        Self::with_devices(config, storage, Arc::new(SimulatedDevices::new()), remote)
    }

    pub fn with_devices(
        config: ClientConfig,
        storage: SessionStorage,
        probe: Arc<dyn DeviceProbe>,
        remote: Arc<dyn RemoteParty>,
    ) -> Result<Self, AuthError> {
        let storage = Arc::new(Mutex::new(storage));
        let auth = AuthManager::new(storage.clone(), UserDirectory::seeded(), config.auth_config())?;

        Ok(Self {
            config,
            auth: Arc::new(auth),
            storage,
            page: Page::Welcome,
            flow: None,
            appointments: seed_appointments(),
            probe,
            remote,
        })
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// A fresh flow with `user` on the local end.
    pub fn new_flow(&self, user: &User) -> TelemedicineFlow {
        let local = LocalParticipant {
            id: user.id.clone(),
            name: user.full_name(),
            role: ParticipantRole::from_role(user.role),
        };
        TelemedicineFlow::new(
            local,
            Arc::clone(&self.probe),
            Arc::clone(&self.remote),
            self.config.flow_config(),
        )
    }
}
