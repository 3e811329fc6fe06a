//! The waiting room a patient sits in between booking and the call.
//!
//! Opening a room starts the four device checks as independent tasks. Each
//! task reports back over an mpsc channel; the remote participant's status
//! arrives over a `watch` channel. The room is ready once every check
//! succeeded and the remote reports `ready`. Dropping or leaving the room
//! aborts any checks still in flight.

use std::sync::Arc;
use std::time::Duration;

use medicore_shared::appointment::Appointment;
use medicore_shared::constants::{
    DEVICE_CHECK_ATTEMPTS, DEVICE_CHECK_TIMEOUT_SECS, EXPECTED_WAIT_SECS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::devices::{run_check, CheckStatus, DeviceCheck, DeviceCheckFailure, DeviceProbe};
use crate::readiness::{RemoteParty, RemoteStatus};

const RETRY_BACKOFF_MS: u64 = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitingRoomError {
    #[error(transparent)]
    DeviceCheckFailed(#[from] DeviceCheckFailure),

    #[error("The remote participant is no longer reachable (last status: {0})")]
    RemoteUnavailable(RemoteStatus),
}

#[derive(Debug, Clone)]
pub struct WaitingRoomConfig {
    /// Upper bound on a single probe attempt.
    pub check_timeout: Duration,
    /// Attempts per check before it is reported as failed.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for WaitingRoomConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(DEVICE_CHECK_TIMEOUT_SECS),
            max_attempts: DEVICE_CHECK_ATTEMPTS,
            retry_backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        }
    }
}

/// Local preview controls shown while waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSettings {
    pub camera_enabled: bool,
    pub microphone_enabled: bool,
    /// 0..=100
    pub speaker_volume: u8,
    pub background_blur: bool,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            camera_enabled: true,
            microphone_enabled: true,
            speaker_volume: 75,
            background_blur: false,
        }
    }
}

/// Point-in-time view of the room, suitable for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessSnapshot {
    pub checks: Vec<(DeviceCheck, CheckStatus)>,
    pub remote: RemoteStatus,
    pub ready: bool,
    pub wait_secs: u64,
    pub wait_time: String,
    /// Share of the expected wait already spent, capped at 100.
    pub wait_progress: f32,
}

#[derive(Debug)]
struct CheckUpdate {
    check: DeviceCheck,
    generation: u64,
    result: Result<(), DeviceCheckFailure>,
}

pub struct WaitingRoom {
    appointment: Appointment,
    probe: Arc<dyn DeviceProbe>,
    config: WaitingRoomConfig,
    statuses: [CheckStatus; 4],
    generations: [u64; 4],
    tasks: [Option<JoinHandle<()>>; 4],
    updates_tx: mpsc::Sender<CheckUpdate>,
    updates_rx: mpsc::Receiver<CheckUpdate>,
    remote: watch::Receiver<RemoteStatus>,
    remote_closed: bool,
    preview: PreviewSettings,
    entered_at: Instant,
}

impl WaitingRoom {
    /// Enter the room for `appointment` and start all device checks. Must be
    /// called from within a tokio runtime.
    pub fn open(
        appointment: Appointment,
        probe: Arc<dyn DeviceProbe>,
        remote: &dyn RemoteParty,
        config: WaitingRoomConfig,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(16);
        let remote = remote.readiness(&appointment);

        info!(
            appointment = %appointment.id,
            room = %appointment.id.to_room(),
            "Entered waiting room"
        );

        let mut room = Self {
            appointment,
            probe,
            config,
            statuses: std::array::from_fn(|_| CheckStatus::Checking),
            generations: [0; 4],
            tasks: std::array::from_fn(|_| None),
            updates_tx,
            updates_rx,
            remote,
            remote_closed: false,
            preview: PreviewSettings::default(),
            entered_at: Instant::now(),
        };

        for check in DeviceCheck::ALL {
            room.spawn_check(check);
        }

        room
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn status(&self, check: DeviceCheck) -> &CheckStatus {
        &self.statuses[check.index()]
    }

    pub fn remote_status(&self) -> RemoteStatus {
        *self.remote.borrow()
    }

    /// Apply every check result that has already arrived.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            if self.apply(update) {
                applied += 1;
            }
        }
        applied
    }

    pub fn is_ready(&self) -> bool {
        self.statuses.iter().all(CheckStatus::is_success) && self.remote_status() == RemoteStatus::Ready
    }

    pub fn failures(&self) -> Vec<DeviceCheckFailure> {
        DeviceCheck::ALL
            .into_iter()
            .filter_map(|check| match self.status(check) {
                CheckStatus::Error(detail) => Some(DeviceCheckFailure::new(check, detail.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn pending(&self) -> Vec<DeviceCheck> {
        DeviceCheck::ALL
            .into_iter()
            .filter(|check| self.status(*check).is_pending())
            .collect()
    }

    /// Apply whatever has arrived and report whether waiting is over:
    /// `Some(Ok(()))` once ready, `Some(Err(_))` on a failed check or a
    /// vanished remote, `None` while still waiting. Never blocks.
    pub fn settle(&mut self) -> Option<Result<(), WaitingRoomError>> {
        self.poll();
        if !self.remote_closed {
            match self.remote.has_changed() {
                Ok(true) => {
                    let status = *self.remote.borrow_and_update();
                    info!(%status, "Remote status changed");
                }
                Ok(false) => {}
                Err(_) => self.remote_closed = true,
            }
        }

        if let Some(failure) = self.failures().into_iter().next() {
            return Some(Err(failure.into()));
        }
        if self.is_ready() {
            return Some(Ok(()));
        }
        if self.remote_closed && self.remote_status() != RemoteStatus::Ready {
            return Some(Err(WaitingRoomError::RemoteUnavailable(self.remote_status())));
        }
        None
    }

    /// Wait until the room is ready, a check fails, or the remote goes away.
    pub async fn wait_until_ready(&mut self) -> Result<(), WaitingRoomError> {
        loop {
            if let Some(outcome) = self.settle() {
                return outcome;
            }

            let checks_pending = !self.pending().is_empty();
            let watch_remote = !self.remote_closed;

            tokio::select! {
                Some(update) = self.updates_rx.recv(), if checks_pending => {
                    self.apply(update);
                }
                changed = self.remote.changed(), if watch_remote => {
                    match changed {
                        Ok(()) => info!(status = %self.remote_status(), "Remote status changed"),
                        Err(_) => self.remote_closed = true,
                    }
                }
                else => {
                    return Err(WaitingRoomError::RemoteUnavailable(self.remote_status()));
                }
            }
        }
    }

    /// Re-run a failed check. Returns `false` when the check is not in the
    /// failed state.
    pub fn retry(&mut self, check: DeviceCheck) -> bool {
        if !matches!(self.status(check), CheckStatus::Error(_)) {
            return false;
        }
        info!(%check, "Retrying device check");
        self.spawn_check(check);
        true
    }

    pub fn preview(&self) -> &PreviewSettings {
        &self.preview
    }

    pub fn toggle_camera_preview(&mut self) -> bool {
        self.preview.camera_enabled = !self.preview.camera_enabled;
        self.preview.camera_enabled
    }

    pub fn toggle_microphone_preview(&mut self) -> bool {
        self.preview.microphone_enabled = !self.preview.microphone_enabled;
        self.preview.microphone_enabled
    }

    pub fn set_speaker_volume(&mut self, volume: u8) {
        self.preview.speaker_volume = volume.min(100);
    }

    pub fn set_background_blur(&mut self, enabled: bool) {
        self.preview.background_blur = enabled;
    }

    pub fn wait_time(&self) -> Duration {
        self.entered_at.elapsed()
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        let wait_secs = self.wait_time().as_secs();
        ReadinessSnapshot {
            checks: DeviceCheck::ALL
                .into_iter()
                .map(|check| (check, self.status(check).clone()))
                .collect(),
            remote: self.remote_status(),
            ready: self.is_ready(),
            wait_secs,
            wait_time: format_wait_time(wait_secs),
            wait_progress: wait_progress(wait_secs),
        }
    }

    /// Leave the room, cancelling outstanding checks.
    pub fn leave(mut self) -> Appointment {
        self.abort_all();
        info!(appointment = %self.appointment.id, "Left waiting room");
        self.appointment.clone()
    }

    fn spawn_check(&mut self, check: DeviceCheck) {
        let idx = check.index();
        if let Some(task) = self.tasks[idx].take() {
            task.abort();
        }
        self.generations[idx] += 1;
        self.statuses[idx] = CheckStatus::Checking;

        let generation = self.generations[idx];
        let probe = Arc::clone(&self.probe);
        let config = self.config.clone();
        let tx = self.updates_tx.clone();

        self.tasks[idx] = Some(tokio::spawn(async move {
            let result = check_with_retry(probe.as_ref(), check, &config).await;
            let _ = tx.send(CheckUpdate { check, generation, result }).await;
        }));
    }

    fn apply(&mut self, update: CheckUpdate) -> bool {
        let idx = update.check.index();
        if update.generation != self.generations[idx] {
            debug!(check = %update.check, "Discarding result of superseded check");
            return false;
        }
        self.tasks[idx] = None;
        self.statuses[idx] = match update.result {
            Ok(()) => {
                debug!(check = %update.check, "Device check passed");
                CheckStatus::Success
            }
            Err(failure) => {
                warn!(check = %update.check, detail = %failure.detail, "Device check failed");
                CheckStatus::Error(failure.detail)
            }
        };
        true
    }

    fn abort_all(&mut self) {
        for task in self.tasks.iter_mut().filter_map(Option::take) {
            task.abort();
        }
    }
}

impl Drop for WaitingRoom {
    fn drop(&mut self) {
        self.abort_all();
    }
}

async fn check_with_retry(
    probe: &dyn DeviceProbe,
    check: DeviceCheck,
    config: &WaitingRoomConfig,
) -> Result<(), DeviceCheckFailure> {
    let attempts = config.max_attempts.max(1);
    let mut last_failure = DeviceCheckFailure::timed_out(check, config.check_timeout);

    for attempt in 1..=attempts {
        match tokio::time::timeout(config.check_timeout, run_check(probe, check)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(failure)) => {
                debug!(%check, attempt, detail = %failure.detail, "Probe attempt failed");
                last_failure = failure;
            }
            Err(_) => {
                debug!(%check, attempt, "Probe attempt timed out");
                last_failure = DeviceCheckFailure::timed_out(check, config.check_timeout);
            }
        }
        if attempt < attempts {
            tokio::time::sleep(config.retry_backoff).await;
        }
    }

    Err(last_failure)
}

/// `75` -> `"1:15"`.
pub fn format_wait_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn wait_progress(secs: u64) -> f32 {
    ((secs as f32 / EXPECTED_WAIT_SECS as f32) * 100.0).min(100.0)
}
