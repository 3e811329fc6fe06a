//! Whether the other side of a consultation is ready to start.

use std::fmt;
use std::time::Duration;

use medicore_shared::appointment::Appointment;
use medicore_shared::constants::DOCTOR_READY_SECS;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Offline,
    Busy,
    Ready,
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "offline",
            Self::Busy => "busy",
            Self::Ready => "ready",
        })
    }
}

/// Publishes the remote participant's status for one appointment.
///
/// Implementations hand out a `watch` receiver; the waiting room reacts to
/// every change and treats a closed channel as "no further updates".
pub trait RemoteParty: Send + Sync {
    fn readiness(&self, appointment: &Appointment) -> watch::Receiver<RemoteStatus>;
}

/// Reports `busy`, then flips to `ready` after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedRemote {
    ready_after: Duration,
}

impl SimulatedRemote {
    pub fn new(ready_after: Duration) -> Self {
        Self { ready_after }
    }
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self::new(Duration::from_secs(DOCTOR_READY_SECS))
    }
}

impl RemoteParty for SimulatedRemote {
    fn readiness(&self, appointment: &Appointment) -> watch::Receiver<RemoteStatus> {
        let (tx, rx) = watch::channel(RemoteStatus::Busy);
        let delay = self.ready_after;
        let room = appointment.id.to_room();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    info!(%room, "Remote participant ready");
                    let _ = tx.send(RemoteStatus::Ready);
                }
                _ = tx.closed() => {
                    debug!(%room, "Readiness watcher dropped before remote was ready");
                }
            }
        });

        rx
    }
}

/// Remote whose status is set by hand. Every appointment shares the same
/// channel.
#[derive(Debug)]
pub struct ManualRemote {
    tx: watch::Sender<RemoteStatus>,
}

impl ManualRemote {
    pub fn new(initial: RemoteStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self, status: RemoteStatus) {
        self.tx.send_replace(status);
    }
}

impl RemoteParty for ManualRemote {
    fn readiness(&self, _appointment: &Appointment) -> watch::Receiver<RemoteStatus> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medicore_shared::catalog::seed_appointments;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_remote_flips_after_delay() {
        let apt = seed_appointments().remove(0);
        let remote = SimulatedRemote::new(Duration::from_secs(30));
        let mut rx = remote.readiness(&apt);

        assert_eq!(*rx.borrow(), RemoteStatus::Busy);

        let start = tokio::time::Instant::now();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), RemoteStatus::Ready);
        assert_eq!(start.elapsed().as_secs(), 30);
    }

    #[tokio::test]
    async fn test_manual_remote_broadcasts() {
        let apt = seed_appointments().remove(0);
        let remote = ManualRemote::new(RemoteStatus::Offline);
        let mut rx = remote.readiness(&apt);

        remote.set(RemoteStatus::Ready);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), RemoteStatus::Ready);
    }
}
