use thiserror::Error;

use crate::booking::BookingError;
use crate::devices::{DeviceCheck, DeviceCheckFailure};
use crate::flow::FlowStage;
use crate::readiness::RemoteStatus;
use crate::waiting_room::WaitingRoomError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Not allowed during {actual}; requires {expected}")]
    InvalidState {
        expected: FlowStage,
        actual: FlowStage,
    },

    #[error("Not ready to join: {}", describe_not_ready(.pending, .failed, .remote))]
    NotReady {
        pending: Vec<DeviceCheck>,
        failed: Vec<DeviceCheckFailure>,
        remote: RemoteStatus,
    },

    #[error("Only clinical staff can record a consultation")]
    RecordingNotPermitted,

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    WaitingRoom(#[from] WaitingRoomError),
}

fn describe_not_ready(
    pending: &[DeviceCheck],
    failed: &[DeviceCheckFailure],
    remote: &RemoteStatus,
) -> String {
    let mut parts = Vec::new();
    if !pending.is_empty() {
        let names: Vec<&str> = pending.iter().map(DeviceCheck::as_str).collect();
        parts.push(format!("still checking {}", names.join(", ")));
    }
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|f| f.check.as_str()).collect();
        parts.push(format!("failed {}", names.join(", ")));
    }
    if *remote != RemoteStatus::Ready {
        parts.push(format!("remote is {remote}"));
    }
    parts.join("; ")
}
