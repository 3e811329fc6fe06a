//! # medicore-media
//!
//! Telemedicine consultations: booking validation, the pre-call waiting room
//! (device checks and remote readiness) and the in-call session state
//! machine driven by [`flow::TelemedicineFlow`].

pub mod booking;
pub mod devices;
pub mod error;
pub mod flow;
pub mod readiness;
pub mod session;
pub mod waiting_room;

pub use booking::{BookingError, PatientRef};
pub use devices::{CheckStatus, DeviceCheck, DeviceCheckFailure, DeviceProbe, SimulatedDevices};
pub use error::CallError;
pub use flow::{BookingOutcome, FlowConfig, FlowStage, TelemedicineFlow};
pub use readiness::{ManualRemote, RemoteParty, RemoteStatus, SimulatedRemote};
pub use session::{
    format_duration, CallStatus, ChatMessage, LocalParticipant, ParticipantRole, VideoCallSession,
};
pub use waiting_room::{PreviewSettings, ReadinessSnapshot, WaitingRoom, WaitingRoomConfig, WaitingRoomError};
