//! Telemedicine flow: booking, then the waiting room, then the call.
//!
//! ```text
//! Booking --book(telemedicine)--> Waiting --join_call--> Call --end_call--> Ended
//!    ^                               |
//!    +-------leave_waiting_room------+
//! ```
//!
//! Every operation checks the current stage first; anything called out of
//! order fails with [`CallError::InvalidState`] and leaves the flow as it was.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use medicore_shared::appointment::{Appointment, ConsultationType, TelemedicineBooking};
use medicore_shared::constants::CALL_ENDED_DISPLAY_SECS;
use serde::Serialize;
use tracing::{debug, info};

use crate::booking::{self, PatientRef};
use crate::devices::{DeviceCheck, DeviceProbe};
use crate::error::CallError;
use crate::readiness::RemoteParty;
use crate::session::{ChatMessage, LocalParticipant, MessageKind, ParticipantRole, VideoCallSession};
use crate::waiting_room::{WaitingRoom, WaitingRoomConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStage {
    Booking,
    Waiting,
    Call,
    Ended,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Booking => "booking",
            Self::Waiting => "waiting room",
            Self::Call => "call",
            Self::Ended => "ended call",
        })
    }
}

enum FlowState {
    Booking,
    Waiting(WaitingRoom),
    Call(VideoCallSession),
    Ended(VideoCallSession),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// The flow moved into the waiting room for this appointment.
    Telemedicine(Appointment),
    /// Booked for an in-person visit; the flow stays in booking.
    InPerson(Appointment),
}

impl BookingOutcome {
    pub fn appointment(&self) -> &Appointment {
        match self {
            Self::Telemedicine(apt) | Self::InPerson(apt) => apt,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub waiting_room: WaitingRoomConfig,
    /// How long the ended screen stays up before returning to the dashboard.
    pub ended_display: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            waiting_room: WaitingRoomConfig::default(),
            ended_display: Duration::from_secs(CALL_ENDED_DISPLAY_SECS),
        }
    }
}

pub struct TelemedicineFlow {
    local: LocalParticipant,
    probe: Arc<dyn DeviceProbe>,
    remote: Arc<dyn RemoteParty>,
    config: FlowConfig,
    state: FlowState,
}

impl TelemedicineFlow {
    pub fn new(
        local: LocalParticipant,
        probe: Arc<dyn DeviceProbe>,
        remote: Arc<dyn RemoteParty>,
        config: FlowConfig,
    ) -> Self {
        Self {
            local,
            probe,
            remote,
            config,
            state: FlowState::Booking,
        }
    }

    pub fn stage(&self) -> FlowStage {
        match self.state {
            FlowState::Booking => FlowStage::Booking,
            FlowState::Waiting(_) => FlowStage::Waiting,
            FlowState::Call(_) => FlowStage::Call,
            FlowState::Ended(_) => FlowStage::Ended,
        }
    }

    pub fn local(&self) -> &LocalParticipant {
        &self.local
    }

    pub fn ended_display(&self) -> Duration {
        self.config.ended_display
    }

    /// Book an appointment. Telemedicine bookings open the waiting room.
    pub fn book(
        &mut self,
        request: &TelemedicineBooking,
        existing: &[Appointment],
    ) -> Result<BookingOutcome, CallError> {
        self.expect_stage(FlowStage::Booking)?;

        let patient = PatientRef {
            id: self.local.id.clone(),
            name: self.local.name.clone(),
        };
        let appointment = booking::book(request, &patient, existing)?;

        if request.consultation_type == ConsultationType::InPerson {
            return Ok(BookingOutcome::InPerson(appointment));
        }

        let room = WaitingRoom::open(
            appointment.clone(),
            Arc::clone(&self.probe),
            self.remote.as_ref(),
            self.config.waiting_room.clone(),
        );
        self.state = FlowState::Waiting(room);
        Ok(BookingOutcome::Telemedicine(appointment))
    }

    pub fn waiting_room(&self) -> Option<&WaitingRoom> {
        match &self.state {
            FlowState::Waiting(room) => Some(room),
            _ => None,
        }
    }

    pub fn waiting_room_mut(&mut self) -> Result<&mut WaitingRoom, CallError> {
        let actual = self.stage();
        match &mut self.state {
            FlowState::Waiting(room) => Ok(room),
            _ => Err(CallError::InvalidState {
                expected: FlowStage::Waiting,
                actual,
            }),
        }
    }

    pub async fn wait_until_ready(&mut self) -> Result<(), CallError> {
        self.waiting_room_mut()?.wait_until_ready().await?;
        Ok(())
    }

    pub fn retry_check(&mut self, check: DeviceCheck) -> Result<bool, CallError> {
        Ok(self.waiting_room_mut()?.retry(check))
    }

    /// Back to booking; pending checks are cancelled.
    pub fn leave_waiting_room(&mut self) -> Result<Appointment, CallError> {
        self.expect_stage(FlowStage::Waiting)?;
        match std::mem::replace(&mut self.state, FlowState::Booking) {
            FlowState::Waiting(room) => Ok(room.leave()),
            other => {
                self.state = other;
                Err(self.invalid(FlowStage::Waiting))
            }
        }
    }

    /// Join once every check passed and the remote is ready.
    pub fn join_call(&mut self) -> Result<&VideoCallSession, CallError> {
        let room = self.waiting_room_mut()?;
        room.poll();
        if !room.is_ready() {
            return Err(CallError::NotReady {
                pending: room.pending(),
                failed: room.failures(),
                remote: room.remote_status(),
            });
        }

        let appointment = room.appointment().clone();
        let session = VideoCallSession::start(&appointment, &self.local, Utc::now());
        info!(
            call = %session.id,
            room = %session.room_id,
            user = %self.local.id,
            "Joined video consultation"
        );

        if let FlowState::Waiting(room) = std::mem::replace(&mut self.state, FlowState::Call(session)) {
            room.leave();
        }
        self.session().ok_or_else(|| self.invalid(FlowStage::Call))
    }

    /// The current call, or the finished one while the ended screen shows.
    pub fn session(&self) -> Option<&VideoCallSession> {
        match &self.state {
            FlowState::Call(session) | FlowState::Ended(session) => Some(session),
            _ => None,
        }
    }

    pub fn toggle_mute(&mut self) -> Result<bool, CallError> {
        let local = self.local.id.clone();
        let role = self.local.role;
        let session = self.active_session_mut()?;
        let muted = match session.participant_mut(&local, role) {
            Some(p) => {
                p.is_muted = !p.is_muted;
                p.is_muted
            }
            None => false,
        };
        debug!(muted, "Toggled microphone");
        Ok(muted)
    }

    pub fn toggle_video(&mut self) -> Result<bool, CallError> {
        let local = self.local.id.clone();
        let role = self.local.role;
        let session = self.active_session_mut()?;
        let video_on = match session.participant_mut(&local, role) {
            Some(p) => {
                p.is_video_on = !p.is_video_on;
                p.is_video_on
            }
            None => false,
        };
        debug!(video_on, "Toggled camera");
        Ok(video_on)
    }

    /// Start sharing, taking over from whoever shares now, or stop if the
    /// local user is the one sharing.
    pub fn toggle_screen_share(&mut self) -> Result<bool, CallError> {
        let local = self.local.id.clone();
        let role = self.local.role;
        let session = self.active_session_mut()?;
        let sharing_locally = session.screen_sharing_active
            && session.screen_sharing_by.as_ref() == Some(&local)
            && session.screen_sharing_role == Some(role);
        if sharing_locally {
            session.screen_sharing_active = false;
            session.screen_sharing_by = None;
            session.screen_sharing_role = None;
        } else {
            session.screen_sharing_active = true;
            session.screen_sharing_by = Some(local);
            session.screen_sharing_role = Some(role);
        }
        info!(sharing = session.screen_sharing_active, "Screen share toggled");
        Ok(session.screen_sharing_active)
    }

    pub fn toggle_recording(&mut self) -> Result<bool, CallError> {
        if self.local.role == ParticipantRole::Patient {
            self.active_session_mut()?;
            return Err(CallError::RecordingNotPermitted);
        }
        let session = self.active_session_mut()?;
        session.recording_enabled = !session.recording_enabled;
        info!(recording = session.recording_enabled, "Recording toggled");
        Ok(session.recording_enabled)
    }

    pub fn send_chat(&mut self, text: &str) -> Result<&ChatMessage, CallError> {
        let text = text.trim();
        if text.is_empty() {
            self.active_session_mut()?;
            return Err(CallError::EmptyMessage);
        }
        let sender = self.local.id.clone();
        let sender_name = self.local.name.clone();
        let session = self.active_session_mut()?;
        Ok(session.push_message(sender, &sender_name, text, MessageKind::Text, Utc::now()))
    }

    /// Hang up. The finished session stays readable until the flow is
    /// dropped or reset.
    pub fn end_call(&mut self) -> Result<&VideoCallSession, CallError> {
        self.expect_stage(FlowStage::Call)?;
        if let FlowState::Call(mut session) = std::mem::replace(&mut self.state, FlowState::Booking) {
            session.finish(Utc::now());
            info!(
                call = %session.id,
                duration = session.duration.unwrap_or(0),
                "Video consultation ended"
            );
            self.state = FlowState::Ended(session);
        }
        self.session().ok_or_else(|| self.invalid(FlowStage::Ended))
    }

    /// Discard an ended call and return to booking.
    pub fn reset(&mut self) -> Result<(), CallError> {
        self.expect_stage(FlowStage::Ended)?;
        self.state = FlowState::Booking;
        Ok(())
    }

    fn active_session_mut(&mut self) -> Result<&mut VideoCallSession, CallError> {
        let actual = self.stage();
        match &mut self.state {
            FlowState::Call(session) => Ok(session),
            _ => Err(CallError::InvalidState {
                expected: FlowStage::Call,
                actual,
            }),
        }
    }

    fn expect_stage(&self, expected: FlowStage) -> Result<(), CallError> {
        if self.stage() == expected {
            Ok(())
        } else {
            Err(self.invalid(expected))
        }
    }

    fn invalid(&self, expected: FlowStage) -> CallError {
        CallError::InvalidState {
            expected,
            actual: self.stage(),
        }
    }
}
