//! Video consultation session record.

use chrono::{DateTime, Utc};
use medicore_shared::appointment::Appointment;
use medicore_shared::constants::{CALL_WELCOME_MESSAGE, SYSTEM_SENDER_ID};
use medicore_shared::types::{AppointmentId, CallId, UserId};
use medicore_shared::user::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Waiting,
    Connecting,
    Active,
    Ended,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Patient,
    Doctor,
    Nurse,
}

impl ParticipantRole {
    /// Patients join as patients and nurses as nurses; every other staff
    /// role takes the clinician seat.
    pub fn from_role(role: Role) -> Self {
        match role {
            Role::Patient => Self::Patient,
            Role::Nurse => Self::Nurse,
            Role::Doctor | Role::Admin | Role::Employer => Self::Doctor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: UserId,
    pub name: String,
    pub role: ParticipantRole,
    pub is_connected: bool,
    pub is_muted: bool,
    pub is_video_on: bool,
    pub joined_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn joined(id: UserId, name: impl Into<String>, role: ParticipantRole, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            is_connected: true,
            is_muted: false,
            is_video_on: true,
            joined_at: now,
            left_at: None,
        }
    }
}

/// The user on this end of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalParticipant {
    pub id: UserId,
    pub name: String,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    System,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Sequential within a call, starting at 1.
    pub id: u64,
    pub sender_id: UserId,
    pub sender_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallQuality {
    pub connection_status: ConnectionQuality,
    /// kbit/s
    pub bandwidth: u32,
    /// ms
    pub latency: u32,
    /// Percent.
    pub packet_loss: f32,
}

impl Default for CallQuality {
    fn default() -> Self {
        Self {
            connection_status: ConnectionQuality::Excellent,
            bandwidth: 1200,
            latency: 45,
            packet_loss: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCallSession {
    pub id: CallId,
    pub appointment_id: AppointmentId,
    pub room_id: String,
    pub status: CallStatus,
    pub participants: Vec<Participant>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds, set when the call ends.
    pub duration: Option<u64>,
    pub recording_enabled: bool,
    pub chat_messages: Vec<ChatMessage>,
    pub screen_sharing_active: bool,
    pub screen_sharing_by: Option<UserId>,
    /// Seat of the sharer. Patient and doctor ids come from different
    /// directories and can collide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_sharing_role: Option<ParticipantRole>,
    pub quality: CallQuality,
}

impl VideoCallSession {
    /// An active call for `appointment` with the local user and their
    /// counterpart connected, opened by the system welcome message.
    pub(crate) fn start(appointment: &Appointment, local: &LocalParticipant, now: DateTime<Utc>) -> Self {
        let counterpart = match local.role {
            ParticipantRole::Patient => Participant::joined(
                appointment.doctor_id.clone(),
                appointment.doctor_name.clone(),
                ParticipantRole::Doctor,
                now,
            ),
            ParticipantRole::Doctor | ParticipantRole::Nurse => Participant::joined(
                appointment.patient_id.clone(),
                appointment.patient_name.clone(),
                ParticipantRole::Patient,
                now,
            ),
        };

        let mut session = Self {
            id: CallId::new(),
            appointment_id: appointment.id.clone(),
            room_id: appointment.id.to_room(),
            status: CallStatus::Active,
            participants: vec![
                Participant::joined(local.id.clone(), local.name.clone(), local.role, now),
                counterpart,
            ],
            start_time: Some(now),
            end_time: None,
            duration: None,
            recording_enabled: false,
            chat_messages: Vec::new(),
            screen_sharing_active: false,
            screen_sharing_by: None,
            screen_sharing_role: None,
            quality: CallQuality::default(),
        };
        session.push_message(
            UserId::from(SYSTEM_SENDER_ID),
            "System",
            CALL_WELCOME_MESSAGE,
            MessageKind::System,
            now,
        );
        session
    }

    /// Participants are keyed by id and seat together.
    pub fn participant(&self, id: &UserId, role: ParticipantRole) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id && p.role == role)
    }

    pub(crate) fn participant_mut(&mut self, id: &UserId, role: ParticipantRole) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| &p.id == id && p.role == role)
    }

    pub fn connected_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_connected).count()
    }

    pub(crate) fn push_message(
        &mut self,
        sender_id: UserId,
        sender_name: &str,
        text: &str,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> &ChatMessage {
        let id = self.chat_messages.len() as u64 + 1;
        self.chat_messages.push(ChatMessage {
            id,
            sender_id,
            sender_name: sender_name.to_string(),
            message: text.to_string(),
            timestamp: now,
            kind,
        });
        &self.chat_messages[self.chat_messages.len() - 1]
    }

    pub(crate) fn finish(&mut self, now: DateTime<Utc>) {
        self.status = CallStatus::Ended;
        self.end_time = Some(now);
        self.duration = Some(self.elapsed_secs(now));
        self.screen_sharing_active = false;
        self.screen_sharing_by = None;
        self.screen_sharing_role = None;
        for participant in &mut self.participants {
            participant.is_connected = false;
            participant.left_at.get_or_insert(now);
        }
    }

    /// Seconds since the call started, frozen once it has ended.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        let until = self.end_time.unwrap_or(now);
        self.start_time
            .map(|start| (until - start).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}

/// `125` -> `"02:05"`.
pub fn format_duration(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use medicore_shared::catalog::seed_appointments;

    fn patient() -> LocalParticipant {
        LocalParticipant {
            id: UserId::from("p1"),
            name: "John Patient".into(),
            role: ParticipantRole::Patient,
        }
    }

    #[test]
    fn test_start_seeds_participants_and_welcome() {
        let apt = seed_appointments().remove(0);
        let now = Utc::now();
        let session = VideoCallSession::start(&apt, &patient(), now);

        assert_eq!(session.status, CallStatus::Active);
        assert_eq!(session.room_id, "room-1");
        assert_eq!(session.connected_count(), 2);
        let doctor = session
            .participant(&UserId::from("1"), ParticipantRole::Doctor)
            .unwrap();
        assert_eq!(doctor.role, ParticipantRole::Doctor);
        assert_eq!(doctor.name, "Dr. Sarah Wilson");

        assert_eq!(session.chat_messages.len(), 1);
        let welcome = &session.chat_messages[0];
        assert_eq!(welcome.id, 1);
        assert_eq!(welcome.kind, MessageKind::System);
        assert_eq!(welcome.message, CALL_WELCOME_MESSAGE);
    }

    #[test]
    fn test_staff_meets_patient() {
        let apt = seed_appointments().remove(0);
        let doctor = LocalParticipant {
            id: UserId::from("1"),
            name: "Dr. Sarah Wilson".into(),
            role: ParticipantRole::from_role(Role::Doctor),
        };
        let session = VideoCallSession::start(&apt, &doctor, Utc::now());
        assert_eq!(
            session
                .participant(&UserId::from("p1"), ParticipantRole::Patient)
                .map(|p| p.name.as_str()),
            Some("John Patient")
        );
    }

    #[test]
    fn test_colliding_ids_resolve_by_seat() {
        let apt = seed_appointments().remove(0);
        let local = LocalParticipant {
            id: UserId::from("1"),
            name: "John Patient".into(),
            role: ParticipantRole::Patient,
        };
        let mut session = VideoCallSession::start(&apt, &local, Utc::now());
        let id = UserId::from("1");

        session
            .participant_mut(&id, ParticipantRole::Patient)
            .unwrap()
            .is_muted = true;

        let doctor = session.participant(&id, ParticipantRole::Doctor).unwrap();
        assert_eq!(doctor.name, "Dr. Sarah Wilson");
        assert!(!doctor.is_muted);
        assert!(session.participant(&id, ParticipantRole::Patient).unwrap().is_muted);
        assert!(session.participant(&id, ParticipantRole::Nurse).is_none());
    }

    #[test]
    fn test_finish_freezes_duration() {
        let apt = seed_appointments().remove(0);
        let start = Utc::now();
        let mut session = VideoCallSession::start(&apt, &patient(), start);

        session.finish(start + Duration::seconds(125));
        assert_eq!(session.status, CallStatus::Ended);
        assert_eq!(session.duration, Some(125));
        assert_eq!(session.elapsed_secs(start + Duration::hours(1)), 125);
        assert!(session.participants.iter().all(|p| !p.is_connected && p.left_at.is_some()));
        assert_eq!(format_duration(125), "02:05");
    }

    #[test]
    fn test_session_json_shape() {
        let apt = seed_appointments().remove(0);
        let session = VideoCallSession::start(&apt, &patient(), Utc::now());
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["status"], "active");
        assert_eq!(json["roomId"], "room-1");
        assert_eq!(json["chatMessages"][0]["type"], "system");
        assert_eq!(json["participants"][0]["isVideoOn"], true);
        assert_eq!(json["quality"]["connectionStatus"], "excellent");
    }
}
