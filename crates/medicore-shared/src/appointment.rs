use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AppointmentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Emergency,
    Surgery,
}

impl std::str::FromStr for AppointmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "consultation" => Ok(Self::Consultation),
            "follow-up" => Ok(Self::FollowUp),
            "emergency" => Ok(Self::Emergency),
            "surgery" => Ok(Self::Surgery),
            other => Err(format!("unknown appointment type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Cancelled and no-show appointments free their slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::NoShow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultationType {
    InPerson,
    Telemedicine,
}

impl std::str::FromStr for ConsultationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in-person" => Ok(Self::InPerson),
            "telemedicine" => Ok(Self::Telemedicine),
            other => Err(format!("unknown consultation type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: UserId,
    pub patient_name: String,
    pub doctor_id: UserId,
    pub doctor_name: String,
    pub department: String,
    pub date: NaiveDate,
    /// Slot start, `HH:MM`.
    pub time: String,
    /// Minutes.
    pub duration: u32,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the booking screen hands over on submit. Date and time stay as the
/// raw strings the form produced; they are validated when booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentForm {
    pub doctor_id: UserId,
    pub department: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub symptoms: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemedicineBooking {
    #[serde(flatten)]
    pub form: AppointmentForm,
    pub consultation_type: ConsultationType,
    /// Patient confirmed camera, microphone and a stable connection.
    #[serde(default)]
    pub has_required_tech: bool,
    #[serde(default)]
    pub agreed_to_terms: bool,
}
