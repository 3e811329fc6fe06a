//! Turning a submitted booking form into a scheduled appointment.

use chrono::{NaiveDate, NaiveTime, Utc};
use medicore_shared::appointment::{
    Appointment, AppointmentStatus, ConsultationType, TelemedicineBooking,
};
use medicore_shared::catalog::{find_doctor, generate_time_slots};
use medicore_shared::constants::DEFAULT_APPOINTMENT_MINUTES;
use medicore_shared::types::{AppointmentId, UserId};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Unknown doctor: {0}")]
    UnknownDoctor(UserId),

    #[error("{doctor} does not practice in {department}")]
    WrongDepartment { doctor: String, department: String },

    #[error("{0} is not a bookable time slot")]
    NotASlot(String),

    #[error("The {time} slot on {date} is already booked")]
    SlotTaken { date: NaiveDate, time: String },

    #[error("Please confirm you have a camera, microphone and a stable internet connection")]
    TechNotConfirmed,

    #[error("Please agree to the telemedicine consultation terms")]
    TermsNotAccepted,
}

/// Who the appointment is booked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRef {
    pub id: UserId,
    pub name: String,
}

/// Validate `booking` against the catalog and the existing appointment book
/// and build the resulting appointment (always `scheduled`).
pub fn book(
    booking: &TelemedicineBooking,
    patient: &PatientRef,
    existing: &[Appointment],
) -> Result<Appointment, BookingError> {
    let form = &booking.form;

    if form.department.trim().is_empty() {
        return Err(BookingError::MissingField("department"));
    }
    if form.doctor_id.as_str().trim().is_empty() {
        return Err(BookingError::MissingField("doctor"));
    }
    if form.date.trim().is_empty() {
        return Err(BookingError::MissingField("date"));
    }
    if form.time.trim().is_empty() {
        return Err(BookingError::MissingField("time"));
    }
    if form.symptoms.trim().is_empty() {
        return Err(BookingError::MissingField("symptoms"));
    }

    if booking.consultation_type == ConsultationType::Telemedicine {
        if !booking.has_required_tech {
            return Err(BookingError::TechNotConfirmed);
        }
        if !booking.agreed_to_terms {
            return Err(BookingError::TermsNotAccepted);
        }
    }

    let date = NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidDate(form.date.clone()))?;
    let time = NaiveTime::parse_from_str(form.time.trim(), "%H:%M")
        .map_err(|_| BookingError::InvalidTime(form.time.clone()))?
        .format("%H:%M")
        .to_string();

    let doctor =
        find_doctor(&form.doctor_id).ok_or_else(|| BookingError::UnknownDoctor(form.doctor_id.clone()))?;
    if doctor.department != form.department.trim() {
        return Err(BookingError::WrongDepartment {
            doctor: doctor.name,
            department: form.department.clone(),
        });
    }

    let slots = generate_time_slots(existing, date, &doctor.id);
    match slots.iter().find(|s| s.time == time) {
        None => return Err(BookingError::NotASlot(time)),
        Some(slot) if !slot.available => return Err(BookingError::SlotTaken { date, time }),
        Some(_) => {}
    }

    let notes = form
        .notes
        .as_ref()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let appointment = Appointment {
        id: AppointmentId::new(),
        patient_id: patient.id.clone(),
        patient_name: patient.name.clone(),
        doctor_id: doctor.id,
        doctor_name: doctor.name,
        department: doctor.department,
        date,
        time,
        duration: DEFAULT_APPOINTMENT_MINUTES,
        appointment_type: form.appointment_type,
        status: AppointmentStatus::Scheduled,
        symptoms: Some(form.symptoms.trim().to_string()),
        notes,
        created_at: Utc::now(),
    };

    info!(
        appointment = %appointment.id,
        doctor = %appointment.doctor_id,
        date = %appointment.date,
        time = %appointment.time,
        kind = ?booking.consultation_type,
        "Appointment booked"
    );

    Ok(appointment)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use medicore_shared::appointment::{AppointmentForm, AppointmentType};
    use medicore_shared::catalog::seed_appointments;

    pub(crate) fn cardiology_booking(kind: ConsultationType) -> TelemedicineBooking {
        TelemedicineBooking {
            form: AppointmentForm {
                doctor_id: UserId::from("1"),
                department: "Cardiology".into(),
                date: "2025-02-10".into(),
                time: "10:00".into(),
                appointment_type: AppointmentType::Consultation,
                symptoms: "headache".into(),
                notes: None,
            },
            consultation_type: kind,
            has_required_tech: true,
            agreed_to_terms: true,
        }
    }

    pub(crate) fn john() -> PatientRef {
        PatientRef {
            id: UserId::from("1"),
            name: "John Patient".into(),
        }
    }

    #[test]
    fn test_books_scheduled_appointment() {
        let booking = cardiology_booking(ConsultationType::Telemedicine);
        let apt = book(&booking, &john(), &seed_appointments()).unwrap();

        assert_eq!(apt.status, AppointmentStatus::Scheduled);
        assert_eq!(apt.doctor_name, "Dr. Sarah Wilson");
        assert_eq!(apt.department, "Cardiology");
        assert_eq!(apt.date, NaiveDate::from_ymd_opt(2025, 2, 10).unwrap());
        assert_eq!(apt.time, "10:00");
        assert_eq!(apt.duration, 30);
        assert_eq!(apt.symptoms.as_deref(), Some("headache"));
        assert_eq!(apt.patient_id, UserId::from("1"));
    }

    #[test]
    fn test_telemedicine_requires_confirmations() {
        let mut booking = cardiology_booking(ConsultationType::Telemedicine);
        booking.has_required_tech = false;
        assert_eq!(book(&booking, &john(), &[]), Err(BookingError::TechNotConfirmed));

        booking.has_required_tech = true;
        booking.agreed_to_terms = false;
        assert_eq!(book(&booking, &john(), &[]), Err(BookingError::TermsNotAccepted));

        // in-person visits skip both
        booking.consultation_type = ConsultationType::InPerson;
        booking.has_required_tech = false;
        assert!(book(&booking, &john(), &[]).is_ok());
    }

    #[test]
    fn test_rejects_taken_slot() {
        let mut booking = cardiology_booking(ConsultationType::InPerson);
        booking.form.date = "2025-01-20".into();
        booking.form.time = "09:00".into();

        let err = book(&booking, &john(), &seed_appointments()).unwrap_err();
        assert!(matches!(err, BookingError::SlotTaken { .. }));
    }

    #[test]
    fn test_rejects_bad_form_values() {
        let mut booking = cardiology_booking(ConsultationType::InPerson);
        booking.form.symptoms = "   ".into();
        assert_eq!(book(&booking, &john(), &[]), Err(BookingError::MissingField("symptoms")));

        let mut booking = cardiology_booking(ConsultationType::InPerson);
        booking.form.date = "10/02/2025".into();
        assert!(matches!(book(&booking, &john(), &[]), Err(BookingError::InvalidDate(_))));

        let mut booking = cardiology_booking(ConsultationType::InPerson);
        booking.form.time = "10:15".into();
        assert_eq!(
            book(&booking, &john(), &[]),
            Err(BookingError::NotASlot("10:15".into()))
        );

        let mut booking = cardiology_booking(ConsultationType::InPerson);
        booking.form.department = "Neurology".into();
        assert!(matches!(
            book(&booking, &john(), &[]),
            Err(BookingError::WrongDepartment { .. })
        ));

        let mut booking = cardiology_booking(ConsultationType::InPerson);
        booking.form.doctor_id = UserId::from("42");
        assert!(matches!(
            book(&booking, &john(), &[]),
            Err(BookingError::UnknownDoctor(_))
        ));
    }

    #[test]
    fn test_normalizes_short_time() {
        let mut booking = cardiology_booking(ConsultationType::InPerson);
        booking.form.time = "9:30".into();
        let apt = book(&booking, &john(), &[]).unwrap();
        assert_eq!(apt.time, "09:30");
    }
}
