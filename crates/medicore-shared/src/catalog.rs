//! Static directory data: departments, doctors, seeded accounts and the
//! appointment book the portal starts with.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::appointment::{Appointment, AppointmentStatus, AppointmentType};
use crate::constants::{FIRST_SLOT_HOUR, LAST_SLOT_HOUR, SLOT_MINUTES};
use crate::types::{AppointmentId, UserId};
use crate::user::{default_permissions, Role, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: UserId,
    pub name: String,
    pub specialty: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: String,
    pub available: bool,
}

pub fn departments() -> Vec<Department> {
    [
        ("1", "Cardiology", "Heart and cardiovascular care"),
        ("2", "Neurology", "Brain and nervous system"),
        ("3", "Orthopedics", "Bone and joint care"),
        ("4", "Pediatrics", "Children healthcare"),
        ("5", "Dermatology", "Skin and hair care"),
        ("6", "General Medicine", "General healthcare"),
    ]
    .into_iter()
    .map(|(id, name, description)| Department {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}

pub fn doctors() -> Vec<Doctor> {
    [
        ("1", "Dr. Sarah Wilson", "Cardiologist", "Cardiology"),
        ("2", "Dr. Michael Chen", "Neurologist", "Neurology"),
        ("3", "Dr. Emily Rodriguez", "Orthopedic Surgeon", "Orthopedics"),
        ("4", "Dr. James Thompson", "Pediatrician", "Pediatrics"),
        ("5", "Dr. Lisa Anderson", "Dermatologist", "Dermatology"),
        ("6", "Dr. Robert Kumar", "General Practitioner", "General Medicine"),
    ]
    .into_iter()
    .map(|(id, name, specialty, department)| Doctor {
        id: UserId::from(id),
        name: name.to_string(),
        specialty: specialty.to_string(),
        department: department.to_string(),
    })
    .collect()
}

pub fn find_doctor(id: &UserId) -> Option<Doctor> {
    doctors().into_iter().find(|d| &d.id == id)
}

pub fn doctors_in(department: &str) -> Vec<Doctor> {
    doctors()
        .into_iter()
        .filter(|d| d.department == department)
        .collect()
}

/// The accounts every fresh directory starts with.
pub fn seed_users() -> Vec<User> {
    let created_at = timestamp(1_704_067_200); // 2024-01-01T00:00:00Z

    let user = |id: &str, email: &str, first: &str, last: &str, role: Role| User {
        id: UserId::from(id),
        email: email.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        role,
        department: None,
        specialization: None,
        license_number: None,
        is_active: true,
        last_login: None,
        created_at,
        permissions: default_permissions(role),
    };

    let patient = user("1", "john.patient@email.com", "John", "Patient", Role::Patient);

    let doctor = User {
        department: Some("Cardiology".into()),
        specialization: Some("Interventional Cardiologist".into()),
        license_number: Some("MD123456".into()),
        ..user("2", "dr.wilson@medicore.com", "Sarah", "Wilson", Role::Doctor)
    };

    let nurse = User {
        department: Some("Emergency".into()),
        ..user("3", "nurse.jane@medicore.com", "Jane", "Smith", Role::Nurse)
    };

    let admin = user("4", "admin@medicore.com", "Admin", "User", Role::Admin);

    vec![patient, doctor, nurse, admin]
}

pub fn seed_appointments() -> Vec<Appointment> {
    let apt = |id: &str,
               patient: (&str, &str),
               doctor: (&str, &str),
               department: &str,
               day: (i32, u32, u32),
               time: &str,
               duration: u32,
               kind: AppointmentType,
               status: AppointmentStatus,
               symptoms: &str,
               created: i64| Appointment {
        id: AppointmentId::from(id),
        patient_id: UserId::from(patient.0),
        patient_name: patient.1.to_string(),
        doctor_id: UserId::from(doctor.0),
        doctor_name: doctor.1.to_string(),
        department: department.to_string(),
        date: NaiveDate::from_ymd_opt(day.0, day.1, day.2).unwrap_or_default(),
        time: time.to_string(),
        duration,
        appointment_type: kind,
        status,
        symptoms: Some(symptoms.to_string()),
        notes: None,
        created_at: timestamp(created),
    };

    vec![
        apt(
            "1",
            ("p1", "John Patient"),
            ("1", "Dr. Sarah Wilson"),
            "Cardiology",
            (2025, 1, 20),
            "09:00",
            30,
            AppointmentType::Consultation,
            AppointmentStatus::Scheduled,
            "Chest pain and shortness of breath",
            1_736_935_200,
        ),
        apt(
            "2",
            ("p1", "John Patient"),
            ("3", "Dr. Emily Rodriguez"),
            "Orthopedics",
            (2025, 1, 25),
            "14:30",
            45,
            AppointmentType::FollowUp,
            AppointmentStatus::Confirmed,
            "Knee pain follow-up",
            1_736_517_600,
        ),
        apt(
            "3",
            ("p2", "Jane Smith"),
            ("1", "Dr. Sarah Wilson"),
            "Cardiology",
            (2025, 1, 22),
            "11:00",
            30,
            AppointmentType::Consultation,
            AppointmentStatus::Scheduled,
            "Regular checkup",
            1_737_190_800,
        ),
    ]
}

/// Half-hour slots over the working day, marked unavailable when the doctor
/// already holds an appointment at that time.
pub fn generate_time_slots(
    appointments: &[Appointment],
    date: NaiveDate,
    doctor_id: &UserId,
) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    for hour in FIRST_SLOT_HOUR..LAST_SLOT_HOUR {
        for minute in (0..60).step_by(SLOT_MINUTES as usize) {
            let time = format!("{hour:02}:{minute:02}");
            let booked = appointments.iter().any(|apt| {
                &apt.doctor_id == doctor_id
                    && apt.date == date
                    && apt.time == time
                    && apt.status.holds_slot()
            });
            slots.push(TimeSlot {
                time,
                available: !booked,
            });
        }
    }
    slots
}

/// `"14:30"` -> `"2:30 PM"`. Unparseable input is returned unchanged.
pub fn format_time(time: &str) -> String {
    match NaiveTime::parse_from_str(time, "%H:%M") {
        Ok(t) => t.format("%-I:%M %p").to_string(),
        Err(_) => time.to_string(),
    }
}

/// `2025-02-10` -> `"Monday, February 10, 2025"`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
