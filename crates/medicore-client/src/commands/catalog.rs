use chrono::NaiveDate;
use medicore_shared::appointment::Appointment;
use medicore_shared::catalog::{self, Department, Doctor, TimeSlot};
use medicore_shared::types::UserId;
use medicore_shared::user::Role;

use super::require_user;
use crate::state::SharedState;

pub fn list_departments() -> Vec<Department> {
    catalog::departments()
}

/// Every doctor, or only those practicing in `department`.
pub fn list_doctors(department: Option<&str>) -> Vec<Doctor> {
    match department.map(str::trim).filter(|d| !d.is_empty()) {
        Some(department) => catalog::doctors_in(department),
        None => catalog::doctors(),
    }
}

pub async fn available_slots(state: &SharedState, doctor_id: &str, date: &str) -> Result<Vec<TimeSlot>, String> {
    let doctor_id = UserId::from(doctor_id.trim());
    if catalog::find_doctor(&doctor_id).is_none() {
        return Err(format!("Unknown doctor: {doctor_id}"));
    }
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{date}', expected YYYY-MM-DD"))?;

    let guard = state.lock().await;
    Ok(catalog::generate_time_slots(&guard.appointments, date, &doctor_id))
}

/// Patients see their own appointments, staff see the whole book. Sorted by
/// date and time.
pub async fn my_appointments(state: &SharedState) -> Result<Vec<Appointment>, String> {
    let user = require_user(state).await?;
    let guard = state.lock().await;

    let mut appointments: Vec<Appointment> = guard
        .appointments
        .iter()
        .filter(|apt| user.role != Role::Patient || apt.patient_id == user.id)
        .cloned()
        .collect();
    appointments.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
    Ok(appointments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::auth::demo_login;
    use crate::commands::test_support::shared_state;

    #[test]
    fn test_doctor_filter() {
        assert_eq!(list_departments().len(), 6);
        assert_eq!(list_doctors(None).len(), 6);
        let cardio = list_doctors(Some("Cardiology"));
        assert_eq!(cardio.len(), 1);
        assert_eq!(cardio[0].name, "Dr. Sarah Wilson");
        assert!(list_doctors(Some("Radiology")).is_empty());
        assert_eq!(list_doctors(Some("  ")).len(), 6);
    }

    #[tokio::test]
    async fn test_slots_reflect_booked_appointments() {
        let state = shared_state();
        let slots = available_slots(&state, "1", "2025-01-20").await.unwrap();
        assert_eq!(slots.len(), 16);
        let nine = slots.iter().find(|s| s.time == "09:00").unwrap();
        assert!(!nine.available);
        assert!(slots.iter().filter(|s| s.available).count() == 15);

        assert_eq!(
            available_slots(&state, "1", "20/01/2025").await.unwrap_err(),
            "Invalid date '20/01/2025', expected YYYY-MM-DD"
        );
        assert_eq!(
            available_slots(&state, "42", "2025-01-20").await.unwrap_err(),
            "Unknown doctor: 42"
        );
    }

    #[tokio::test]
    async fn test_appointments_by_role() {
        let state = shared_state();
        assert!(my_appointments(&state).await.is_err());

        demo_login(&state, Role::Doctor).await.unwrap();
        let all = my_appointments(&state).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["1", "3", "2"]);

        demo_login(&state, Role::Patient).await.unwrap();
        assert!(my_appointments(&state).await.unwrap().is_empty());
    }
}
