use std::time::Duration;

use medicore_media::booking::{self, PatientRef};
use medicore_media::{
    CallError, ChatMessage, DeviceCheck, FlowStage, PreviewSettings, ReadinessSnapshot,
    TelemedicineFlow, VideoCallSession, WaitingRoomError,
};
use medicore_shared::appointment::{Appointment, ConsultationType, TelemedicineBooking};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::navigation::{open_page, schedule_return_to_dashboard};
use super::require_user;
use crate::pages::{view_for, Page, View};
use crate::state::{AppState, SharedState};

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub appointment: Appointment,
    /// Flow stage after a telemedicine booking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<FlowStage>,
    pub view: View,
}

/// A change to the local preview in the waiting room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "control", content = "value", rename_all = "lowercase")]
pub enum PreviewChange {
    Camera,
    Microphone,
    Volume(u8),
    Blur(bool),
}

/// Book a visit. Telemedicine bookings move the user onto the telemedicine
/// page and into its waiting room; in-person bookings only add to the book.
pub async fn book_appointment(
    state: &SharedState,
    request: TelemedicineBooking,
) -> Result<BookingResponse, String> {
    let user = require_user(state).await?;
    let mut guard = state.lock().await;
    let existing = guard.appointments.clone();

    let (appointment, stage) = match request.consultation_type {
        ConsultationType::Telemedicine => {
            if guard.page != Page::Telemedicine || guard.flow.is_none() {
                open_page(&mut guard, &user, Page::Telemedicine);
            }
            let flow = flow_mut(&mut guard)?;
            let outcome = flow.book(&request, &existing).map_err(describe)?;
            (outcome.appointment().clone(), Some(flow.stage()))
        }
        ConsultationType::InPerson => {
            let patient = PatientRef {
                id: user.id.clone(),
                name: user.full_name(),
            };
            let appointment = booking::book(&request, &patient, &existing).map_err(|e| e.to_string())?;
            (appointment, None)
        }
    };

    guard.appointments.push(appointment.clone());
    info!(
        appointment = %appointment.id,
        doctor = %appointment.doctor_id,
        kind = ?request.consultation_type,
        "Appointment booked"
    );

    Ok(BookingResponse {
        view: view_for(Some(&user), guard.page),
        appointment,
        stage,
    })
}

pub async fn waiting_room_status(state: &SharedState) -> Result<ReadinessSnapshot, String> {
    let mut guard = state.lock().await;
    let room = flow_mut(&mut guard)?.waiting_room_mut().map_err(describe)?;
    room.poll();
    Ok(room.snapshot())
}

/// Block until the room is ready to join. The state lock is only taken for
/// each poll, so leaving the room or navigating away ends the wait with an
/// error.
pub async fn wait_until_ready(state: &SharedState) -> Result<ReadinessSnapshot, String> {
    loop {
        {
            let mut guard = state.lock().await;
            let room = flow_mut(&mut guard)?.waiting_room_mut().map_err(describe)?;
            if let Some(outcome) = room.settle() {
                outcome.map_err(|e| describe(e.into()))?;
                return Ok(room.snapshot());
            }
        }
        tokio::time::sleep(READINESS_POLL_INTERVAL).await;
    }
}

/// Re-run a failed device check. `false` when the check had not failed.
pub async fn retry_check(state: &SharedState, check: DeviceCheck) -> Result<bool, String> {
    let mut guard = state.lock().await;
    let flow = flow_mut(&mut guard)?;
    flow.waiting_room_mut().map_err(describe)?.poll();
    flow.retry_check(check).map_err(describe)
}

pub async fn update_preview(state: &SharedState, change: PreviewChange) -> Result<PreviewSettings, String> {
    let mut guard = state.lock().await;
    let room = flow_mut(&mut guard)?.waiting_room_mut().map_err(describe)?;
    match change {
        PreviewChange::Camera => {
            room.toggle_camera_preview();
        }
        PreviewChange::Microphone => {
            room.toggle_microphone_preview();
        }
        PreviewChange::Volume(volume) => room.set_speaker_volume(volume),
        PreviewChange::Blur(enabled) => room.set_background_blur(enabled),
    }
    Ok(room.preview().clone())
}

/// Leave the waiting room and return to booking. The appointment stays
/// booked.
pub async fn leave_waiting_room(state: &SharedState) -> Result<Appointment, String> {
    let mut guard = state.lock().await;
    flow_mut(&mut guard)?.leave_waiting_room().map_err(describe)
}

pub async fn join_call(state: &SharedState) -> Result<VideoCallSession, String> {
    let mut guard = state.lock().await;
    let session = flow_mut(&mut guard)?.join_call().map_err(describe)?;
    Ok(session.clone())
}

pub async fn toggle_mute(state: &SharedState) -> Result<bool, String> {
    let mut guard = state.lock().await;
    flow_mut(&mut guard)?.toggle_mute().map_err(describe)
}

pub async fn toggle_video(state: &SharedState) -> Result<bool, String> {
    let mut guard = state.lock().await;
    flow_mut(&mut guard)?.toggle_video().map_err(describe)
}

pub async fn toggle_screen_share(state: &SharedState) -> Result<bool, String> {
    let mut guard = state.lock().await;
    flow_mut(&mut guard)?.toggle_screen_share().map_err(describe)
}

pub async fn toggle_recording(state: &SharedState) -> Result<bool, String> {
    let mut guard = state.lock().await;
    flow_mut(&mut guard)?.toggle_recording().map_err(describe)
}

pub async fn send_chat(state: &SharedState, text: String) -> Result<ChatMessage, String> {
    let mut guard = state.lock().await;
    let message = flow_mut(&mut guard)?.send_chat(&text).map_err(describe)?;
    Ok(message.clone())
}

/// Hang up and schedule the return to the dashboard once the ended view
/// has been shown.
pub async fn end_call(state: &SharedState) -> Result<VideoCallSession, String> {
    let mut guard = state.lock().await;
    let flow = flow_mut(&mut guard)?;
    let session = flow.end_call().map_err(describe)?.clone();
    let delay = flow.ended_display();
    drop(guard);

    schedule_return_to_dashboard(state.clone(), delay);
    Ok(session)
}

/// The current or just-ended call.
pub async fn call_session(state: &SharedState) -> Result<Option<VideoCallSession>, String> {
    let guard = state.lock().await;
    Ok(guard.flow.as_ref().and_then(TelemedicineFlow::session).cloned())
}

fn flow_mut(state: &mut AppState) -> Result<&mut TelemedicineFlow, String> {
    state
        .flow
        .as_mut()
        .ok_or_else(|| "Open the telemedicine page first".to_string())
}

/// Failed device checks carry their fix-it hint.
fn describe(err: CallError) -> String {
    match &err {
        CallError::WaitingRoom(WaitingRoomError::DeviceCheckFailed(failure)) => {
            format!("{err}. {}", failure.remediation())
        }
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use medicore_media::{CallStatus, CheckStatus, ManualRemote, RemoteStatus, SimulatedDevices};
    use medicore_shared::appointment::{AppointmentForm, AppointmentStatus, AppointmentType};
    use medicore_shared::types::UserId;
    use medicore_shared::user::Role;
    use medicore_store::SessionStorage;

    use crate::commands::auth::demo_login;
    use crate::commands::navigation::navigate;
    use crate::commands::test_support::shared_state;
    use crate::config::ClientConfig;

    fn headache_booking(kind: ConsultationType) -> TelemedicineBooking {
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

    fn state_with(probe: SimulatedDevices, remote: Arc<ManualRemote>) -> SharedState {
        let config = ClientConfig {
            login_latency: Duration::ZERO,
            ..ClientConfig::default()
        };
        AppState::with_devices(config, SessionStorage::ephemeral(), Arc::new(probe), remote)
            .unwrap()
            .into_shared()
    }

    #[tokio::test(start_paused = true)]
    async fn test_consultation_end_to_end() {
        let state = shared_state();
        demo_login(&state, Role::Patient).await.unwrap();

        let booked = book_appointment(&state, headache_booking(ConsultationType::Telemedicine))
            .await
            .unwrap();
        assert_eq!(booked.appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(booked.appointment.doctor_name, "Dr. Sarah Wilson");
        assert_eq!(booked.stage, Some(FlowStage::Waiting));
        assert_eq!(state.lock().await.page, Page::Telemedicine);

        let err = join_call(&state).await.unwrap_err();
        assert!(err.starts_with("Not ready to join"), "{err}");

        let snapshot = wait_until_ready(&state).await.unwrap();
        assert!(snapshot.ready);
        assert!(snapshot.checks.iter().all(|(_, s)| s.is_success()));

        let session = join_call(&state).await.unwrap();
        assert_eq!(session.status, CallStatus::Active);
        assert_eq!(session.chat_messages.len(), 1);

        assert!(toggle_mute(&state).await.unwrap());
        assert!(toggle_screen_share(&state).await.unwrap());
        let err = toggle_recording(&state).await.unwrap_err();
        assert_eq!(err, "Only clinical staff can record a consultation");

        for text in ["hello", "  the pain started yesterday "] {
            send_chat(&state, text.into()).await.unwrap();
        }
        let session = call_session(&state).await.unwrap().unwrap();
        assert_eq!(session.chat_messages.len(), 3);
        assert_eq!(session.chat_messages[2].message, "the pain started yesterday");

        let ended = end_call(&state).await.unwrap();
        assert_eq!(ended.status, CallStatus::Ended);
        assert!(ended.duration.is_some());

        let err = send_chat(&state, "still there?".into()).await.unwrap_err();
        assert_eq!(err, "Not allowed during ended call; requires call");
        assert!(toggle_mute(&state).await.is_err());
        assert!(toggle_screen_share(&state).await.is_err());
        assert_eq!(state.lock().await.page, Page::Telemedicine);

        tokio::time::sleep(Duration::from_secs(4)).await;
        let guard = state.lock().await;
        assert_eq!(guard.page, Page::Dashboard);
        assert!(guard.flow.is_none());
        assert_eq!(guard.appointments.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_ended_view_cancels_return() {
        let remote = Arc::new(ManualRemote::new(RemoteStatus::Ready));
        let state = state_with(SimulatedDevices::new(), remote);
        demo_login(&state, Role::Patient).await.unwrap();
        book_appointment(&state, headache_booking(ConsultationType::Telemedicine))
            .await
            .unwrap();
        wait_until_ready(&state).await.unwrap();
        join_call(&state).await.unwrap();
        end_call(&state).await.unwrap();

        navigate(&state, "settings").await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(state.lock().await.page, Page::Settings);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_person_stays_put() {
        let state = shared_state();
        demo_login(&state, Role::Patient).await.unwrap();
        navigate(&state, "appointments").await.unwrap();

        let booked = book_appointment(&state, headache_booking(ConsultationType::InPerson))
            .await
            .unwrap();
        assert_eq!(booked.stage, None);
        assert_eq!(booked.appointment.patient_name, "John Patient");

        let guard = state.lock().await;
        assert_eq!(guard.page, Page::Appointments);
        assert!(guard.flow.is_none());
        assert_eq!(guard.appointments.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_booking_rejected() {
        let state = shared_state();
        demo_login(&state, Role::Patient).await.unwrap();
        book_appointment(&state, headache_booking(ConsultationType::InPerson))
            .await
            .unwrap();
        let err = book_appointment(&state, headache_booking(ConsultationType::InPerson))
            .await
            .unwrap_err();
        assert!(err.contains("10:00"), "{err}");
        assert_eq!(state.lock().await.appointments.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_check_then_retry() {
        let remote = Arc::new(ManualRemote::new(RemoteStatus::Ready));
        let probe = SimulatedDevices::new().failing_times(DeviceCheck::Camera, 2, "permission denied");
        let state = state_with(probe, remote);
        demo_login(&state, Role::Patient).await.unwrap();
        book_appointment(&state, headache_booking(ConsultationType::Telemedicine))
            .await
            .unwrap();

        let err = wait_until_ready(&state).await.unwrap_err();
        assert!(err.contains("camera check failed"), "{err}");
        assert!(err.contains("Allow camera access"), "{err}");
        assert!(join_call(&state).await.is_err());

        assert!(!retry_check(&state, DeviceCheck::Microphone).await.unwrap());
        assert!(retry_check(&state, DeviceCheck::Camera).await.unwrap());
        let snapshot = wait_until_ready(&state).await.unwrap();
        assert_eq!(snapshot.checks[0], (DeviceCheck::Camera, CheckStatus::Success));
        join_call(&state).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_and_leave() {
        let remote = Arc::new(ManualRemote::new(RemoteStatus::Busy));
        let state = state_with(SimulatedDevices::new(), remote);
        demo_login(&state, Role::Patient).await.unwrap();
        book_appointment(&state, headache_booking(ConsultationType::Telemedicine))
            .await
            .unwrap();

        let preview = update_preview(&state, PreviewChange::Camera).await.unwrap();
        assert!(!preview.camera_enabled);
        let preview = update_preview(&state, PreviewChange::Volume(180)).await.unwrap();
        assert_eq!(preview.speaker_volume, 100);

        let status = waiting_room_status(&state).await.unwrap();
        assert_eq!(status.remote, RemoteStatus::Busy);
        assert!(!status.ready);

        let appointment = leave_waiting_room(&state).await.unwrap();
        assert_eq!(appointment.time, "10:00");
        let guard = state.lock().await;
        assert_eq!(guard.flow.as_ref().unwrap().stage(), FlowStage::Booking);
        assert_eq!(guard.appointments.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_stays_usable_while_waiting() {
        let remote = Arc::new(ManualRemote::new(RemoteStatus::Busy));
        let state = state_with(SimulatedDevices::new(), remote.clone());
        demo_login(&state, Role::Patient).await.unwrap();
        book_appointment(&state, headache_booking(ConsultationType::Telemedicine))
            .await
            .unwrap();

        let waiter = tokio::spawn({
            let state = state.clone();
            async move { wait_until_ready(&state).await }
        });
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!waiter.is_finished());

        let preview = update_preview(&state, PreviewChange::Blur(true)).await.unwrap();
        assert!(preview.background_blur);
        assert_eq!(waiting_room_status(&state).await.unwrap().remote, RemoteStatus::Busy);

        remote.set(RemoteStatus::Ready);
        let snapshot = waiter.await.unwrap().unwrap();
        assert!(snapshot.ready);
        join_call(&state).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_ends_pending_wait() {
        let remote = Arc::new(ManualRemote::new(RemoteStatus::Busy));
        let state = state_with(SimulatedDevices::new(), remote);
        demo_login(&state, Role::Patient).await.unwrap();
        book_appointment(&state, headache_booking(ConsultationType::Telemedicine))
            .await
            .unwrap();

        let waiter = tokio::spawn({
            let state = state.clone();
            async move { wait_until_ready(&state).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        leave_waiting_room(&state).await.unwrap();
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err, "Not allowed during booking; requires waiting room");
    }

    #[tokio::test]
    async fn test_requires_telemedicine_page() {
        let state = shared_state();
        demo_login(&state, Role::Doctor).await.unwrap();
        assert_eq!(
            join_call(&state).await.unwrap_err(),
            "Open the telemedicine page first"
        );
        assert_eq!(call_session(&state).await.unwrap(), None);
    }

    #[test]
    fn test_preview_change_json() {
        let change: PreviewChange = serde_json::from_str(r#"{"control":"volume","value":40}"#).unwrap();
        assert_eq!(change, PreviewChange::Volume(40));
        let change: PreviewChange = serde_json::from_str(r#"{"control":"camera"}"#).unwrap();
        assert_eq!(change, PreviewChange::Camera);
    }
}
