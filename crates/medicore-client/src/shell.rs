//! Line-oriented front end over the command handlers.
//!
//! Each input line is one command followed by its arguments. Structured
//! arguments (registration, bookings, settings) are passed as JSON. Every
//! reply is a JSON value.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use medicore_media::DeviceCheck;
use medicore_shared::user::{LoginCredentials, Role};

use crate::commands::telemedicine::PreviewChange;
use crate::commands::{auth, catalog, navigation, settings, telemedicine};
use crate::state::SharedState;

pub const HELP: &str = "\
login <email> <password> [remember]   sign in
demo <patient|doctor|nurse|admin>     sign in with a demo account
register <json>                       create an account
logout | reset-password <email> | whoami | can <resource> <action>
passwd <json> | users | activate <id> | deactivate <id>
go <page> | view
departments | doctors [department] | slots <doctor> <YYYY-MM-DD> | appointments
book <json>                           book an appointment
room | wait | retry <check> | preview <camera|mic|volume N|blur on|off> | leave
join | mute | video | share | record | chat <text> | end | call
settings | settings-set <json>
help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Value),
    Quit,
}

pub struct Shell {
    state: SharedState,
}

impl Shell {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Run one command line.
    pub async fn execute(&self, line: &str) -> Result<Reply, String> {
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();
        let state = &self.state;

        let value = match command {
            "" => Value::Null,
            "help" => Value::String(HELP.to_string()),
            "quit" | "exit" => return Ok(Reply::Quit),

            "login" => {
                let [email, password, flags @ ..] = args.as_slice() else {
                    return Err("usage: login <email> <password> [remember]".into());
                };
                let remember = flags.first().is_some_and(|f| *f == "remember");
                to_json(auth::login(state, LoginCredentials::new(email, password, remember)).await?)?
            }
            "demo" => {
                let role: Role = rest.parse()?;
                to_json(auth::demo_login(state, role).await?)?
            }
            "register" => to_json(auth::register(state, parse_json(rest)?).await?)?,
            "logout" => to_json(auth::logout(state).await?)?,
            "reset-password" => json!({ "message": auth::reset_password(state, rest.to_string()).await? }),
            "whoami" => to_json(auth::current_user(state).await?)?,
            "can" => {
                let [resource, action] = args.as_slice() else {
                    return Err("usage: can <resource> <action>".into());
                };
                let allowed = auth::has_permission(state, resource.to_string(), action.to_string()).await?;
                json!({ "allowed": allowed })
            }
            "passwd" => {
                auth::change_password(state, parse_json(rest)?).await?;
                json!({ "message": "Password updated" })
            }
            "users" => to_json(auth::list_users(state).await?)?,
            "activate" | "deactivate" => {
                let user = auth::set_user_active(state, rest.to_string(), command == "activate").await?;
                to_json(user)?
            }

            "go" => to_json(navigation::navigate(state, rest).await?)?,
            "view" => to_json(navigation::current_view(state).await?)?,

            "departments" => to_json(catalog::list_departments())?,
            "doctors" => to_json(catalog::list_doctors(Some(rest)))?,
            "slots" => {
                let [doctor, date] = args.as_slice() else {
                    return Err("usage: slots <doctor> <YYYY-MM-DD>".into());
                };
                to_json(catalog::available_slots(state, doctor, date).await?)?
            }
            "appointments" => to_json(catalog::my_appointments(state).await?)?,

            "book" => to_json(telemedicine::book_appointment(state, parse_json(rest)?).await?)?,
            "room" => to_json(telemedicine::waiting_room_status(state).await?)?,
            "wait" => to_json(telemedicine::wait_until_ready(state).await?)?,
            "retry" => {
                let check: DeviceCheck = rest.parse()?;
                json!({ "retrying": telemedicine::retry_check(state, check).await? })
            }
            "preview" => to_json(telemedicine::update_preview(state, parse_preview(&args)?).await?)?,
            "leave" => to_json(telemedicine::leave_waiting_room(state).await?)?,
            "join" => to_json(telemedicine::join_call(state).await?)?,
            "mute" => json!({ "muted": telemedicine::toggle_mute(state).await? }),
            "video" => json!({ "videoOn": telemedicine::toggle_video(state).await? }),
            "share" => json!({ "screenSharing": telemedicine::toggle_screen_share(state).await? }),
            "record" => json!({ "recording": telemedicine::toggle_recording(state).await? }),
            "chat" => to_json(telemedicine::send_chat(state, rest.to_string()).await?)?,
            "end" => to_json(telemedicine::end_call(state).await?)?,
            "call" => to_json(telemedicine::call_session(state).await?)?,

            "settings" => to_json(settings::get_settings(state).await?)?,
            "settings-set" => {
                settings::update_settings(state, parse_json(rest)?).await?;
                json!({ "message": "Settings saved" })
            }

            other => return Err(format!("Unknown command '{other}', try 'help'")),
        };

        Ok(Reply::Json(value))
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to serialize reply: {e}"))
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON argument: {e}"))
}

fn parse_preview(args: &[&str]) -> Result<PreviewChange, String> {
    match args {
        ["camera"] => Ok(PreviewChange::Camera),
        ["mic" | "microphone"] => Ok(PreviewChange::Microphone),
        ["volume", level] => level
            .parse()
            .map(PreviewChange::Volume)
            .map_err(|_| format!("Invalid volume '{level}'")),
        ["blur", "on"] => Ok(PreviewChange::Blur(true)),
        ["blur", "off"] => Ok(PreviewChange::Blur(false)),
        _ => Err("usage: preview <camera|mic|volume N|blur on|off>".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::commands::test_support::shared_state;
    use crate::pages::Page;

    async fn run(shell: &Shell, line: &str) -> Value {
        match shell.execute(line).await {
            Ok(Reply::Json(value)) => value,
            other => panic!("{line}: {other:?}"),
        }
    }

    const BOOKING: &str = r#"{"doctorId":"1","department":"Cardiology","date":"2025-02-10","time":"10:00","type":"consultation","symptoms":"headache","consultationType":"telemedicine","hasRequiredTech":true,"agreedToTerms":true}"#;

    #[tokio::test(start_paused = true)]
    async fn test_telemedicine_session_over_shell() {
        let shell = Shell::new(shared_state());

        assert_eq!(run(&shell, "go telemedicine").await["view"], "auth");
        let login = run(&shell, "demo patient").await;
        assert_eq!(login["user"]["email"], "john.patient@email.com");
        assert_eq!(login["view"]["page"], "dashboard");

        let booked = run(&shell, &format!("book {BOOKING}")).await;
        assert_eq!(booked["appointment"]["status"], "scheduled");
        assert_eq!(booked["stage"], "waiting");
        assert_eq!(booked["view"]["page"], "telemedicine");

        let room = run(&shell, "wait").await;
        assert_eq!(room["ready"], true);
        assert_eq!(room["remote"], "ready");

        let call = run(&shell, "join").await;
        assert_eq!(call["status"], "active");
        assert_eq!(call["participants"].as_array().unwrap().len(), 2);

        assert_eq!(run(&shell, "mute").await["muted"], true);
        let msg = run(&shell, "chat see you soon").await;
        assert_eq!(msg["message"], "see you soon");
        assert_eq!(msg["type"], "text");

        let ended = run(&shell, "end").await;
        assert_eq!(ended["status"], "ended");
        assert!(shell.execute("share").await.is_err());

        tokio::time::sleep(Duration::from_secs(3) + Duration::from_millis(10)).await;
        assert_eq!(shell.state().lock().await.page, Page::Dashboard);
        assert_eq!(run(&shell, "call").await, Value::Null);
    }

    #[tokio::test]
    async fn test_argument_errors() {
        let shell = Shell::new(shared_state());
        assert_eq!(
            shell.execute("login someone@email.com").await.unwrap_err(),
            "usage: login <email> <password> [remember]"
        );
        assert_eq!(shell.execute("demo surgeon").await.unwrap_err(), "unknown role 'surgeon'");
        assert!(shell
            .execute("register {not json")
            .await
            .unwrap_err()
            .starts_with("Invalid JSON argument"));
        assert_eq!(
            shell.execute("dance").await.unwrap_err(),
            "Unknown command 'dance', try 'help'"
        );
        assert_eq!(shell.execute("quit").await, Ok(Reply::Quit));
        assert_eq!(run(&shell, "   ").await, Value::Null);
    }

    #[tokio::test]
    async fn test_register_and_permissions() {
        let shell = Shell::new(shared_state());
        let reg = run(
            &shell,
            r#"register {"firstName":"Ana","lastName":"Lima","email":"ana@email.com","password":"pw","confirmPassword":"pw","role":"nurse"}"#,
        )
        .await;
        assert_eq!(reg["user"]["id"], "5");
        assert_eq!(run(&shell, "can patients read").await["allowed"], true);
        assert_eq!(run(&shell, "can patients delete").await["allowed"], false);
        assert!(shell.execute("users").await.is_err());

        run(&shell, "logout").await;
        assert_eq!(run(&shell, "whoami").await, Value::Null);
    }

    #[test]
    fn test_preview_args() {
        assert_eq!(parse_preview(&["volume", "30"]), Ok(PreviewChange::Volume(30)));
        assert_eq!(parse_preview(&["blur", "on"]), Ok(PreviewChange::Blur(true)));
        assert!(parse_preview(&["volume", "loud"]).is_err());
        assert!(parse_preview(&[]).is_err());
    }
}
