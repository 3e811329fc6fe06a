//! Portal navigation.

use std::fmt;

use medicore_shared::user::{Role, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Welcome,
    Dashboard,
    Appointments,
    Telemedicine,
    MedicalRecords,
    Departments,
    Settings,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Dashboard => "dashboard",
            Self::Appointments => "appointments",
            Self::Telemedicine => "telemedicine",
            Self::MedicalRecords => "medical-records",
            Self::Departments => "departments",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a navigation request leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Page(Page),
    Logout,
}

/// Resolve a navigation target. Unknown names land on the dashboard.
pub fn route(name: &str) -> Route {
    match name.trim() {
        "welcome" => Route::Page(Page::Welcome),
        "dashboard" => Route::Page(Page::Dashboard),
        "appointments" => Route::Page(Page::Appointments),
        "telemedicine" => Route::Page(Page::Telemedicine),
        "medical-records" => Route::Page(Page::MedicalRecords),
        "departments" => Route::Page(Page::Departments),
        "settings" => Route::Page(Page::Settings),
        "logout" => Route::Logout,
        _ => Route::Page(Page::Dashboard),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Patient,
    Staff,
}

impl From<Role> for Audience {
    fn from(role: Role) -> Self {
        if role.is_staff() {
            Self::Staff
        } else {
            Self::Patient
        }
    }
}

/// What is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum View {
    /// Login / register / reset forms.
    Auth,
    Portal { page: Page, audience: Audience },
}

/// Anonymous visitors only ever see the auth forms.
pub fn view_for(user: Option<&User>, page: Page) -> View {
    match user {
        Some(user) => View::Portal {
            page,
            audience: user.role.into(),
        },
        None => View::Auth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medicore_shared::catalog::seed_users;

    #[test]
    fn test_routes() {
        assert_eq!(route("medical-records"), Route::Page(Page::MedicalRecords));
        assert_eq!(route("logout"), Route::Logout);
        assert_eq!(route("billing"), Route::Page(Page::Dashboard));
        assert_eq!(route(""), Route::Page(Page::Dashboard));
    }

    #[test]
    fn test_view_gating() {
        assert_eq!(view_for(None, Page::Settings), View::Auth);

        let users = seed_users();
        assert_eq!(
            view_for(Some(&users[0]), Page::Telemedicine),
            View::Portal {
                page: Page::Telemedicine,
                audience: Audience::Patient
            }
        );
        assert_eq!(
            view_for(Some(&users[1]), Page::Dashboard),
            View::Portal {
                page: Page::Dashboard,
                audience: Audience::Staff
            }
        );
    }

    #[test]
    fn test_view_json() {
        let json = serde_json::to_value(View::Auth).unwrap();
        assert_eq!(json["view"], "auth");
        let users = seed_users();
        let json = serde_json::to_value(view_for(Some(&users[0]), Page::MedicalRecords)).unwrap();
        assert_eq!(json["view"], "portal");
        assert_eq!(json["page"], "medical-records");
        assert_eq!(json["audience"], "patient");
    }
}
