//! Portal identities and role-based permissions.
//!
//! A [`User`] carries the permission set it was granted at creation time.
//! Permission checks never consult the role directly; the role only decides
//! which defaults a new account receives (see [`default_permissions`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Nurse,
    Admin,
    Employer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Admin => "admin",
            Role::Employer => "employer",
        }
    }

    /// Everyone but patients lands on the staff dashboard.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Patient)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "nurse" => Ok(Role::Nurse),
            "admin" => Ok(Role::Admin),
            "employer" => Ok(Role::Employer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Permission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Grants every action on the resource.
    All,
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "all" => Ok(Action::All),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// A resource name, or `*` for every resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Resource {
    All,
    Named(String),
}

impl Resource {
    pub const WILDCARD: &'static str = "*";

    pub fn named(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    pub fn matches(&self, resource: &str) -> bool {
        match self {
            Resource::All => true,
            Resource::Named(name) => name == resource,
        }
    }
}

impl From<String> for Resource {
    fn from(s: String) -> Self {
        if s == Self::WILDCARD {
            Resource::All
        } else {
            Resource::Named(s)
        }
    }
}

impl From<Resource> for String {
    fn from(r: Resource) -> Self {
        match r {
            Resource::All => Resource::WILDCARD.to_string(),
            Resource::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub resource: Resource,
    pub action: Action,
}

impl Permission {
    pub fn new(id: &str, name: &str, resource: Resource, action: Action) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            resource,
            action,
        }
    }

    pub fn grants(&self, resource: &str, action: Action) -> bool {
        self.resource.matches(resource) && (self.action == Action::All || self.action == action)
    }
}

/// Permission set a freshly created account receives.
///
/// Employers have no documented defaults and get an empty set.
pub fn default_permissions(role: Role) -> Vec<Permission> {
    match role {
        Role::Patient => vec![
            Permission::new("1", "View Own Records", Resource::named("medical-records"), Action::Read),
            Permission::new("2", "Book Appointments", Resource::named("appointments"), Action::Create),
        ],
        Role::Doctor => vec![
            Permission::new("3", "Manage Patients", Resource::named("patients"), Action::All),
            Permission::new("4", "Manage Appointments", Resource::named("appointments"), Action::All),
            Permission::new("5", "Access Medical Records", Resource::named("medical-records"), Action::All),
        ],
        Role::Nurse => vec![
            Permission::new("6", "View Patients", Resource::named("patients"), Action::Read),
            Permission::new("7", "Update Patient Records", Resource::named("medical-records"), Action::Update),
        ],
        Role::Admin => vec![Permission::new("8", "System Admin", Resource::All, Action::All)],
        Role::Employer => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A directory identity. This is also the record persisted next to the
/// session token, hence the camelCase field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_permission(&self, resource: &str, action: Action) -> bool {
        self.permissions.iter().any(|p| p.grants(resource, action))
    }
}

// ---------------------------------------------------------------------------
// Auth form payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl LoginCredentials {
    pub fn new(email: &str, password: &str, remember_me: bool) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            remember_me,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordData {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(permissions: Vec<Permission>) -> User {
        User {
            id: UserId::from("99"),
            email: "t@example.com".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role: Role::Nurse,
            department: None,
            specialization: None,
            license_number: None,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
            permissions,
        }
    }

    #[test]
    fn test_wildcard_grants_everything() {
        let user = user_with(default_permissions(Role::Admin));
        for resource in ["patients", "appointments", "billing", "users"] {
            for action in [Action::Create, Action::Read, Action::Update, Action::Delete, Action::All] {
                assert!(user.has_permission(resource, action));
            }
        }
    }

    #[test]
    fn test_exact_action_only() {
        let user = user_with(default_permissions(Role::Nurse));
        assert!(user.has_permission("patients", Action::Read));
        assert!(!user.has_permission("patients", Action::Update));
        assert!(user.has_permission("medical-records", Action::Update));
        assert!(!user.has_permission("medical-records", Action::Delete));
    }

    #[test]
    fn test_all_action_on_named_resource() {
        let user = user_with(default_permissions(Role::Doctor));
        assert!(user.has_permission("appointments", Action::Delete));
        assert!(!user.has_permission("users", Action::Read));
    }

    #[test]
    fn test_employer_has_no_defaults() {
        assert!(default_permissions(Role::Employer).is_empty());
    }

    #[test]
    fn test_resource_serializes_as_plain_string() {
        let perm = Permission::new("8", "System Admin", Resource::All, Action::All);
        let json = serde_json::to_value(&perm).unwrap();
        assert_eq!(json["resource"], "*");
        assert_eq!(json["action"], "all");

        let back: Permission = serde_json::from_value(json).unwrap();
        assert_eq!(back.resource, Resource::All);
    }

    #[test]
    fn test_user_record_uses_camel_case() {
        let user = user_with(Vec::new());
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["firstName"], "Test");
        assert_eq!(json["isActive"], true);
        assert!(json.get("lastLogin").is_none());
    }
}
