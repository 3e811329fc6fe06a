//! In-memory user directory the auth manager authenticates against.

use medicore_shared::catalog::seed_users;
use medicore_shared::password::PasswordHash;
use medicore_shared::types::UserId;
use medicore_shared::user::User;

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub user: User,
    /// Seeded accounts carry no password.
    pub password: Option<PasswordHash>,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    entries: Vec<DirectoryEntry>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four demo accounts.
    pub fn seeded() -> Self {
        Self {
            entries: seed_users()
                .into_iter()
                .map(|user| DirectoryEntry { user, password: None })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact, case-sensitive match.
    pub fn find_by_email(&self, email: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.user.email == email)
    }

    pub fn find(&self, id: &UserId) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| &e.user.id == id)
    }

    pub fn find_mut(&mut self, id: &UserId) -> Option<&mut DirectoryEntry> {
        self.entries.iter_mut().find(|e| &e.user.id == id)
    }

    /// Ids are assigned sequentially from the current size.
    pub fn next_id(&self) -> UserId {
        UserId::new((self.entries.len() + 1).to_string())
    }

    pub fn insert(&mut self, user: User, password: Option<PasswordHash>) {
        self.entries.push(DirectoryEntry { user, password });
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.entries.iter().map(|e| &e.user)
    }
}
