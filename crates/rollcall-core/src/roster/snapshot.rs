use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{NewMember, RosterSchema, User};
use crate::utils::contains_ignore_case;

/// Length of generated opaque member codes.
const MEMBER_CODE_LEN: usize = 8;

/// Which ingestion path produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotSource {
    /// Nothing fetched yet.
    Empty,
    /// Primary delimited-text export.
    Export,
    /// Secondary key-authenticated values API.
    Values,
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotSource::Empty => write!(f, "empty"),
            SnapshotSource::Export => write!(f, "export"),
            SnapshotSource::Values => write!(f, "values API"),
        }
    }
}

/// The validated, deduplicated roster from one ingestion run, newest serial first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSnapshot {
    users: Vec<User>,
    pub fetched_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

impl RosterSnapshot {
    pub fn new(users: Vec<User>, source: SnapshotSource) -> Self {
        Self {
            users,
            fetched_at: Utc::now(),
            source,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), SnapshotSource::Empty)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn find_by_serial(&self, serial: u64) -> Option<&User> {
        self.users.iter().find(|u| u.serial == serial)
    }

    /// Case-insensitive filter over name, phone and identifier.
    pub fn search(&self, query: &str) -> Vec<&User> {
        let query = query.trim();
        if query.is_empty() {
            return self.users.iter().collect();
        }
        self.users
            .iter()
            .filter(|u| {
                contains_ignore_case(&u.name, query)
                    || u.phone.contains(query)
                    || contains_ignore_case(&u.identifier, query)
            })
            .collect()
    }

    /// Serial for the next registration: one past the highest serial seen.
    pub fn next_serial(&self) -> u64 {
        self.users.iter().map(|u| u.serial).max().unwrap_or(0) + 1
    }

    /// Assign a serial and identifier to a member being added.
    pub fn next_member(&self, schema: &RosterSchema, member: NewMember) -> User {
        self.assign(schema, member, self.next_serial(), &[])
    }

    /// Like `next_member` for a batch: consecutive serials, and codes that
    /// are unique across the roster and the batch itself.
    pub fn next_members(&self, schema: &RosterSchema, members: Vec<NewMember>) -> Vec<User> {
        let first = self.next_serial();
        let mut assigned: Vec<User> = Vec::with_capacity(members.len());
        for (offset, member) in (0u64..).zip(members) {
            let user = self.assign(schema, member, first + offset, &assigned);
            assigned.push(user);
        }
        assigned
    }

    fn assign(&self, schema: &RosterSchema, member: NewMember, serial: u64, pending: &[User]) -> User {
        let identifier = if schema.has_identifier_column() {
            self.fresh_member_code(pending)
        } else {
            serial.to_string()
        };
        member.into_user(serial, identifier)
    }

    fn fresh_member_code(&self, pending: &[User]) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..MEMBER_CODE_LEN)
                .map(|_| {
                    let nibble: u32 = rng.gen_range(0..16);
                    char::from_digit(nibble, 16).unwrap_or('0').to_ascii_uppercase()
                })
                .collect();
            let taken = self
                .users
                .iter()
                .chain(pending)
                .any(|u| u.identifier.eq_ignore_ascii_case(&code));
            if !taken {
                return code;
            }
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        if self.source == SnapshotSource::Empty {
            return "never".to_string();
        }
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Holds the current snapshot. Refreshes swap the `Arc`, so a reader keeps a
/// complete roster even while a replacement is being installed.
#[derive(Debug)]
pub struct RosterHandle {
    current: RwLock<Arc<RosterSnapshot>>,
}

impl Default for RosterHandle {
    fn default() -> Self {
        Self::new(RosterSnapshot::empty())
    }
}

impl RosterHandle {
    pub fn new(snapshot: RosterSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn current(&self) -> Arc<RosterSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new snapshot, returning the one it replaced.
    pub fn replace(&self, snapshot: RosterSnapshot) -> Arc<RosterSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn member(serial: u64, name: &str, phone: &str, identifier: &str) -> User {
        NewMember {
            name: name.to_string(),
            phone: phone.to_string(),
            ..Default::default()
        }
        .into_user(serial, identifier.to_string())
    }

    fn snapshot() -> RosterSnapshot {
        RosterSnapshot::new(
            vec![
                member(3, "Kim Young", "010-3333-0000", "3"),
                member(2, "Lee Soon", "010-2222-0000", "B7C1D2E3"),
                member(1, "Park Min", "010-1111-0000", "1"),
            ],
            SnapshotSource::Export,
        )
    }

    #[test]
    fn test_search_matches_name_phone_and_identifier() {
        let s = snapshot();
        assert_eq!(s.search("kim").len(), 1);
        assert_eq!(s.search("2222").len(), 1);
        assert_eq!(s.search("b7c1").len(), 1);
        assert_eq!(s.search("  ").len(), 3);
        assert!(s.search("nobody").is_empty());
    }

    #[test]
    fn test_next_member_serial_schema() {
        let s = snapshot();
        let user = s.next_member(&RosterSchema::Serial, NewMember {
            name: "Choi".to_string(),
            ..Default::default()
        });
        assert_eq!(user.serial, 4);
        assert_eq!(user.identifier, "4");
        assert_eq!(user.phone, "-");
    }

    #[test]
    fn test_next_member_opaque_schema_gets_code() {
        let s = snapshot();
        let user = s.next_member(&RosterSchema::Opaque, NewMember {
            name: "Choi".to_string(),
            ..Default::default()
        });
        assert_eq!(user.identifier.len(), MEMBER_CODE_LEN);
        assert!(user
            .identifier
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_next_members_are_consecutive() {
        let batch = vec![
            NewMember {
                name: "Choi".to_string(),
                ..Default::default()
            },
            NewMember {
                name: "Jung".to_string(),
                ..Default::default()
            },
        ];
        let users = snapshot().next_members(&RosterSchema::Opaque, batch);
        assert_eq!(users.iter().map(|u| u.serial).collect::<Vec<_>>(), vec![4, 5]);
        assert_ne!(users[0].identifier, users[1].identifier);
    }

    #[test]
    fn test_next_serial_on_empty_roster() {
        assert_eq!(RosterSnapshot::empty().next_serial(), 1);
    }

    #[test]
    fn test_age_display() {
        assert_eq!(RosterSnapshot::empty().age_display(), "never");

        let mut s = snapshot();
        assert_eq!(s.age_display(), "just now");
        s.fetched_at = Utc::now() - Duration::minutes(95);
        assert_eq!(s.age_display(), "2h ago");
        s.fetched_at = Utc::now() - Duration::days(3);
        assert_eq!(s.age_display(), "3d ago");
    }

    #[test]
    fn test_handle_replace_swaps_whole_snapshot() {
        let handle = RosterHandle::default();
        let before = handle.current();
        assert!(before.is_empty());

        let previous = handle.replace(snapshot());
        assert!(previous.is_empty());

        // A reader holding the old Arc still sees the old roster.
        assert!(before.is_empty());
        assert_eq!(handle.current().len(), 3);
        assert!(handle.current().find_by_serial(2).is_some());
    }
}
