// Core domain types shared across all donelist crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned identifier of a todo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TodoId(Uuid);

impl TodoId {
    /// Mint a fresh id. Only the mutation service does this.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TodoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Identifier of an authenticated actor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A todo item owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub owner_id: UserId,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Privilege level of an actor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the current actor, fetched fresh for every mutating call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub role: Role,
    /// Bearer credential for remote transports. In-process services ignore it.
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role, access_token: None }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Change-feed event published by the mutation service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TodoChange {
    Upserted { todo: Todo },
    Deleted { id: TodoId, owner_id: UserId },
    /// Subscribers should drop cached state and reload.
    Invalidated,
}

impl TodoChange {
    /// Owner the event concerns, if it concerns a single row.
    pub fn owner_id(&self) -> Option<UserId> {
        match self {
            Self::Upserted { todo } => Some(todo.owner_id),
            Self::Deleted { owner_id, .. } => Some(*owner_id),
            Self::Invalidated => None,
        }
    }

    pub fn todo_id(&self) -> Option<TodoId> {
        match self {
            Self::Upserted { todo } => Some(todo.id),
            Self::Deleted { id, .. } => Some(*id),
            Self::Invalidated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_id_round_trips_through_display() {
        let id = TodoId::new_v4();
        let parsed: TodoId = id.to_string().parse().expect("id should parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn todo_id_rejects_placeholder_shaped_strings() {
        assert!("temp-1".parse::<TodoId>().is_err());
    }

    #[test]
    fn todo_serializes_with_snake_case_fields() {
        let todo = Todo {
            id: TodoId::new_v4(),
            owner_id: UserId::new_v4(),
            title: "buy milk".into(),
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&todo).expect("todo should serialize");
        assert_eq!(value["title"], "buy milk");
        assert_eq!(value["completed"], false);
        assert!(value["owner_id"].is_string());
        assert!(value["created_at"].is_string());
    }

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("member"), Some(Role::Member));
        assert_eq!(Role::parse("root"), None);
        assert!(Role::Admin.is_admin());
        assert!(!Role::default().is_admin());
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = Session::new(UserId::new_v4(), Role::Member).with_access_token("secret");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn change_event_is_tagged() {
        let value = serde_json::to_value(TodoChange::Invalidated).expect("should serialize");
        assert_eq!(value["kind"], "invalidated");
    }
}
