//! Core domain types for entgraph: the three entities, their ids, and the
//! create inputs a provider accepts.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Provider-assigned identity of a [`User`].
    UserId
);
entity_id!(
    /// Provider-assigned identity of a [`Car`].
    CarId
);
entity_id!(
    /// Provider-assigned identity of a [`Group`].
    GroupId
);

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A person who owns cars and belongs to groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub age: u32,
}

/// A car. Always has exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub model: String,
    pub registered_at: DateTime<Utc>,
    pub owner: UserId,
}

/// A named set of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User(id={}, age={}, name={})", self.id, self.age, self.name)
    }
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Car(id={}, model={}, registered_at={})",
            self.id,
            self.model,
            self.registered_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group(id={}, name={})", self.id, self.name)
    }
}

/// Render a slice of entities as `[a, b, c]` using their `Display` impls.
pub fn display_list<T: fmt::Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Create inputs
// ---------------------------------------------------------------------------

/// Fields for a new [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub age: u32,
}

impl NewUser {
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }
}

/// Fields for a new [`Car`]. The owner is required, so there is no way to
/// build one without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCar {
    pub model: String,
    pub registered_at: DateTime<Utc>,
    pub owner: UserId,
}

impl NewCar {
    pub fn new(model: impl Into<String>, owner: UserId) -> Self {
        Self {
            model: model.into(),
            registered_at: Utc::now(),
            owner,
        }
    }

    /// Override the registration time (defaults to now).
    pub fn registered_at(mut self, at: DateTime<Utc>) -> Self {
        self.registered_at = at;
        self
    }
}

/// Fields for a new [`Group`], with the members to link on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub members: Vec<UserId>,
}

impl NewGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Add members. Duplicate ids are linked once.
    pub fn add_users(mut self, users: &[&User]) -> Self {
        for user in users {
            if !self.members.contains(&user.id) {
                self.members.push(user.id);
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Aggregate counts over the stored graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub users: usize,
    pub cars: usize,
    pub groups: usize,
    pub memberships: usize,
}

impl GraphStats {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "users": self.users,
            "cars": self.cars,
            "groups": self.groups,
            "memberships": self.memberships,
        })
    }
}
