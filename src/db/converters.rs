//! Row-to-entity conversion for the SQLite store.
//!
//! Columns are read by name, so callers may select them in any order as
//! long as the names match the table definitions.

use rusqlite::Row;

use crate::types::{Car, CarId, Group, GroupId, User, UserId};

pub fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get("id")?),
        name: row.get("name")?,
        age: row.get("age")?,
    })
}

pub fn row_to_car(row: &Row<'_>) -> rusqlite::Result<Car> {
    Ok(Car {
        id: CarId(row.get("id")?),
        model: row.get("model")?,
        registered_at: row.get("registered_at")?,
        owner: UserId(row.get("owner_id")?),
    })
}

pub fn row_to_group(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId(row.get("id")?),
        name: row.get("name")?,
    })
}
