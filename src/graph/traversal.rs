//! Edge traversals over the SQLite store.
//!
//! Each traversal starts from a set of source ids, follows one edge and
//! returns the distinct targets that pass a filter, ordered by id. Source
//! ids travel as a single JSON array parameter expanded with `json_each`,
//! so the set size is not bounded by SQLite's host-parameter limit.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::db::converters::{row_to_car, row_to_group, row_to_user};
use crate::error::{GraphError, Result};
use crate::graph::predicate::{CarFilter, GroupFilter, UserFilter};
use crate::graph::store::GraphStore;
use crate::types::{Car, CarId, Group, GroupId, User, UserId};

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

const OWNER_OF_CAR_SQL: &str = "\
SELECT u.id, u.name, u.age
FROM users u
JOIN cars c ON c.owner_id = u.id
WHERE c.id = ?1";

fn cars_of_users_sql(filter: &str) -> String {
    format!(
        "SELECT c.id, c.model, c.registered_at, c.owner_id
FROM cars c
WHERE c.owner_id IN ({SOURCE_IDS}) AND {filter}
ORDER BY c.id ASC"
    )
}

fn users_of_groups_sql(filter: &str) -> String {
    format!(
        "SELECT DISTINCT u.id, u.name, u.age
FROM users u
JOIN group_users gu ON gu.user_id = u.id
WHERE gu.group_id IN ({SOURCE_IDS}) AND {filter}
ORDER BY u.id ASC"
    )
}

fn groups_of_users_sql(filter: &str) -> String {
    format!(
        "SELECT DISTINCT g.id, g.name
FROM \"groups\" g
JOIN group_users gu ON gu.group_id = g.id
WHERE gu.user_id IN ({SOURCE_IDS}) AND {filter}
ORDER BY g.id ASC"
    )
}

/// Expands the first parameter, a JSON array of ids, into a row set.
const SOURCE_IDS: &str = "SELECT value FROM json_each(?)";

/// The source id array first, then the filter's own parameters, matching
/// the placeholder order of the statements above.
fn bind(sources: impl Iterator<Item = i64>, filter_params: Vec<Value>) -> Vec<Value> {
    let array = serde_json::Value::from(sources.collect::<Vec<i64>>()).to_string();
    std::iter::once(Value::Text(array))
        .chain(filter_params)
        .collect()
}

// ---------------------------------------------------------------------------
// GraphTraversal
// ---------------------------------------------------------------------------

/// Edge traversals bound to a store.
pub struct GraphTraversal<'a> {
    store: &'a GraphStore,
}

impl<'a> GraphTraversal<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// User → cars: every car owned by one of `users`.
    pub fn cars_of_users(&self, users: &[UserId], filter: &CarFilter) -> Result<Vec<Car>> {
        if users.is_empty() {
            return Ok(Vec::new());
        }
        let (where_sql, filter_params) = filter.to_sql();
        let sql = cars_of_users_sql(&where_sql);
        let values = bind(users.iter().map(|u| u.0), filter_params);

        let mut stmt = self.store.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_car)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Group → users: the members of any of `groups`, each once.
    pub fn users_of_groups(&self, groups: &[GroupId], filter: &UserFilter) -> Result<Vec<User>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let (where_sql, filter_params) = filter.to_sql();
        let sql = users_of_groups_sql(&where_sql);
        let values = bind(groups.iter().map(|g| g.0), filter_params);

        let mut stmt = self.store.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_user)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// User → groups: every group any of `users` belongs to, each once.
    pub fn groups_of_users(&self, users: &[UserId], filter: &GroupFilter) -> Result<Vec<Group>> {
        if users.is_empty() {
            return Ok(Vec::new());
        }
        let (where_sql, filter_params) = filter.to_sql();
        let sql = groups_of_users_sql(&where_sql);
        let values = bind(users.iter().map(|u| u.0), filter_params);

        let mut stmt = self.store.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_group)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Car → owner.
    pub fn owner_of_car(&self, car: CarId) -> Result<User> {
        let mut stmt = self.store.conn.prepare_cached(OWNER_OF_CAR_SQL)?;
        stmt.query_row(params![car.0], row_to_user)
            .optional()?
            .ok_or(GraphError::NotFound { entity: "car" })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
