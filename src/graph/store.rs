//! SQLite implementation of the [`GraphProvider`] contract.
//!
//! Fixed statements go through [`Connection::prepare_cached`]; statements
//! whose text depends on a filter are prepared per call.

use rusqlite::{params, params_from_iter, Connection};

use crate::config::DatabaseConfig;
use crate::db::converters::{row_to_car, row_to_group, row_to_user};
use crate::db::schema::{apply_schema, open_connection};
use crate::error::{GraphError, Result};
use crate::graph::predicate::{CarFilter, GroupFilter, UserFilter};
use crate::graph::traversal::GraphTraversal;
use crate::provider::GraphProvider;
use crate::types::{
    Car, CarId, GraphStats, Group, GroupId, NewCar, NewGroup, NewUser, User, UserId,
};

// ---------------------------------------------------------------------------
// GraphStore
// ---------------------------------------------------------------------------

/// Typed wrapper around the entgraph SQLite database.
///
/// Owns its connection; [`GraphProvider::close`] consumes the store, and a
/// store that is dropped without being closed still releases the
/// connection.
pub struct GraphStore {
    pub conn: Connection,
    target: String,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const INSERT_USER_SQL: &str = "INSERT INTO users (name, age) VALUES (?1, ?2)";

const INSERT_CAR_SQL: &str = "\
INSERT INTO cars (model, registered_at, owner_id) VALUES (?1, ?2, ?3)";

const INSERT_GROUP_SQL: &str = "INSERT INTO \"groups\" (name) VALUES (?1)";

const INSERT_MEMBERSHIP_SQL: &str = "\
INSERT OR IGNORE INTO group_users (group_id, user_id) VALUES (?1, ?2)";

const USER_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)";

fn select_users_sql(filter: &str) -> String {
    format!("SELECT u.id, u.name, u.age FROM users u WHERE {filter} ORDER BY u.id ASC")
}

fn select_cars_sql(filter: &str) -> String {
    format!(
        "SELECT c.id, c.model, c.registered_at, c.owner_id FROM cars c WHERE {filter} ORDER BY c.id ASC"
    )
}

fn select_groups_sql(filter: &str) -> String {
    format!("SELECT g.id, g.name FROM \"groups\" g WHERE {filter} ORDER BY g.id ASC")
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl GraphStore {
    /// Open the database described by `config`. The schema is not touched;
    /// call [`GraphProvider::ensure_schema`] next.
    ///
    /// # Errors
    ///
    /// [`GraphError::Connection`] if the database cannot be opened or
    /// configured.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let conn = open_connection(config).map_err(|source| GraphError::Connection {
            target: config.path.clone(),
            source,
        })?;
        tracing::debug!(path = %config.path, journal_mode = %config.journal_mode, "opened database");
        Ok(Self {
            conn,
            target: config.path.clone(),
        })
    }

    /// Wrap an already-open connection. Useful in tests.
    pub fn from_connection(conn: Connection) -> Self {
        let target = conn.path().unwrap_or(":memory:").to_string();
        Self { conn, target }
    }

    fn user_exists(&self, id: UserId) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(USER_EXISTS_SQL)?;
        Ok(stmt.query_row(params![id.0], |row| row.get(0))?)
    }

    fn count(&self, table: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl GraphProvider for GraphStore {
    fn ensure_schema(&self) -> Result<()> {
        apply_schema(&self.conn).map_err(GraphError::Schema)?;
        tracing::debug!(target_db = %self.target, "schema ready");
        Ok(())
    }

    fn close(self) -> Result<()> {
        let target = self.target;
        self.conn
            .close()
            .map_err(|(_conn, e)| GraphError::Database(e))?;
        tracing::debug!(path = %target, "closed database");
        Ok(())
    }

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut stmt = self.conn.prepare_cached(INSERT_USER_SQL)?;
        stmt.execute(params![user.name, user.age])?;
        let created = User {
            id: UserId(self.conn.last_insert_rowid()),
            name: user.name.clone(),
            age: user.age,
        };
        tracing::debug!(%created, "created user");
        Ok(created)
    }

    fn create_car(&self, car: &NewCar) -> Result<Car> {
        if !self.user_exists(car.owner)? {
            return Err(GraphError::Constraint {
                entity: "car",
                reason: format!("owner {} does not exist", car.owner),
            });
        }
        let mut stmt = self.conn.prepare_cached(INSERT_CAR_SQL)?;
        stmt.execute(params![car.model, car.registered_at, car.owner.0])?;
        let created = Car {
            id: CarId(self.conn.last_insert_rowid()),
            model: car.model.clone(),
            registered_at: car.registered_at,
            owner: car.owner,
        };
        tracing::debug!(%created, owner = %car.owner, "created car");
        Ok(created)
    }

    fn create_group(&self, group: &NewGroup) -> Result<Group> {
        for member in &group.members {
            if !self.user_exists(*member)? {
                return Err(GraphError::Constraint {
                    entity: "group",
                    reason: format!("member {member} does not exist"),
                });
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let id = {
            let mut insert_group = tx.prepare_cached(INSERT_GROUP_SQL)?;
            insert_group.execute(params![group.name])?;
            let id = GroupId(tx.last_insert_rowid());

            let mut link = tx.prepare_cached(INSERT_MEMBERSHIP_SQL)?;
            for member in &group.members {
                link.execute(params![id.0, member.0])?;
            }
            id
        };
        tx.commit()?;

        let created = Group {
            id,
            name: group.name.clone(),
        };
        tracing::debug!(%created, members = group.members.len(), "created group");
        Ok(created)
    }

    fn query_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let (where_sql, values) = filter.to_sql();
        let mut stmt = self.conn.prepare(&select_users_sql(&where_sql))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_user)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_cars(&self, filter: &CarFilter) -> Result<Vec<Car>> {
        let (where_sql, values) = filter.to_sql();
        let mut stmt = self.conn.prepare(&select_cars_sql(&where_sql))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_car)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_groups(&self, filter: &GroupFilter) -> Result<Vec<Group>> {
        let (where_sql, values) = filter.to_sql();
        let mut stmt = self.conn.prepare(&select_groups_sql(&where_sql))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_group)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn cars_of_users(&self, users: &[UserId], filter: &CarFilter) -> Result<Vec<Car>> {
        GraphTraversal::new(self).cars_of_users(users, filter)
    }

    fn groups_of_users(&self, users: &[UserId], filter: &GroupFilter) -> Result<Vec<Group>> {
        GraphTraversal::new(self).groups_of_users(users, filter)
    }

    fn users_of_groups(&self, groups: &[GroupId], filter: &UserFilter) -> Result<Vec<User>> {
        GraphTraversal::new(self).users_of_groups(groups, filter)
    }

    fn owner_of_car(&self, car: CarId) -> Result<User> {
        GraphTraversal::new(self).owner_of_car(car)
    }

    fn stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            users: self.count("users")?,
            cars: self.count("cars")?,
            groups: self.count("groups")?,
            memberships: self.count("group_users")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
