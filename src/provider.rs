//! The persistence contract the graph service is written against.
//!
//! Implemented by [`GraphStore`](crate::graph::store::GraphStore) (SQLite)
//! and [`MemoryStore`](crate::graph::memory::MemoryStore) (in-process).
//! Opening is left to each implementation since their parameters differ.

use crate::error::{GraphError, Result};
use crate::graph::predicate::{CarFilter, GroupFilter, UserFilter};
use crate::types::{Car, CarId, Group, GroupId, GraphStats, NewCar, NewGroup, NewUser, User, UserId};

/// Storage, identity and query execution for the user/car/group graph.
///
/// Traversal methods follow one named edge from a set of source ids and
/// return the distinct targets passing `filter`, ordered by id. An empty
/// source set yields an empty result.
pub trait GraphProvider {
    /// Create or verify every table and index. Safe to call repeatedly.
    fn ensure_schema(&self) -> Result<()>;

    /// Release the underlying connection.
    fn close(self) -> Result<()>
    where
        Self: Sized;

    fn create_user(&self, user: &NewUser) -> Result<User>;

    /// Fails if the owner does not exist.
    fn create_car(&self, car: &NewCar) -> Result<Car>;

    /// Creates the group and links every listed member. Fails if a member
    /// does not exist.
    fn create_group(&self, group: &NewGroup) -> Result<Group>;

    fn query_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
    fn query_cars(&self, filter: &CarFilter) -> Result<Vec<Car>>;
    fn query_groups(&self, filter: &GroupFilter) -> Result<Vec<Group>>;

    /// User → cars.
    fn cars_of_users(&self, users: &[UserId], filter: &CarFilter) -> Result<Vec<Car>>;

    /// User → groups.
    fn groups_of_users(&self, users: &[UserId], filter: &GroupFilter) -> Result<Vec<Group>>;

    /// Group → users.
    fn users_of_groups(&self, groups: &[GroupId], filter: &UserFilter) -> Result<Vec<User>>;

    /// Car → owner.
    fn owner_of_car(&self, car: CarId) -> Result<User>;

    fn stats(&self) -> Result<GraphStats>;
}

/// Reduce a query result to its single element.
///
/// Zero results is [`GraphError::NotFound`], more than one is
/// [`GraphError::NotSingular`].
pub fn only<T>(entity: &'static str, mut items: Vec<T>) -> Result<T> {
    match items.len() {
        0 => Err(GraphError::NotFound { entity }),
        1 => Ok(items.remove(0)),
        count => Err(GraphError::NotSingular { entity, count }),
    }
}

/// Collect ids from a slice of entities.
pub fn ids<T, I>(items: &[T], id: impl Fn(&T) -> I) -> Vec<I> {
    items.iter().map(id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_returns_single_item() {
        assert_eq!(only("user", vec![5]).unwrap(), 5);
    }

    #[test]
    fn only_rejects_empty() {
        let err = only::<i32>("group", Vec::new()).unwrap_err();
        assert!(matches!(err, GraphError::NotFound { entity: "group" }));
    }

    #[test]
    fn only_rejects_many() {
        let err = only("user", vec![1, 2]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::NotSingular {
                entity: "user",
                count: 2
            }
        ));
    }

    #[test]
    fn ids_maps_in_order() {
        let pairs = [(3, "c"), (1, "a")];
        assert_eq!(ids(&pairs, |p| p.0), vec![3, 1]);
    }
}
