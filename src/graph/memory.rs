//! In-process implementation of the [`GraphProvider`] contract.
//!
//! Holds every entity in ordered maps behind a `RefCell`. Membership is a
//! single set of `(group, user)` pairs, read in both directions. Used by
//! tests and by `--in-memory` runs.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GraphError, Result};
use crate::graph::predicate::{CarField, CarFilter, GroupField, GroupFilter, UserField, UserFilter};
use crate::provider::GraphProvider;
use crate::types::{
    Car, CarId, GraphStats, Group, GroupId, NewCar, NewGroup, NewUser, User, UserId,
};

#[derive(Debug, Default)]
struct State {
    schema_ready: bool,
    next_id: i64,
    users: BTreeMap<UserId, User>,
    cars: BTreeMap<CarId, Car>,
    groups: BTreeMap<GroupId, Group>,
    memberships: BTreeSet<(GroupId, UserId)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has_cars(&self, user: UserId) -> bool {
        self.cars.values().any(|c| c.owner == user)
    }

    fn has_groups(&self, user: UserId) -> bool {
        self.memberships.iter().any(|(_, u)| *u == user)
    }

    fn has_users(&self, group: GroupId) -> bool {
        self.memberships.iter().any(|(g, _)| *g == group)
    }

    fn user_matches(&self, user: &User, filter: &UserFilter) -> bool {
        filter.matches(&|field: &UserField| match field {
            UserField::NameEq(name) => user.name == *name,
            UserField::AgeEq(age) => user.age == *age,
            UserField::HasCars => self.has_cars(user.id),
            UserField::HasGroups => self.has_groups(user.id),
        })
    }

    fn car_matches(&self, car: &Car, filter: &CarFilter) -> bool {
        filter.matches(&|field: &CarField| match field {
            CarField::ModelEq(model) => car.model == *model,
            CarField::HasOwner => self.users.contains_key(&car.owner),
        })
    }

    fn group_matches(&self, group: &Group, filter: &GroupFilter) -> bool {
        filter.matches(&|field: &GroupField| match field {
            GroupField::NameEq(name) => group.name == *name,
            GroupField::HasUsers => self.has_users(group.id),
        })
    }
}

/// A graph provider that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<()> {
        if self.state.borrow().schema_ready {
            Ok(())
        } else {
            Err(GraphError::SchemaNotReady)
        }
    }
}

impl GraphProvider for MemoryStore {
    fn ensure_schema(&self) -> Result<()> {
        self.state.borrow_mut().schema_ready = true;
        Ok(())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }

    fn create_user(&self, user: &NewUser) -> Result<User> {
        self.ready()?;
        let mut state = self.state.borrow_mut();
        let created = User {
            id: UserId(state.next_id()),
            name: user.name.clone(),
            age: user.age,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    fn create_car(&self, car: &NewCar) -> Result<Car> {
        self.ready()?;
        let mut state = self.state.borrow_mut();
        if !state.users.contains_key(&car.owner) {
            return Err(GraphError::Constraint {
                entity: "car",
                reason: format!("owner {} does not exist", car.owner),
            });
        }
        let created = Car {
            id: CarId(state.next_id()),
            model: car.model.clone(),
            registered_at: car.registered_at,
            owner: car.owner,
        };
        state.cars.insert(created.id, created.clone());
        Ok(created)
    }

    fn create_group(&self, group: &NewGroup) -> Result<Group> {
        self.ready()?;
        let mut state = self.state.borrow_mut();
        if let Some(missing) = group.members.iter().find(|m| !state.users.contains_key(*m)) {
            return Err(GraphError::Constraint {
                entity: "group",
                reason: format!("member {missing} does not exist"),
            });
        }
        let created = Group {
            id: GroupId(state.next_id()),
            name: group.name.clone(),
        };
        state.groups.insert(created.id, created.clone());
        for member in &group.members {
            state.memberships.insert((created.id, *member));
        }
        Ok(created)
    }

    fn query_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.ready()?;
        let state = self.state.borrow();
        Ok(state
            .users
            .values()
            .filter(|u| state.user_matches(u, filter))
            .cloned()
            .collect())
    }

    fn query_cars(&self, filter: &CarFilter) -> Result<Vec<Car>> {
        self.ready()?;
        let state = self.state.borrow();
        Ok(state
            .cars
            .values()
            .filter(|c| state.car_matches(c, filter))
            .cloned()
            .collect())
    }

    fn query_groups(&self, filter: &GroupFilter) -> Result<Vec<Group>> {
        self.ready()?;
        let state = self.state.borrow();
        Ok(state
            .groups
            .values()
            .filter(|g| state.group_matches(g, filter))
            .cloned()
            .collect())
    }

    fn cars_of_users(&self, users: &[UserId], filter: &CarFilter) -> Result<Vec<Car>> {
        self.ready()?;
        let state = self.state.borrow();
        Ok(state
            .cars
            .values()
            .filter(|c| users.contains(&c.owner) && state.car_matches(c, filter))
            .cloned()
            .collect())
    }

    fn groups_of_users(&self, users: &[UserId], filter: &GroupFilter) -> Result<Vec<Group>> {
        self.ready()?;
        let state = self.state.borrow();
        let ids: BTreeSet<GroupId> = state
            .memberships
            .iter()
            .filter(|(_, u)| users.contains(u))
            .map(|(g, _)| *g)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| state.groups.get(id))
            .filter(|g| state.group_matches(g, filter))
            .cloned()
            .collect())
    }

    fn users_of_groups(&self, groups: &[GroupId], filter: &UserFilter) -> Result<Vec<User>> {
        self.ready()?;
        let state = self.state.borrow();
        let ids: BTreeSet<UserId> = state
            .memberships
            .iter()
            .filter(|(g, _)| groups.contains(g))
            .map(|(_, u)| *u)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .filter(|u| state.user_matches(u, filter))
            .cloned()
            .collect())
    }

    fn owner_of_car(&self, car: CarId) -> Result<User> {
        self.ready()?;
        let state = self.state.borrow();
        state
            .cars
            .get(&car)
            .and_then(|c| state.users.get(&c.owner))
            .cloned()
            .ok_or(GraphError::NotFound { entity: "car" })
    }

    fn stats(&self) -> Result<GraphStats> {
        let state = self.state.borrow();
        Ok(GraphStats {
            users: state.users.len(),
            cars: state.cars.len(),
            groups: state.groups.len(),
            memberships: state.memberships.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::predicate::{car, group, user, Filter};

    fn setup() -> MemoryStore {
        let store = MemoryStore::new();
        store.ensure_schema().unwrap();
        store
    }

    #[test]
    fn writes_before_schema_are_rejected() {
        let store = MemoryStore::new();
        let err = store.create_user(&NewUser::new("Ariel", 30)).unwrap_err();
        assert!(matches!(err, GraphError::SchemaNotReady));
        assert!(err.is_fatal());
        assert!(matches!(
            store.query_users(&Filter::all()),
            Err(GraphError::SchemaNotReady)
        ));
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
        assert!(store.create_user(&NewUser::new("Ariel", 30)).is_ok());
    }

    #[test]
    fn ids_are_unique_across_entity_kinds() {
        let store = setup();
        let a = store.create_user(&NewUser::new("Ariel", 30)).unwrap();
        let c = store.create_car(&NewCar::new("Tesla", a.id)).unwrap();
        let g = store.create_group(&NewGroup::new("GitHub")).unwrap();
        assert_eq!((a.id.0, c.id.0, g.id.0), (1, 2, 3));
    }

    #[test]
    fn car_owner_must_exist() {
        let store = setup();
        let err = store.create_car(&NewCar::new("Tesla", UserId(7))).unwrap_err();
        assert!(matches!(err, GraphError::Constraint { entity: "car", .. }));
    }

    #[test]
    fn group_members_must_exist() {
        let store = setup();
        let mut new_group = NewGroup::new("GitHub");
        new_group.members.push(UserId(3));
        assert!(store.create_group(&new_group).is_err());
        assert_eq!(store.stats().unwrap().groups, 0);
    }

    #[test]
    fn traversals_follow_memberships_both_ways() {
        let store = setup();
        let a = store.create_user(&NewUser::new("Ariel", 30)).unwrap();
        let n = store.create_user(&NewUser::new("Neta", 28)).unwrap();
        let gitlab = store
            .create_group(&NewGroup::new("GitLab").add_users(&[&n, &a]))
            .unwrap();
        let github = store
            .create_group(&NewGroup::new("GitHub").add_users(&[&a]))
            .unwrap();

        assert_eq!(
            store.groups_of_users(&[a.id], &Filter::all()).unwrap(),
            vec![gitlab.clone(), github.clone()]
        );
        assert_eq!(
            store
                .users_of_groups(&[gitlab.id, github.id], &Filter::all())
                .unwrap(),
            vec![a.clone(), n.clone()]
        );
        assert_eq!(
            store
                .groups_of_users(&[n.id], &group::name_eq("GitHub"))
                .unwrap(),
            Vec::<Group>::new()
        );
        assert_eq!(
            store.users_of_groups(&[github.id], &user::age_eq(30)).unwrap(),
            vec![a]
        );
    }

    #[test]
    fn cars_of_users_and_owner() {
        let store = setup();
        let a = store.create_user(&NewUser::new("Ariel", 30)).unwrap();
        let n = store.create_user(&NewUser::new("Neta", 28)).unwrap();
        let tesla = store.create_car(&NewCar::new("Tesla", a.id)).unwrap();
        store.create_car(&NewCar::new("Mazda", a.id)).unwrap();
        let ford = store.create_car(&NewCar::new("Ford", n.id)).unwrap();

        let cars = store
            .cars_of_users(&[a.id, n.id], &Filter::not(car::model_eq("Mazda")))
            .unwrap();
        assert_eq!(cars, vec![tesla.clone(), ford]);
        assert_eq!(store.owner_of_car(tesla.id).unwrap(), a);
        assert!(store.owner_of_car(CarId(100)).is_err());
    }

    #[test]
    fn has_filters() {
        let store = setup();
        let a = store.create_user(&NewUser::new("Ariel", 30)).unwrap();
        let n = store.create_user(&NewUser::new("Neta", 28)).unwrap();
        store.create_car(&NewCar::new("Tesla", a.id)).unwrap();
        let github = store
            .create_group(&NewGroup::new("GitHub").add_users(&[&a]))
            .unwrap();
        store.create_group(&NewGroup::new("GroupWithoutUsers")).unwrap();

        assert_eq!(store.query_users(&user::has_cars()).unwrap(), vec![a.clone()]);
        assert_eq!(
            store.query_users(&Filter::not(user::has_groups())).unwrap(),
            vec![n]
        );
        assert_eq!(store.query_groups(&group::has_users()).unwrap(), vec![github]);
        assert_eq!(store.query_cars(&car::has_owner()).unwrap().len(), 1);
    }
}
