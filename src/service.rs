//! The graph data service: seeds the user/car/group graph and runs the
//! fixed traversal queries against any [`GraphProvider`].

use crate::error::{GraphError, Result};
use crate::graph::predicate::{car, group, user, Filter};
use crate::provider::{ids, only, GraphProvider};
use crate::types::{display_list, Car, GraphStats, Group, NewCar, NewGroup, NewUser};

pub const ARIEL: &str = "Ariel";
pub const NETA: &str = "Neta";
pub const GITHUB: &str = "GitHub";
pub const GITLAB: &str = "GitLab";
pub const EXCLUDED_MODEL: &str = "Mazda";

const CARS_CONTEXT: &str = "failed getting cars";
const GROUPS_CONTEXT: &str = "failed getting groups";

/// Create the seed graph.
///
/// Users first, then their cars, then the groups linking them; each step
/// needs ids from the one before. The first failure stops the sequence and
/// is returned as-is. Whatever was written before it stays written.
pub fn create_graph<P: GraphProvider + ?Sized>(provider: &P) -> Result<()> {
    let ariel = provider.create_user(&NewUser::new(ARIEL, 30))?;
    let neta = provider.create_user(&NewUser::new(NETA, 28))?;

    provider.create_car(&NewCar::new("Tesla", ariel.id))?;
    provider.create_car(&NewCar::new("Mazda", ariel.id))?;
    provider.create_car(&NewCar::new("Ford", neta.id))?;

    provider.create_group(&NewGroup::new(GITLAB).add_users(&[&neta, &ariel]))?;
    provider.create_group(&NewGroup::new(GITHUB).add_users(&[&ariel]))?;

    tracing::info!("the graph was created successfully");
    Ok(())
}

/// Cars of every member of the "GitHub" group.
pub fn query_github_cars<P: GraphProvider + ?Sized>(provider: &P) -> Result<Vec<Car>> {
    github_cars(provider).map_err(|e| e.context(CARS_CONTEXT))
}

fn github_cars<P: GraphProvider + ?Sized>(provider: &P) -> Result<Vec<Car>> {
    let github = only("group", provider.query_groups(&group::name_eq(GITHUB))?)?;
    let members = provider.users_of_groups(&[github.id], &Filter::all())?;
    provider.cars_of_users(&ids(&members, |u| u.id), &Filter::all())
}

/// Cars of everyone who shares a group with Ariel (Ariel included), minus
/// any Mazda.
pub fn query_ariel_cars_excluding_mazda<P: GraphProvider + ?Sized>(
    provider: &P,
) -> Result<Vec<Car>> {
    ariel_cars(provider).map_err(|e| e.context(CARS_CONTEXT))
}

fn ariel_cars<P: GraphProvider + ?Sized>(provider: &P) -> Result<Vec<Car>> {
    let ariel = only(
        "user",
        provider.query_users(&Filter::and([user::has_cars(), user::name_eq(ARIEL)]))?,
    )?;
    let groups = provider.groups_of_users(&[ariel.id], &Filter::all())?;
    let members = provider.users_of_groups(&ids(&groups, |g| g.id), &Filter::all())?;
    provider.cars_of_users(
        &ids(&members, |u| u.id),
        &Filter::not(car::model_eq(EXCLUDED_MODEL)),
    )
}

/// Every group with at least one member.
pub fn query_groups_with_users<P: GraphProvider + ?Sized>(provider: &P) -> Result<Vec<Group>> {
    provider
        .query_groups(&group::has_users())
        .map_err(|e| e.context(GROUPS_CONTEXT))
}

// ---------------------------------------------------------------------------
// Top-level sequence
// ---------------------------------------------------------------------------

/// Outcome of each step of [`run_demo`].
#[derive(Debug)]
pub struct DemoReport {
    pub create_graph: Result<()>,
    pub github_cars: Result<Vec<Car>>,
    pub ariel_cars: Result<Vec<Car>>,
    pub groups_with_users: Result<Vec<Group>>,
    pub stats: Option<GraphStats>,
}

impl DemoReport {
    /// Number of steps that returned an error.
    pub fn failures(&self) -> usize {
        [
            self.create_graph.is_err(),
            self.github_cars.is_err(),
            self.ariel_cars.is_err(),
            self.groups_with_users.is_err(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

/// Seed the graph and run every query in order.
///
/// A failing step is logged and the next one still runs; nothing here is
/// fatal. Opening the provider and ensuring its schema are the caller's job.
pub fn run_demo<P: GraphProvider + ?Sized>(provider: &P) -> DemoReport {
    let create_graph = create_graph(provider);
    log_step("create graph", &create_graph);

    let github_cars = query_github_cars(provider);
    log_results("cars returned", &github_cars);

    let ariel_cars = query_ariel_cars_excluding_mazda(provider);
    log_results("cars returned", &ariel_cars);

    let groups_with_users = query_groups_with_users(provider);
    log_results("groups returned", &groups_with_users);

    let stats = match provider.stats() {
        Ok(stats) => {
            tracing::info!(stats = %stats.to_json(), "graph statistics");
            Some(stats)
        }
        Err(e) => {
            tracing::warn!("could not read graph statistics: {e}");
            None
        }
    };

    DemoReport {
        create_graph,
        github_cars,
        ariel_cars,
        groups_with_users,
        stats,
    }
}

fn log_step(step: &str, result: &Result<()>) {
    if let Err(e) = result {
        tracing::error!(step, "{e}");
    }
}

fn log_results<T: std::fmt::Display>(label: &str, result: &std::result::Result<Vec<T>, GraphError>) {
    match result {
        Ok(items) => tracing::info!(count = items.len(), "{label}: {}", display_list(items)),
        Err(e) => tracing::error!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryStore;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.ensure_schema().unwrap();
        create_graph(&store).unwrap();
        store
    }

    fn models(cars: &[Car]) -> Vec<String> {
        let mut m: Vec<String> = cars.iter().map(|c| c.model.clone()).collect();
        m.sort();
        m
    }

    #[test]
    fn create_graph_writes_every_entity() {
        let store = seeded();
        let stats = store.stats().unwrap();
        assert_eq!(stats.users, 2);
        assert_eq!(stats.cars, 3);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.memberships, 3);
    }

    #[test]
    fn github_cars_are_ariels() {
        let store = seeded();
        assert_eq!(models(&query_github_cars(&store).unwrap()), vec!["Mazda", "Tesla"]);
    }

    #[test]
    fn ariel_query_excludes_mazda() {
        let store = seeded();
        assert_eq!(
            models(&query_ariel_cars_excluding_mazda(&store).unwrap()),
            vec!["Ford", "Tesla"]
        );
    }

    #[test]
    fn groups_with_users_lists_both_groups() {
        let store = seeded();
        let mut names: Vec<String> = query_groups_with_users(&store)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["GitHub", "GitLab"]);
    }

    #[test]
    fn github_query_on_empty_graph_is_wrapped_not_found() {
        let store = MemoryStore::new();
        store.ensure_schema().unwrap();
        let err = query_github_cars(&store).unwrap_err();
        assert_eq!(err.to_string(), "failed getting cars: group not found");
    }

    #[test]
    fn duplicate_github_group_is_not_singular() {
        let store = seeded();
        store.create_group(&NewGroup::new(GITHUB)).unwrap();
        let err = query_github_cars(&store).unwrap_err();
        assert!(err.to_string().contains("not singular"));
    }

    #[test]
    fn second_seed_makes_ariel_ambiguous() {
        let store = seeded();
        create_graph(&store).unwrap();
        let err = query_ariel_cars_excluding_mazda(&store).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Query { ref source, .. }
                if matches!(**source, GraphError::NotSingular { entity: "user", count: 2 })
        ));
    }

    #[test]
    fn run_demo_on_fresh_store_succeeds() {
        let store = MemoryStore::new();
        store.ensure_schema().unwrap();
        let report = run_demo(&store);
        assert_eq!(report.failures(), 0);
        assert_eq!(report.stats.unwrap().cars, 3);
    }
}
