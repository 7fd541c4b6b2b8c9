//! Composable filters over users, cars and groups.
//!
//! A [`Filter`] is a tree of field predicates joined by `And`, `Or` and
//! `Not`. The SQLite store renders it into a `WHERE` fragment with
//! positional parameters; the in-memory store evaluates it directly with
//! [`Filter::matches`].
//!
//! Rendered SQL assumes the fixed table aliases used by the store:
//! `u` for `users`, `c` for `cars` and `g` for `groups`.

use rusqlite::types::Value;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A boolean combination of field predicates of type `F`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter<F> {
    Field(F),
    Not(Box<Filter<F>>),
    And(Vec<Filter<F>>),
    Or(Vec<Filter<F>>),
}

impl<F> Filter<F> {
    /// Matches every entity (an empty conjunction).
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn not(inner: Filter<F>) -> Self {
        Filter::Not(Box::new(inner))
    }

    pub fn and(filters: impl IntoIterator<Item = Filter<F>>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter<F>>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Evaluate the tree, deciding each leaf with `leaf`.
    pub fn matches(&self, leaf: &dyn Fn(&F) -> bool) -> bool {
        match self {
            Filter::Field(field) => leaf(field),
            Filter::Not(inner) => !inner.matches(leaf),
            Filter::And(items) => items.iter().all(|f| f.matches(leaf)),
            Filter::Or(items) => items.iter().any(|f| f.matches(leaf)),
        }
    }
}

/// A field predicate that knows how to render itself as SQL.
pub trait SqlField {
    fn render(&self, out: &mut String, params: &mut Vec<Value>);
}

impl<F: SqlField> Filter<F> {
    /// Render as a parenthesised `WHERE` fragment plus its parameters, in
    /// placeholder order.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut out = String::new();
        let mut params = Vec::new();
        self.render(&mut out, &mut params);
        (out, params)
    }

    fn render(&self, out: &mut String, params: &mut Vec<Value>) {
        match self {
            Filter::Field(field) => field.render(out, params),
            Filter::Not(inner) => {
                out.push_str("NOT ");
                inner.render(out, params);
            }
            Filter::And(items) if items.is_empty() => out.push_str("(1)"),
            Filter::Or(items) if items.is_empty() => out.push_str("(0)"),
            Filter::And(items) => render_joined(items, " AND ", out, params),
            Filter::Or(items) => render_joined(items, " OR ", out, params),
        }
    }
}

fn render_joined<F: SqlField>(
    items: &[Filter<F>],
    sep: &str,
    out: &mut String,
    params: &mut Vec<Value>,
) {
    out.push('(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        item.render(out, params);
    }
    out.push(')');
}

// ---------------------------------------------------------------------------
// Field predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserField {
    NameEq(String),
    AgeEq(u32),
    /// Owns at least one car.
    HasCars,
    /// Belongs to at least one group.
    HasGroups,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarField {
    ModelEq(String),
    HasOwner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupField {
    NameEq(String),
    /// Has at least one member.
    HasUsers,
}

pub type UserFilter = Filter<UserField>;
pub type CarFilter = Filter<CarField>;
pub type GroupFilter = Filter<GroupField>;

impl SqlField for UserField {
    fn render(&self, out: &mut String, params: &mut Vec<Value>) {
        match self {
            UserField::NameEq(name) => {
                out.push_str("(u.name = ?)");
                params.push(Value::Text(name.clone()));
            }
            UserField::AgeEq(age) => {
                out.push_str("(u.age = ?)");
                params.push(Value::Integer(i64::from(*age)));
            }
            UserField::HasCars => {
                out.push_str("(EXISTS (SELECT 1 FROM cars hc WHERE hc.owner_id = u.id))")
            }
            UserField::HasGroups => out.push_str(
                "(EXISTS (SELECT 1 FROM group_users hg WHERE hg.user_id = u.id))",
            ),
        }
    }
}

impl SqlField for CarField {
    fn render(&self, out: &mut String, params: &mut Vec<Value>) {
        match self {
            CarField::ModelEq(model) => {
                out.push_str("(c.model = ?)");
                params.push(Value::Text(model.clone()));
            }
            CarField::HasOwner => out.push_str("(c.owner_id IS NOT NULL)"),
        }
    }
}

impl SqlField for GroupField {
    fn render(&self, out: &mut String, params: &mut Vec<Value>) {
        match self {
            GroupField::NameEq(name) => {
                out.push_str("(g.name = ?)");
                params.push(Value::Text(name.clone()));
            }
            GroupField::HasUsers => out.push_str(
                "(EXISTS (SELECT 1 FROM group_users hu WHERE hu.group_id = g.id))",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

pub mod user {
    use super::{Filter, UserField, UserFilter};

    pub fn name_eq(name: impl Into<String>) -> UserFilter {
        Filter::Field(UserField::NameEq(name.into()))
    }

    pub fn age_eq(age: u32) -> UserFilter {
        Filter::Field(UserField::AgeEq(age))
    }

    pub fn has_cars() -> UserFilter {
        Filter::Field(UserField::HasCars)
    }

    pub fn has_groups() -> UserFilter {
        Filter::Field(UserField::HasGroups)
    }
}

pub mod car {
    use super::{CarField, CarFilter, Filter};

    pub fn model_eq(model: impl Into<String>) -> CarFilter {
        Filter::Field(CarField::ModelEq(model.into()))
    }

    pub fn has_owner() -> CarFilter {
        Filter::Field(CarField::HasOwner)
    }
}

pub mod group {
    use super::{Filter, GroupField, GroupFilter};

    pub fn name_eq(name: impl Into<String>) -> GroupFilter {
        Filter::Field(GroupField::NameEq(name.into()))
    }

    pub fn has_users() -> GroupFilter {
        Filter::Field(GroupField::HasUsers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_renders_as_true() {
        let (sql, params) = UserFilter::all().to_sql();
        assert_eq!(sql, "(1)");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_or_renders_as_false() {
        let (sql, _) = CarFilter::or(Vec::new()).to_sql();
        assert_eq!(sql, "(0)");
    }

    #[test]
    fn and_keeps_parameter_order() {
        let filter = Filter::and([user::name_eq("Ariel"), user::has_cars(), user::age_eq(30)]);
        let (sql, params) = filter.to_sql();
        assert_eq!(
            sql,
            "((u.name = ?) AND (EXISTS (SELECT 1 FROM cars hc WHERE hc.owner_id = u.id)) AND (u.age = ?))"
        );
        assert_eq!(
            params,
            vec![Value::Text("Ariel".into()), Value::Integer(30)]
        );
    }

    #[test]
    fn not_wraps_inner_fragment() {
        let (sql, params) = Filter::not(car::model_eq("Mazda")).to_sql();
        assert_eq!(sql, "NOT (c.model = ?)");
        assert_eq!(params, vec![Value::Text("Mazda".into())]);
    }

    #[test]
    fn matches_evaluates_tree() {
        let filter = Filter::or([
            group::name_eq("GitHub"),
            Filter::not(group::has_users()),
        ]);
        let github_with_users = |f: &GroupField| match f {
            GroupField::NameEq(n) => n == "GitHub",
            GroupField::HasUsers => true,
        };
        let gitlab_with_users = |f: &GroupField| match f {
            GroupField::NameEq(n) => n == "GitLab",
            GroupField::HasUsers => true,
        };
        let empty_gitlab = |f: &GroupField| match f {
            GroupField::NameEq(n) => n == "GitLab",
            GroupField::HasUsers => false,
        };
        assert!(filter.matches(&github_with_users));
        assert!(!filter.matches(&gitlab_with_users));
        assert!(filter.matches(&empty_gitlab));
    }

    #[test]
    fn all_matches_everything_and_empty_or_nothing() {
        let leaf = |_: &CarField| false;
        assert!(CarFilter::all().matches(&leaf));
        assert!(!CarFilter::or(Vec::new()).matches(&leaf));
    }
}
