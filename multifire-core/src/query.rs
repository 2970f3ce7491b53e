//! Query construction for collection reads and collection listeners.
//!
//! A [`Query`] targets one collection and is composed, in this order, of where-clauses,
//! order-by clauses, pagination cursors and a result cap. Clauses keep the order the caller
//! supplied them in; nothing is reordered or deduplicated on the way to the backend.
//!
//! # Query Building
//!
//! ```ignore
//! use multifire::query::{Filter, Query, SortDirection};
//!
//! let query = Query::builder("users")
//!     .filter(Filter::eq("status", "active"))
//!     .filter(Filter::gt("age", 18))
//!     .order_by("age", SortDirection::Desc)
//!     .start_after(vec![40.into()])
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides one constructor per backend operator:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Array: `array_contains`, `array_contains_any`
//! - Membership: `is_in`, `not_in`

use bson::Bson;
use std::{fmt, str::FromStr};

use crate::error::FirebaseError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = FirebaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(FirebaseError::InvalidArgument(format!(
                "unknown sort direction {other:?}"
            ))),
        }
    }
}

/// Sort key of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Operators accepted in a where-clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOp {
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `array-contains`: the array field holds the value.
    ArrayContains,
    /// `array-contains-any`: the array field holds at least one of the listed values.
    ArrayContainsAny,
    /// `in`: the field equals one of the listed values.
    In,
    /// `not-in`: the field equals none of the listed values.
    NotIn,
}

impl WhereOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhereOp::Lt => "<",
            WhereOp::Lte => "<=",
            WhereOp::Eq => "==",
            WhereOp::Ne => "!=",
            WhereOp::Gt => ">",
            WhereOp::Gte => ">=",
            WhereOp::ArrayContains => "array-contains",
            WhereOp::ArrayContainsAny => "array-contains-any",
            WhereOp::In => "in",
            WhereOp::NotIn => "not-in",
        }
    }

    /// Whether the operator expects a list of values.
    pub fn takes_list(&self) -> bool {
        matches!(self, WhereOp::ArrayContainsAny | WhereOp::In | WhereOp::NotIn)
    }
}

impl fmt::Display for WhereOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WhereOp {
    type Err = FirebaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "<" => WhereOp::Lt,
            "<=" => WhereOp::Lte,
            "==" => WhereOp::Eq,
            "!=" => WhereOp::Ne,
            ">" => WhereOp::Gt,
            ">=" => WhereOp::Gte,
            "array-contains" => WhereOp::ArrayContains,
            "array-contains-any" => WhereOp::ArrayContainsAny,
            "in" => WhereOp::In,
            "not-in" => WhereOp::NotIn,
            other => {
                return Err(FirebaseError::InvalidArgument(format!(
                    "unknown where operator {other:?}"
                )));
            }
        })
    }
}

/// A single `(field, operator, value)` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub field: String,
    pub op: WhereOp,
    pub value: Bson,
}

impl WhereClause {
    pub fn new(field: impl Into<String>, op: WhereOp, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// Helper struct for constructing where-clauses.
///
/// ```ignore
/// use multifire::query::Filter;
///
/// let adults = Filter::gte("age", 18);
/// let roles = Filter::is_in("role", vec!["admin", "owner"]);
/// ```
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::Lte, value)
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::ArrayContains, value)
    }

    pub fn array_contains_any(field: impl Into<String>, values: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::ArrayContainsAny, values)
    }

    pub fn is_in(field: impl Into<String>, values: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::In, values)
    }

    pub fn not_in(field: impl Into<String>, values: impl Into<Bson>) -> WhereClause {
        WhereClause::new(field, WhereOp::NotIn, values)
    }
}

/// Pagination boundaries, each a list of values matched positionally against the order-by
/// fields of the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursors {
    pub start_at: Option<Vec<Bson>>,
    pub start_after: Option<Vec<Bson>>,
    pub end_at: Option<Vec<Bson>>,
    pub end_before: Option<Vec<Bson>>,
}

impl Cursors {
    pub fn is_empty(&self) -> bool {
        self.start_at.is_none()
            && self.start_after.is_none()
            && self.end_at.is_none()
            && self.end_before.is_none()
    }
}

/// A structured query against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<WhereClause>,
    pub order_by: Vec<OrderBy>,
    pub cursors: Cursors,
    pub limit: Option<u32>,
}

impl Query {
    /// A query returning every document of `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Query {
            collection: collection.into(),
            ..Query::default()
        }
    }

    pub fn builder(collection: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(collection)
    }

    /// The same query with every cursor removed.
    pub fn without_cursors(mut self) -> Self {
        self.cursors = Cursors::default();
        self
    }

    /// The same query with a limit of 0 read as "no limit".
    pub fn without_zero_limit(mut self) -> Self {
        if self.limit == Some(0) {
            self.limit = None;
        }
        self
    }
}

/// Where to read data from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Source {
    /// Let the backend choose (server when reachable, cache otherwise).
    #[default]
    Default,
    /// Server only; fails when the backend is unreachable.
    Server,
    /// Local cache only.
    Cache,
}

/// Options for [`get_query`](crate::firebase::Firebase::get_query).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub source: Source,
}

impl GetOptions {
    pub fn source(source: Source) -> Self {
        Self { source }
    }
}

/// A query bound to an optional project name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub project: Option<String>,
    pub query: Query,
}

impl QuerySpec {
    pub fn new(query: Query) -> Self {
        Self { project: None, query }
    }

    pub fn in_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}

impl From<Query> for QuerySpec {
    fn from(query: Query) -> Self {
        QuerySpec::new(query)
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    project: Option<String>,
    query: Query,
}

impl QueryBuilder {
    pub fn new(collection: impl Into<String>) -> Self {
        QueryBuilder {
            project: None,
            query: Query::new(collection),
        }
    }

    /// Targets a named project instead of the default one.
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Appends a where-clause.
    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.query.filters.push(clause);
        self
    }

    /// Appends a where-clause given as a `(field, "op", value)` triple.
    pub fn where_op(
        self,
        field: impl Into<String>,
        op: &str,
        value: impl Into<Bson>,
    ) -> Result<Self, FirebaseError> {
        let op = op.parse::<WhereOp>()?;
        Ok(self.filter(WhereClause::new(field, op, value)))
    }

    /// Appends a sort key.
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn start_at(mut self, values: Vec<Bson>) -> Self {
        self.query.cursors.start_at = Some(values);
        self
    }

    pub fn start_after(mut self, values: Vec<Bson>) -> Self {
        self.query.cursors.start_after = Some(values);
        self
    }

    pub fn end_at(mut self, values: Vec<Bson>) -> Self {
        self.query.cursors.end_at = Some(values);
        self
    }

    pub fn end_before(mut self, values: Vec<Bson>) -> Self {
        self.query.cursors.end_before = Some(values);
        self
    }

    /// Caps the number of returned documents.
    pub fn limit(mut self, limit: u32) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn build(self) -> QuerySpec {
        QuerySpec {
            project: self.project,
            query: self.query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_clause_order() {
        let spec = Query::builder("users")
            .project("p1")
            .filter(Filter::gt("b", 2))
            .filter(Filter::eq("a", 1))
            .order_by("c", SortDirection::Asc)
            .order_by("a", SortDirection::Desc)
            .limit(5)
            .build();

        assert_eq!(spec.project.as_deref(), Some("p1"));
        assert_eq!(spec.query.collection, "users");
        assert_eq!(
            spec.query.filters,
            vec![Filter::gt("b", 2), Filter::eq("a", 1)]
        );
        assert_eq!(
            spec.query
                .order_by
                .iter()
                .map(|o| o.field.as_str())
                .collect::<Vec<_>>(),
            vec!["c", "a"]
        );
        assert_eq!(spec.query.limit, Some(5));
        assert!(spec.query.cursors.is_empty());
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let query = Query::builder("users").limit(0).build().query;
        assert_eq!(query.without_zero_limit().limit, None);

        let query = Query::builder("users").limit(3).build().query;
        assert_eq!(query.without_zero_limit().limit, Some(3));
    }

    #[test]
    fn later_cursor_of_same_kind_replaces_earlier() {
        let spec = Query::builder("users")
            .start_at(vec![Bson::Int32(1)])
            .start_at(vec![Bson::Int32(2)])
            .end_before(vec![Bson::Int32(9)])
            .build();

        assert_eq!(spec.query.cursors.start_at, Some(vec![Bson::Int32(2)]));
        assert_eq!(spec.query.cursors.end_before, Some(vec![Bson::Int32(9)]));
        assert!(spec.query.without_cursors().cursors.is_empty());
    }

    #[test]
    fn operators_parse_from_their_symbols() {
        for op in [
            WhereOp::Lt,
            WhereOp::Lte,
            WhereOp::Eq,
            WhereOp::Ne,
            WhereOp::Gt,
            WhereOp::Gte,
            WhereOp::ArrayContains,
            WhereOp::ArrayContainsAny,
            WhereOp::In,
            WhereOp::NotIn,
        ] {
            assert_eq!(op.as_str().parse::<WhereOp>().unwrap(), op);
        }

        assert!(matches!(
            "=~".parse::<WhereOp>(),
            Err(FirebaseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn where_op_accepts_string_operators() {
        let spec = Query::builder("users")
            .where_op("age", ">=", 21)
            .unwrap()
            .build();

        assert_eq!(spec.query.filters, vec![Filter::gte("age", 21)]);
        assert!(Query::builder("users").where_op("age", "~", 1).is_err());
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
    }
}
