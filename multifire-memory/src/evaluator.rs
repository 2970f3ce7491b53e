//! Query evaluation for the in-memory document store.
//!
//! This module filters, orders, paginates and caps documents the way the hosted document store
//! does: documents missing a filtered or ordered field never match, range filters only compare
//! values of the same type, and results are ordered by the order-by fields followed by the
//! document id.

use bson::{Bson, DateTime, Document};
use std::cmp::Ordering;

use multifire_core::{
    document::QueryDocument,
    error::{FirebaseError, FirebaseResult},
    query::{Query, SortDirection, WhereClause, WhereOp},
};

/// Comparable representation of BSON values.
///
/// Integers keep their exact value and only meet floats as numbers, so `1` and `1.0` compare
/// equal while large `Int64` values stay distinct. NaN sorts before every other number and
/// equals itself.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    /// Fields sorted by key.
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Types the store does not order (binary, object ids, ...).
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Integer(i64::from(*value)),
            Bson::Int64(value) => Comparable::Integer(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => {
                let mut fields = doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>();
                fields.sort_by(|(a, _), (b, _)| a.cmp(b));
                Comparable::Map(fields)
            }
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the cross-type ordering.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Integer(_) | Comparable::Double(_) => 2,
            Comparable::DateTime(_) => 3,
            Comparable::String(_) => 4,
            Comparable::Other(_) => 5,
            Comparable::Array(_) => 6,
            Comparable::Map(_) => 7,
        }
    }

    fn is_nan(&self) -> bool {
        matches!(self, Comparable::Double(value) if value.is_nan())
    }

    /// Total order used for sorting, cursors and equality: by type first, then by value.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Integer(a), Comparable::Integer(b)) => a.cmp(b),
            (Comparable::Double(a), Comparable::Double(b)) => compare_doubles(*a, *b),
            (Comparable::Integer(a), Comparable::Double(b)) => compare_integer_to_double(*a, *b),
            (Comparable::Double(a), Comparable::Integer(b)) => {
                compare_integer_to_double(*b, *a).reverse()
            }
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    match left.total_cmp(right) {
                        Ordering::Equal => continue,
                        ordering => return ordering,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Comparable::Map(a), Comparable::Map(b)) => {
                for ((left_key, left), (right_key, right)) in a.iter().zip(b.iter()) {
                    match left_key.cmp(right_key).then_with(|| left.total_cmp(right)) {
                        Ordering::Equal => continue,
                        ordering => return ordering,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Comparable::Other(a), Comparable::Other(b)) if a == b => Ordering::Equal,
            (Comparable::Other(a), Comparable::Other(b)) => (a.element_type() as u8)
                .cmp(&(b.element_type() as u8))
                .then_with(|| format!("{a:?}").cmp(&format!("{b:?}"))),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Ordering used by range filters: values of different types, and NaN, never compare.
    pub(crate) fn range_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.type_rank() != other.type_rank() || self.is_nan() || other.is_nan() {
            return None;
        }

        Some(self.total_cmp(other))
    }
}

/// Orders doubles with NaN first and equal to itself.
fn compare_doubles(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Compares an integer with a double without rounding the integer.
fn compare_integer_to_double(integer: i64, double: f64) -> Ordering {
    if double.is_nan() {
        return Ordering::Greater;
    }
    // 2^63 is exactly representable; anything at or beyond it is out of i64 range
    if double >= 9_223_372_036_854_775_808.0 {
        return Ordering::Less;
    }
    if double < -9_223_372_036_854_775_808.0 {
        return Ordering::Greater;
    }

    let whole = double.trunc();
    match integer.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(double - whole)).unwrap_or(Ordering::Equal),
        ordering => ordering,
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

/// Resolves a dotted field path (`"address.city"`) inside a document.
pub(crate) fn lookup<'a>(data: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Evaluates one query against the documents of its collection.
pub(crate) struct QueryEvaluator<'q> {
    query: &'q Query,
}

impl<'q> QueryEvaluator<'q> {
    pub fn new(query: &'q Query) -> Self {
        Self { query }
    }

    /// Rejects queries the hosted store would refuse.
    pub fn validate(&self) -> FirebaseResult<()> {
        if self.query.limit == Some(0) {
            return Err(FirebaseError::InvalidArgument(
                "limit must be a positive number".into(),
            ));
        }

        for clause in &self.query.filters {
            if clause.field.is_empty() {
                return Err(FirebaseError::InvalidArgument("empty field path in filter".into()));
            }

            if clause.op.takes_list() {
                match &clause.value {
                    Bson::Array(values) if !values.is_empty() => {}
                    _ => {
                        return Err(FirebaseError::InvalidArgument(format!(
                            "'{}' filters require a non-empty array value",
                            clause.op
                        )));
                    }
                }
            }
        }

        // cursor values cover the order-by fields plus the implicit document id
        let max_values = self.query.order_by.len() + 1;
        let cursors = &self.query.cursors;
        for values in [
            &cursors.start_at,
            &cursors.start_after,
            &cursors.end_at,
            &cursors.end_before,
        ]
        .into_iter()
        .flatten()
        {
            if values.len() > max_values {
                return Err(FirebaseError::InvalidArgument(format!(
                    "cursor has {} values but the query orders by {} field(s)",
                    values.len(),
                    self.query.order_by.len()
                )));
            }
        }

        Ok(())
    }

    /// Applies filters, ordering, cursors and limit, in that order.
    pub fn execute<'d>(
        &self,
        documents: impl IntoIterator<Item = (&'d String, &'d Document)>,
    ) -> FirebaseResult<Vec<QueryDocument>> {
        self.validate()?;

        let mut matching = documents
            .into_iter()
            .filter(|(_, data)| self.matches(data))
            .collect::<Vec<_>>();

        matching.sort_by(|(a_id, a), (b_id, b)| self.compare_documents(a_id, a, b_id, b));

        let cursors = &self.query.cursors;
        Ok(matching
            .into_iter()
            .filter(|(id, data)| {
                let bound = |values: &Vec<Bson>| self.compare_to_cursor(id, data, values);

                cursors.start_at.as_ref().is_none_or(|v| bound(v) != Ordering::Less)
                    && cursors.start_after.as_ref().is_none_or(|v| bound(v) == Ordering::Greater)
                    && cursors.end_at.as_ref().is_none_or(|v| bound(v) != Ordering::Greater)
                    && cursors.end_before.as_ref().is_none_or(|v| bound(v) == Ordering::Less)
            })
            .take(self.query.limit.map_or(usize::MAX, |limit| limit as usize))
            .map(|(id, data)| QueryDocument::new(id.clone(), data.clone()))
            .collect())
    }

    /// Whether a document passes every filter and has every order-by field.
    pub fn matches(&self, data: &Document) -> bool {
        self.query
            .filters
            .iter()
            .all(|clause| Self::matches_clause(data, clause))
            && self
                .query
                .order_by
                .iter()
                .all(|order| lookup(data, &order.field).is_some())
    }

    fn matches_clause(data: &Document, clause: &WhereClause) -> bool {
        let Some(field_value) = lookup(data, &clause.field) else {
            return false;
        };
        let field = Comparable::from(field_value);
        let value = Comparable::from(&clause.value);

        match clause.op {
            WhereOp::Eq => field == value,
            WhereOp::Ne => field != Comparable::Null && field != value,
            WhereOp::Lt | WhereOp::Lte | WhereOp::Gt | WhereOp::Gte => {
                match field.range_cmp(&value) {
                    Some(ordering) => match clause.op {
                        WhereOp::Lt => ordering == Ordering::Less,
                        WhereOp::Lte => ordering != Ordering::Greater,
                        WhereOp::Gt => ordering == Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    },
                    None => false,
                }
            }
            WhereOp::ArrayContains => match field {
                Comparable::Array(items) => items.iter().any(|item| item == &value),
                _ => false,
            },
            WhereOp::ArrayContainsAny => match (field, value) {
                (Comparable::Array(items), Comparable::Array(candidates)) => {
                    candidates.iter().any(|candidate| items.contains(candidate))
                }
                _ => false,
            },
            WhereOp::In => match value {
                Comparable::Array(candidates) => candidates.contains(&field),
                _ => false,
            },
            WhereOp::NotIn => match value {
                Comparable::Array(candidates) => {
                    field != Comparable::Null && !candidates.contains(&field)
                }
                _ => false,
            },
        }
    }

    fn compare_documents(&self, a_id: &str, a: &Document, b_id: &str, b: &Document) -> Ordering {
        for order in &self.query.order_by {
            let left = lookup(a, &order.field).map_or(Comparable::Null, Comparable::from);
            let right = lookup(b, &order.field).map_or(Comparable::Null, Comparable::from);

            let ordering = match order.direction {
                SortDirection::Asc => left.total_cmp(&right),
                SortDirection::Desc => right.total_cmp(&left),
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        a_id.cmp(b_id)
    }

    /// Orders a document against cursor values, honoring each field's direction.
    fn compare_to_cursor(&self, id: &str, data: &Document, values: &[Bson]) -> Ordering {
        for (position, cursor_value) in values.iter().enumerate() {
            let ordering = match self.query.order_by.get(position) {
                Some(order) => {
                    let field =
                        lookup(data, &order.field).map_or(Comparable::Null, Comparable::from);
                    let ordering = field.total_cmp(&Comparable::from(cursor_value));

                    match order.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                }
                None => Comparable::String(id).total_cmp(&Comparable::from(cursor_value)),
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }
}
