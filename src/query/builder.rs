use crate::collection::Collection;

use super::cursor::Cursor;
use super::exec;
use super::types::{Filter, FindOptions, Projection, SortSpec};

/// A chainable handle describing an in-progress, not-yet-executed query.
///
/// Implementations accumulate configuration; execution stays with the storage
/// layer. `filter` must compose as a conjunction with previously applied
/// predicates.
pub trait QueryBuilder: Sized {
    #[must_use]
    fn filter(self, predicate: Filter) -> Self;
    #[must_use]
    fn sort(self, fields: Vec<SortSpec>) -> Self;
    #[must_use]
    fn select(self, projection: Projection) -> Self;
    #[must_use]
    fn skip(self, n: usize) -> Self;
    #[must_use]
    fn limit(self, n: usize) -> Self;
}

/// The storage layer's concrete find builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub options: FindOptions,
}

impl FindQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes the configured query against a collection.
    #[must_use]
    pub fn run(&self, col: &Collection) -> Cursor {
        exec::find_docs(col, &self.filter, &self.options)
    }

    /// Counts matching documents, ignoring pagination and projection.
    #[must_use]
    pub fn count(&self, col: &Collection) -> usize {
        exec::count_docs(col, &self.filter)
    }
}

impl QueryBuilder for FindQuery {
    fn filter(mut self, predicate: Filter) -> Self {
        if matches!(predicate, Filter::True) {
            return self;
        }
        self.filter = match self.filter {
            Filter::True => predicate,
            Filter::And(mut clauses) => {
                clauses.push(predicate);
                Filter::And(clauses)
            }
            prev => Filter::And(vec![prev, predicate]),
        };
        self
    }

    fn sort(mut self, fields: Vec<SortSpec>) -> Self {
        self.options.sort = Some(fields);
        self
    }

    fn select(mut self, projection: Projection) -> Self {
        self.options.projection = Some(projection);
        self
    }

    fn skip(mut self, n: usize) -> Self {
        self.options.skip = Some(n);
        self
    }

    fn limit(mut self, n: usize) -> Self {
        self.options.limit = Some(n);
        self
    }
}
