use crate::collection::{CREATED_AT_FIELD, REVISION_FIELD};
use crate::errors::ApiError;

use super::builder::QueryBuilder;
use super::params::QueryParams;
use super::types::{Order, Projection, SortSpec};

/// Page used when `page` is absent or unusable.
pub const DEFAULT_PAGE: usize = 1;
/// Page size used when `limit` is absent or unusable.
pub const DEFAULT_LIMIT: usize = 100;

/// Translates an untrusted query-parameter mapping into builder configuration.
///
/// The four stages mutate one builder and are defined for the order
/// filter, sort, field limiting, pagination; later stages assume the
/// narrowing established by earlier ones. `apply` runs them in that order.
#[derive(Debug, Clone)]
pub struct ApiFeatures<B> {
    builder: B,
    params: QueryParams,
}

impl<B: QueryBuilder> ApiFeatures<B> {
    pub fn new(builder: B, params: QueryParams) -> Self {
        Self { builder, params }
    }

    /// Applies the non-reserved parameters as a conjunction of predicates.
    ///
    /// An empty predicate mapping imposes no restriction.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidQuery` when the predicate mapping is malformed.
    pub fn filter(mut self) -> Result<Self, ApiError> {
        let predicate = self.params.filter()?;
        self.builder = self.builder.filter(predicate);
        Ok(self)
    }

    /// Applies the `sort` directive; newest first when absent.
    #[must_use]
    pub fn sort(mut self) -> Self {
        let specs = self.params.get("sort").map(parse_sort).unwrap_or_default();
        let specs = if specs.is_empty() {
            vec![SortSpec { field: CREATED_AT_FIELD.to_string(), order: Order::Desc }]
        } else {
            specs
        };
        self.builder = self.builder.sort(specs);
        self
    }

    /// Applies the `fields` projection; the engine's revision field stays
    /// hidden when no selection is requested.
    #[must_use]
    pub fn limit_fields(mut self) -> Self {
        let projection = match self.params.get("fields").map(parse_fields) {
            Some(fields) if !fields.is_empty() => Projection::Include(fields),
            _ => Projection::Exclude(vec![REVISION_FIELD.to_string()]),
        };
        self.builder = self.builder.select(projection);
        self
    }

    /// Applies `page`/`limit` as a skip/limit window.
    ///
    /// Absent, non-numeric, zero, or negative values fall back to the
    /// defaults, so the computed skip is never negative.
    #[must_use]
    pub fn paginate(mut self) -> Self {
        let page = positive_number(self.params.get("page")).unwrap_or(DEFAULT_PAGE);
        let limit = positive_number(self.params.get("limit")).unwrap_or(DEFAULT_LIMIT);
        let skip = (page - 1).saturating_mul(limit);
        self.builder = self.builder.skip(skip).limit(limit);
        self
    }

    /// Runs all four stages in their defined order and hands back the builder.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidQuery` when the filter stage rejects the
    /// parameter mapping.
    pub fn apply(self) -> Result<B, ApiError> {
        Ok(self.filter()?.sort().limit_fields().paginate().into_builder())
    }

    /// Hands the configured builder back for execution.
    pub fn into_builder(self) -> B {
        self.builder
    }
}

fn parse_sort(raw: &str) -> Vec<SortSpec> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "-")
        .map(|s| match s.strip_prefix('-') {
            Some(field) => SortSpec { field: field.to_string(), order: Order::Desc },
            None => SortSpec { field: s.to_string(), order: Order::Asc },
        })
        .collect()
}

fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn positive_number(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok()).filter(|n| *n > 0)
}
