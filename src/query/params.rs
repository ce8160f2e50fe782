use bson::{Bson, Document as BsonDocument};

use crate::errors::ApiError;

use super::types::{CmpOp, Filter, MAX_IN_SET};

/// Control parameters consumed by the translator itself, never filter predicates.
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Comparison tokens recognized in nested predicate keys.
const CMP_TOKENS: [&str; 4] = ["gte", "gt", "lte", "lt"];

/// Marker prefixing escaped operator keys in predicate documents.
const OPERATOR_MARKER: char = '$';

/// A single query-string value; repeated parameters collapse into `Many`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

/// A flat query-parameter mapping as produced by HTTP query-string parsing.
///
/// Entries keep their arrival order so predicate documents come out
/// deterministic. Keys are expected to be percent-decoded already; decoding
/// belongs to the web layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, ParamValue)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from decoded key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.push(k.into(), v.into());
        }
        params
    }

    /// Appends a value, collapsing repeated keys into `Many`.
    pub fn push(&mut self, key: String, value: String) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            match existing {
                ParamValue::Single(prev) => {
                    *existing = ParamValue::Many(vec![std::mem::take(prev), value]);
                }
                ParamValue::Many(vals) => vals.push(value),
            }
            return;
        }
        self.entries.push((key, ParamValue::Single(value)));
    }

    /// Replaces any existing value for `key`. Used by request presets.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            *existing = ParamValue::Single(value.to_string());
            return;
        }
        self.entries.push((key.to_string(), ParamValue::Single(value.to_string())));
    }

    /// Returns the value for `key` when it was supplied exactly once.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).and_then(|(_, v)| match v {
            ParamValue::Single(s) => Some(s.as_str()),
            ParamValue::Many(_) => None,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the escaped predicate document from the non-reserved entries.
    ///
    /// Bracketed keys nest (`price[gte]=100` becomes `{price: {$gte: 100}}`)
    /// and comparison tokens are rewritten key by key, at nested depth only,
    /// never inside values.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidQuery` for malformed bracket syntax or when
    /// one field is given conflicting shapes.
    pub fn predicate_document(&self) -> Result<BsonDocument, ApiError> {
        let mut root = BsonDocument::new();
        for (key, value) in &self.entries {
            let segments = parse_bracket_key(key)?;
            if RESERVED_KEYS.contains(&segments[0].as_str()) {
                continue;
            }
            insert_predicate(&mut root, &segments, value)?;
        }
        Ok(root)
    }

    /// Translates the predicate document into a storage filter.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidQuery` when the predicate mapping is malformed.
    pub fn filter(&self) -> Result<Filter, ApiError> {
        let doc = self.predicate_document()?;
        predicates_to_filter(&doc)
    }
}

/// Converts an escaped predicate document into a conjunction filter.
pub(crate) fn predicates_to_filter(doc: &BsonDocument) -> Result<Filter, ApiError> {
    let mut clauses = Vec::new();
    for (field, value) in doc {
        push_field_clauses(field, value, &mut clauses)?;
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn push_field_clauses(path: &str, value: &Bson, out: &mut Vec<Filter>) -> Result<(), ApiError> {
    match value {
        Bson::Document(nested) => {
            let escaped = nested.keys().filter(|k| k.starts_with(OPERATOR_MARKER)).count();
            if escaped == 0 {
                // Plain nested mapping: equality against a dotted path.
                for (k, v) in nested {
                    push_field_clauses(&format!("{path}.{k}"), v, out)?;
                }
                return Ok(());
            }
            if escaped != nested.len() {
                return Err(ApiError::InvalidQuery(format!(
                    "cannot mix operator and equality forms for `{path}`"
                )));
            }
            for (k, v) in nested {
                let op = match k.as_str() {
                    "$gt" => CmpOp::Gt,
                    "$gte" => CmpOp::Gte,
                    "$lt" => CmpOp::Lt,
                    "$lte" => CmpOp::Lte,
                    _ => {
                        return Err(ApiError::InvalidQuery(format!(
                            "unsupported operator `{k}` for `{path}`"
                        )));
                    }
                };
                if matches!(v, Bson::Document(_) | Bson::Array(_)) {
                    return Err(ApiError::InvalidQuery(format!(
                        "operator `{k}` for `{path}` requires a scalar value"
                    )));
                }
                out.push(Filter::Cmp { path: path.to_string(), op, value: v.clone() });
            }
        }
        Bson::Array(values) => out.push(Filter::In {
            path: path.to_string(),
            values: values.iter().take(MAX_IN_SET).cloned().collect(),
        }),
        scalar => out.push(Filter::Cmp {
            path: path.to_string(),
            op: CmpOp::Eq,
            value: scalar.clone(),
        }),
    }
    Ok(())
}

/// Splits `price[gte]` into its path segments, validating the bracket syntax.
fn parse_bracket_key(key: &str) -> Result<Vec<String>, ApiError> {
    let malformed = || ApiError::InvalidQuery(format!("malformed parameter name `{key}`"));
    let mut segments = Vec::new();
    let root_end = key.find('[').unwrap_or(key.len());
    let root = &key[..root_end];
    if root.is_empty() || root.contains(']') {
        return Err(malformed());
    }
    segments.push(root.to_string());
    let mut rest = &key[root_end..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(malformed());
        }
        let Some(close) = rest.find(']') else {
            return Err(malformed());
        };
        let segment = &rest[1..close];
        if segment.is_empty() || segment.contains('[') {
            return Err(malformed());
        }
        segments.push(segment.to_string());
        rest = &rest[close + 1..];
    }
    Ok(segments)
}

fn insert_predicate(
    root: &mut BsonDocument,
    segments: &[String],
    value: &ParamValue,
) -> Result<(), ApiError> {
    let conflict =
        || ApiError::InvalidQuery(format!("conflicting filter shapes for `{}`", segments[0]));
    let mut cur = root;
    for (depth, segment) in segments.iter().enumerate().take(segments.len() - 1) {
        let key = if depth == 0 { segment.clone() } else { escape_token(segment) };
        if cur.get(&key).is_none() {
            cur.insert(key.clone(), Bson::Document(BsonDocument::new()));
        }
        match cur.get_mut(&key) {
            Some(Bson::Document(nested)) => cur = nested,
            _ => return Err(conflict()),
        }
    }
    let leaf = match segments {
        [only] => only.clone(),
        [.., last] => escape_token(last),
        [] => return Err(conflict()),
    };
    if cur.get(&leaf).is_some() {
        return Err(conflict());
    }
    cur.insert(leaf, param_to_bson(value));
    Ok(())
}

/// Rewrites a nested comparison token to the engine's escaped form.
fn escape_token(segment: &str) -> String {
    if CMP_TOKENS.contains(&segment) {
        format!("{OPERATOR_MARKER}{segment}")
    } else {
        segment.to_string()
    }
}

fn param_to_bson(value: &ParamValue) -> Bson {
    match value {
        ParamValue::Single(s) => parse_scalar(s),
        ParamValue::Many(vals) => Bson::Array(vals.iter().map(|s| parse_scalar(s)).collect()),
    }
}

/// Coerces a raw query-string value into the closest BSON scalar.
fn parse_scalar(raw: &str) -> Bson {
    if let Ok(i) = raw.parse::<i64>() {
        return Bson::Int64(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Bson::Double(f);
    }
    match raw {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        _ => Bson::String(raw.to_string()),
    }
}
