use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use crate::collection::ID_FIELD;
use crate::document::Document;

use super::types::{
    CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_PROJECTION_FIELDS, Order, Projection, SortSpec,
};

/// Evaluates a filter against one document.
#[must_use]
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::In { path, values } => get_path(doc, path)
            .is_some_and(|v| values.iter().take(MAX_IN_SET).any(|x| bson_equal(v, x))),
        Filter::Cmp { path, op, value } => match (get_path(doc, path), op) {
            (Some(v), CmpOp::Eq) => bson_equal(v, value),
            (Some(v), CmpOp::Gt) => bson_cmp(v, value).is_some_and(|o| o == Ordering::Greater),
            (Some(v), CmpOp::Gte) => bson_cmp(v, value).is_some_and(|o| o != Ordering::Less),
            (Some(v), CmpOp::Lt) => bson_cmp(v, value).is_some_and(|o| o == Ordering::Less),
            (Some(v), CmpOp::Lte) => bson_cmp(v, value).is_some_and(|o| o != Ordering::Greater),
            (None, _) => false,
        },
    }
}

fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut iter = path.split('.');
    let first = iter.next()?;
    // Enforce path depth limit
    let mut depth = 1usize;
    let mut cur: Option<&Bson> = doc.get(first);
    for part in iter {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Some(Bson::Document(nested)) => cur = nested.get(part),
            _ => return None,
        }
    }
    cur
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[allow(clippy::float_cmp)]
fn bson_equal(a: &Bson, b: &Bson) -> bool {
    if let (Some(x), Some(y)) = (to_f64(a), to_f64(b)) {
        return x == y;
    }
    a == b
}

fn bson_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (to_f64(a), to_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn sort_docs(docs: &mut [Document], specs: &[SortSpec]) {
    docs.sort_by(|a, b| compare_docs(&a.data, &b.data, specs));
}

fn compare_docs(a: &BsonDocument, b: &BsonDocument, specs: &[SortSpec]) -> Ordering {
    for spec in specs {
        let av = get_path(a, &spec.field);
        let bv = get_path(b, &spec.field);
        let ord = match (av, bv) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => bson_cmp(x, y).unwrap_or(Ordering::Equal),
        };
        if ord != Ordering::Equal {
            return if spec.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Applies a projection; the identity field always survives an `Include`.
pub(crate) fn project(doc: &BsonDocument, projection: &Projection) -> BsonDocument {
    match projection {
        Projection::Include(fields) => {
            let mut out = BsonDocument::new();
            if let Some(id) = doc.get(ID_FIELD) {
                out.insert(ID_FIELD, id.clone());
            }
            for field in fields.iter().take(MAX_PROJECTION_FIELDS) {
                if field == ID_FIELD {
                    continue;
                }
                if let Some(v) = get_path(doc, field) {
                    out.insert(field.clone(), v.clone());
                }
            }
            out
        }
        Projection::Exclude(fields) => {
            let mut out = doc.clone();
            for field in fields.iter().take(MAX_PROJECTION_FIELDS) {
                out.remove(field.as_str());
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn cross_type_numeric_comparison() {
        let doc = doc! {"price": 100_i64};
        let f = Filter::Cmp { path: "price".to_string(), op: CmpOp::Gte, value: Bson::Int32(100) };
        assert!(eval_filter(&doc, &f));
        let f = Filter::Cmp { path: "price".to_string(), op: CmpOp::Lt, value: Bson::Double(99.5) };
        assert!(!eval_filter(&doc, &f));
    }

    #[test]
    fn missing_path_never_matches_cmp() {
        let doc = doc! {"a": 1};
        let f = Filter::Cmp { path: "b".to_string(), op: CmpOp::Eq, value: Bson::Int32(1) };
        assert!(!eval_filter(&doc, &f));
        // The negation therefore matches, which is what read guards rely on.
        assert!(eval_filter(&doc, &Filter::Not(Box::new(f))));
    }

    #[test]
    fn dotted_paths_descend_nested_documents() {
        let doc = doc! {"stats": {"price": 7}};
        let f = Filter::Cmp {
            path: "stats.price".to_string(),
            op: CmpOp::Gt,
            value: Bson::Int32(5),
        };
        assert!(eval_filter(&doc, &f));
    }

    #[test]
    fn include_projection_keeps_identity() {
        let doc = doc! {"_id": "x", "name": "a", "price": 1};
        let out = project(&doc, &Projection::Include(vec!["name".to_string()]));
        assert_eq!(out, doc! {"_id": "x", "name": "a"});
    }

    #[test]
    fn exclude_projection_drops_named_fields() {
        let doc = doc! {"_id": "x", "name": "a", "_rev": 1_i64};
        let out = project(&doc, &Projection::Exclude(vec!["_rev".to_string()]));
        assert_eq!(out, doc! {"_id": "x", "name": "a"});
    }
}
