use crate::collection::Collection;
use crate::document::Document;

use super::cursor::Cursor;
use super::eval::{eval_filter, project, sort_docs};
use super::types::{Filter, FindOptions, MAX_LIMIT, MAX_SORT_FIELDS, SortSpec};

/// Runs a configured find against a collection, materializing the results.
#[must_use]
pub fn find_docs(col: &Collection, filter: &Filter, opts: &FindOptions) -> Cursor {
    let mut docs: Vec<Document> =
        col.get_all_documents().into_iter().filter(|d| eval_filter(&d.data, filter)).collect();

    if let Some(specs) = &opts.sort {
        if specs.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec too long: {}", specs.len());
        }
        let limited: Vec<SortSpec> = specs.iter().take(MAX_SORT_FIELDS).cloned().collect();
        sort_docs(&mut docs, &limited);
    }

    let skip = opts.skip.unwrap_or(0);
    let limit = opts.limit.unwrap_or(usize::MAX).min(MAX_LIMIT);
    let end = skip.saturating_add(limit).min(docs.len());
    let mut docs: Vec<Document> =
        if skip >= docs.len() { Vec::new() } else { docs[skip..end].to_vec() };

    if let Some(projection) = &opts.projection {
        for doc in &mut docs {
            doc.data = project(&doc.data, projection);
        }
    }

    log::debug!(
        "find collection={} results={} skip={} limit={}",
        col.name(),
        docs.len(),
        skip,
        limit
    );
    Cursor::new(docs)
}

/// Counts documents matching a filter.
#[must_use]
pub fn count_docs(col: &Collection, filter: &Filter) -> usize {
    col.get_all_documents().iter().filter(|d| eval_filter(&d.data, filter)).count()
}
