//! Request-level facade over the storage and query layers.

use bson::{Bson, Document as BsonDocument};
use std::sync::Arc;

use crate::Database;
use crate::collection::Collection;
use crate::document::Document;
use crate::errors::ApiError;
use crate::model::{TOURS_COLLECTION, Tour, USERS_COLLECTION, User};
use crate::query::{ApiFeatures, FindQuery, QueryBuilder, QueryParams};
use crate::types::DocumentId;

/// Lists tours matching the request parameters.
///
/// Runs the full translation chain over the storage builder, with the
/// secret-tour guard applied ahead of any caller predicates.
///
/// # Errors
/// Returns `ApiError::InvalidQuery` for malformed parameters and
/// `ApiError::NoSuchCollection` when nothing was ever stored.
pub fn list_tours(db: &Database, params: QueryParams) -> Result<Vec<BsonDocument>, ApiError> {
    let col = tours(db)?;
    let builder = FindQuery::new().filter(Tour::visibility_filter());
    let query = ApiFeatures::new(builder, params).apply()?;
    Ok(query.run(&col).to_vec().into_iter().map(|d| d.data).collect())
}

/// The "top five tours" alias: preset parameters, then the normal listing.
///
/// # Errors
/// Same conditions as `list_tours`.
pub fn top_tours(db: &Database, mut params: QueryParams) -> Result<Vec<BsonDocument>, ApiError> {
    Tour::top_rated_preset(&mut params);
    list_tours(db, params)
}

/// Creates a tour from a JSON payload, validating before the write.
///
/// # Errors
/// Returns `ApiError::Json` for malformed payloads and `ApiError::Validation`
/// for rule violations.
pub fn create_tour(db: &Database, payload: &str) -> Result<DocumentId, ApiError> {
    let tour: Tour = serde_json::from_str(payload)?;
    let doc = tour.into_document();
    Tour::validate(&doc)?;
    let col = db.create_collection(TOURS_COLLECTION);
    let id = col.insert_document(Document::new(doc));
    log::info!("created tour {id}");
    Ok(id)
}

/// Fetches one tour by id; secret tours read as absent.
///
/// # Errors
/// Returns `ApiError::NoSuchDocument` when the id does not resolve.
pub fn get_tour(db: &Database, id: &str) -> Result<BsonDocument, ApiError> {
    let col = tours(db)?;
    let id = DocumentId::parse_str(id)?;
    fetch_tour(&col, &id).map(|d| d.data)
}

/// Merges a partial JSON object payload into a tour, re-validating the result.
///
/// # Errors
/// Returns `ApiError::NoSuchDocument`, `ApiError::Json`, or
/// `ApiError::Validation` under the corresponding failures.
pub fn update_tour(db: &Database, id: &str, payload: &str) -> Result<BsonDocument, ApiError> {
    let col = tours(db)?;
    let id = DocumentId::parse_str(id)?;
    let mut doc = fetch_tour(&col, &id)?;
    let value: serde_json::Value = serde_json::from_str(payload)?;
    let serde_json::Value::Object(fields) = value else {
        return Err(ApiError::Validation("update payload must be a JSON object".to_string()));
    };
    for (k, v) in fields {
        doc.data.insert(k, json_to_bson(v));
    }
    Tour::validate(&doc.data)?;
    if !col.update_document(&id, doc.data) {
        return Err(ApiError::NoSuchDocument(id.to_string()));
    }
    col.find_document(&id).map(|d| d.data).ok_or_else(|| ApiError::NoSuchDocument(id.to_string()))
}

/// Deletes one tour by id; secret tours read as absent.
///
/// # Errors
/// Returns `ApiError::NoSuchDocument` when the id does not resolve.
pub fn delete_tour(db: &Database, id: &str) -> Result<(), ApiError> {
    let col = tours(db)?;
    let id = DocumentId::parse_str(id)?;
    fetch_tour(&col, &id)?;
    if !col.delete_document(&id) {
        return Err(ApiError::NoSuchDocument(id.to_string()));
    }
    log::info!("deleted tour {id}");
    Ok(())
}

/// Lists users matching the request parameters; deactivated accounts stay
/// hidden.
///
/// # Errors
/// Same conditions as `list_tours`.
pub fn list_users(db: &Database, params: QueryParams) -> Result<Vec<BsonDocument>, ApiError> {
    let col = db
        .get_collection(USERS_COLLECTION)
        .ok_or_else(|| ApiError::NoSuchCollection(USERS_COLLECTION.to_string()))?;
    let builder = FindQuery::new().filter(User::visibility_filter());
    let query = ApiFeatures::new(builder, params).apply()?;
    Ok(query.run(&col).to_vec().into_iter().map(|d| d.data).collect())
}

/// Creates an account, hashing the password before the write.
///
/// # Errors
/// Returns `ApiError::Validation` or `ApiError::Crypto` from account
/// construction.
pub fn create_user(
    db: &Database,
    name: &str,
    email: &str,
    password: &str,
    password_confirm: &str,
) -> Result<DocumentId, ApiError> {
    let user = User::new(name, email, password, password_confirm)?;
    let col = db.create_collection(USERS_COLLECTION);
    Ok(col.insert_document(Document::new(user.into_document())))
}

fn tours(db: &Database) -> Result<Arc<Collection>, ApiError> {
    db.get_collection(TOURS_COLLECTION)
        .ok_or_else(|| ApiError::NoSuchCollection(TOURS_COLLECTION.to_string()))
}

fn fetch_tour(col: &Collection, id: &DocumentId) -> Result<Document, ApiError> {
    let doc =
        col.find_document(id).ok_or_else(|| ApiError::NoSuchDocument(id.to_string()))?;
    if matches!(doc.data.get("secret_tour"), Some(Bson::Boolean(true))) {
        return Err(ApiError::NoSuchDocument(id.to_string()));
    }
    Ok(doc)
}

/// Recursive JSON-to-BSON conversion for untyped update payloads.
fn json_to_bson(value: serde_json::Value) -> Bson {
    use serde_json::Value;
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(fields) => {
            let mut doc = BsonDocument::new();
            for (k, v) in fields {
                doc.insert(k, json_to_bson(v));
            }
            Bson::Document(doc)
        }
    }
}
