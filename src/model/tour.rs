use bson::{Bson, Document as BsonDocument, doc};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::query::{CmpOp, Filter, QueryParams};

pub const TOURS_COLLECTION: &str = "tours";

const NAME_MIN: usize = 10;
const NAME_MAX: usize = 40;
const RATING_MIN: f64 = 1.0;
const RATING_MAX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Difficult => "difficult",
        }
    }
}

/// A tour as accepted on the write path.
///
/// Engine fields (`_id`, `_rev`, `created_at`) are stamped by the storage
/// layer, never supplied here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub name: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub max_group_size: i64,
    pub difficulty: Difficulty,
    #[serde(default = "default_rating")]
    pub ratings_average: f64,
    #[serde(default)]
    pub ratings_quantity: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub secret_tour: bool,
}

fn default_rating() -> f64 {
    4.5
}

impl Tour {
    /// Validates a tour's stored document form ahead of a write.
    ///
    /// Working on the stored form lets fresh inserts and merged updates go
    /// through the same rules.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` naming the first failing rule.
    pub fn validate(doc: &BsonDocument) -> Result<(), ApiError> {
        let name = match doc.get("name") {
            Some(Bson::String(s)) if !s.trim().is_empty() => s.trim(),
            _ => return Err(ApiError::Validation("a tour must have a name".to_string())),
        };
        let name_len = name.chars().count();
        if !(NAME_MIN..=NAME_MAX).contains(&name_len) {
            return Err(ApiError::Validation(format!(
                "a tour name must have between {NAME_MIN} and {NAME_MAX} characters"
            )));
        }
        require_positive(doc, "duration", "a tour must have a duration")?;
        require_positive(doc, "max_group_size", "a tour must have a group size")?;
        match doc.get("difficulty") {
            Some(Bson::String(s)) if matches!(s.as_str(), "easy" | "medium" | "difficult") => {}
            _ => {
                return Err(ApiError::Validation(
                    "difficulty is either: easy, medium, difficult".to_string(),
                ));
            }
        }
        if let Some(rating) = numeric(doc.get("ratings_average"))
            && !(RATING_MIN..=RATING_MAX).contains(&rating)
        {
            return Err(ApiError::Validation(format!(
                "rating must be between {RATING_MIN} and {RATING_MAX}"
            )));
        }
        let price = require_positive(doc, "price", "a tour must have a price")?;
        if let Some(discount) = numeric(doc.get("price_discount"))
            && discount >= price
        {
            return Err(ApiError::Validation(format!(
                "discount price ({discount}) should be below regular price"
            )));
        }
        require_string(doc, "summary", "a tour must have a summary")?;
        require_string(doc, "image_cover", "a tour must have a cover image")?;
        Ok(())
    }

    /// Converts the tour into its stored document form, deriving the slug.
    #[must_use]
    pub fn into_document(self) -> BsonDocument {
        let slug = slugify(&self.name);
        let start_dates: Vec<Bson> = self
            .start_dates
            .iter()
            .map(|d| Bson::DateTime(bson::DateTime::from_millis(d.timestamp_millis())))
            .collect();
        let mut doc = doc! {
            "name": self.name.trim(),
            "slug": slug,
            "duration": self.duration,
            "max_group_size": self.max_group_size,
            "difficulty": self.difficulty.as_str(),
            "ratings_average": self.ratings_average,
            "ratings_quantity": self.ratings_quantity,
            "price": self.price,
            "summary": self.summary.trim(),
            "image_cover": self.image_cover,
            "images": self.images,
            "start_dates": start_dates,
            "secret_tour": self.secret_tour,
        };
        if let Some(discount) = self.price_discount {
            doc.insert("price_discount", discount);
        }
        if let Some(description) = self.description {
            doc.insert("description", description.trim().to_string());
        }
        doc
    }

    /// Tours flagged secret never leave the storage layer on reads.
    #[must_use]
    pub fn visibility_filter() -> Filter {
        Filter::Not(Box::new(Filter::Cmp {
            path: "secret_tour".to_string(),
            op: CmpOp::Eq,
            value: Bson::Boolean(true),
        }))
    }

    /// Duration in weeks; derived, never stored.
    #[must_use]
    pub fn duration_weeks(&self) -> f64 {
        self.duration / 7.0
    }

    /// Presets the "top five tours" listing: best-rated first, cheapest as
    /// tie-break, trimmed field set.
    pub fn top_rated_preset(params: &mut QueryParams) {
        params.set("limit", "5");
        params.set("sort", "-ratings_average,price");
        params.set("fields", "name,price,ratings_average,summary,difficulty");
    }
}

#[allow(clippy::cast_precision_loss)]
fn numeric(value: Option<&Bson>) -> Option<f64> {
    match value {
        Some(Bson::Int32(i)) => Some(f64::from(*i)),
        Some(Bson::Int64(i)) => Some(*i as f64),
        Some(Bson::Double(f)) => Some(*f),
        _ => None,
    }
}

fn require_positive(doc: &BsonDocument, field: &str, message: &str) -> Result<f64, ApiError> {
    match numeric(doc.get(field)) {
        Some(v) if v > 0.0 => Ok(v),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}

fn require_string(doc: &BsonDocument, field: &str, message: &str) -> Result<(), ApiError> {
    match doc.get(field) {
        Some(Bson::String(s)) if !s.trim().is_empty() => Ok(()),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}

/// Lowercased, hyphen-separated form of a name for URL use.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
