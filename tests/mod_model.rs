use bson::Bson;
use chrono::{Duration, Utc};
use tourlite::errors::ApiError;
use tourlite::model::{Difficulty, Tour, User};
use tourlite::query::eval_filter;

#[test]
fn tour_json_parses_with_defaults() {
    let tour: Tour = serde_json::from_str(
        r#"{
            "name": "The Forest Hiker",
            "duration": 14,
            "max_group_size": 25,
            "difficulty": "medium",
            "price": 397,
            "summary": "Breathtaking hike",
            "image_cover": "cover.jpg"
        }"#,
    )
    .unwrap();
    assert_eq!(tour.difficulty, Difficulty::Medium);
    assert_eq!(tour.ratings_average, 4.5);
    assert_eq!(tour.ratings_quantity, 0);
    assert!(!tour.secret_tour);
    assert_eq!(tour.duration_weeks(), 2.0);
}

#[test]
fn unknown_difficulty_fails_to_parse() {
    let result: Result<Tour, _> = serde_json::from_str(
        r#"{"name": "The Forest Hiker", "difficulty": "impossible"}"#,
    );
    assert!(result.is_err());
}

#[test]
fn stored_form_carries_the_slug() {
    let tour: Tour = serde_json::from_str(
        r#"{
            "name": "The Forest Hiker",
            "duration": 5,
            "max_group_size": 25,
            "difficulty": "easy",
            "price": 397,
            "summary": "Breathtaking hike",
            "image_cover": "cover.jpg"
        }"#,
    )
    .unwrap();
    let doc = tour.into_document();
    assert_eq!(doc.get("slug"), Some(&Bson::String("the-forest-hiker".to_string())));
    assert_eq!(doc.get("difficulty"), Some(&Bson::String("easy".to_string())));
}

#[test]
fn visibility_filters_match_guarded_documents() {
    let secret = bson::doc! {"secret_tour": true};
    let open = bson::doc! {"secret_tour": false};
    let unmarked = bson::doc! {};
    let filter = Tour::visibility_filter();
    assert!(!eval_filter(&secret, &filter));
    assert!(eval_filter(&open, &filter));
    assert!(eval_filter(&unmarked, &filter));

    let inactive = bson::doc! {"active": false};
    let active = bson::doc! {"active": true};
    let filter = User::visibility_filter();
    assert!(!eval_filter(&inactive, &filter));
    assert!(eval_filter(&active, &filter));
    // A document that never got the flag still counts as active.
    assert!(eval_filter(&unmarked, &filter));
}

#[test]
fn password_round_trip() {
    let user = User::new("Lea", "lea@example.com", "password123", "password123").unwrap();
    assert!(user.correct_password("password123").unwrap());
    assert!(!user.correct_password("password124").unwrap());
}

#[test]
fn correct_password_without_hash_is_false() {
    let mut user = User::new("Lea", "lea@example.com", "password123", "password123").unwrap();
    user.password_hash = None;
    assert!(!user.correct_password("password123").unwrap());
}

#[test]
fn changed_password_after_tracks_the_change_time() {
    let mut user = User::new("Lea", "lea@example.com", "password123", "password123").unwrap();
    let before_change = Utc::now() - Duration::hours(1);
    assert!(user.changed_password_after(before_change));
    // Issued now, after the (backdated) change: still valid.
    assert!(!user.changed_password_after(Utc::now()));

    user.password_changed_at = None;
    assert!(!user.changed_password_after(before_change));
}

#[test]
fn reset_token_round_trip() {
    let mut user = User::new("Lea", "lea@example.com", "password123", "password123").unwrap();
    let token = user.create_password_reset_token();
    // Only the digest is stored.
    assert_ne!(user.password_reset_token.as_deref(), Some(token.as_str()));
    assert!(user.reset_token_valid(&token));
    assert!(!user.reset_token_valid("0000000000000000"));
}

#[test]
fn expired_reset_tokens_are_rejected() {
    let mut user = User::new("Lea", "lea@example.com", "password123", "password123").unwrap();
    let token = user.create_password_reset_token();
    user.password_reset_expires = Some(Utc::now() - Duration::minutes(1));
    assert!(!user.reset_token_valid(&token));
}

#[test]
fn setting_a_new_password_invalidates_reset_tokens() {
    let mut user = User::new("Lea", "lea@example.com", "password123", "password123").unwrap();
    let token = user.create_password_reset_token();
    user.set_password("password456").unwrap();
    assert!(!user.reset_token_valid(&token));
    assert!(user.correct_password("password456").unwrap());
    assert!(matches!(
        User::new("Lea", "lea@example.com", "password123", "different1"),
        Err(ApiError::Validation(_))
    ));
}
