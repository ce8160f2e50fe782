use bson::{Bson, doc};
use tourlite::query::{
    ApiFeatures, CmpOp, DEFAULT_LIMIT, Filter, FindQuery, Order, Projection, QueryBuilder,
    QueryParams, SortSpec, eval_filter,
};

fn translate(pairs: &[(&str, &str)]) -> FindQuery {
    let params = QueryParams::from_pairs(pairs.iter().copied());
    ApiFeatures::new(FindQuery::new(), params).apply().unwrap()
}

#[test]
fn pagination_defaults_when_absent() {
    let q = translate(&[("duration[gte]", "5")]);
    assert_eq!(q.options.skip, Some(0));
    assert_eq!(q.options.limit, Some(DEFAULT_LIMIT));
}

#[test]
fn pagination_window_is_computed_from_page_and_limit() {
    let q = translate(&[("page", "3"), ("limit", "10")]);
    assert_eq!(q.options.skip, Some(20));
    assert_eq!(q.options.limit, Some(10));
}

#[test]
fn non_numeric_page_coerces_to_defaults() {
    let q = translate(&[("page", "abc")]);
    assert_eq!(q.options.skip, Some(0));
    assert_eq!(q.options.limit, Some(100));
}

#[test]
fn zero_and_negative_pagination_values_coerce_to_defaults() {
    for pair in [("page", "0"), ("page", "-2"), ("limit", "0"), ("limit", "-10")] {
        let q = translate(&[pair]);
        assert_eq!(q.options.skip, Some(0), "{pair:?}");
        assert_eq!(q.options.limit, Some(DEFAULT_LIMIT), "{pair:?}");
    }
}

#[test]
fn sort_preserves_left_to_right_priority() {
    let q = translate(&[("sort", "-price,name")]);
    assert_eq!(
        q.options.sort,
        Some(vec![
            SortSpec { field: "price".to_string(), order: Order::Desc },
            SortSpec { field: "name".to_string(), order: Order::Asc },
        ])
    );
}

#[test]
fn sort_defaults_to_newest_first() {
    let q = translate(&[]);
    assert_eq!(
        q.options.sort,
        Some(vec![SortSpec { field: "created_at".to_string(), order: Order::Desc }])
    );
}

#[test]
fn projection_includes_named_fields() {
    let q = translate(&[("fields", "name,price")]);
    assert_eq!(
        q.options.projection,
        Some(Projection::Include(vec!["name".to_string(), "price".to_string()]))
    );
}

#[test]
fn projection_defaults_to_hiding_the_revision_field() {
    let q = translate(&[]);
    assert_eq!(q.options.projection, Some(Projection::Exclude(vec!["_rev".to_string()])));
}

#[test]
fn filter_rewrites_operators_and_preserves_values() {
    let q = translate(&[("duration[gte]", "5")]);
    assert_eq!(
        q.filter,
        Filter::Cmp { path: "duration".to_string(), op: CmpOp::Gte, value: Bson::Int64(5) }
    );
}

#[test]
fn reserved_keys_never_reach_the_filter() {
    let q = translate(&[("page", "2"), ("sort", "name"), ("limit", "3"), ("fields", "name")]);
    assert_eq!(q.filter, Filter::True);
}

#[test]
fn identical_mappings_translate_to_identical_builders() {
    let pairs = [("duration[gte]", "5"), ("difficulty", "easy"), ("page", "2"), ("limit", "7")];
    assert_eq!(translate(&pairs), translate(&pairs));
}

#[test]
fn applying_filter_twice_keeps_predicates_equivalent() {
    let params = QueryParams::from_pairs([("duration[gte]", "5"), ("difficulty", "easy")]);
    let once = ApiFeatures::new(FindQuery::new(), params.clone())
        .filter()
        .unwrap()
        .into_builder();
    let twice = ApiFeatures::new(FindQuery::new(), params.clone())
        .filter()
        .unwrap()
        .filter()
        .unwrap()
        .into_builder();
    let samples = [
        doc! {"duration": 6, "difficulty": "easy"},
        doc! {"duration": 4, "difficulty": "easy"},
        doc! {"duration": 9, "difficulty": "difficult"},
        doc! {},
    ];
    for sample in &samples {
        assert_eq!(eval_filter(sample, &once.filter), eval_filter(sample, &twice.filter));
    }
}

#[test]
fn empty_mapping_yields_only_the_default_rules() {
    let q = translate(&[]);
    let expected = FindQuery::new()
        .sort(vec![SortSpec { field: "created_at".to_string(), order: Order::Desc }])
        .select(Projection::Exclude(vec!["_rev".to_string()]))
        .skip(0)
        .limit(DEFAULT_LIMIT);
    assert_eq!(q, expected);
}

#[test]
fn repeated_control_parameters_fall_back_to_defaults() {
    let q = translate(&[("page", "2"), ("page", "3")]);
    assert_eq!(q.options.skip, Some(0));
    assert_eq!(q.options.limit, Some(DEFAULT_LIMIT));
}
