use proptest::prelude::*;
use tourlite::query::{ApiFeatures, CmpOp, Filter, FindQuery, QueryParams};

proptest! {
    #[test]
    fn prop_paginate_always_yields_a_valid_window(page in any::<String>(), limit in any::<String>()) {
        let params = QueryParams::from_pairs([("page", page.as_str()), ("limit", limit.as_str())]);
        let q = ApiFeatures::new(FindQuery::new(), params).paginate().into_builder();
        let limit = q.options.limit.unwrap();
        let skip = q.options.skip.unwrap();
        // Whatever garbage comes in, the window is usable: a positive limit
        // and a skip that starts at a page boundary.
        prop_assert!(limit >= 1);
        prop_assert!(skip == 0 || skip >= limit);
    }

    #[test]
    fn prop_numeric_pagination_matches_the_window_formula(page in 1usize..1000, limit in 1usize..1000) {
        let params = QueryParams::from_pairs([
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ]);
        let q = ApiFeatures::new(FindQuery::new(), params).paginate().into_builder();
        prop_assert_eq!(q.options.skip, Some((page - 1) * limit));
        prop_assert_eq!(q.options.limit, Some(limit));
    }

    #[test]
    fn prop_operator_rewrite_preserves_field_and_value(
        field in "[a-z][a-z_]{0,11}",
        op_idx in 0usize..4,
        value in any::<i64>(),
    ) {
        let ops = ["gte", "gt", "lte", "lt"];
        let expected = [CmpOp::Gte, CmpOp::Gt, CmpOp::Lte, CmpOp::Lt];
        prop_assume!(!["page", "sort", "limit", "fields"].contains(&field.as_str()));
        let key = format!("{field}[{}]", ops[op_idx]);
        let params = QueryParams::from_pairs([(key, value.to_string())]);
        let filter = params.filter().unwrap();
        prop_assert_eq!(
            filter,
            Filter::Cmp { path: field, op: expected[op_idx], value: bson::Bson::Int64(value) }
        );
    }

    #[test]
    fn prop_sort_parse_keeps_field_count_and_order(
        fields in proptest::collection::vec("[a-z]{1,8}", 1..5),
        desc in proptest::collection::vec(any::<bool>(), 5),
    ) {
        let raw = fields
            .iter()
            .zip(&desc)
            .map(|(f, d)| if *d { format!("-{f}") } else { f.clone() })
            .collect::<Vec<_>>()
            .join(",");
        let params = QueryParams::from_pairs([("sort", raw)]);
        let q = ApiFeatures::new(FindQuery::new(), params).sort().into_builder();
        let specs = q.options.sort.unwrap();
        prop_assert_eq!(specs.len(), fields.len());
        for (spec, field) in specs.iter().zip(&fields) {
            prop_assert_eq!(&spec.field, field);
        }
    }
}
