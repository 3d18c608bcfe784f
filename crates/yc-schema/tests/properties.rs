//! Property tests: range and length bounds, dump/load round trips, and
//! idempotent validation.

use proptest::prelude::*;
use yc_schema::prelude::*;

fn range_elem() -> Element {
    RangeElem::int("level").min(-10).max(10).build().unwrap()
}

fn list_elem() -> Element {
    ListElem::new("items", ScalarElem::anon(ScalarType::Int))
        .min_length(1)
        .max_length(3)
        .build()
        .unwrap()
}

fn inventory() -> YamlConfig {
    YamlConfig::builder([
        ScalarElem::str("owner").required().into(),
        ScalarElem::int("count").default(1).into(),
        RangeElem::float("ratio").min(0).max(1).into(),
        ScalarElem::bool("active").default(true).into(),
        ListElem::new("tags", ScalarElem::anon(ScalarType::Str)).into(),
        CategoryElem::new("stock", ScalarElem::anon(ScalarType::Int)).into(),
        DerivedElem::new("total").into(),
    ])
    .resolver("total", |d| {
        let stock = d["stock"].as_dict().map(|s| s.values().filter_map(Value::as_i64).sum::<i64>());
        Ok(Value::Int(stock.unwrap_or(0) * d["count"].as_i64().unwrap_or(0)))
    })
    .build()
    .unwrap()
}

/// Strings that include YAML-significant text such as `null`, `true`,
/// numbers, colons, surrounding whitespace and control characters.
fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z][A-Za-z0-9 _.-]{0,12}",
        Just("null".to_string()),
        Just("true".to_string()),
        Just("42".to_string()),
        Just("a: b".to_string()),
        Just(" padded ".to_string()),
        Just("#hash".to_string()),
        Just("del\u{7f}".to_string()),
        Just("c1\u{90} nel\u{85}".to_string()),
        Just(String::new()),
    ]
}

fn document() -> impl Strategy<Value = Value> {
    (
        text(),
        0i64..1000,
        prop::option::of(0.001f64..0.999),
        any::<bool>(),
        prop::collection::vec(text(), 0..4),
        prop::collection::btree_map("[a-z][a-z0-9_]{1,6}", -100i64..100, 0..4),
    )
        .prop_map(|(owner, count, ratio, active, tags, stock)| {
            let mut doc = ConfigDict::new();
            doc.insert("owner", owner);
            doc.insert("count", count);
            doc.insert("ratio", ratio);
            doc.insert("active", active);
            doc.insert("tags", tags);
            doc.insert("stock", stock.into_iter().collect::<ConfigDict>());
            Value::Dict(doc)
        })
}

proptest! {
    /// Values strictly inside the bounds pass; the bounds themselves fail.
    #[test]
    fn range_bounds_are_exclusive(n in -50i64..50) {
        let result = range_elem().validate(&Value::Int(n), false);
        prop_assert_eq!(result.is_ok(), n > -10 && n < 10);
    }

    /// Lists validate exactly when their length is within the inclusive
    /// length bounds.
    #[test]
    fn list_length_bounds(items in prop::collection::vec(-5i64..5, 0..6)) {
        let len = items.len();
        let value = Value::from(items);
        let result = list_elem().validate(&value, false);
        prop_assert_eq!(result.is_ok(), (1..=3).contains(&len));
    }

    /// Validating a validated document changes nothing.
    #[test]
    fn validation_is_idempotent(doc in document()) {
        let config = inventory();
        let once = config.validate(&doc).unwrap();
        let twice = config.validate(&Value::Dict(once.clone())).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Dumping a validated document and loading it back reproduces it.
    #[test]
    fn dump_load_round_trip(doc in document(), comments in any::<bool>()) {
        let config = inventory();
        let values = config.validate(&doc).unwrap();
        let opts = DumpOptions { show_comments: comments, ..DumpOptions::default() };
        let text = config.dump_to_string(Some(&values), &opts).unwrap();
        let reloaded = config.load_str(&text).unwrap();
        prop_assert_eq!(reloaded, values);
    }

    /// Derived fields are recomputed, never read back from a dump.
    #[test]
    fn derived_fields_never_dumped(doc in document()) {
        let config = inventory();
        let values = config.validate(&doc).unwrap();
        let text = config.dump_to_string(Some(&values), &DumpOptions::bare()).unwrap();
        prop_assert!(!text.lines().any(|line| line.starts_with("total:")));
    }
}
