//! Property-based tests for the value codec.
//!
//! Properties checked:
//! 1. **Stability**: Re-encoding a canonical value's JSON form yields an equivalent value
//! 2. **Storage**: Writing a value to a storage row and decoding it is lossless
//! 3. **No panics**: Encoding and decoding never crash on any input
//!
//! ```bash
//! PROPTEST_CASES=10000 cargo test -p enrich --test codec_props
//! ```

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use enrich::codec::{RATING_MAX, RATING_MIN};
use enrich::{AttributeRegistry, CanonicalValue, DataType, RatingPolicy, StorageRow, ValueCodec};

// =============================================================================
// Strategies
// =============================================================================

fn codec() -> ValueCodec {
    ValueCodec::new(Arc::new(AttributeRegistry::builtin()))
}

fn tag() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 ]{0,12}[a-z0-9]"
}

fn tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(tag(), 1..6).prop_map(|mut tags| {
        let mut seen = Vec::new();
        tags.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(t.clone());
                true
            }
        });
        tags
    })
}

fn schedule() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{3}", "[0-9]{2}:[0-9]{2}-[0-9]{2}:[0-9]{2}", 0..5).prop_map(
        |days| {
            days.into_iter()
                .map(|(day, hours)| (day, Value::String(hours)))
                .collect()
        },
    )
}

fn range() -> impl Strategy<Value = CanonicalValue> {
    (any::<Option<i32>>(), any::<Option<i32>>())
        .prop_filter("at least one bound", |(min, max)| min.is_some() || max.is_some())
        .prop_map(|(min, max)| CanonicalValue::Range {
            min: min.map(i64::from),
            max: max.map(i64::from),
        })
}

fn canonical() -> impl Strategy<Value = CanonicalValue> {
    prop_oneof![
        any::<bool>().prop_map(CanonicalValue::Bool),
        any::<i64>().prop_map(CanonicalValue::Int),
        range(),
        (RATING_MIN..=RATING_MAX).prop_map(CanonicalValue::Rating),
        tags().prop_map(CanonicalValue::Tags),
        "[A-Za-z][A-Za-z ,.]{0,40}[a-z.]".prop_map(CanonicalValue::Text),
        schedule().prop_map(CanonicalValue::Schedule),
    ]
}

fn arbitrary_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|i| json!(i)),
        any::<f64>().prop_map(|f| json!(f)),
        ".{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,5}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn data_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::Boolean),
        Just(DataType::Integer),
        Just(DataType::IntegerRange),
        Just(DataType::Rating),
        Just(DataType::TagSet),
        Just(DataType::Text),
        Just(DataType::Schedule),
    ]
}

// =============================================================================
// Round trips
// =============================================================================

proptest! {
    #[test]
    fn json_form_reencodes_to_same_value(value in canonical()) {
        let encoded = codec().encode(value.data_type(), &value.to_json()).unwrap();
        prop_assert!(encoded.equivalent(&value), "{:?} became {:?}", value, encoded);
    }

    #[test]
    fn storage_row_is_lossless(value in canonical()) {
        let row = StorageRow::from(&value);
        prop_assert!(row.populated_slots() <= 1);
        prop_assert_eq!(row.decode(), Some(value));
    }

    #[test]
    fn tags_equivalence_ignores_order(tags in tags()) {
        let mut reversed = tags.clone();
        reversed.reverse();
        prop_assert!(CanonicalValue::Tags(tags).equivalent(&CanonicalValue::Tags(reversed)));
    }
}

// =============================================================================
// Ratings
// =============================================================================

proptest! {
    #[test]
    fn in_range_ratings_pass_every_policy(rating in RATING_MIN..=RATING_MAX) {
        for policy in [RatingPolicy::Reject, RatingPolicy::Clamp, RatingPolicy::Unchecked] {
            let encoded = codec()
                .with_rating_policy(policy)
                .encode(DataType::Rating, &json!(rating))
                .unwrap();
            prop_assert_eq!(encoded, CanonicalValue::Rating(rating));
        }
    }

    #[test]
    fn out_of_range_ratings_follow_policy(
        rating in prop_oneof![-1000.0..RATING_MIN - 0.001, RATING_MAX + 0.001..1000.0]
    ) {
        let raw = json!(rating);

        prop_assert!(codec().encode(DataType::Rating, &raw).is_err());

        let clamped = codec()
            .with_rating_policy(RatingPolicy::Clamp)
            .encode(DataType::Rating, &raw)
            .unwrap();
        prop_assert_eq!(clamped, CanonicalValue::Rating(rating.clamp(RATING_MIN, RATING_MAX)));

        let kept = codec()
            .with_rating_policy(RatingPolicy::Unchecked)
            .encode(DataType::Rating, &raw)
            .unwrap();
        prop_assert_eq!(kept, CanonicalValue::Rating(rating));
    }
}

// =============================================================================
// No panics
// =============================================================================

proptest! {
    #[test]
    fn encode_never_panics(data_type in data_type(), raw in arbitrary_json()) {
        let _ = codec().encode(data_type, &raw);
    }

    #[test]
    fn decode_never_panics(
        boolean_value in any::<Option<bool>>(),
        int_value in any::<Option<i64>>(),
        numeric_min in any::<Option<i64>>(),
        numeric_max in any::<Option<i64>>(),
        rating_value in any::<Option<f64>>(),
        tags_value in prop::option::of(prop::collection::vec(".{0,8}", 0..3)),
        text_value in prop::option::of(".{0,20}"),
        schedule_value in prop::option::of(arbitrary_json()),
    ) {
        let row = StorageRow {
            boolean_value,
            int_value,
            numeric_min,
            numeric_max,
            rating_value,
            tags_value,
            text_value,
            schedule_value,
        };
        if let Some(value) = row.decode() {
            // Whatever wins must survive another trip through storage.
            prop_assert_eq!(StorageRow::from(&value).decode(), Some(value));
        }
    }

    #[test]
    fn boolean_words_ignore_case(word in prop_oneof![
        Just("true"), Just("yes"), Just("y"), Just("1"),
        Just("false"), Just("no"), Just("n"), Just("0"),
    ], upper in any::<bool>()) {
        let raw = if upper { word.to_uppercase() } else { word.to_string() };
        let expected = matches!(word, "true" | "yes" | "y" | "1");
        prop_assert_eq!(
            codec().encode(DataType::Boolean, &json!(raw)).unwrap(),
            CanonicalValue::Bool(expected)
        );
    }
}
