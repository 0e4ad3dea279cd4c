//! Property-based tests for core types.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::document::{KeyPath, load_str};
    use crate::duration::{Duration, DurationUnit};
    use crate::interpolate::resolve;
    use proptest::prelude::*;

    fn integral_unit() -> impl Strategy<Value = DurationUnit> {
        prop_oneof![
            Just(DurationUnit::Epoch),
            Just(DurationUnit::Batch),
            Just(DurationUnit::Sample),
            Just(DurationUnit::Token),
        ]
    }

    proptest! {
        #[test]
        fn test_duration_display_parse_roundtrip(count in any::<u64>(), unit in integral_unit()) {
            let d = Duration::new(count, unit);
            let parsed: Duration = d.to_string().parse().unwrap();
            prop_assert_eq!(parsed, d);
        }

        #[test]
        fn test_fraction_display_parse_roundtrip(millis in 1u32..=1000) {
            let d = Duration::fraction(f64::from(millis) / 1000.0).unwrap();
            let parsed: Duration = d.to_string().parse().unwrap();
            prop_assert_eq!(parsed, d);
        }

        #[test]
        fn test_key_path_display_parse_roundtrip(
            keys in proptest::collection::vec("[a-z_][a-z0-9_]{0,8}", 1..5),
            index in proptest::option::of(0usize..50),
        ) {
            let mut path = KeyPath::root();
            for key in &keys {
                path = path.key(key.clone());
            }
            if let Some(i) = index {
                path = path.index(i);
            }
            let parsed: KeyPath = path.to_string().parse().unwrap();
            prop_assert_eq!(parsed, path);
        }

        #[test]
        fn test_key_path_with_awkward_keys_roundtrip(
            keys in proptest::collection::vec("[a-z_. \\[\\]\"\\\\]{0,8}", 1..5),
        ) {
            let mut path = KeyPath::root();
            for key in &keys {
                path = path.key(key.clone());
            }
            let parsed: KeyPath = path.to_string().parse().unwrap();
            prop_assert_eq!(parsed, path);
        }

        #[test]
        fn test_resolve_without_references_is_identity(
            entries in proptest::collection::btree_map("[a-z][a-z0-9_]{0,8}", 0i64..10_000, 1..8),
        ) {
            let text: String = entries
                .iter()
                .map(|(k, v)| format!("k_{k}: {v}\n"))
                .collect();
            let doc = load_str(&text).unwrap();
            let resolved = resolve(&doc).unwrap();
            prop_assert_eq!(resolved.document().root(), doc.root());
        }
    }
}
