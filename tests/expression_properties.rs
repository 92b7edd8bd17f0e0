//! Property-based tests for boolean and collection expressions

use eddy::exp::{AllExp, AnyExp, Exp, JsObjExp, ListExp};
use eddy::testing::CallCounter;
use eddy::IO;
use proptest::prelude::*;
use serde_json::json;

fn run<E: Exp>(exp: E) -> eddy::Result<E::Output> {
    tokio_test::block_on(exp.into_io().run())
}

fn operands(values: &[bool]) -> Vec<IO<bool>> {
    values.iter().copied().map(IO::succeed).collect()
}

proptest! {
    #[test]
    fn prop_all_matches_iterator_all(values in prop::collection::vec(any::<bool>(), 0..32)) {
        let expected = values.iter().all(|v| *v);
        prop_assert_eq!(run(AllExp::seq(operands(&values))).unwrap(), expected);
        prop_assert_eq!(run(AllExp::par(operands(&values))).unwrap(), expected);
    }

    #[test]
    fn prop_any_matches_iterator_any(values in prop::collection::vec(any::<bool>(), 0..32)) {
        let expected = values.iter().any(|v| *v);
        prop_assert_eq!(run(AnyExp::seq(operands(&values))).unwrap(), expected);
        prop_assert_eq!(run(AnyExp::par(operands(&values))).unwrap(), expected);
    }

    #[test]
    fn prop_sequential_all_stops_after_first_false(values in prop::collection::vec(any::<bool>(), 0..32)) {
        let counter = CallCounter::new();
        let counted: Vec<IO<bool>> = operands(&values)
            .into_iter()
            .map(|operand| counter.count(operand))
            .collect();

        run(AllExp::seq(counted)).unwrap();

        let expected = values
            .iter()
            .position(|v| !*v)
            .map_or(values.len(), |i| i + 1);
        prop_assert_eq!(counter.get(), expected);
    }

    #[test]
    fn prop_sequential_any_stops_after_first_true(values in prop::collection::vec(any::<bool>(), 0..32)) {
        let counter = CallCounter::new();
        let counted: Vec<IO<bool>> = operands(&values)
            .into_iter()
            .map(|operand| counter.count(operand))
            .collect();

        run(AnyExp::seq(counted)).unwrap();

        let expected = values
            .iter()
            .position(|v| *v)
            .map_or(values.len(), |i| i + 1);
        prop_assert_eq!(counter.get(), expected);
    }

    #[test]
    fn prop_list_preserves_order(values in prop::collection::vec(any::<i64>(), 0..32)) {
        let exp = ListExp::par(values.iter().copied().map(IO::succeed));
        prop_assert_eq!(run(exp).unwrap(), values);
    }

    #[test]
    fn prop_js_obj_keeps_insertion_order(keys in prop::collection::btree_set("[a-z]{1,8}", 0..16)) {
        let keys: Vec<String> = keys.into_iter().rev().collect();
        let exp = keys.iter().fold(JsObjExp::par(), |exp, key| {
            exp.set(key.clone(), IO::succeed(json!(key.len())))
        });

        let value = run(exp).unwrap();
        let object = value.as_object().unwrap();
        prop_assert_eq!(object.keys().cloned().collect::<Vec<_>>(), keys);
    }
}
