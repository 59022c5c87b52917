mod common;

use catadt::Value;
use proptest::prelude::*;

use common::*;

proptest! {
    #[test]
    fn prop_peano_round_trip(n in 0i64..2_000) {
        let p = peano();
        let built = p.call("FromValue", n).unwrap().into_instance().unwrap();
        prop_assert_eq!(built.call("toValue", &[]).unwrap(), Value::Int(n));
    }

    #[test]
    fn prop_factorial_fusion_matches_sequential(n in 0i64..15) {
        let l = list().install_merge("factorial", &["counter", "product"]).unwrap();
        let fused = l.call("factorial", n).unwrap();
        let sequential = l
            .call("counter", n)
            .unwrap()
            .into_instance()
            .unwrap()
            .call("product", &[])
            .unwrap();
        prop_assert_eq!(fused, sequential);
    }

    #[test]
    fn prop_map_fold_fusion_matches_sequential(items in proptest::collection::vec(-1_000i64..1_000, 0..200)) {
        let l = list().install_merge("doubleSum", &["double", "sum"]).unwrap();
        let xs = list_of(&l, &items);
        let fused = xs.call("doubleSum", &[]).unwrap();
        let sequential = xs
            .call("double", &[])
            .unwrap()
            .into_instance()
            .unwrap()
            .call("sum", &[])
            .unwrap();
        prop_assert_eq!(&fused, &sequential);
        prop_assert_eq!(fused, Value::Int(items.iter().sum::<i64>() * 2));
    }

    #[test]
    fn prop_length_matches_input(items in proptest::collection::vec(any::<i64>(), 0..300)) {
        let l = list();
        let xs = list_of(&l, &items);
        prop_assert_eq!(xs.call("length", &[]).unwrap(), Value::Int(items.len() as i64));
    }

    #[test]
    fn prop_stream_take(start in -1_000i64..1_000, n in 0usize..50) {
        let s = stream();
        let values = s.call("countFrom", start).unwrap().take("head", "tail", n).unwrap();
        let expected: Vec<Value> = (0..n as i64).map(|i| Value::Int(start + i)).collect();
        prop_assert_eq!(values, expected);
    }
}
