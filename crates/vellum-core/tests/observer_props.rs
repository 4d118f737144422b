//! Property tests for the observer write path.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use vellum_core::{DataContainer, Value, data, observe_with};

fn primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ]
}

fn counted(container: &DataContainer) -> Rc<Cell<u32>> {
    let calls = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&calls);
    observe_with(&Value::Map(container.clone()), move |_, _, _| {
        counter.set(counter.get() + 1);
    })
    .expect("flat container observes cleanly");
    calls
}

proptest! {
    #[test]
    fn repeated_write_notifies_at_most_once(initial in primitive(), next in primitive()) {
        let container = data! { "k" => initial.clone() };
        let calls = counted(&container);

        container.set("k", next.clone()).unwrap();
        container.set("k", next.clone()).unwrap();

        let expected = u32::from(!initial.same_value(&next));
        prop_assert_eq!(calls.get(), expected);
    }

    #[test]
    fn callback_count_matches_distinct_transitions(writes in proptest::collection::vec(-3i64..3, 0..40)) {
        let container = data! { "k" => 0 };
        let calls = counted(&container);

        let mut current = 0i64;
        let mut transitions = 0u32;
        for w in writes {
            if w != current {
                transitions += 1;
                current = w;
            }
            container.set("k", w).unwrap();
        }
        prop_assert_eq!(calls.get(), transitions);
        prop_assert_eq!(container.get("k"), Some(Value::from(current)));
    }
}
