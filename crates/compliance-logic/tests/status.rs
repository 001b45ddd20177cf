// compliance-logic/tests/status.rs
// Behavioral tests for the Status fold algebra, run against the public API only.

use compliance_logic::Status;
use compliance_logic::fold_all_of;
use compliance_logic::fold_any_of;
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Compliant),
        Just(Status::NonCompliant),
        "[a-z]{1,8}".prop_map(Status::system_error),
    ]
}

proptest! {
    #[test]
    fn all_of_is_compliant_iff_every_child_is(children in proptest::collection::vec(arb_status(), 0..8)) {
        let all_compliant = children.iter().all(Status::is_compliant);
        let folded = fold_all_of(children);
        prop_assert_eq!(folded.is_compliant(), all_compliant);
    }

    #[test]
    fn any_of_is_compliant_iff_some_child_is(children in proptest::collection::vec(arb_status(), 0..8)) {
        let some_compliant = children.iter().any(Status::is_compliant);
        let folded = fold_any_of(children);
        prop_assert_eq!(folded.is_compliant(), some_compliant);
    }
}

#[test]
fn all_of_empty_tree_is_compliant() {
    assert_eq!(fold_all_of(Vec::new()), Status::Compliant);
}

#[test]
fn any_of_empty_tree_is_non_compliant() {
    assert_eq!(fold_any_of(Vec::new()), Status::NonCompliant);
}
