//! Decision combinators over already reduced sub-decisions.
//!
//! Mismatching sub-decisions count against the target decision. Failed
//! sub-rules never reach these functions: the evaluator fails the parent
//! first.

use arbiter_core::Decision;

/// `decision` iff strictly more than half of `decisions` equal it.
pub fn majority(decision: Decision, decisions: &[Decision]) -> Decision {
    let votes = decisions.iter().filter(|d| **d == decision).count();
    if votes * 2 > decisions.len() {
        decision
    } else {
        Decision::Undecided
    }
}

/// `decision` iff every entry equals it. Vacuously true for an empty list.
pub fn all(decision: Decision, decisions: &[Decision]) -> Decision {
    if decisions.iter().all(|d| *d == decision) {
        decision
    } else {
        Decision::Undecided
    }
}

/// `decision` iff at least one entry equals it.
pub fn any(decision: Decision, decisions: &[Decision]) -> Decision {
    if decisions.contains(&decision) {
        decision
    } else {
        Decision::Undecided
    }
}

/// The single non-`Undecided` entry, or `Undecided` when zero or several
/// entries decided.
pub fn one_of(decisions: &[Decision]) -> Decision {
    let mut decided = decisions.iter().filter(|d| **d != Decision::Undecided);
    match (decided.next(), decided.next()) {
        (Some(d), None) => *d,
        _ => Decision::Undecided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Decision::{Deny, Permit, Undecided};

    #[test]
    fn majority_needs_strictly_more_than_half() {
        assert_eq!(majority(Permit, &[Permit, Permit, Deny]), Permit);
        assert_eq!(majority(Permit, &[Permit, Deny, Deny]), Undecided);
        assert_eq!(majority(Permit, &[Permit, Deny]), Undecided);
        assert_eq!(majority(Deny, &[Deny, Undecided, Deny, Permit, Deny]), Deny);
        assert_eq!(majority(Permit, &[]), Undecided);
    }

    #[test]
    fn all_requires_every_entry() {
        assert_eq!(all(Permit, &[Permit, Permit, Deny]), Undecided);
        assert_eq!(all(Deny, &[Deny, Deny]), Deny);
        assert_eq!(all(Permit, &[]), Permit);
    }

    #[test]
    fn any_requires_one_entry() {
        assert_eq!(any(Permit, &[Deny, Permit, Deny]), Permit);
        assert_eq!(any(Permit, &[Deny, Undecided]), Undecided);
        assert_eq!(any(Deny, &[]), Undecided);
    }

    #[test]
    fn one_of_picks_the_single_decision() {
        assert_eq!(one_of(&[Permit, Undecided]), Permit);
        assert_eq!(one_of(&[Undecided, Deny, Undecided]), Deny);
        assert_eq!(one_of(&[Permit, Deny]), Undecided);
        assert_eq!(one_of(&[Permit, Permit]), Undecided);
        assert_eq!(one_of(&[Undecided]), Undecided);
        assert_eq!(one_of(&[]), Undecided);
    }
}
