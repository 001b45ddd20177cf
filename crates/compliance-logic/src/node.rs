// compliance-logic/src/node.rs
// ============================================================================
// Module: Procedure Tree Node
// Description: Generic AllOf/AnyOf/Not/Call algebra over a domain leaf type.
// Purpose: Define `Node<C>`, the compiled shape of one procedure branch, and
// its generic short-circuiting fold over `Status`.
// Dependencies: crate::{error, status}, serde::{Deserialize, Serialize}, smallvec::SmallVec
// ============================================================================

//! ## Overview
//! `Node<C>` is the universal Boolean algebra the compliance engine compiles
//! every `audit`/`remediate` branch into. The logical combinators
//! (`AllOf`/`AnyOf`/`Not`) are domain-agnostic; `Call` is the boundary where
//! domain-specific evaluation (`C`, e.g. a bound builtin invocation) is
//! handed off to the caller via the `eval` closure.

use smallvec::SmallVec;

use crate::error::EngineError;
use crate::error::EngineResult;
use crate::status::Status;
use crate::status::fold_all_of;
use crate::status::fold_any_of;

// ============================================================================
// SECTION: Node Definition
// ============================================================================

/// Compiled procedure tree node over leaf type `C`
///
/// # Invariants
/// - `Call` is the only variant that can produce `Err` from evaluation; all
///   other variants only propagate a child's error or fold `Status` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<C> {
    /// Invoke a leaf: a bound builtin call in the compliance domain
    Call(C),

    /// Success iff every child is `Compliant`; short-circuits on first
    /// `NonCompliant` or `Error`. An empty `AllOf` is trivially `Compliant`.
    AllOf(SmallVec<[Box<Self>; 4]>),

    /// Success iff some child is `Compliant`; short-circuits on first
    /// `Compliant`. An empty `AnyOf` is trivially `NonCompliant`.
    AnyOf(SmallVec<[Box<Self>; 4]>),

    /// Inverts `Compliant` <-> `NonCompliant`; `Error` passes through
    Not(Box<Self>),
}

impl<C> Node<C> {
    /// Creates an `AllOf` node from a vector of children
    pub fn all_of(children: Vec<Self>) -> Self {
        Self::AllOf(children.into_iter().map(Box::new).collect())
    }

    /// Creates an `AnyOf` node from a vector of children
    pub fn any_of(children: Vec<Self>) -> Self {
        Self::AnyOf(children.into_iter().map(Box::new).collect())
    }

    /// Creates a `Not` node wrapping a child
    pub fn not(child: Self) -> Self {
        Self::Not(Box::new(child))
    }

    /// Creates a `Call` leaf
    pub const fn call(leaf: C) -> Self {
        Self::Call(leaf)
    }

    /// Returns the number of nodes in this tree, including this one
    pub fn complexity(&self) -> usize {
        match self {
            Self::Call(_) => 1,
            Self::Not(child) => 1 + child.complexity(),
            Self::AllOf(children) | Self::AnyOf(children) => {
                1 + children.iter().map(|child| child.complexity()).sum::<usize>()
            }
        }
    }

    /// Evaluates this node, delegating `Call` leaves to `eval_call`
    ///
    /// `eval_call` is invoked once per `Call` node encountered in
    /// depth-first, declaration order, short-circuiting exactly as
    /// `AllOf`/`AnyOf`/`Not` require. A `Call` evaluation that returns `Err`
    /// propagates immediately and aborts the remainder of the branch.
    ///
    /// # Errors
    ///
    /// Returns whatever `eval_call` returns for the `Call` that aborted
    /// evaluation.
    pub fn eval<F>(&self, eval_call: &mut F) -> EngineResult<Status>
    where
        F: FnMut(&C) -> EngineResult<Status>,
    {
        match self {
            Self::Call(leaf) => eval_call(leaf),
            Self::Not(child) => Ok(child.eval(eval_call)?.negate()),
            Self::AllOf(children) => {
                let mut statuses = Vec::with_capacity(children.len());
                for child in children {
                    let status = child.eval(eval_call)?;
                    let stop = !status.is_compliant();
                    statuses.push(status);
                    if stop {
                        break;
                    }
                }
                Ok(fold_all_of(statuses))
            }
            Self::AnyOf(children) => {
                let mut statuses = Vec::with_capacity(children.len());
                for child in children {
                    let status = child.eval(eval_call)?;
                    let stop = status.is_compliant();
                    statuses.push(status);
                    if stop {
                        break;
                    }
                }
                Ok(fold_any_of(statuses))
            }
        }
    }
}

impl<C> Default for Node<C> {
    /// Creates an empty `AllOf` node (trivially `Compliant`)
    fn default() -> Self {
        Self::AllOf(SmallVec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct CountingCall(Status);

    fn count_calls(node: &Node<CountingCall>, calls: &mut u32) -> EngineResult<Status> {
        node.eval(&mut |leaf: &CountingCall| {
            *calls += 1;
            Ok(leaf.0.clone())
        })
    }

    #[test]
    fn all_of_stops_after_first_failure() {
        let tree = Node::all_of(vec![
            Node::call(CountingCall(Status::Compliant)),
            Node::call(CountingCall(Status::NonCompliant)),
            Node::call(CountingCall(Status::Compliant)),
        ]);
        let mut calls = 0;
        let result = count_calls(&tree, &mut calls).expect("eval should not error");
        assert_eq!(result, Status::NonCompliant);
        assert_eq!(calls, 2, "third child must never be invoked");
    }

    #[test]
    fn any_of_stops_after_first_success() {
        let tree = Node::any_of(vec![
            Node::call(CountingCall(Status::NonCompliant)),
            Node::call(CountingCall(Status::Compliant)),
            Node::call(CountingCall(Status::NonCompliant)),
        ]);
        let mut calls = 0;
        let result = count_calls(&tree, &mut calls).expect("eval should not error");
        assert_eq!(result, Status::Compliant);
        assert_eq!(calls, 2, "third child must never be invoked");
    }

    #[test]
    fn call_error_propagates_and_short_circuits() {
        let tree = Node::all_of(vec![
            Node::call(CountingCall(Status::Compliant)),
            Node::call(CountingCall(Status::Compliant)),
        ]);
        let mut calls = 0;
        let result = tree.eval(&mut |_: &CountingCall| {
            calls += 1;
            if calls == 1 {
                Ok(Status::Compliant)
            } else {
                Err(EngineError::UnknownFunction {
                    name: "x".to_string(),
                })
            }
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn empty_all_of_is_compliant() {
        let tree: Node<CountingCall> = Node::default();
        let mut calls = 0;
        assert_eq!(count_calls(&tree, &mut calls).expect("ok"), Status::Compliant);
    }

    #[test]
    fn empty_any_of_is_non_compliant() {
        let tree: Node<CountingCall> = Node::any_of(Vec::new());
        let mut calls = 0;
        assert_eq!(count_calls(&tree, &mut calls).expect("ok"), Status::NonCompliant);
    }
}
