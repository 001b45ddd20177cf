// compliance-logic/src/lib.rs
// ============================================================================
// Crate: compliance-logic
// Description: Generic procedure-tree algebra for the compliance engine.
// Purpose: Re-export the Status verdict, its fold rules, and the Node<C>
// tree so compliance-core can specialize C to a bound builtin call.
// Dependencies: crate::{error, node, status}
// ============================================================================

//! # compliance-logic
//!
//! This crate has no knowledge of files, services, or packages. It defines
//! only the universal part of the compliance policy DSL: the tri-state
//! [`Status`] verdict and the [`Node`] combinator tree (`AllOf`/`AnyOf`/
//! `Not`/`Call`) that folds child verdicts into a parent verdict with
//! short-circuit evaluation. `compliance-core` supplies the domain-specific
//! leaf type and drives `Node::eval`.

#![forbid(unsafe_code)]

mod error;
mod node;
mod status;

pub use error::EngineError;
pub use error::EngineResult;
pub use node::Node;
pub use status::ErrorKind;
pub use status::Status;
pub use status::fold_all_of;
pub use status::fold_any_of;
