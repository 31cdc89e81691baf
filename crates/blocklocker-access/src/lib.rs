//! Access evaluation for BlockLocker.
//!
//! [`evaluate`] decides whether an actor may perform an action on a block
//! given the block's lock record (if any). It reads nothing but its
//! arguments, so it can be tested without a store and called from any
//! thread.

pub mod evaluator;

pub use evaluator::evaluate;
