//! Predicate verification for the Stride step runtime.
//!
//! - `predicate`: the pure goal-condition contract plus closure support
//! - `predicates`: ready-made conditions over urls and elements
//! - `spec`: per-step verification declarations with polling budgets
//! - `assertion`: terminal verification records and the step-level set
//! - `probe`: the port through which the engine sees fresh page state
//! - `engine`: `check(predicate, label).eventually(options)` polling

pub mod assertion;
pub mod context;
pub mod engine;
pub mod errors;
pub mod predicate;
pub mod predicates;
pub mod probe;
pub mod spec;

pub use assertion::{Assertion, AssertionSet, REASON_SNAPSHOT_EXHAUSTED};
pub use context::VerifyContext;
pub use engine::{AssertionCheck, AssertionEngine};
pub use errors::VerifyError;
pub use predicate::{Predicate, PredicateOutcome};
pub use probe::StateProbe;
pub use spec::{EventuallyOptions, Verification};
