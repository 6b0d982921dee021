//! Page snapshot model and capture contracts for the Stride step runtime.
//!
//! - `model`: immutable point-in-time extraction of a page's interactive
//!   elements plus extraction diagnostics
//! - `source`: the async capture port implemented by perception backends
//! - `ramp`: the element-count limit ramp used when extraction confidence
//!   comes back low

pub mod errors;
pub mod model;
pub mod ramp;
pub mod source;

pub use errors::SnapshotError;
pub use model::{
    BoundingBox, Element, Snapshot, SnapshotDiagnostics, SnapshotMetrics, SnapshotStatus,
    VisualCues,
};
pub use ramp::{
    next_limit, LimitRamp, RampConfig, DEFAULT_LIMIT_BASE, DEFAULT_LIMIT_MAX, DEFAULT_LIMIT_STEP,
};
pub use source::{SnapshotOptions, SnapshotSource};
