//! Single-step control loop for browser agents.
//!
//! - `config`: step declarations bound to a task and page route
//! - `runner`: the phase machine driving ramp, execution, verification
//!   and vision fallback
//! - `selector`: structured-vs-vision choice plus the canvas short-circuit
//! - `action`: the verb grammar model replies are parsed from
//! - `prompt`: prompt assembly for both executors
//! - `probe`: snapshot capture bound to the per-step limit ramp
//! - `browser` / `provider`: the outward ports, with recording and
//!   scripted implementations for tests
//! - `report`: the terminal step result

pub mod action;
pub mod browser;
pub mod config;
pub mod errors;
pub mod probe;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod runner;
pub mod selector;

pub use action::{parse_action, StepAction};
pub use browser::{BrowserAdapter, RecordingBrowser};
pub use config::{StepRequest, StepSpec};
pub use errors::{ActionParseError, BrowserError, ProviderError, RuntimeError};
pub use probe::SnapshotProbe;
pub use provider::{
    GenerateOptions, Generation, LanguageProvider, ScriptedLanguageProvider,
    ScriptedVisionProvider, VisionProvider,
};
pub use report::{ActionRecord, StepReport};
pub use runner::{StepRunner, ACTION_VERIFICATION_LABEL, SNAPSHOT_VERIFICATION_LABEL};
pub use selector::{
    probe_canvas, select_executor, CanvasProbe, ExecutorChoice, ExecutorKind, SelectionReason,
};
