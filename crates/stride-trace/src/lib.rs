//! Trace events for the Stride step runtime.
//!
//! - `model`: the event envelope and scope carried by every emission
//! - `events`: payload builders so event shapes stay stable for downstream
//!   consumers
//! - `sink`: the fire-and-forget `TraceSink` contract plus in-memory
//!   implementations
//!
//! Sequence numbers are owned by sinks, not emitters: an event's `seq` is 0
//! until a sink accepts it.

pub mod events;
pub mod model;
pub mod sink;

pub use model::{kind, TraceEvent, TraceScope};
pub use sink::{BroadcastTraceSink, MemoryTraceSink, NullTraceSink, TraceSink};
