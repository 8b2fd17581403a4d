//! Query submission, polling and payload decoding.
//!
//! This module isolates the BI API request flow from result presentation.

pub mod executor;
pub mod params;
pub mod payload;
pub mod poll;

pub use executor::{ExecutorSettings, NamedQuery, QueryExecutor};
pub use params::{native_payload, placeholders, ParamValue, QueryParams};
pub use payload::RawPayload;
pub use poll::{PollEndpoint, PollSettings, PollState, Poller};
