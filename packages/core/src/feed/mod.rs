//! Metrics Feed Module
//!
//! Push-based feed of dashboard snapshots delivered to subscribers on a
//! fixed period until they unsubscribe, and the digital twin of the
//! production line stepped on its own timer.

pub mod simulator;
pub mod twin;
pub mod types;

pub use simulator::{FeedState, FeedStream, MetricsFeed, Subscription, DEFAULT_PERIOD, STREAM_CAPACITY};
pub use twin::{spawn_twin, DigitalTwin, ProcessStage, ProcessStatus, SharedTwin, SimulationState};
pub use types::*;
