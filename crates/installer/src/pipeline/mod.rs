//! Install pipeline controller, stages and events

pub mod controller;
pub mod events;
pub mod state;

pub use controller::{Controller, InstallOutcome};
pub use events::{CompositeObserver, ConsoleObserver, EventSender, InstallObserver, NullObserver, PipelineEvent};
pub use state::{PipelineStatus, Stage, StageTracker};
