pub mod catalog;
pub mod manager;

pub use catalog::{map_state_change, StateChange, TriggeredEvent};
pub use manager::{NotifyOutcome, ProactiveManager, SkipReason};
