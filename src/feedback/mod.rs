pub mod policy;
pub mod sweep;
pub mod tracker;

pub use policy::{cooldown, evaluate, GateReason, NotifyDecision};
pub use sweep::SweepController;
pub use tracker::{
    EventStats, FeedbackOutcome, FeedbackOverview, FeedbackTracker, PendingNotification,
    SweepReport, TrackerConfig, TOTAL_SENT,
};
