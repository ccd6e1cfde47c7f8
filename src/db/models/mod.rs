pub mod activity_state;
pub mod feedback;

pub use activity_state::ActivitySnapshot;
pub use feedback::{FeedbackEntry, FeedbackKind};
