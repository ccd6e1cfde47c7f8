pub mod activity_state;
pub mod feedback;
pub mod notifications;
