pub mod activity;
pub mod urgency;

pub use activity::{Activity, DeliveryMethod};
pub use urgency::Urgency;
