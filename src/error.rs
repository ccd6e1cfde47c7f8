/// Rejections surfaced to callers of the feedback and notification APIs.
///
/// Storage failures are deliberately absent: decision paths degrade to
/// defaults instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    #[error("invalid feedback kind '{kind}' (expected ignored, dismissed, acknowledged, engaged or thanked)")]
    InvalidKind { kind: String },

    #[error("invalid urgency '{urgency}' (expected critical, high, medium or low)")]
    InvalidUrgency { urgency: String },

    #[error("unknown notification id '{id}'")]
    UnknownNotification { id: String },
}
