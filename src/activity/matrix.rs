//! Silence matrix: activity x urgency -> delivery channel.

use crate::models::{Activity, DeliveryMethod, Urgency};

use crate::models::DeliveryMethod::{LedBlink, Suppress, TtsLoud, TtsQuiet};

/// Total lookup; every pair has an answer.
pub fn delivery_method(activity: Activity, urgency: Urgency) -> DeliveryMethod {
    match (activity, urgency) {
        (Activity::Sleeping, Urgency::Critical) => TtsLoud,
        (Activity::Sleeping, Urgency::High) => LedBlink,
        (Activity::Sleeping, Urgency::Medium | Urgency::Low) => Suppress,

        (Activity::InCall, Urgency::Critical | Urgency::High) => LedBlink,
        (Activity::InCall, Urgency::Medium | Urgency::Low) => Suppress,

        (Activity::Watching, Urgency::Critical) => TtsLoud,
        (Activity::Watching, Urgency::High) => LedBlink,
        (Activity::Watching, Urgency::Medium | Urgency::Low) => Suppress,

        (Activity::Focused | Activity::Guests, Urgency::Critical) => TtsLoud,
        (Activity::Focused | Activity::Guests, Urgency::High | Urgency::Medium) => TtsQuiet,
        (Activity::Focused | Activity::Guests, Urgency::Low) => Suppress,

        (Activity::Relaxing, Urgency::Critical | Urgency::High | Urgency::Medium) => TtsLoud,
        (Activity::Relaxing, Urgency::Low) => TtsQuiet,

        // Off-site forwarding of critical alerts is handled by the sink.
        (Activity::Away, Urgency::Critical) => TtsLoud,
        (Activity::Away, _) => Suppress,
    }
}

/// Label-based lookup for loosely typed callers. Unknown activities use the
/// relaxing row and unknown urgencies are delivered loudly.
pub fn delivery_for_labels(activity: &str, urgency: &str) -> DeliveryMethod {
    let activity = Activity::from_label(activity).unwrap_or(Activity::Relaxing);
    match urgency.parse::<Urgency>() {
        Ok(urgency) => delivery_method(activity, urgency),
        Err(_) => TtsLoud,
    }
}

/// The one precedence rule combining scenes and activity: critical alerts
/// always follow the matrix, an active silence scene suppresses everything
/// else, and otherwise the matrix decides.
pub fn resolve_delivery(activity: Activity, urgency: Urgency, silence_scene: bool) -> DeliveryMethod {
    if urgency != Urgency::Critical && silence_scene {
        return Suppress;
    }
    delivery_method(activity, urgency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_total() {
        for activity in Activity::ALL {
            for urgency in Urgency::ALL {
                let method = delivery_method(activity, urgency);
                assert!(matches!(method, TtsLoud | TtsQuiet | LedBlink | Suppress));
            }
        }
    }

    #[test]
    fn spot_checks() {
        assert_eq!(delivery_method(Activity::Sleeping, Urgency::Critical), TtsLoud);
        assert_eq!(delivery_method(Activity::Sleeping, Urgency::Medium), Suppress);
        assert_eq!(delivery_method(Activity::Relaxing, Urgency::Low), TtsQuiet);
        assert_eq!(delivery_method(Activity::Away, Urgency::Critical), TtsLoud);
        assert_eq!(delivery_method(Activity::InCall, Urgency::Critical), LedBlink);
        assert_eq!(delivery_method(Activity::Guests, Urgency::Medium), TtsQuiet);
    }

    #[test]
    fn critical_is_never_suppressed() {
        for activity in Activity::ALL {
            assert_ne!(delivery_method(activity, Urgency::Critical), Suppress);
        }
    }

    #[test]
    fn label_fallbacks() {
        assert_eq!(delivery_for_labels("gardening", "low"), TtsQuiet);
        assert_eq!(delivery_for_labels("sleeping", "urgent-ish"), TtsLoud);
        assert_eq!(delivery_for_labels("in_call", "medium"), Suppress);
    }

    #[test]
    fn silence_scene_never_mutes_critical() {
        assert_eq!(resolve_delivery(Activity::Relaxing, Urgency::High, true), Suppress);
        assert_eq!(resolve_delivery(Activity::Relaxing, Urgency::Critical, true), TtsLoud);
        assert_eq!(resolve_delivery(Activity::Relaxing, Urgency::High, false), TtsLoud);
    }
}
