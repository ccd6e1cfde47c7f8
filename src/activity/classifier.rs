use crate::models::Activity;

use super::signals::ActivitySignals;

/// Confidence reported when the classifier falls back to the last known
/// activity because no sensor data was available.
pub const DEGRADED_CONFIDENCE: f64 = 0.3;

/// Picks one activity from the signals. Rules are checked strictly in order
/// and the first match wins: presence and rest signals outrank calls, calls
/// outrank entertainment and work, and relaxing is the fallback.
pub fn classify(signals: &ActivitySignals) -> (Activity, f64) {
    if signals.away {
        return (Activity::Away, 0.95);
    }

    if signals.sleeping {
        let confidence = if signals.lights_off { 0.90 } else { 0.70 };
        return (Activity::Sleeping, confidence);
    }

    if signals.in_call {
        return (Activity::InCall, 0.95);
    }

    if signals.media_playing {
        return (Activity::Watching, 0.85);
    }

    if signals.guests {
        return (Activity::Guests, 0.80);
    }

    if signals.pc_active {
        return (Activity::Focused, 0.70);
    }

    (Activity::Relaxing, 0.60)
}
