use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    activity::{DeliveryPlan, Detection, EntityState},
    feedback::{EventStats, FeedbackOutcome, FeedbackOverview},
    models::Urgency,
    proactive::{NotifyOutcome, StateChange},
    AppState,
};

/// One line of input on the command channel.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEnvelope {
    /// Echoed back so callers can pair replies with requests.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command")]
pub enum Command {
    #[serde(rename = "proactive.event")]
    ProactiveEvent {
        event_type: String,
        #[serde(default)]
        urgency: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(rename = "proactive.state_changed")]
    StateChanged(StateChange),
    #[serde(rename = "assistant.feedback")]
    Feedback {
        notification_id: String,
        feedback_type: String,
    },
    #[serde(rename = "feedback.stats")]
    FeedbackStats {
        #[serde(default)]
        event_type: Option<String>,
    },
    #[serde(rename = "activity.detect")]
    DetectActivity,
    #[serde(rename = "activity.delivery")]
    ActivityDelivery { urgency: String },
    #[serde(rename = "activity.update_states")]
    UpdateStates {
        states: Vec<EntityState>,
        #[serde(default)]
        replace: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn from_result(id: Option<Value>, result: Result<Value, String>) -> Self {
        match result {
            Ok(value) => Self {
                id,
                ok: true,
                result: Some(value),
                error: None,
            },
            Err(error) => Self {
                id,
                ok: false,
                result: None,
                error: Some(error),
            },
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn parse_urgency(value: &str) -> Result<Urgency, String> {
    value.parse::<Urgency>().map_err(|e| e.to_string())
}

/// Parses one input line and runs it. Malformed lines produce an error
/// reply rather than stopping the loop.
pub async fn handle_line(state: &AppState, line: &str) -> Reply {
    match serde_json::from_str::<CommandEnvelope>(line) {
        Ok(envelope) => Reply::from_result(envelope.id, dispatch(state, envelope.command).await),
        Err(err) => Reply::from_result(None, Err(format!("invalid command: {err}"))),
    }
}

pub async fn dispatch(state: &AppState, command: Command) -> Result<Value, String> {
    match command {
        Command::ProactiveEvent {
            event_type,
            urgency,
            text,
        } => to_value(proactive_event(state, &event_type, urgency.as_deref(), text.as_deref()).await?),
        Command::StateChanged(change) => to_value(state_changed(state, &change).await?),
        Command::Feedback {
            notification_id,
            feedback_type,
        } => to_value(assistant_feedback(state, &notification_id, &feedback_type).await?),
        Command::FeedbackStats {
            event_type: Some(event_type),
        } => to_value(get_event_stats(state, &event_type).await?),
        Command::FeedbackStats { event_type: None } => to_value(get_feedback_overview(state).await?),
        Command::DetectActivity => to_value(detect_activity(state).await?),
        Command::ActivityDelivery { urgency } => to_value(activity_delivery(state, &urgency).await?),
        Command::UpdateStates { states, replace } => {
            to_value(update_states(state, states, replace).await?)
        }
    }
}

pub async fn proactive_event(
    state: &AppState,
    event_type: &str,
    urgency: Option<&str>,
    text: Option<&str>,
) -> Result<NotifyOutcome, String> {
    if event_type.trim().is_empty() {
        return Err("event_type is required".into());
    }
    let urgency = urgency.map(parse_urgency).transpose()?;
    Ok(state.proactive.notify_event(event_type, urgency, text).await)
}

pub async fn state_changed(
    state: &AppState,
    change: &StateChange,
) -> Result<Option<NotifyOutcome>, String> {
    Ok(state.proactive.handle_state_change(change).await)
}

pub async fn assistant_feedback(
    state: &AppState,
    notification_id: &str,
    feedback_type: &str,
) -> Result<FeedbackOutcome, String> {
    state
        .tracker
        .record_feedback(notification_id, feedback_type)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_event_stats(state: &AppState, event_type: &str) -> Result<EventStats, String> {
    Ok(state.tracker.stats(event_type).await)
}

pub async fn get_feedback_overview(state: &AppState) -> Result<FeedbackOverview, String> {
    Ok(state.tracker.overview().await)
}

pub async fn detect_activity(state: &AppState) -> Result<Detection, String> {
    Ok(state.activity.detect().await)
}

pub async fn activity_delivery(state: &AppState, urgency: &str) -> Result<DeliveryPlan, String> {
    let urgency = parse_urgency(urgency)?;
    Ok(state.activity.should_deliver(urgency).await)
}

/// Feeds entity states into the in-memory snapshot. Fails when states are
/// read from a snapshot file instead.
pub async fn update_states(
    state: &AppState,
    states: Vec<EntityState>,
    replace: bool,
) -> Result<usize, String> {
    let provider = state
        .states
        .as_ref()
        .ok_or_else(|| "entity states are read from a snapshot file".to_string())?;

    if replace {
        provider.replace(states);
    } else {
        for entity in states {
            provider.set(entity);
        }
    }
    Ok(provider.len())
}
