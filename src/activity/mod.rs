pub mod classifier;
pub mod engine;
pub mod matrix;
pub mod provider;
pub mod signals;

pub use classifier::{classify, DEGRADED_CONFIDENCE};
pub use engine::{plan_for, ActivityEngine, DeliveryPlan, Detection};
pub use matrix::{delivery_for_labels, delivery_method, resolve_delivery};
pub use provider::{SnapshotFileProvider, StateProvider, StaticStateProvider};
pub use signals::{collect_signals, ActivitySignals, EntityState, SignalConfig};
