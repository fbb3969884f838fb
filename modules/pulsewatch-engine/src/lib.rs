pub mod detect;
pub mod engine;
pub mod evidence;
pub mod identity;
pub mod lifecycle;
pub mod overlay;
pub mod report;
mod scopes;
pub mod score;
pub mod stats;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use engine::AlertEngine;
pub use lifecycle::{LifecyclePolicy, SimulatedLifecycle};
pub use overlay::{
    load_and_overlay, overlay_persisted, AlertAction, AlertStateStore, MemoryStateStore,
    PersistedAlertState,
};
pub use report::{
    alert_timeline, pulse_summary, rule_catalog, PulseSummary, RuleCatalogEntry, TimelineBucket,
};
