//! Metrics collection.
//!
//! # Metrics
//! - `engine_bootstrap_total` (counter): bootstrap attempts by outcome
//! - `engine_state_transitions_total` (counter): transitions by target state
//! - `engine_network_changes_total` (counter): events routed to an engine by the platform
//!
//! # Design Decisions
//! - Labels are static strings so recording never allocates
//! - No-op until the embedding application installs a recorder

use crate::lifecycle::handle::EngineState;

pub fn record_bootstrap(outcome: &'static str) {
    metrics::counter!("engine_bootstrap_total", "outcome" => outcome).increment(1);
}

pub fn record_engine_transition(state: EngineState) {
    let state = match state {
        EngineState::Starting => "starting",
        EngineState::Running => "running",
        EngineState::Stopped => "stopped",
    };
    metrics::counter!("engine_state_transitions_total", "state" => state).increment(1);
}

pub fn record_network_changes(delivered: usize) {
    metrics::counter!("engine_network_changes_total").increment(delivered as u64);
}
