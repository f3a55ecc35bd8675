//! Prometheus metrics for the governance module
//!
//! Tracks proposal lifecycle transitions, voting, and whitelist size.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};

/// Proposal lifecycle transitions
pub static PROPOSAL_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "agora_governance_proposal_transitions_total",
        "Total proposal lifecycle transitions",
        &["from_state", "to_state"]
    )
    .unwrap()
});

/// Votes recorded
pub static VOTES_CAST: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "agora_governance_votes_cast_total",
        "Total votes recorded",
        &["support"]
    )
    .unwrap()
});

/// Votes soft-rejected (late or duplicate)
pub static VOTES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "agora_governance_votes_rejected_total",
        "Total votes soft-rejected",
        &["reason"]
    )
    .unwrap()
});

/// Proposals executed
pub static PROPOSALS_EXECUTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "agora_governance_proposals_executed_total",
        "Total proposals executed"
    )
    .unwrap()
});

/// Current whitelist size
pub static WHITELISTED_STRATEGIES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "agora_governance_whitelisted_strategies",
        "Number of whitelisted strategies"
    )
    .unwrap()
});
