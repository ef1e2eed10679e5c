use serde::Serialize;
use std::collections::BTreeMap;

use super::{ActionStatus, SCORE_MAX, SCORE_MIN, TrackingStatus};
use crate::core::error::CouncilResult;
use crate::core::store::CouncilStore;
use crate::core::store::types::{RejectionSummary, RunRecord};

const RECENT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionTotals {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackingTotals {
    pub active: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOutputCount {
    pub agent_name: String,
    pub outputs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectMetrics {
    pub actions: ActionTotals,
    /// Percent of all actions, two decimals.
    pub approval_rate: f64,
    pub rejection_rate: f64,
    /// Keyed by score; every value in range is present.
    pub score_distribution: BTreeMap<i64, usize>,
    pub average_score: Option<f64>,
    pub tracking: TrackingTotals,
    pub agent_outputs: Vec<AgentOutputCount>,
    pub recent_rejections: Vec<RejectionSummary>,
    pub recent_runs: Vec<RunRecord>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / whole as f64)
}

pub async fn project_metrics(store: &CouncilStore, project_id: &str) -> CouncilResult<ProjectMetrics> {
    let mut actions = ActionTotals::default();
    for action in store.list_actions(project_id, None).await? {
        actions.total += 1;
        match ActionStatus::parse(&action.status) {
            Some(ActionStatus::Pending) => actions.pending += 1,
            Some(ActionStatus::Accepted) => actions.accepted += 1,
            Some(ActionStatus::Rejected) => actions.rejected += 1,
            None => {}
        }
    }

    let mut tracking = TrackingTotals::default();
    let mut score_distribution: BTreeMap<i64, usize> =
        (SCORE_MIN..=SCORE_MAX).map(|s| (s, 0)).collect();
    let mut scores = Vec::new();
    for row in store.list_tracking(project_id).await? {
        match TrackingStatus::parse(&row.status) {
            Some(TrackingStatus::Active) => tracking.active += 1,
            Some(TrackingStatus::Completed) => tracking.completed += 1,
            None => {}
        }
        if let Some(score) = row.success_score {
            *score_distribution.entry(score).or_default() += 1;
            scores.push(score);
        }
    }
    let average_score = (!scores.is_empty())
        .then(|| round2(scores.iter().sum::<i64>() as f64 / scores.len() as f64));

    let agent_outputs = store
        .analysis_output_counts(project_id)
        .await?
        .into_iter()
        .map(|(agent_name, outputs)| AgentOutputCount {
            agent_name,
            outputs,
        })
        .collect();

    Ok(ProjectMetrics {
        approval_rate: percent(actions.accepted, actions.total),
        rejection_rate: percent(actions.rejected, actions.total),
        actions,
        score_distribution,
        average_score,
        tracking,
        agent_outputs,
        recent_rejections: store.recent_rejections(project_id, RECENT).await?,
        recent_runs: store.list_runs(project_id, RECENT).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_round_to_two_decimals() {
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(2, 3), 66.67);
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(round2(2.345678), 2.35);
    }
}
