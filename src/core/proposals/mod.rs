//! Review and tracking of proposed actions.

pub mod metrics;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::core::error::{CouncilError, CouncilResult};
use crate::core::store::CouncilStore;
use crate::core::store::types::{
    ActionRecord, RejectionRecord, TrackingRecord, TrackingWrite,
};

pub const SCORE_MIN: i64 = -5;
pub const SCORE_MAX: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Accepted => "accepted",
            ActionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ActionStatus::Pending),
            "accepted" => Some(ActionStatus::Accepted),
            "rejected" => Some(ActionStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Active,
    Completed,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Active => "active",
            TrackingStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(TrackingStatus::Active),
            "completed" => Some(TrackingStatus::Completed),
            _ => None,
        }
    }
}

/// `accepted -> accepted` is allowed so re-accepting is a no-op.
pub fn can_review(from: ActionStatus, to: ActionStatus) -> bool {
    matches!(
        (from, to),
        (ActionStatus::Pending, ActionStatus::Accepted)
            | (ActionStatus::Pending, ActionStatus::Rejected)
            | (ActionStatus::Accepted, ActionStatus::Accepted)
    )
}

/// Tracking never reopens once completed.
pub fn can_track(from: TrackingStatus, to: TrackingStatus) -> bool {
    !matches!(
        (from, to),
        (TrackingStatus::Completed, TrackingStatus::Active)
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub status: ActionStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionDetail {
    pub action: ActionRecord,
    pub tracking: Option<TrackingRecord>,
    pub rejection: Option<RejectionRecord>,
}

fn status_of(action: &ActionRecord) -> CouncilResult<ActionStatus> {
    ActionStatus::parse(&action.status).ok_or_else(|| {
        CouncilError::Internal(anyhow::anyhow!(
            "action {} has unknown status '{}'",
            action.id,
            action.status
        ))
    })
}

pub async fn action_detail(store: &CouncilStore, action: ActionRecord) -> CouncilResult<ActionDetail> {
    let tracking = store.get_tracking_for_action(&action.id).await?;
    let rejection = store.get_rejection_for_action(&action.id).await?;
    Ok(ActionDetail {
        action,
        tracking,
        rejection,
    })
}

/// `pending -> accepted`, creating the tracking row once.
pub async fn accept(store: &CouncilStore, action: &ActionRecord) -> CouncilResult<TrackingRecord> {
    let from = status_of(action)?;
    if !can_review(from, ActionStatus::Accepted) {
        return Err(CouncilError::transition(from.as_str(), "accepted"));
    }
    let tracking = store
        .accept_action(&action.id)
        .await?
        .ok_or_else(|| CouncilError::transition("rejected", "accepted"))?;
    info!("Action {} accepted", action.id);
    Ok(tracking)
}

/// `pending -> rejected`. The reason is required and feeds later synthesis.
pub async fn reject(
    store: &CouncilStore,
    action: &ActionRecord,
    reason: &str,
) -> CouncilResult<RejectionRecord> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CouncilError::validation(
            "rejection_reason is required when rejecting",
        ));
    }
    let from = status_of(action)?;
    if !can_review(from, ActionStatus::Rejected) {
        return Err(CouncilError::transition(from.as_str(), "rejected"));
    }
    let rec = store
        .reject_action(&action.id, reason)
        .await?
        .ok_or_else(|| CouncilError::transition("accepted", "rejected"))?;
    info!("Action {} rejected", action.id);
    Ok(rec)
}

/// Applies a review request and returns the action as it now stands.
pub async fn review(
    store: &CouncilStore,
    action: &ActionRecord,
    request: &ReviewRequest,
) -> CouncilResult<ActionDetail> {
    match request.status {
        ActionStatus::Accepted => {
            accept(store, action).await?;
        }
        ActionStatus::Rejected => {
            reject(store, action, request.rejection_reason.as_deref().unwrap_or("")).await?;
        }
        ActionStatus::Pending => {
            let from = status_of(action)?;
            return Err(CouncilError::transition(from.as_str(), "pending"));
        }
    }
    let updated = store
        .get_action(&action.id)
        .await?
        .ok_or(CouncilError::NotFound("action"))?;
    action_detail(store, updated).await
}

/// Distinguishes a missing field from an explicit `null`.
pub(crate) fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// A tracking update. Omitted fields are left alone; `null` clears.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingUpdate {
    #[serde(default)]
    pub status: Option<TrackingStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub comments: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub success_score: Option<Option<i64>>,
}

impl TrackingUpdate {
    pub fn validate(&self) -> CouncilResult<()> {
        if let Some(Some(score)) = self.success_score
            && !(SCORE_MIN..=SCORE_MAX).contains(&score)
        {
            return Err(CouncilError::validation(format!(
                "success_score must be between {} and {}, got {}",
                SCORE_MIN, SCORE_MAX, score
            )));
        }
        Ok(())
    }
}

/// Comments and score are written first, then completion is stamped. The
/// stamp is set once and never moves.
pub async fn update_tracking(
    store: &CouncilStore,
    tracking: &TrackingRecord,
    update: &TrackingUpdate,
) -> CouncilResult<TrackingRecord> {
    update.validate()?;
    let from = TrackingStatus::parse(&tracking.status).ok_or_else(|| {
        CouncilError::Internal(anyhow::anyhow!(
            "tracking {} has unknown status '{}'",
            tracking.id,
            tracking.status
        ))
    })?;
    if let Some(to) = update.status
        && !can_track(from, to)
    {
        return Err(CouncilError::transition(from.as_str(), to.as_str()));
    }

    let write = TrackingWrite {
        comments: update.comments.clone(),
        success_score: update.success_score,
        complete: update.status == Some(TrackingStatus::Completed),
    };
    let rec = store
        .write_tracking(&tracking.id, &write)
        .await?
        .ok_or(CouncilError::NotFound("tracking"))?;
    if write.complete && from == TrackingStatus::Active {
        info!("Tracking {} completed", tracking.id);
    }
    Ok(rec)
}

#[cfg(test)]
mod tests;
