use super::metrics::project_metrics;
use super::*;
use crate::core::store::test_store;
use crate::core::store::types::NewAction;

async fn seeded(n: usize) -> (CouncilStore, String, Vec<ActionRecord>) {
    let store = test_store();
    let project = store
        .create_project("owner", "Atlas", None, None)
        .await
        .unwrap();
    let drafts: Vec<NewAction> = (0..n)
        .map(|i| NewAction {
            title: format!("Action {}", i),
            description: "desc".into(),
            justification: "why".into(),
        })
        .collect();
    let actions = store.insert_actions(&project.id, &drafts).await.unwrap();
    (store, project.id, actions)
}

fn update(json: &str) -> TrackingUpdate {
    serde_json::from_str(json).unwrap()
}

#[test]
fn review_table() {
    use ActionStatus::*;
    assert!(can_review(Pending, Accepted));
    assert!(can_review(Pending, Rejected));
    assert!(can_review(Accepted, Accepted));
    assert!(!can_review(Accepted, Rejected));
    assert!(!can_review(Rejected, Accepted));
    assert!(!can_review(Rejected, Rejected));
    assert!(!can_review(Pending, Pending));

    assert!(can_track(TrackingStatus::Active, TrackingStatus::Completed));
    assert!(can_track(TrackingStatus::Completed, TrackingStatus::Completed));
    assert!(!can_track(TrackingStatus::Completed, TrackingStatus::Active));
}

#[test]
fn tracking_update_tells_null_from_missing() {
    let u = update(r#"{"comments": null}"#);
    assert_eq!(u.comments, Some(None));
    assert_eq!(u.success_score, None);

    let u = update(r#"{"status": "completed", "success_score": -2}"#);
    assert_eq!(u.status, Some(TrackingStatus::Completed));
    assert_eq!(u.success_score, Some(Some(-2)));
}

#[tokio::test]
async fn accepting_twice_keeps_one_tracking_row() {
    let (store, project_id, actions) = seeded(2).await;
    let first = accept(&store, &actions[0]).await.unwrap();
    assert_eq!(first.status, "active");

    let refreshed = store.get_action(&actions[0].id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, "accepted");
    let second = accept(&store, &refreshed).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(store.list_tracking(&project_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejection_needs_a_reason_and_a_pending_action() {
    let (store, _, actions) = seeded(2).await;

    let err = reject(&store, &actions[0], "   ").await.unwrap_err();
    assert!(matches!(err, CouncilError::Validation(_)));
    let untouched = store.get_action(&actions[0].id).await.unwrap().unwrap();
    assert_eq!(untouched.status, "pending");

    let rec = reject(&store, &actions[0], " too costly ").await.unwrap();
    assert_eq!(rec.rejection_reason, "too costly");

    let rejected = store.get_action(&actions[0].id).await.unwrap().unwrap();
    assert!(matches!(
        accept(&store, &rejected).await.unwrap_err(),
        CouncilError::InvalidTransition { .. }
    ));
    assert!(matches!(
        reject(&store, &rejected, "again").await.unwrap_err(),
        CouncilError::InvalidTransition { .. }
    ));

    accept(&store, &actions[1]).await.unwrap();
    let accepted = store.get_action(&actions[1].id).await.unwrap().unwrap();
    assert!(matches!(
        reject(&store, &accepted, "changed my mind").await.unwrap_err(),
        CouncilError::InvalidTransition { .. }
    ));
}

#[tokio::test]
async fn stale_record_cannot_sneak_past_the_store() {
    let (store, _, actions) = seeded(1).await;
    reject(&store, &actions[0], "no").await.unwrap();

    // `actions[0]` still says pending.
    let err = accept(&store, &actions[0]).await.unwrap_err();
    assert!(matches!(err, CouncilError::InvalidTransition { .. }));
    assert!(store.get_tracking_for_action(&actions[0].id).await.unwrap().is_none());
}

#[tokio::test]
async fn review_request_dispatches_and_reports_detail() {
    let (store, _, actions) = seeded(3).await;

    let req: ReviewRequest = serde_json::from_str(r#"{"status": "rejected"}"#).unwrap();
    let err = review(&store, &actions[0], &req).await.unwrap_err();
    assert_eq!(err.to_string(), "rejection_reason is required when rejecting");

    let req: ReviewRequest =
        serde_json::from_str(r#"{"status": "rejected", "rejection_reason": "low ROI"}"#).unwrap();
    let detail = review(&store, &actions[0], &req).await.unwrap();
    assert_eq!(detail.action.status, "rejected");
    assert_eq!(detail.rejection.unwrap().rejection_reason, "low ROI");
    assert!(detail.tracking.is_none());

    let req: ReviewRequest = serde_json::from_str(r#"{"status": "accepted"}"#).unwrap();
    let detail = review(&store, &actions[1], &req).await.unwrap();
    assert_eq!(detail.action.status, "accepted");
    assert_eq!(detail.tracking.unwrap().status, "active");

    let req: ReviewRequest = serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
    assert!(matches!(
        review(&store, &actions[2], &req).await.unwrap_err(),
        CouncilError::InvalidTransition { .. }
    ));

    assert!(serde_json::from_str::<ReviewRequest>(r#"{"status": "maybe"}"#).is_err());
}

#[tokio::test]
async fn out_of_range_score_mutates_nothing() {
    let (store, _, actions) = seeded(1).await;
    let tracking = accept(&store, &actions[0]).await.unwrap();

    let err = update_tracking(
        &store,
        &tracking,
        &update(r#"{"comments": "nice", "success_score": 6}"#),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CouncilError::Validation(_)));

    let row = store.get_tracking(&tracking.id).await.unwrap().unwrap();
    assert!(row.comments.is_none());
    assert!(row.success_score.is_none());
}

#[tokio::test]
async fn completion_is_stamped_once_and_never_reopens() {
    let (store, _, actions) = seeded(1).await;
    let tracking = accept(&store, &actions[0]).await.unwrap();

    let done = update_tracking(
        &store,
        &tracking,
        &update(r#"{"status": "completed", "success_score": 4, "comments": "shipped"}"#),
    )
    .await
    .unwrap();
    assert_eq!(done.status, "completed");
    assert_eq!(done.success_score, Some(4));
    assert_eq!(done.comments.as_deref(), Some("shipped"));
    let stamp = done.completed_at.clone().unwrap();

    let edited = update_tracking(
        &store,
        &done,
        &update(r#"{"status": "completed", "comments": null}"#),
    )
    .await
    .unwrap();
    assert_eq!(edited.completed_at.as_deref(), Some(stamp.as_str()));
    assert!(edited.comments.is_none());
    assert_eq!(edited.success_score, Some(4));

    let err = update_tracking(&store, &edited, &update(r#"{"status": "active"}"#))
        .await
        .unwrap_err();
    assert!(matches!(err, CouncilError::InvalidTransition { .. }));
}

#[tokio::test]
async fn accepted_and_scored_action_shows_up_in_metrics() {
    let (store, project_id, actions) = seeded(3).await;
    let tracking = accept(&store, &actions[0]).await.unwrap();
    update_tracking(
        &store,
        &tracking,
        &update(r#"{"status": "completed", "success_score": 4}"#),
    )
    .await
    .unwrap();
    reject(&store, &actions[1], "not now").await.unwrap();

    let m = project_metrics(&store, &project_id).await.unwrap();
    assert_eq!(
        m.actions,
        metrics::ActionTotals {
            total: 3,
            pending: 1,
            accepted: 1,
            rejected: 1,
        }
    );
    assert_eq!(m.approval_rate, 33.33);
    assert_eq!(m.rejection_rate, 33.33);
    assert_eq!(m.average_score, Some(4.0));
    assert_eq!(m.score_distribution.len(), 11);
    assert_eq!(m.score_distribution[&4], 1);
    assert_eq!(m.score_distribution[&-5], 0);
    assert_eq!(m.tracking.completed, 1);
    assert_eq!(m.tracking.active, 0);
    assert_eq!(m.recent_rejections.len(), 1);
    assert_eq!(m.recent_rejections[0].rejection_reason, "not now");
}

#[tokio::test]
async fn empty_project_has_no_average() {
    let (store, project_id, _) = seeded(0).await;
    let m = project_metrics(&store, &project_id).await.unwrap();
    assert_eq!(m.actions.total, 0);
    assert_eq!(m.approval_rate, 0.0);
    assert!(m.average_score.is_none());
    assert!(m.recent_runs.is_empty());
}
