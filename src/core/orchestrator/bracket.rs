use std::future::Future;
use tracing::{error, info, warn};

use super::{RunKind, RunStatus, can_transition};
use crate::core::error::{CouncilError, CouncilResult};
use crate::core::store::CouncilStore;
use crate::core::store::types::RunRecord;

/// What a run body hands back: its value, plus a failure message when the run
/// should close as `failed` even though the body itself returned normally.
pub struct RunOutcome<T> {
    pub value: T,
    pub failure: Option<String>,
}

impl<T> RunOutcome<T> {
    pub fn completed(value: T) -> Self {
        Self {
            value,
            failure: None,
        }
    }

    pub fn failed(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            failure: Some(message.into()),
        }
    }
}

/// Opens a run, executes `body`, and always writes a terminal status.
///
/// The body is spawned, so a panic inside it or a dropped caller cannot leave
/// the run at `running`. A body error closes the run as `failed` with the
/// error text and is returned to the caller. The returned record is the
/// finalized row.
pub async fn bracketed<T, F, Fut>(
    store: &CouncilStore,
    project_id: &str,
    kind: RunKind,
    body: F,
) -> CouncilResult<(RunRecord, T)>
where
    T: Send + 'static,
    F: FnOnce(RunRecord) -> Fut,
    Fut: Future<Output = CouncilResult<RunOutcome<T>>> + Send + 'static,
{
    let run = store.create_run(project_id, kind.as_str()).await?;
    info!("Run {} ({}) started", run.id, kind.as_str());

    let opened = RunStatus::parse(&run.status).unwrap_or(RunStatus::Running);
    let task = tokio::spawn(body(run.clone()));
    let store = store.clone();
    let run_id = run.id.clone();
    let finalize = tokio::spawn(async move {
        let joined = task.await;
        let (status, message, result) = match joined {
            Ok(Ok(outcome)) => match outcome.failure {
                None => (RunStatus::Completed, None, Ok(outcome.value)),
                Some(msg) => (RunStatus::Failed, Some(msg), Ok(outcome.value)),
            },
            Ok(Err(e)) => (RunStatus::Failed, Some(e.to_string()), Err(e)),
            Err(join_err) => {
                let msg = if join_err.is_panic() {
                    "run aborted: task panicked".to_string()
                } else {
                    "run aborted: task cancelled".to_string()
                };
                (
                    RunStatus::Failed,
                    Some(msg.clone()),
                    Err(CouncilError::Internal(anyhow::anyhow!(msg))),
                )
            }
        };

        if !can_transition(opened, status) {
            warn!("Run {} cannot move from {} to {}", run_id, opened.as_str(), status.as_str());
        }
        match store
            .finalize_run(&run_id, status.as_str(), message.as_deref())
            .await
        {
            Ok(true) => info!(
                "Run {} finalized as {}{}",
                run_id,
                status.as_str(),
                message
                    .as_deref()
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            ),
            Ok(false) => warn!("Run {} was already terminal", run_id),
            Err(e) => error!("Failed to finalize run {}: {:#}", run_id, e),
        }

        let record = store.get_run(&run_id).await.ok().flatten();
        if let Some(r) = &record
            && !RunStatus::parse(&r.status).is_some_and(|s| s.is_terminal())
        {
            error!("Run {} left non-terminal at {}", run_id, r.status);
        }
        (record, result)
    });

    let (record, result) = finalize.await.map_err(|e| {
        CouncilError::Internal(anyhow::anyhow!("run finalizer aborted: {}", e))
    })?;
    let value = result?;
    Ok((record.unwrap_or(run), value))
}
