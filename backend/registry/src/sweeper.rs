//! Long-running background task that applies the scheduled transitions:
//! classification of submitted waste and promotion of approved plantations
//! whose after-images are complete.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::path::Collection;
use crate::status::{ProjectStatus, WasteStatus};
use crate::store::Change;
use crate::workflow::Workflow;

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub classified: usize,
    pub promoted: usize,
}

/// Run the sweeper until `shutdown` is cancelled.
///
/// Sweeps every `interval`, and right away when a write leaves a record in a
/// status the sweeper acts on.
pub async fn run(workflow: Arc<Workflow>, interval: Duration, shutdown: CancellationToken) {
    info!("Sweeper starting, interval: {interval:?}");

    let mut changes = workflow.store().subscribe();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Sweeper stopping");
                return;
            }
            _ = ticker.tick() => {}
            change = changes.recv() => match change {
                Ok(change) if wants_sweep(&change) => {
                    debug!("Sweep triggered by {}", change.path);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!("Sweeper missed {missed} change notifications");
                }
                Err(RecvError::Closed) => {
                    info!("Change feed closed; sweeper stopping");
                    return;
                }
            },
        }

        if let Err(e) = sweep_once(&workflow).await {
            error!("Sweep error: {e}");
        }
    }
}

/// Perform a single sweep.
pub async fn sweep_once(workflow: &Workflow) -> crate::errors::Result<SweepReport> {
    let report = SweepReport {
        classified: workflow.classify_pending().await?,
        promoted: workflow.promote_after_uploaded().await?,
    };
    if report != SweepReport::default() {
        info!(
            "Sweep classified {} waste records, promoted {} projects",
            report.classified, report.promoted
        );
    }
    Ok(report)
}

fn wants_sweep(change: &Change) -> bool {
    let status = change.status.as_deref();
    match change.path.collection {
        Collection::WasteProjects => status == Some(WasteStatus::Submitted.as_str()),
        Collection::Projects => status == Some(ProjectStatus::Approved.as_str()),
        _ => false,
    }
}
