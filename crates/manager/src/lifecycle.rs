//! Background worker lifecycle.

use shadow_core::Execution;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Externally visible manager state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerStatus {
    /// Constructed; background loops not started yet
    Created,
    /// Evaluation pipeline and evolution loop are running
    Running,
    /// Stopped for good
    Stopped,
}

/// Handles to the two background loops.
pub(crate) struct Workers {
    pub(crate) cancel: CancellationToken,
    pub(crate) pipeline: JoinHandle<u64>,
    pub(crate) evolution: JoinHandle<()>,
}

impl Workers {
    /// Cancel both loops and wait for them to exit.
    ///
    /// Returns how many executions the pipeline evaluated.
    pub(crate) async fn shutdown(self) -> u64 {
        self.cancel.cancel();

        let processed = match self.pipeline.await {
            Ok(processed) => processed,
            Err(e) => {
                warn!("Evaluation pipeline ended abnormally: {}", e);
                0
            }
        };
        if let Err(e) = self.evolution.await {
            warn!("Evolution loop ended abnormally: {}", e);
        }
        processed
    }
}

/// Internal lifecycle, carrying what each state owns.
pub(crate) enum Lifecycle {
    /// Receiver waiting for the pipeline to be started
    Created(mpsc::Receiver<Execution>),
    Running(Workers),
    Stopped,
}

impl Lifecycle {
    pub(crate) fn status(&self) -> ManagerStatus {
        match self {
            Lifecycle::Created(_) => ManagerStatus::Created,
            Lifecycle::Running(_) => ManagerStatus::Running,
            Lifecycle::Stopped => ManagerStatus::Stopped,
        }
    }
}
