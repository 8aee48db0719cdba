//! Diagnostic captures taken at every transition

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::PageDriver;
use ticketpilot_core_types::{RunId, SnapshotRef};
use tracing::debug;

use crate::errors::FlowError;
use crate::types::{FlowState, StepStatus};

#[async_trait]
pub trait SnapshotPort: Send + Sync {
    /// Captures the page as it is after step number `seq` (1-based).
    async fn capture(
        &self,
        seq: usize,
        state: FlowState,
        status: StepStatus,
    ) -> Result<SnapshotRef, FlowError>;
}

/// Writes full-page PNGs named `<run>_<seq>_<state>_<status>.png`.
pub struct PageSnapshotRecorder {
    page: Arc<dyn PageDriver>,
    dir: PathBuf,
    run_id: RunId,
}

impl PageSnapshotRecorder {
    pub fn new(page: Arc<dyn PageDriver>, dir: impl Into<PathBuf>, run_id: RunId) -> Self {
        Self {
            page,
            dir: dir.into(),
            run_id,
        }
    }

    pub fn file_name(&self, seq: usize, state: FlowState, status: StepStatus) -> String {
        format!("{}_{seq:02}_{state}_{status}.png", self.run_id.short())
    }
}

#[async_trait]
impl SnapshotPort for PageSnapshotRecorder {
    async fn capture(
        &self,
        seq: usize,
        state: FlowState,
        status: StepStatus,
    ) -> Result<SnapshotRef, FlowError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| FlowError::Snapshot(format!("{}: {err}", self.dir.display())))?;
        let path = self.dir.join(self.file_name(seq, state, status));
        self.page.capture_snapshot(&path).await?;
        debug!(path = %path.display(), "snapshot written");
        Ok(SnapshotRef(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::scripted::ScriptedPage;

    #[tokio::test]
    async fn recorder_names_files_by_step() {
        let dir = tempfile::tempdir().unwrap();
        let page = ScriptedPage::new();
        let run = RunId("abcdef0123456789".into());
        let recorder =
            PageSnapshotRecorder::new(Arc::new(page.clone()), dir.path().join("shots"), run);

        let snapshot = recorder
            .capture(3, FlowState::SelectOptions, StepStatus::Skipped)
            .await
            .unwrap();
        assert_eq!(
            snapshot.path().file_name().unwrap().to_str().unwrap(),
            "abcdef01_03_select_options_skipped.png"
        );
        assert!(snapshot.path().exists());
        assert_eq!(page.snapshots(), vec![snapshot.path().to_path_buf()]);
    }
}
