use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::llm::media::{EncodedImage, UploadedFile};
use crate::llm::{ImageTransformer, TransformError};
use crate::session::state::{download_file_name, Session, UploadOutcome};
use crate::styles::ProfessionalStyle;

type TransformResult = Result<EncodedImage, TransformError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformCompletion {
    Succeeded,
    Failed,
}

/// Owns the session and runs transforms in the background. Results come
/// back over a oneshot channel and are applied on the caller's task.
pub struct Studio {
    session: Session,
    transformer: Arc<dyn ImageTransformer>,
    pending: Option<oneshot::Receiver<TransformResult>>,
}

impl Studio {
    pub fn new(transformer: Arc<dyn ImageTransformer>) -> Self {
        Self {
            session: Session::new(),
            transformer,
            pending: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_processing(&self) -> bool {
        self.session.is_processing()
    }

    pub fn upload(&mut self, file: UploadedFile) -> UploadOutcome {
        self.session.upload(file)
    }

    pub fn select_style(&mut self, style: ProfessionalStyle) -> bool {
        self.session.select_style(style)
    }

    /// Starts a transform unless one is running or nothing is uploaded.
    pub fn start_transform(&mut self) -> bool {
        let Some(job) = self.session.begin_transform() else {
            return false;
        };

        info!(style = job.style.as_str(), bytes = job.image.len(), "Starting transform");
        let (sender, receiver) = oneshot::channel();
        let transformer = Arc::clone(&self.transformer);
        tokio::spawn(async move {
            let outcome = transformer.transform(&job.image, job.style).await;
            // The receiver is gone if the session was reset meanwhile.
            let _ = sender.send(outcome);
        });
        self.pending = Some(receiver);
        true
    }

    /// Waits for the running transform and applies its outcome. Returns
    /// `None` when nothing is running. Dropping the future before it
    /// resolves leaves the transform pending.
    pub async fn wait_for_completion(&mut self) -> Option<TransformCompletion> {
        let receiver = self.pending.as_mut()?;
        let outcome = receiver.await.unwrap_or_else(|_| {
            Err(TransformError::UpstreamFailure(
                "transform task ended without a result".to_string(),
            ))
        });
        self.pending = None;

        let completion = if outcome.is_ok() {
            TransformCompletion::Succeeded
        } else {
            TransformCompletion::Failed
        };
        self.session.finish_transform(outcome);
        Some(completion)
    }

    /// Starts a transform and waits for it.
    pub async fn transform(&mut self) -> Option<TransformCompletion> {
        if !self.start_transform() {
            return None;
        }
        self.wait_for_completion().await
    }

    pub fn reset(&mut self) {
        if self.pending.take().is_some() {
            warn!("Reset while a transform was running; its result will be discarded");
        }
        self.session.reset();
    }

    /// Writes the result image into `dir` and returns the file path.
    pub async fn download(&self, dir: &Path) -> Result<PathBuf> {
        let image = self
            .session
            .result_image()
            .ok_or_else(|| anyhow!("There is no result image to download yet."))?;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(download_file_name(Utc::now()));
        tokio::fs::write(&path, image.bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = image.len(), "Saved result image");
        Ok(path)
    }
}
