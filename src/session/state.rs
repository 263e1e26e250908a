use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::llm::media::{detect_mime_type, EncodedImage, UploadedFile, MAX_UPLOAD_BYTES};
use crate::llm::TransformError;
use crate::styles::ProfessionalStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("The file is too large ({size} bytes). The maximum size is 10 MB.")]
    TooLarge { size: usize },
    #[error("Only image files (JPG, PNG, WEBP, HEIC) can be uploaded.")]
    NotAnImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted,
    Rejected(UploadError),
    /// A transform is running; the upload was not looked at.
    Ignored,
}

/// Work handed to the transformer when a transform starts.
#[derive(Debug, Clone)]
pub struct TransformJob {
    pub image: EncodedImage,
    pub style: ProfessionalStyle,
}

/// Everything the user has done in one sitting. `Session::default()` is the
/// initial state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    original_image: Option<EncodedImage>,
    result_image: Option<EncodedImage>,
    status: SessionStatus,
    error: Option<String>,
    selected_style: ProfessionalStyle,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn original_image(&self) -> Option<&EncodedImage> {
        self.original_image.as_ref()
    }

    pub fn result_image(&self) -> Option<&EncodedImage> {
        self.result_image.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_processing(&self) -> bool {
        self.status == SessionStatus::Processing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_style(&self) -> ProfessionalStyle {
        self.selected_style
    }

    pub fn upload(&mut self, file: UploadedFile) -> UploadOutcome {
        if self.is_processing() {
            return UploadOutcome::Ignored;
        }

        let size = file.size();
        if size > MAX_UPLOAD_BYTES {
            return self.reject_upload(UploadError::TooLarge { size });
        }

        let mime_type = detect_mime_type(&file.bytes).filter(|mime| mime.starts_with("image/"));
        let Some(mime_type) = mime_type else {
            return self.reject_upload(UploadError::NotAnImage);
        };

        info!(
            name = ?file.display_name,
            mime_type = %mime_type,
            size,
            "Accepted upload"
        );
        self.original_image = Some(EncodedImage::new(file.bytes, mime_type));
        self.result_image = None;
        self.error = None;
        UploadOutcome::Accepted
    }

    fn reject_upload(&mut self, err: UploadError) -> UploadOutcome {
        warn!("Rejected upload: {:?}", err);
        self.error = Some(err.to_string());
        UploadOutcome::Rejected(err)
    }

    pub fn select_style(&mut self, style: ProfessionalStyle) -> bool {
        if self.is_processing() {
            return false;
        }
        self.selected_style = style;
        true
    }

    /// Moves to `Processing` and returns the job to run, or `None` when there
    /// is nothing to transform or a transform is already running.
    pub fn begin_transform(&mut self) -> Option<TransformJob> {
        if self.is_processing() {
            return None;
        }
        let image = self.original_image.clone()?;

        self.error = None;
        self.status = SessionStatus::Processing;
        Some(TransformJob {
            image,
            style: self.selected_style,
        })
    }

    /// Applies a transform outcome. Returns `false` if no transform was
    /// running, in which case nothing changes.
    pub fn finish_transform(&mut self, outcome: Result<EncodedImage, TransformError>) -> bool {
        if !self.is_processing() {
            return false;
        }

        match outcome {
            Ok(image) => {
                self.result_image = Some(image);
                self.error = None;
            }
            Err(err) => {
                // The previous result, if any, stays on screen.
                warn!("Transform failed: {}", err);
                self.error = Some(err.user_message().to_string());
            }
        }
        self.status = SessionStatus::Idle;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub fn download_file_name(at: DateTime<Utc>) -> String {
    format!("professional_profile_{}.png", at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::llm::media::sample_png;

    fn png_upload() -> UploadedFile {
        UploadedFile::new(sample_png(4, 4), Some("me.png".to_string()))
    }

    fn jpeg_upload(size: usize) -> UploadedFile {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.resize(size, 0);
        UploadedFile::new(bytes, Some("me.jpg".to_string()))
    }

    fn session_with_result() -> Session {
        let mut session = Session::new();
        assert_eq!(session.upload(png_upload()), UploadOutcome::Accepted);
        session.begin_transform().unwrap();
        session.finish_transform(Ok(EncodedImage::new(vec![1, 2, 3], "image/png")));
        session
    }

    #[test]
    fn initial_state_is_idle_and_empty() {
        let session = Session::new();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.original_image().is_none());
        assert!(session.result_image().is_none());
        assert!(session.error().is_none());
        assert_eq!(session.selected_style(), ProfessionalStyle::MaleSuit);
    }

    #[test]
    fn oversized_upload_only_sets_error() {
        let mut session = session_with_result();
        let before_original = session.original_image().cloned();
        let before_result = session.result_image().cloned();

        let outcome = session.upload(jpeg_upload(11 * 1024 * 1024));
        assert!(matches!(
            outcome,
            UploadOutcome::Rejected(UploadError::TooLarge { .. })
        ));
        assert!(!session.error().unwrap_or_default().is_empty());
        assert_eq!(session.original_image().cloned(), before_original);
        assert_eq!(session.result_image().cloned(), before_result);
    }

    #[test]
    fn eleven_mib_upload_on_fresh_session_leaves_no_image() {
        let mut session = Session::new();
        session.upload(jpeg_upload(11 * 1024 * 1024));
        assert!(session.error().unwrap().contains("10 MB"));
        assert!(session.original_image().is_none());
    }

    #[tokio::test]
    async fn oversized_file_on_disk_is_rejected_by_declared_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.jpg");
        std::fs::File::create(&path)
            .unwrap()
            .set_len(MAX_UPLOAD_BYTES as u64 + 1)
            .unwrap();

        let mut session = session_with_result();
        let before_result = session.result_image().cloned();
        let file = UploadedFile::read(&path).await.unwrap();
        assert!(file.bytes.is_empty());

        assert_eq!(
            session.upload(file),
            UploadOutcome::Rejected(UploadError::TooLarge {
                size: MAX_UPLOAD_BYTES + 1
            })
        );
        assert!(session.error().unwrap().contains("10 MB"));
        assert_eq!(session.original_image().unwrap().mime_type(), "image/png");
        assert_eq!(session.result_image().cloned(), before_result);
    }

    #[test]
    fn exactly_ten_mib_is_accepted() {
        let mut session = Session::new();
        assert_eq!(
            session.upload(jpeg_upload(MAX_UPLOAD_BYTES)),
            UploadOutcome::Accepted
        );
    }

    #[test]
    fn non_image_upload_is_rejected() {
        let mut session = Session::new();
        let outcome = session.upload(UploadedFile::new(b"%PDF-1.7 not a photo".to_vec(), None));
        assert_eq!(outcome, UploadOutcome::Rejected(UploadError::NotAnImage));
        assert!(session.original_image().is_none());
        assert!(session.error().is_some());
    }

    #[test]
    fn valid_upload_clears_error_and_result() {
        let mut session = session_with_result();
        session.upload(jpeg_upload(11 * 1024 * 1024));
        assert!(session.error().is_some());

        assert_eq!(session.upload(jpeg_upload(2048)), UploadOutcome::Accepted);
        assert!(session.error().is_none());
        assert!(session.result_image().is_none());
        assert_eq!(session.original_image().unwrap().mime_type(), "image/jpeg");
    }

    #[test]
    fn upload_keeps_bytes_verbatim() {
        let bytes = sample_png(5, 3);
        let mut session = Session::new();
        session.upload(UploadedFile::new(bytes.clone(), None));

        let uri = session.original_image().unwrap().to_data_uri();
        let decoded = EncodedImage::from_data_uri(&uri).unwrap();
        assert_eq!(decoded.bytes(), bytes.as_slice());
    }

    #[test]
    fn start_without_image_is_a_no_op() {
        let mut session = Session::new();
        session.select_style(ProfessionalStyle::ModernGray);
        let before = session.clone();
        assert!(session.begin_transform().is_none());
        assert_eq!(session, before);
    }

    #[test]
    fn start_while_processing_is_a_no_op() {
        let mut session = Session::new();
        session.upload(png_upload());
        assert!(session.begin_transform().is_some());
        let before = session.clone();
        assert!(session.begin_transform().is_none());
        assert_eq!(session, before);
    }

    #[test]
    fn inputs_are_locked_while_processing() {
        let mut session = Session::new();
        session.upload(png_upload());
        session.begin_transform().unwrap();

        assert!(!session.select_style(ProfessionalStyle::SmartCasual));
        assert_eq!(session.upload(jpeg_upload(1024)), UploadOutcome::Ignored);
        assert_eq!(session.selected_style(), ProfessionalStyle::MaleSuit);
        assert_eq!(session.original_image().unwrap().mime_type(), "image/png");
    }

    #[test]
    fn job_carries_selected_style_and_clears_error() {
        let mut session = Session::new();
        session.upload(png_upload());
        session.select_style(ProfessionalStyle::FemaleSuit);
        session.begin_transform().unwrap();
        session.finish_transform(Err(TransformError::NoImageProduced));
        assert!(session.error().is_some());

        let job = session.begin_transform().unwrap();
        assert_eq!(job.style, ProfessionalStyle::FemaleSuit);
        assert!(session.error().is_none());
        assert!(session.is_processing());
    }

    #[test]
    fn success_stores_result_and_returns_to_idle() {
        let mut session = Session::new();
        session.upload(png_upload());
        session.begin_transform().unwrap();
        let payload = EncodedImage::new(vec![4, 5, 6], "image/png");
        assert!(session.finish_transform(Ok(payload.clone())));

        assert_eq!(session.result_image(), Some(&payload));
        assert!(session.error().is_none());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn failure_keeps_previous_result() {
        let mut session = session_with_result();
        let previous = session.result_image().cloned();

        session.begin_transform().unwrap();
        session.finish_transform(Err(TransformError::UpstreamFailure("500".to_string())));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(!session.error().unwrap().is_empty());
        assert_eq!(session.result_image().cloned(), previous);
    }

    #[test]
    fn completion_without_running_transform_is_ignored() {
        let mut session = Session::new();
        assert!(!session.finish_transform(Err(TransformError::NoImageProduced)));
        assert_eq!(session, Session::new());
    }

    #[test]
    fn reset_restores_initial_state_from_anywhere() {
        let mut processing = Session::new();
        processing.upload(png_upload());
        processing.select_style(ProfessionalStyle::MinimalWhite);
        processing.begin_transform().unwrap();

        let mut errored = Session::new();
        errored.upload(jpeg_upload(11 * 1024 * 1024));

        for mut session in [processing, errored, session_with_result(), Session::new()] {
            session.reset();
            assert_eq!(session, Session::default());
        }
    }

    #[test]
    fn download_name_uses_epoch_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            download_file_name(at),
            "professional_profile_1700000000123.png"
        );
    }
}
