pub mod gemini;
pub mod media;

use async_trait::async_trait;

use crate::styles::ProfessionalStyle;
use media::EncodedImage;

pub use gemini::{GeminiTransformer, PORTRAIT_MODEL};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("no image was returned by the model")]
    NoImageProduced,
    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),
}

impl TransformError {
    /// Text shown to the user in place of the raw failure detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            TransformError::NoImageProduced => {
                "The service did not return a result image. Please try again."
            }
            TransformError::UpstreamFailure(_) => {
                "An error occurred while transforming the image. Please try again."
            }
        }
    }
}

/// Restyles a portrait. One call is one request to the backing service.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(
        &self,
        image: &EncodedImage,
        style: ProfessionalStyle,
    ) -> Result<EncodedImage, TransformError>;
}
