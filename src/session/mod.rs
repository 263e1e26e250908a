pub mod state;
pub mod studio;

pub use state::{Session, SessionStatus, UploadOutcome};
pub use studio::{Studio, TransformCompletion};
