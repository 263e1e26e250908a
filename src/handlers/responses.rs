use std::fmt::Write as _;

use crate::llm::media::{format_size, EncodedImage};
use crate::llm::PORTRAIT_MODEL;
use crate::session::{Session, SessionStatus, TransformCompletion, UploadOutcome};
use crate::styles::ProfessionalStyle;

pub fn welcome_text() -> String {
    format!(
        "AI Professional Portrait Studio (powered by {PORTRAIT_MODEL})\n\
         Load a selfie or casual photo and turn it into a polished resume-ready portrait.\n\
         Type `help` to see commands."
    )
}

pub fn help_text() -> &'static str {
    "
Commands

upload <path|data-uri> - Load a photo (JPG, PNG, WEBP, HEIC; up to 10 MB)
styles - List the available styles
style <id|number> - Pick a style, e.g. `style minimal_white` or `style 4`
transform - Turn the loaded photo into a professional portrait
download [dir] - Save the result as professional_profile_<timestamp>.png
status - Show the current photo, style and result
reset - Start over
quit - Leave the studio
"
}

pub fn styles_text(selected: ProfessionalStyle) -> String {
    let mut text = String::from("Styles\n");
    for (index, style) in ProfessionalStyle::ALL.iter().enumerate() {
        let marker = if *style == selected { "*" } else { " " };
        let _ = writeln!(
            text,
            "{marker} {}. {:<14} {}",
            index + 1,
            style.as_str(),
            style.label()
        );
    }
    text
}

fn describe_image(image: &EncodedImage) -> String {
    let mut text = format!("{}, {}", image.mime_type(), format_size(image.len()));
    if let Some((width, height)) = image.dimensions() {
        let _ = write!(text, ", {width}x{height}");
    }
    text
}

pub fn build_status_report(session: &Session) -> String {
    let status = match session.status() {
        SessionStatus::Idle => "idle",
        SessionStatus::Processing => "transforming...",
    };
    let style = session.selected_style();
    let photo = session
        .original_image()
        .map(describe_image)
        .unwrap_or_else(|| "none".to_string());
    let result = session
        .result_image()
        .map(describe_image)
        .unwrap_or_else(|| "none".to_string());

    let mut report = format!(
        "Status: {status}\nPhoto: {photo}\nStyle: {} ({})\nResult: {result}",
        style.label(),
        style.as_str()
    );
    if let Some(error) = session.error() {
        let _ = write!(report, "\nError: {error}");
    }
    report
}

pub fn upload_reply(outcome: &UploadOutcome, session: &Session) -> String {
    match outcome {
        UploadOutcome::Accepted => {
            let detail = session
                .original_image()
                .map(describe_image)
                .unwrap_or_default();
            format!("Photo loaded ({detail}). Pick a style and type `transform`.")
        }
        UploadOutcome::Rejected(err) => format!("Error: {err}"),
        UploadOutcome::Ignored => busy_reply().to_string(),
    }
}

pub fn busy_reply() -> &'static str {
    "A transform is in progress. Please wait for it to finish."
}

pub fn completion_reply(completion: TransformCompletion, session: &Session) -> String {
    match completion {
        TransformCompletion::Succeeded => {
            let detail = session
                .result_image()
                .map(describe_image)
                .unwrap_or_default();
            format!(
                "Your professional portrait is ready ({detail}).\n\
                 Type `download` to save it, or pick another style and `transform` again."
            )
        }
        TransformCompletion::Failed => format!(
            "Error: {}",
            session
                .error()
                .unwrap_or("An error occurred while transforming the image.")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::media::{sample_png, UploadedFile};
    use crate::llm::TransformError;

    #[test]
    fn styles_list_marks_selection() {
        let text = styles_text(ProfessionalStyle::SmartCasual);
        assert!(text.contains("* 3. SMART_CASUAL"));
        assert!(text.contains("  1. MALE_SUIT"));
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn status_report_describes_photo_and_error() {
        let mut session = Session::new();
        assert!(build_status_report(&session).contains("Photo: none"));

        session.upload(UploadedFile::new(sample_png(6, 4), None));
        session.begin_transform();
        session.finish_transform(Err(TransformError::NoImageProduced));

        let report = build_status_report(&session);
        assert!(report.contains("image/png"));
        assert!(report.contains("6x4"));
        assert!(report.contains("Error: The service did not return a result image."));
    }

    #[test]
    fn failed_completion_shows_session_error() {
        let mut session = Session::new();
        session.upload(UploadedFile::new(sample_png(2, 2), None));
        session.begin_transform();
        session.finish_transform(Err(TransformError::UpstreamFailure("x".into())));

        let reply = completion_reply(TransformCompletion::Failed, &session);
        assert!(reply.starts_with("Error: An error occurred"));
    }
}
