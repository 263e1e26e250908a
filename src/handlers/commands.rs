use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::CONFIG;
use crate::handlers::responses::{
    build_status_report, busy_reply, help_text, styles_text, upload_reply,
};
use crate::llm::media::{EncodedImage, UploadedFile};
use crate::session::{Studio, UploadOutcome};
use crate::styles::ProfessionalStyle;
use crate::utils::timing::{complete_command_timer, start_command_timer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Styles,
    Style(String),
    Upload(String),
    Transform,
    Download(Option<String>),
    Status,
    Reset,
    Quit,
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Styles => "styles",
            Command::Style(_) => "style",
            Command::Upload(_) => "upload",
            Command::Transform => "transform",
            Command::Download(_) => "download",
            Command::Status => "status",
            Command::Reset => "reset",
            Command::Quit => "quit",
        }
    }
}

fn optional_arg(arg: &str) -> Option<String> {
    let trimmed = arg.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|value| value.strip_suffix('\''))
        })
        .unwrap_or(trimmed);
    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

/// Parses one input line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let (name, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    let name = name.trim_start_matches('/').to_lowercase();
    let arg = optional_arg(rest);

    let command = match name.as_str() {
        "help" | "?" => Command::Help,
        "styles" => Command::Styles,
        "style" | "select" => match arg {
            Some(arg) => Command::Style(arg),
            None => return Err("Usage: style <id|number>".to_string()),
        },
        "upload" | "open" => match arg {
            Some(arg) => Command::Upload(arg),
            None => return Err("Usage: upload <path>".to_string()),
        },
        "transform" | "go" => Command::Transform,
        "download" | "save" => Command::Download(arg),
        "status" => Command::Status,
        "reset" => Command::Reset,
        "quit" | "exit" => Command::Quit,
        other => {
            return Err(format!(
                "Unknown command: {other}. Type `help` to see commands."
            ))
        }
    };
    Ok(Some(command))
}

pub async fn upload_handler(studio: &mut Studio, path: &str) -> (String, &'static str) {
    if studio.is_processing() {
        return (busy_reply().to_string(), "busy");
    }

    let file = if path.starts_with("data:") {
        match EncodedImage::from_data_uri(path) {
            Ok(image) => UploadedFile::new(image.bytes().to_vec(), None),
            Err(err) => return (format!("Error: {err}"), "error"),
        }
    } else {
        match UploadedFile::read(&PathBuf::from(path)).await {
            Ok(file) => file,
            Err(err) => {
                warn!("Upload read failed: {err:#}");
                return (format!("Error: {err:#}"), "error");
            }
        }
    };

    let outcome = studio.upload(file);
    let reply = upload_reply(&outcome, studio.session());
    let status = match outcome {
        UploadOutcome::Accepted => "success",
        UploadOutcome::Rejected(_) => "rejected",
        UploadOutcome::Ignored => "busy",
    };
    (reply, status)
}

pub fn style_handler(studio: &mut Studio, value: &str) -> (String, &'static str) {
    let Some(style) = ProfessionalStyle::parse(value) else {
        let styles = styles_text(studio.session().selected_style());
        return (format!("Unknown style: {value}\n\n{styles}"), "error");
    };
    if !studio.select_style(style) {
        return (busy_reply().to_string(), "busy");
    }
    (format!("Style set to {} ({}).", style.label(), style.as_str()), "success")
}

pub fn transform_handler(studio: &mut Studio) -> (String, &'static str) {
    if studio.is_processing() {
        return (busy_reply().to_string(), "busy");
    }
    if studio.session().original_image().is_none() {
        return ("Load a photo first with `upload <path>`.".to_string(), "skipped");
    }
    if !CONFIG.has_api_key() {
        warn!("GEMINI_API_KEY is not set; the transform will fail");
    }

    studio.start_transform();
    let style = studio.session().selected_style();
    (
        format!(
            "Transforming into \"{}\"... This can take a while; you can keep typing commands.",
            style.label()
        ),
        "started",
    )
}

pub async fn download_handler(studio: &Studio, dir: Option<&str>) -> (String, &'static str) {
    let dir = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| CONFIG.download_dir.clone());
    match studio.download(&dir).await {
        Ok(path) => (format!("Saved {}", path.display()), "success"),
        Err(err) => (format!("Error: {err:#}"), "error"),
    }
}

/// Runs one command against the studio and returns the text to show.
/// `Quit` is left to the caller.
pub async fn handle_command(studio: &mut Studio, command: Command, input: &str) -> String {
    let mut timer = start_command_timer(command.name(), input);

    let (reply, status) = match &command {
        Command::Help => (help_text().trim().to_string(), "success"),
        Command::Styles => (styles_text(studio.session().selected_style()), "success"),
        Command::Style(value) => style_handler(studio, value),
        Command::Upload(path) => upload_handler(studio, path).await,
        Command::Transform => transform_handler(studio),
        Command::Download(dir) => download_handler(studio, dir.as_deref()).await,
        Command::Status => (build_status_report(studio.session()), "success"),
        Command::Reset => {
            studio.reset();
            info!("Session reset");
            ("Started over. Load a new photo with `upload <path>`.".to_string(), "success")
        }
        Command::Quit => (String::new(), "success"),
    };

    complete_command_timer(&mut timer, status, None);
    reply
}
