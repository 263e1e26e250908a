use std::error::Error;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use dotenvy::dotenv;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

mod config;
mod handlers;
mod llm;
mod session;
mod styles;
mod utils;

use config::CONFIG;
use handlers::commands::{handle_command, parse_command, Command};
use handlers::responses::{completion_reply, styles_text, welcome_text};
use llm::media::UploadedFile;
use llm::GeminiTransformer;
use session::{Studio, TransformCompletion, UploadOutcome};
use styles::ProfessionalStyle;
use utils::logging::init_logging;

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TransformArgs {
    image: PathBuf,
    style: ProfessionalStyle,
    out_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    Interactive,
    Styles,
    Transform(TransformArgs),
}

fn usage() -> &'static str {
    "Usage: portrait_studio [transform --image <path> [--style <id|number>] [--out <dir>] | styles]\n\
     Without arguments an interactive session starts."
}

fn parse_cli_args(args: &[String]) -> anyhow::Result<CliMode> {
    match args.get(1).map(|value| value.as_str()) {
        None => return Ok(CliMode::Interactive),
        Some("styles") => return Ok(CliMode::Styles),
        Some("transform") => {}
        Some("--help" | "-h" | "help") => bail!(usage()),
        Some(other) => bail!("Unknown command: {other}\n{}", usage()),
    }

    let mut image: Option<PathBuf> = None;
    let mut style = ProfessionalStyle::default();
    let mut out_dir = CONFIG.download_dir.clone();

    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--image" | "-i" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --image"))?;
                image = Some(PathBuf::from(value));
            }
            "--style" | "-s" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --style"))?;
                style = ProfessionalStyle::parse(value)
                    .ok_or_else(|| anyhow!("Invalid --style value: {value}"))?;
            }
            "--out" | "-o" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --out"))?;
                out_dir = PathBuf::from(value);
            }
            "--help" | "-h" => bail!(usage()),
            other => bail!("Unknown transform argument: {other}\n{}", usage()),
        }
        index += 1;
    }

    let image = image.ok_or_else(|| anyhow!("--image is required"))?;
    Ok(CliMode::Transform(TransformArgs {
        image,
        style,
        out_dir,
    }))
}

async fn run_transform(studio: &mut Studio, args: TransformArgs) -> anyhow::Result<()> {
    let file = UploadedFile::read(&args.image).await?;
    if let UploadOutcome::Rejected(err) = studio.upload(file) {
        bail!(err);
    }
    studio.select_style(args.style);

    println!("Transforming {} into \"{}\"...", args.image.display(), args.style.label());
    match studio.transform().await {
        Some(TransformCompletion::Succeeded) => {}
        _ => {
            let message = studio
                .session()
                .error()
                .unwrap_or("The transform did not run.")
                .to_string();
            bail!(message);
        }
    }

    let path = studio.download(&args.out_dir).await?;
    println!("Saved {}", path.display());
    Ok(())
}

fn print_prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn run_interactive<R>(studio: &mut Studio, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut interrupted = false;
    println!("{}", welcome_text());
    print_prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        let reply = handle_command(studio, command, &line).await;
                        println!("{reply}");
                    }
                    Err(message) => println!("{message}"),
                }
                print_prompt();
            }
            completion = studio.wait_for_completion(), if studio.is_processing() => {
                if let Some(completion) = completion {
                    println!("\n{}", completion_reply(completion, studio.session()));
                    print_prompt();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                interrupted = true;
                break;
            }
        }
    }

    if studio.is_processing() {
        if interrupted {
            warn!("Interrupted while a transform is still running; its result is dropped");
        } else {
            println!("\nWaiting for the running transform to finish...");
            if let Some(completion) = studio.wait_for_completion().await {
                println!("{}", completion_reply(completion, studio.session()));
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging();

    let args: Vec<String> = std::env::args().collect();
    let mode = match parse_cli_args(&args) {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if !CONFIG.has_api_key() {
        warn!("GEMINI_API_KEY is not set; transforms will fail until it is configured");
    }

    let transformer = Arc::new(GeminiTransformer::from_config(&CONFIG));
    let mut studio = Studio::new(transformer);

    match mode {
        CliMode::Styles => {
            print!("{}", styles_text(ProfessionalStyle::default()));
        }
        CliMode::Transform(transform_args) => {
            info!("Running one-shot transform for {}", transform_args.image.display());
            if let Err(err) = run_transform(&mut studio, transform_args).await {
                error!("One-shot transform failed: {err:#}");
                eprintln!("Error: {err:#}");
                std::process::exit(1);
            }
        }
        CliMode::Interactive => {
            info!("Starting interactive portrait studio");
            run_interactive(&mut studio, BufReader::new(tokio::io::stdin())).await?;
        }
    }

    Ok(())
}
