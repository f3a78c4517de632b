//! Apostila - Interactive Study-Guide Renderer
//!
//! Command line entry point: mounts a study guide in a headless host page,
//! applies the requested actions and prints the rendered page.

use apostila::network::{DocumentId, MemoryGateway};
use apostila::ui::{FontStep, HostPage, LoggingSynthesizer, SpeechChannel};
use apostila::{NAME, RendererConfig, VERSION, Viewer};
use std::env;
use std::path::PathBuf;
use std::rc::Rc;

const LOCAL_ID: &str = "local";

/// Parsed command line
#[derive(Debug, Default)]
struct CliOptions {
    input: PathBuf,
    config: Option<PathBuf>,
    collapse: Vec<String>,
    theme: bool,
    font_up: u32,
    font_down: u32,
    edit: Option<String>,
    text: Option<String>,
}

fn usage() -> String {
    format!(
        "{NAME} v{VERSION}\n\
         usage: apostila <file.html> [--config cfg.json] [--collapse KEY]... [--theme]\n\
         \x20                [--font-up N] [--font-down N] [--edit KEY --text TEXT]"
    )
}

fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut input = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--config" => options.config = Some(PathBuf::from(value("--config")?)),
            "--collapse" => options.collapse.push(value("--collapse")?),
            "--theme" => options.theme = true,
            "--font-up" => options.font_up = parse_count(&value("--font-up")?)?,
            "--font-down" => options.font_down = parse_count(&value("--font-down")?)?,
            "--edit" => options.edit = Some(value("--edit")?),
            "--text" => options.text = Some(value("--text")?),
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            path if input.is_none() => input = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument {extra}")),
        }
    }

    options.input = input.ok_or_else(|| "missing input file".to_string())?;
    if options.edit.is_some() != options.text.is_some() {
        return Err("--edit and --text go together".to_string());
    }
    Ok(options)
}

fn parse_count(value: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("expected a count, got {value:?}"))
}

fn edited_path(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "apostila".to_string());
    input.with_file_name(format!("{stem}.edited.html"))
}

async fn run(options: CliOptions) -> apostila::Result<()> {
    let config = match &options.config {
        Some(path) => RendererConfig::load(path)?,
        None => RendererConfig::default(),
    };
    let raw = std::fs::read_to_string(&options.input)?;

    let gateway = Rc::new(MemoryGateway::new());
    gateway.insert(LOCAL_ID, raw, false);
    let host = Rc::new(HostPage::new());
    let speech = SpeechChannel::new(Box::new(LoggingSynthesizer::new()));
    let viewer = Viewer::new(config, Rc::clone(&host), gateway.clone(), speech)?;

    viewer.open(DocumentId::new(LOCAL_ID)).await?;
    if let Some(report) = viewer.report() {
        log::info!(
            "{} sections, cover: {}, schema violations: {}",
            report.sections.len(),
            report.has_cover,
            report.schema_violations.len()
        );
    }

    if let (Some(key), Some(text)) = (&options.edit, &options.text) {
        let mut session = viewer.open_editor(key)?;
        session.set_text(text.as_str());
        let tier = viewer.commit_edit(&session).await?;
        if let Some(document) = viewer.document() {
            let path = edited_path(&options.input);
            std::fs::write(&path, document.raw_html())?;
            log::info!("wrote {} ({:?})", path.display(), tier);
        }
    }

    if let Some(controller) = viewer.controller() {
        for key in &options.collapse {
            if let Err(e) = controller.toggle_section(key) {
                if let Some(message) = e.user_message() {
                    eprintln!("{message}");
                }
            }
        }
        if options.theme {
            controller.toggle_theme();
        }
        for _ in 0..options.font_up {
            controller.step_font(FontStep::Up);
        }
        for _ in 0..options.font_down {
            controller.step_font(FontStep::Down);
        }
    }

    println!("{}", host.render()?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", usage());
        return;
    }
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}\n{}", usage());
            std::process::exit(2);
        }
    };

    if let Err(e) = run(options).await {
        eprintln!("{}", e.user_message().unwrap_or_else(|| e.to_string()));
        std::process::exit(1);
    }
}
