use std::error::Error;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use accessnow::dom::{Document, Element};
use accessnow::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig};
use accessnow::popup::{PopupController, PopupServices, PopupView};
use accessnow::relay::{self, RelayConfig};
use accessnow::settings::{AccessibilitySettings, DisplayMode, SyncStorage, Theme};
use accessnow::speech::{HeadlessSpeech, ReadButton};
use accessnow::summary::{DEFAULT_RELAY_URL, RelayClient};
use accessnow::text::{bullet_items, format_as_bullets, generate_answer, local_summary, simplify_text};
use accessnow::{InProcessTab, build_css};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "accessnow", about = "Accessibility styling, page Q&A and AI summaries", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the summarization relay.
    Serve {
        /// Interface to bind.
        #[arg(long, env = "ACCESSNOW_HOST", default_value = "0.0.0.0")]
        host: IpAddr,
        /// Port to listen on.
        #[arg(long, env = "PORT", default_value_t = relay::DEFAULT_PORT)]
        port: u16,
        /// Key for the generative-language API.
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Model used for summaries.
        #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
        model: String,
        /// Base URL of the generative-language API.
        #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// Upstream request timeout in seconds; unlimited when unset.
        #[arg(long, env = "ACCESSNOW_UPSTREAM_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,
    },
    /// Print the stylesheet injected for the given settings.
    Css {
        #[arg(long, default_value = "default")]
        theme: String,
        #[arg(long, default_value_t = 16)]
        font_size: u32,
        #[arg(long, default_value_t = 0.0)]
        letter_spacing: f64,
        #[arg(long, default_value_t = 1.5)]
        line_height: f64,
        #[arg(long)]
        dyslexia_font: bool,
    },
    /// Answer a question from a text file by keyword match.
    Answer {
        #[arg(long)]
        file: PathBuf,
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Render a text file as reading-mode bullets.
    Bullets {
        #[arg(long)]
        file: PathBuf,
    },
    /// Offline word-count summary and simplified text.
    Digest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run a popup session against a text file: extract, summarize, answer.
    Analyze {
        /// Text file; blank lines separate paragraphs.
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        relay_url: String,
        /// Relay request timeout in seconds; unlimited when unset.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Preference file; in-memory only when unset.
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long)]
        question: Option<String>,
        /// Start reading the summary after analysis.
        #[arg(long)]
        read_aloud: bool,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Visual,
    Reading,
}

impl From<ModeArg> for DisplayMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Visual => DisplayMode::Visual,
            ModeArg::Reading => DisplayMode::Reading,
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    // Loaded before parsing so `.env` values feed the `env` fallbacks.
    let env_file = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing();
    match env_file {
        Ok(path) => debug!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => debug!("no .env file found"),
        Err(err) => warn!(error = %err, "failed to load .env file"),
    }
    match cli.command {
        Command::Serve {
            host,
            port,
            api_key,
            model,
            base_url,
            timeout_secs,
        } => {
            let config = RelayConfig {
                addr: SocketAddr::new(host, port),
                gemini: GeminiConfig {
                    api_key,
                    base_url,
                    model,
                    timeout: timeout_secs.map(Duration::from_secs),
                },
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(relay::serve(config))?;
            Ok(())
        }
        Command::Css {
            theme,
            font_size,
            letter_spacing,
            line_height,
            dyslexia_font,
        } => {
            let settings = AccessibilitySettings {
                theme: Theme::from_name(&theme),
                font_size,
                letter_spacing,
                line_height,
                dyslexia_font,
            };
            handle_css(&settings, cli.json)
        }
        Command::Answer { file, question } => handle_answer(&file, &question.join(" "), cli.json),
        Command::Bullets { file } => handle_bullets(&file, cli.json),
        Command::Digest { file } => handle_digest(&file, cli.json),
        Command::Analyze {
            file,
            relay_url,
            timeout_secs,
            state,
            mode,
            question,
            read_aloud,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(handle_analyze(AnalyzeArgs {
                file,
                relay_url,
                timeout: timeout_secs.map(Duration::from_secs),
                state,
                mode: mode.map(DisplayMode::from),
                question,
                read_aloud,
                as_json: cli.json,
            }))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_text(path: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(path).map_err(|err| format!("Failed to read {}: {err}", path.display()).into())
}

fn handle_css(settings: &AccessibilitySettings, as_json: bool) -> Result<(), Box<dyn Error>> {
    let css = build_css(settings);
    if as_json {
        let payload = json!({ "settings": settings.normalized(), "css": css });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{css}");
    }
    Ok(())
}

fn handle_answer(path: &Path, question: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    if question.trim().is_empty() {
        return Err("Question cannot be empty".into());
    }
    let text = read_text(path)?;
    let answer = generate_answer(&text, question);
    if as_json {
        let payload = json!({ "question": question, "answer": answer });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{answer}");
    }
    Ok(())
}

fn handle_bullets(path: &Path, as_json: bool) -> Result<(), Box<dyn Error>> {
    let text = read_text(path)?;
    if as_json {
        let payload = json!({ "items": bullet_items(&text), "html": format_as_bullets(&text) });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for item in bullet_items(&text) {
            println!("- {item}");
        }
    }
    Ok(())
}

fn handle_digest(path: &Path, as_json: bool) -> Result<(), Box<dyn Error>> {
    let text = read_text(path)?;
    let summary = local_summary(&text);
    let simplified = simplify_text(&text);
    if as_json {
        let payload = json!({ "summary": summary, "simplified": simplified });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Summary:\n{summary}\n\nSimplified:\n{simplified}");
    }
    Ok(())
}

struct AnalyzeArgs {
    file: PathBuf,
    relay_url: String,
    timeout: Option<Duration>,
    state: Option<PathBuf>,
    mode: Option<DisplayMode>,
    question: Option<String>,
    read_aloud: bool,
    as_json: bool,
}

fn document_from_text(text: &str) -> Document {
    let paragraphs = text
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| Element::with_text("p", block))
        .collect();
    Document::new(paragraphs)
}

async fn handle_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let text = read_text(&args.file)?;
    let storage = match &args.state {
        Some(path) => SyncStorage::persistent(path)?,
        None => SyncStorage::ephemeral(),
    };
    let speech = HeadlessSpeech::new();
    let services = PopupServices {
        storage: Arc::new(storage),
        page: Arc::new(InProcessTab::new(document_from_text(&text))),
        summarizer: Arc::new(RelayClient::new(args.relay_url, args.timeout)?),
        speech: Arc::new(speech.clone()),
    };

    let mut popup = PopupController::open(services).await;
    if let Some(mode) = args.mode {
        popup.set_mode(mode).await;
    }
    popup.analyze().await;
    if let Some(question) = &args.question {
        popup.ask(question);
    }
    let mut spoken = None;
    if args.read_aloud {
        popup.read_aloud(ReadButton::Main);
        spoken = popup
            .session()
            .current_utterance
            .as_ref()
            .map(|utterance| utterance.text.clone());
        // Headless playback has nothing to wait for.
        if spoken.is_some() {
            speech.finish();
            popup.speech_finished();
        }
    }
    let alerts = popup.take_alerts();
    print_view(popup.view(), spoken.as_deref(), &alerts, args.as_json)
}

fn print_view(
    view: &PopupView,
    spoken: Option<&str>,
    alerts: &[String],
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload = json!({
            "mode": view.body_class,
            "summary": view.summary.text,
            "summary_html": view.summary.html,
            "answer": view.answer,
            "spoken": spoken,
            "alerts": alerts,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    for alert in alerts {
        println!("! {alert}");
    }
    if view.results_visible {
        println!("Summary:");
        println!("{}", view.summary.html.as_deref().unwrap_or(&view.summary.text));
    }
    if let Some(answer) = &view.answer {
        println!("\nAnswer:\n{answer}");
    }
    if let Some(text) = spoken {
        println!("\nRead aloud:\n{text}");
    }
    Ok(())
}
