//! A simple program demonstrates how to use `react-agent` as a library.
//!
//! It asks one question read from stdin and prints the reasoning trace and
//! the final answer. Everything is configured through environment variables.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use react_agent::SessionBuilder;
use react_agent::core::{ActionPolicy, Error, Language, TranscriptSource};
use react_agent_ollama_model::{OllamaConfigBuilder, OllamaProvider};
use react_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    OpenAI,
    Ollama,
}

/// Options read from the environment.
struct Settings {
    backend: Backend,
    language: Language,
    max_turns: Option<usize>,
    action_policy: ActionPolicy,
    extraction_step: bool,
    call_timeout: Option<Duration>,
    wikipedia_endpoint: Option<String>,
}

impl Settings {
    fn from_env() -> Result<Self, String> {
        let backend = match env_var("AGENT_BACKEND").as_deref() {
            None | Some("openai") => Backend::OpenAI,
            Some("ollama") => Backend::Ollama,
            Some(other) => return Err(format!("unknown AGENT_BACKEND: {other}")),
        };
        let language = match env_var("AGENT_LANGUAGE").as_deref() {
            None | Some("pt") => Language::Portuguese,
            Some("en") => Language::English,
            Some(other) => {
                return Err(format!("unknown AGENT_LANGUAGE: {other}"));
            }
        };
        let action_policy = match env_var("AGENT_ACTION_POLICY").as_deref() {
            None | Some("single") => ActionPolicy::SingleAction,
            Some("all") => ActionPolicy::AllActionsPerTurn,
            Some(other) => {
                return Err(format!("unknown AGENT_ACTION_POLICY: {other}"));
            }
        };
        let extraction_step = matches!(
            env_var("AGENT_EXTRACTION").as_deref(),
            Some("1" | "true" | "yes")
        );

        Ok(Self {
            backend,
            language,
            max_turns: parse_env("AGENT_MAX_TURNS")?,
            action_policy,
            extraction_step,
            call_timeout: parse_env("AGENT_CALL_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            wikipedia_endpoint: env_var("WIKIPEDIA_ENDPOINT"),
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    env_var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| format!("invalid {name}: {value}"))
        })
        .transpose()
}

fn session_builder(backend: Backend) -> Result<SessionBuilder, String> {
    match backend {
        Backend::OpenAI => {
            let Some(api_key) = env_var("OPENAI_API_KEY") else {
                return Err(
                    "OPENAI_API_KEY environment variable is not set".to_owned()
                );
            };
            let mut config = OpenAIConfigBuilder::with_api_key(api_key);
            if let Some(base_url) = env_var("OPENAI_BASE_URL") {
                config = config.with_base_url(base_url);
            }
            if let Some(model) = env_var("OPENAI_MODEL") {
                config = config.with_model(model);
            }
            Ok(SessionBuilder::with_model_provider(OpenAIProvider::new(
                config.build(),
            )))
        }
        Backend::Ollama => {
            let mut config = match env_var("OLLAMA_MODEL") {
                Some(model) => OllamaConfigBuilder::with_model(model),
                None => OllamaConfigBuilder::default(),
            };
            if let Some(base_url) = env_var("OLLAMA_BASE_URL") {
                config = config.with_base_url(base_url);
            }
            Ok(SessionBuilder::with_model_provider(OllamaProvider::new(
                config.build(),
            )))
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let mut builder = match session_builder(settings.backend) {
        Ok(builder) => builder,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let (transcript_tx, mut transcript_rx) = mpsc::unbounded_channel();
    builder = builder
        .with_language(settings.language)
        .with_action_policy(settings.action_policy)
        .with_extraction_step(settings.extraction_step)
        .on_transcript(move |transcript, source| {
            transcript_tx.send((transcript.to_owned(), source)).ok();
        });
    if let Some(max_turns) = settings.max_turns {
        builder = builder.with_max_turns(max_turns);
    }
    if let Some(timeout) = settings.call_timeout {
        builder = builder.with_call_timeout(timeout);
    }
    if let Some(endpoint) = settings.wikipedia_endpoint {
        builder = builder.with_wikipedia_endpoint(endpoint);
    }
    let session = builder.build();

    print!("Ask a question: ");
    std::io::stdout().flush().ok();
    let Some(question) = read_line().await else {
        return ExitCode::FAILURE;
    };
    let question = question.trim();
    if question.is_empty() {
        eprintln!("no question given");
        return ExitCode::FAILURE;
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut progress_bar: Option<ProgressBar> = None;

    let ask = session.ask(question);
    tokio::pin!(ask);

    let result = loop {
        progress_bar
            .get_or_insert_with(|| {
                let progress_bar = ProgressBar::new_spinner();
                progress_bar.set_style(progress_style.clone());
                progress_bar.set_message("🤔 Thinking...");
                progress_bar
            })
            .inc(1);

        select! {
            result = &mut ask => break result,
            Some((transcript, source)) = transcript_rx.recv() => {
                // Finish the progress bar before printing anything else.
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                }
                print_transcript(&transcript, source);
            }
            _ = sleep(Duration::from_millis(100)) => {}
        }
    };

    if let Some(progress_bar) = progress_bar.take() {
        progress_bar.finish_and_clear();
    }
    // Transcripts emitted in the same poll as the answer.
    while let Ok((transcript, source)) = transcript_rx.try_recv() {
        print_transcript(&transcript, source);
    }

    match result {
        Ok(answer) => {
            println!(
                "\n{}✅ {}",
                BAR_CHAR.bright_green(),
                answer.answer.bright_white().bold()
            );
            ExitCode::SUCCESS
        }
        Err(Error::TurnBudgetExceeded { max_turns, .. }) => {
            eprintln!(
                "\n{}⌛ No final answer after {max_turns} model calls.",
                BAR_CHAR.bright_yellow()
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("session failed: {err:?}");
            eprintln!("\n{}❌ {err}", BAR_CHAR.bright_red());
            ExitCode::FAILURE
        }
    }
}

fn print_transcript(transcript: &str, source: TranscriptSource) {
    match source {
        TranscriptSource::User => {}
        TranscriptSource::Assistant => {
            for line in transcript.lines() {
                println!("{}🤖 {}", BAR_CHAR.bright_cyan(), line.bright_white());
            }
        }
        TranscriptSource::Observation => {
            for line in transcript.lines() {
                println!("{}🔎 {}", BAR_CHAR.bright_yellow(), line.dimmed());
            }
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
