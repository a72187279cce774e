mod repl;
mod style;

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use groqterm::{
    ChatOptions, GroqClient, LiveSink, OutputSink, RenderMode, TerminalSink, Tier,
    TranscribeOptions, Transcriber,
};

#[derive(Parser)]
#[command(
    name = "groq",
    version,
    about = "Chat with Groq models and transcribe audio with Whisper",
    after_help = "Examples:
  groq \"Explain quantum computing\"
  groq -q \"What's the latest news about AI?\" -m groq/compound
  groq -t -f audio.wav --format srt --output subtitles.srt
  groq                                  (interactive chat)"
)]
struct Cli {
    /// Query for chat completion (shorthand for --query).
    text: Option<String>,

    /// Query for chat completion.
    #[arg(short, long)]
    query: Option<String>,

    /// Switch to Whisper transcription mode.
    #[arg(short, long)]
    transcribe: bool,

    /// Audio file for transcription.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Chat model (compound models add web search and tools).
    #[arg(short, long, env = "GROQ_DEFAULT_MODEL", default_value = groqterm::config::DEFAULT_CHAT_MODEL)]
    model: String,

    /// Whisper model for transcription.
    #[arg(long, env = "GROQ_DEFAULT_WHISPER_MODEL", default_value = groqterm::config::DEFAULT_WHISPER_MODEL)]
    whisper_model: String,

    /// Groq API key.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API base URL.
    #[arg(long, env = "GROQ_BASE_URL", default_value = groqterm::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Output file for the transcript.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Transcript output format.
    #[arg(long, default_value = "text")]
    format: Format,

    /// Language code for transcription (e.g. en, es, fr).
    #[arg(short, long)]
    language: Option<String>,

    /// Sampling temperature for chat.
    #[arg(long, default_value = "0.7")]
    temperature: f32,

    /// Maximum tokens for the chat reply.
    #[arg(long, default_value = "2000")]
    max_tokens: u32,

    /// System prompt for chat.
    #[arg(long)]
    system: Option<String>,

    /// Account tier, which sets the upload size limit.
    #[arg(long, env = "GROQ_ACCOUNT_TIER", default_value = "free")]
    tier: TierArg,

    /// Only search these domains (compound models).
    #[arg(long = "include-domain", value_name = "DOMAIN")]
    include_domains: Vec<String>,

    /// Never search these domains (compound models).
    #[arg(long = "exclude-domain", value_name = "DOMAIN")]
    exclude_domains: Vec<String>,

    /// Redraw the whole reply in place instead of printing tokens as they arrive.
    #[arg(long)]
    live: bool,

    /// Wait for the complete reply instead of streaming it.
    #[arg(long, conflicts_with = "live")]
    no_stream: bool,

    /// Write a template .env file in the current directory and exit.
    #[arg(long)]
    init_env: bool,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Srt,
    Vtt,
}

impl From<Format> for groqterm::OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => groqterm::OutputFormat::Text,
            Format::Json => groqterm::OutputFormat::Json,
            Format::Srt => groqterm::OutputFormat::Srt,
            Format::Vtt => groqterm::OutputFormat::Vtt,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Free,
    Developer,
}

impl From<TierArg> for Tier {
    fn from(t: TierArg) -> Self {
        match t {
            TierArg::Free => Tier::Free,
            TierArg::Developer => Tier::Developer,
        }
    }
}

fn main() {
    // Environment changes must happen before the runtime spawns its workers,
    // and before clap reads env fallbacks.
    if let Err(e) = groqterm::config::load_default_env_files() {
        let style::Palette { yellow, reset, .. } = style::err();
        eprintln!("{yellow}Warning: could not read .env file: {e}{reset}");
    }

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("groqterm={default_level}"))
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let style::Palette { red, reset, .. } = style::err();
            eprintln!("{red}Error: could not start async runtime: {e}{reset}");
            std::process::exit(1);
        }
    };
    runtime.block_on(run(cli));
}

async fn run(cli: Cli) {
    let out = style::out();
    let style::Palette {
        red, yellow, reset, ..
    } = style::err();

    if cli.init_env {
        match groqterm::config::write_env_template(Path::new(".env")) {
            Ok(()) => println!(
                "{}Created .env file. Please add your API key.{}",
                out.green, out.reset
            ),
            Err(e) => {
                eprintln!("{yellow}{e}{reset}");
                std::process::exit(1);
            }
        }
        return;
    }

    let api_key = match groqterm::resolve_api_key(cli.api_key.clone()) {
        Ok(key) => key,
        Err(_) => {
            eprintln!("{red}Error: GROQ_API_KEY not found.{reset}");
            eprintln!("{yellow}Set it with one of:{reset}");
            eprintln!("  1. Environment variable: export GROQ_API_KEY=your_key_here");
            eprintln!("  2. A .env file containing: GROQ_API_KEY=your_key_here (groq --init-env)");
            eprintln!("  3. The command line: groq --api-key your_key_here");
            std::process::exit(1);
        }
    };
    let client = GroqClient::with_base_url(api_key, &cli.base_url);

    if cli.transcribe {
        run_transcription(&cli, client).await;
        return;
    }

    let options = match chat_options(&cli) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{red}Error: {e}{reset}");
            std::process::exit(1);
        }
    };

    match cli.query.clone().or_else(|| cli.text.clone()) {
        Some(query) => run_single(&cli, &client, &options, &query).await,
        None => repl::run(client, options).await,
    }
}

fn chat_options(cli: &Cli) -> groqterm::Result<ChatOptions> {
    let mode = if cli.live { RenderMode::Live } else { RenderMode::Raw };
    Ok(ChatOptions::new()
        .model(&cli.model)
        .temperature(cli.temperature)?
        .max_tokens(cli.max_tokens)?
        .system_prompt(cli.system.clone())
        .include_domains(cli.include_domains.clone())
        .exclude_domains(cli.exclude_domains.clone())
        .render_mode(mode))
}

/// Output sink matching the requested render mode.
pub(crate) fn sink_for(mode: RenderMode) -> Box<dyn OutputSink> {
    match mode {
        RenderMode::Raw => Box::new(TerminalSink::stdout()),
        RenderMode::Live => Box::new(LiveSink::new()),
    }
}

pub(crate) fn print_tools(options: &ChatOptions, tools: &[String]) {
    let style::Palette { dim, reset, .. } = style::out();
    if options.is_compound() && !tools.is_empty() {
        println!("{dim}Tools used: {}{reset}", tools.join(", "));
    }
}

async fn run_single(cli: &Cli, client: &GroqClient, options: &ChatOptions, query: &str) {
    let style::Palette {
        dim, red, reset, ..
    } = style::err();
    eprintln!("{dim}Using model: {}{reset}", options.model);
    if let Some(system) = &options.system_prompt {
        eprintln!("{dim}System: {system}{reset}");
    }
    eprintln!();

    let result = if cli.no_stream {
        groqterm::complete_blocking(client, options, query)
            .await
            .inspect(|r| print!("{}", r.text))
            .inspect_err(|e| eprintln!("{red}{}{reset}", e.diagnostic()))
    } else {
        let mut sink = sink_for(options.render_mode);
        groqterm::complete_once(client, options, query, &mut sink).await
    };

    match result {
        Ok(reply) => {
            println!();
            print_tools(options, &reply.tools_used);
        }
        // The diagnostic has already been shown.
        Err(_) => std::process::exit(1),
    }
}

async fn run_transcription(cli: &Cli, client: GroqClient) {
    let out = style::out();
    let style::Palette {
        dim,
        red,
        yellow,
        green,
        reset,
        ..
    } = style::err();

    let Some(file) = &cli.file else {
        eprintln!("{red}Error: --file is required when using --transcribe{reset}");
        eprintln!("{yellow}Usage: groq -t -f audio.mp3{reset}");
        std::process::exit(1);
    };

    let format: groqterm::OutputFormat = cli.format.into();
    let options = match TranscribeOptions::new()
        .model(&cli.whisper_model)
        .language(cli.language.clone())
    {
        Ok(o) => o
            .response_format(format.preferred_response_format())
            .timestamps(format.needs_timestamps())
            .tier(cli.tier.into()),
        Err(e) => {
            eprintln!("{red}Error: {e}{reset}");
            std::process::exit(1);
        }
    };

    let name = file
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    eprintln!("Processing: {name}");
    eprintln!("{dim}Model: {}{reset}", options.model);
    if let Some(language) = &options.language {
        eprintln!("{dim}Language: {language}{reset}");
    }

    let transcript = match Transcriber::new(client).transcribe_file(file, &options).await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{red}{}{reset}", e.diagnostic());
            std::process::exit(1);
        }
    };

    println!("\n{}Transcription:{}", out.green, out.reset);
    println!("{}", "-".repeat(50));
    if transcript.text.trim().is_empty() {
        println!("{}No text found in transcription.{}", out.yellow, out.reset);
    } else {
        println!("{}", transcript.text.trim());
    }
    println!("{}", "-".repeat(50));

    if cli.output.is_some() || format != groqterm::OutputFormat::Text {
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| format.default_output_path(file));
        match groqterm::save_transcript(&transcript, &path, format) {
            Ok(path) => eprintln!("{green}Transcript saved to: {}{reset}", path.display()),
            Err(e) => {
                eprintln!("{red}Error writing to {}: {e}{reset}", path.display());
                std::process::exit(1);
            }
        }
    }

    if let Some(duration) = transcript.duration {
        eprintln!("\n{dim}Duration: {duration:.1} seconds{reset}");
    }
    if let Some(language) = &transcript.language {
        eprintln!("{dim}Detected language: {language}{reset}");
    }
}
