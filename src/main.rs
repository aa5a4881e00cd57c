// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use subtrans::app_config::{self, Config, TranslationProvider};
use subtrans::app_controller::{Controller, JobFile};
use subtrans::progress::ProgressBarSink;
use subtrans::server::{self, AppState};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Gemini,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP translation service (default command)
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Translate local subtitle files without starting the server
    Translate {
        /// Target language code (e.g., 'vi', 'es', 'fr')
        #[arg(short, long)]
        target_language: Option<String>,

        /// Directory for the translated files (default: next to each input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// ASS/SSA files to translate
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subtrans - subtitle translation service
///
/// Translates the dialogue of ASS/SSA subtitle files with a text-generation
/// model while leaving headers, styles and timings untouched.
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "ASS/SSA subtitle translation service")]
#[command(long_about = "subtrans translates the dialogue lines of ASS/SSA subtitles with a text-generation model.

EXAMPLES:
    subtrans                                   # Serve on the configured address
    subtrans serve --port 8080                 # Serve on another port
    subtrans translate -t fr episode01.ass     # Translate a local file to French
    subtrans -p ollama translate -o out/ *.ass # Use a local Ollama model
    subtrans completions bash > subtrans.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. A .env file in the working directory is loaded
    at startup; GEMINI_API_KEY sets the Gemini API key.

SUPPORTED PROVIDERS:
    gemini - Google Gemini generateContent API (requires API key)
    ollama - Local Ollama server (default model: llama3.2)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    gemini_api_key: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Must run before clap reads GEMINI_API_KEY
    let dotenv_result = dotenvy::dotenv();

    let cli = CommandLineOptions::parse();

    if let Ok(path) = dotenv_result {
        debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate { ref target_language, ref output_dir, ref files }) => {
            let config = load_config(&cli)?;
            let target_language = target_language
                .clone()
                .unwrap_or_else(|| config.default_target_language.clone());
            run_translate(config, &target_language, output_dir.as_deref(), files).await
        }
        Some(Commands::Serve { ref host, ref port }) => {
            let mut config = load_config(&cli)?;
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            run_server(config).await
        }
        None => run_server(load_config(&cli)?).await,
    }
}

/// Load the config file and apply command line and environment overrides
fn load_config(options: &CommandLineOptions) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(log_level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        let provider = config.translation.provider;
        config.translation.provider_config_mut(provider).model = model.clone();
    }
    if let Some(api_key) = &options.gemini_api_key {
        config.apply_gemini_api_key(api_key);
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate()
        .context("Configuration validation failed")?;

    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        "Using {} ({}) with batches of {}",
        config.translation.provider.display_name(),
        config.translation.get_model(),
        config.translation.common.max_batch_size
    );

    let controller = Controller::with_config(config)?;
    server::serve(AppState::new(controller)).await
}

async fn run_translate(config: Config, target_language: &str, output_dir: Option<&Path>, inputs: &[PathBuf]) -> Result<()> {
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input));
        }
        let name = input
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("Input path has no file name: {:?}", input))?;
        let directory = match output_dir {
            Some(directory) => directory.to_path_buf(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
        };
        files.push(JobFile::new(name, input.clone()).with_output_dir(directory));
    }

    let controller = Controller::with_config(config)?;
    let sink = ProgressBarSink::new(files.len());
    let default_dir = PathBuf::from(".");
    let report = controller
        .run_job("cli", &files, target_language, &default_dir, &sink)
        .await;

    for file in &report.translated {
        info!("Wrote {}", file.path.display());
    }
    for file in &report.skipped {
        error!("Skipped {}: {}", file.name, file.reason);
    }

    if report.is_empty() {
        return Err(anyhow!("No file could be translated"));
    }
    Ok(())
}
