// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use subnotes::app_config::{self, Config, TranslationProvider};
use subnotes::app_controller::Controller;
use subnotes::report::FileStatus;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Deepseek,
    Openai,
    Anthropic,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Deepseek => TranslationProvider::DeepSeek,
            CliTranslationProvider::Openai => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
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

/// Options shared by every command that loads the configuration
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Transcript file or directory of transcripts
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output directory (defaults to the file's folder, or `processed` next to an input folder)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target language code (e.g., 'zh', 'fr', 'deu')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Soft line budget per chunk
    #[arg(long)]
    chunk_lines: Option<usize>,

    /// Maximum concurrent translation requests per file
    #[arg(long)]
    concurrency: Option<usize>,

    /// Sampling temperature (0.0 to 1.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// File name pattern in folder mode (e.g., '*.txt')
    #[arg(long)]
    pattern: Option<String>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Prepend blog front matter to every document
    #[arg(long)]
    front_matter: bool,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate transcripts into bilingual notes (default command)
    Translate(TranslateArgs),

    /// Check that the configured provider is reachable
    Check(ConfigArgs),

    /// Generate shell completions for subnotes
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subnotes - bilingual study notes from lecture transcripts
#[derive(Parser, Debug)]
#[command(name = "subnotes")]
#[command(version)]
#[command(about = "AI-powered bilingual study notes from transcripts")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "subnotes splits English transcripts into paragraph-aligned chunks, translates them concurrently and writes Markdown notes with every paragraph followed by its translation.

EXAMPLES:
    subnotes lecture.txt                        # Translate using default config
    subnotes -f lecture.txt                     # Force overwrite existing notes
    subnotes -p openai -m gpt-4o-mini talk.txt  # Use specific provider and model
    subnotes -t fr --front-matter talk.txt      # French notes with blog front matter
    subnotes --report report.json transcripts/  # Process a folder and write a report
    subnotes check                              # Test the provider connection
    subnotes completions bash > subnotes.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys may also come from DEEPSEEK_API_KEY,
    OPENAI_API_KEY or ANTHROPIC_API_KEY.

SUPPORTED PROVIDERS:
    deepseek  - DeepSeek chat API (default: deepseek-chat)
    openai    - OpenAI API (default: gpt-4o-mini)
    anthropic - Anthropic Claude API
    ollama    - Local Ollama server (default: llama3.2:3b)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for a level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
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
            let (emoji, colour) = Self::decoration(record.level());
            let _ = writeln!(std::io::stderr(), "\x1B[{}m{} {} {}\x1B[0m", colour, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subnotes", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Check(args)) => run_check(args).await,
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Load the configuration and apply the overrides every command shares
fn load_config(args: &ConfigArgs) -> Result<Config> {
    if let Some(level) = &args.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&args.config_path)?;

    if let Some(provider) = &args.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &args.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    match &args.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

async fn run_check(args: ConfigArgs) -> Result<()> {
    let config = load_config(&args)?;
    config.validate().context("Configuration validation failed")?;
    Controller::with_config(config)?.check().await
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let input_path = options
        .input_path
        .clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    let mut config = load_config(&options.config)?;
    apply_translate_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;

    let cancel = controller.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the chunks already translated");
            cancel.cancel();
        }
    });

    let report = if input_path.is_file() {
        let output_dir = options
            .output
            .clone()
            .unwrap_or_else(|| match input_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => Path::new(".").to_path_buf(),
            });
        controller.run(input_path, output_dir, options.force_overwrite).await?
    } else if input_path.is_dir() {
        controller.run_folder(input_path, options.output.clone(), options.force_overwrite).await?
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    };

    let failed = report.count(FileStatus::Failed);
    if failed > 0 {
        return Err(anyhow!("{} of {} files failed", failed, report.len()));
    }
    info!("Done");
    Ok(())
}

fn apply_translate_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(chunk_lines) = options.chunk_lines {
        config.segmentation.chunk_lines = chunk_lines;
    }
    if let Some(concurrency) = options.concurrency {
        config.translation.active_provider_config_mut().concurrent_requests = concurrency;
    }
    if let Some(temperature) = options.temperature {
        config.translation.common.temperature = temperature;
    }
    if let Some(pattern) = &options.pattern {
        config.batch.file_pattern = pattern.clone();
    }
    if options.front_matter {
        config.batch.front_matter = true;
    }
    if let Some(report) = &options.report {
        config.batch.report_file = Some(report.to_string_lossy().into_owned());
    }
}
