use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Verbosity of the narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Applies to quick-apply job listings with answers from a profile file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Job title or keywords to search for
    #[arg(short, long, env = "QUICKAPPLY_KEYWORDS", default_value = "graduate")]
    pub keywords: String,

    /// Search location; the whole of the United Kingdom when omitted
    #[arg(long, env = "QUICKAPPLY_LOCATION")]
    pub location: Option<String>,

    /// Search radius in miles, only used together with --location
    #[arg(long)]
    pub distance: Option<u32>,

    /// Stop after this many submitted applications
    #[arg(short = 'n', long, default_value_t = 5)]
    pub max_applications: usize,

    /// Also open listings that only offer an external application
    #[arg(long)]
    pub include_external: bool,

    /// Login email
    #[arg(long, env = "LINKEDIN_EMAIL")]
    pub email: Option<String>,

    /// Login password; prompted for when not set
    #[arg(long, env = "LINKEDIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// API key for cover letter generation
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat model used for cover letters
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Profile JSON with the answers to application questions
    #[arg(long, env = "USER_DATA_PATH", default_value = "user_data.json")]
    pub profile: PathBuf,

    /// CV as a PDF
    #[arg(long, env = "CV_PATH", default_value = "cv.pdf")]
    pub cv: PathBuf,

    /// Where generated cover letters are written
    #[arg(long, env = "COVER_LETTER_PATH", default_value = "cover.pdf")]
    pub cover_letter: PathBuf,

    /// Session state file
    #[arg(long, env = "STATE_FILE_PATH", default_value = "linkedin_state.json")]
    pub state_file: PathBuf,

    /// Registry of job ids that failed and are skipped from now on
    #[arg(long, env = "FAILED_APPLICATIONS_PATH", default_value = "failed_applications.json")]
    pub failed_applications: PathBuf,

    /// JSON file overriding any of the built-in CSS selectors
    #[arg(long)]
    pub selectors: Option<PathBuf>,

    /// Chrome or Chromium executable
    #[arg(long, env = "QUICKAPPLY_CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Run Chrome without a window
    #[arg(long)]
    pub headless: bool,

    /// Transition attempts without progress before a job is abandoned
    #[arg(long, default_value_t = 2)]
    pub max_stuck: u32,

    /// Seed for the fallback answers, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub level: LogLevel,

    /// Wipe the stored browser session and exit
    #[arg(short, long)]
    pub clean: bool,
}
