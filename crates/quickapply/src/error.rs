/// High-level error category for reporting purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid configuration, raised before the browser starts
    Configuration,
    /// Login / session problems
    Authentication,
    /// System errors - browser, filesystem, network, etc.
    System,
}

/// Run-level errors.
///
/// Field failures and abandoned applications never surface here: the step
/// driver absorbs the former and reports the latter as an
/// [`Outcome`](crate::form::Outcome).
#[derive(Debug, Clone)]
pub enum ApplyError {
    /// Required configuration is missing or unreadable.
    Config {
        missing: Vec<String>,
    },
    /// The profile document exists but cannot be used.
    InvalidProfile {
        message: String,
    },

    LoginFailed {
        attempts: usize,
        reason: String,
    },

    BrowserError {
        message: String,
    },
    Io {
        message: String,
    },
    Cancelled,

    Unknown {
        message: String,
    },
}

impl ApplyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApplyError::Config { .. } | ApplyError::InvalidProfile { .. } => {
                ErrorCategory::Configuration
            }
            ApplyError::LoginFailed { .. } => ErrorCategory::Authentication,
            ApplyError::BrowserError { .. }
            | ApplyError::Io { .. }
            | ApplyError::Cancelled
            | ApplyError::Unknown { .. } => ErrorCategory::System,
        }
    }

    /// Returns true if the run has to stop entirely.
    ///
    /// A cancelled run is a clean stop, everything else here ends the run
    /// with a failure exit code.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ApplyError::Cancelled)
    }

    /// Returns true if wiping the browser profile is worth suggesting
    pub fn should_suggest_clean_session(&self) -> bool {
        matches!(
            self,
            ApplyError::LoginFailed { .. } | ApplyError::BrowserError { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            ApplyError::Config { missing } => {
                let mut msg = String::from("Missing required configuration:");
                for item in missing {
                    msg.push_str(&format!("\n  - {}", item));
                }
                msg
            }
            ApplyError::InvalidProfile { message } => {
                format!("The user profile could not be used.\n\n{}", message)
            }
            ApplyError::LoginFailed { attempts, reason } => {
                format!("Login failed after {} attempt(s).\n\n{}", attempts, reason)
            }
            ApplyError::BrowserError { message } => format!("Browser error.\n\n{}", message),
            ApplyError::Io { message } => format!("File error.\n\n{}", message),
            ApplyError::Cancelled => "Run cancelled by user.".to_string(),
            ApplyError::Unknown { message } => format!("An error occurred.\n\n{}", message),
        }
    }

    pub fn full_message(&self) -> String {
        let mut msg = self.user_message();
        if self.should_suggest_clean_session() {
            msg.push_str("\n\nTry wiping the browser session with --clean and run again.");
        }
        msg
    }
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_message())
    }
}

impl std::error::Error for ApplyError {}

impl From<anyhow::Error> for ApplyError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApplyError>() {
            Ok(apply) => apply,
            Err(other) => ApplyError::Unknown {
                message: format!("{:#}", other),
            },
        }
    }
}

impl From<std::io::Error> for ApplyError {
    fn from(err: std::io::Error) -> Self {
        ApplyError::Io {
            message: err.to_string(),
        }
    }
}
