use std::path::PathBuf;

/// High-level error category for UI display purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The CLI's settings or profile files are missing or malformed
    Configuration,
    /// A `protonvpn` invocation failed or could not be started
    Command,
    /// Filesystem and other system errors
    System,
}

/// Errors returned by the library.
///
/// Every variant carries owned strings so the error can travel inside GUI
/// messages, which must be `Clone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    MissingConfig {
        path: PathBuf,
    },
    MissingValue {
        section: String,
        key: String,
    },
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Io {
        context: String,
        message: String,
    },
    CliNotFound {
        program: String,
    },
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    ServerData {
        message: String,
    },
    Profile {
        message: String,
    },
}

impl CliError {
    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        CliError::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Returns the high-level category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            CliError::MissingConfig { .. }
            | CliError::MissingValue { .. }
            | CliError::InvalidValue { .. }
            | CliError::Parse { .. }
            | CliError::Profile { .. } => ErrorCategory::Configuration,
            CliError::CliNotFound { .. } | CliError::CommandFailed { .. } => {
                ErrorCategory::Command
            }
            CliError::Io { .. } | CliError::ServerData { .. } => ErrorCategory::System,
        }
    }

    /// Returns the user-facing error message
    pub fn user_message(&self) -> String {
        match self {
            CliError::MissingConfig { path } => format!(
                "ProtonVPN-CLI settings not found at {}.\n\nComplete the VPN settings to create them.",
                path.display()
            ),
            CliError::MissingValue { section, key } => {
                format!("Setting [{}] {} is not set.", section, key)
            }
            CliError::InvalidValue {
                section,
                key,
                value,
            } => format!("Setting [{}] {} has an invalid value: {}", section, key, value),
            CliError::Parse { path, message } => {
                format!("Could not read {}.\n\n{}", path.display(), message)
            }
            CliError::Io { context, message } => format!("{}: {}", context, message),
            CliError::CliNotFound { program } => format!(
                "Could not locate '{}'. Install protonvpn-cli or set its path in App Settings.",
                program
            ),
            CliError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                let code = code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                if stderr.trim().is_empty() {
                    format!("'{}' failed (exit {}).", command, code)
                } else {
                    format!("'{}' failed (exit {}).\n\n{}", command, code, stderr.trim())
                }
            }
            CliError::ServerData { message } => format!("Server data unavailable: {}", message),
            CliError::Profile { message } => message.clone(),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::io("I/O error", err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::ServerData {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Io {
            context: "Unexpected error".to_string(),
            message: err.to_string(),
        }
    }
}
