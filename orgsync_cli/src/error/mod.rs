use colored::*;
use orgsync_core::error::StoreError;
use std::error::Error as StdError;
use std::fmt;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    source: Option<Box<dyn StdError + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Network,
    Filesystem,
    DataIntegrity,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    NetworkError = 3,
    FilesystemError = 4,
    DataIntegrityError = 5,
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
}

impl CliError {
    fn new(message: &str, category: ErrorCategory) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    pub fn general(message: &str) -> Self {
        Self::new(message, ErrorCategory::General)
    }

    pub fn misuse(message: &str) -> Self {
        let mut error = Self::new(message, ErrorCategory::Misuse);
        error
            .suggestions
            .push("Run 'orgsync --help' for usage information".to_string());
        error
    }

    pub fn network(message: &str) -> Self {
        let mut error = Self::new(message, ErrorCategory::Network);
        error.suggestions = vec![
            "Check connectivity to the directory and catalog endpoints".to_string(),
            "Try again later".to_string(),
        ];
        error
    }

    pub fn filesystem(message: &str) -> Self {
        let mut error = Self::new(message, ErrorCategory::Filesystem);
        if message.contains("not found") {
            error
                .suggestions
                .push("Verify you have the correct path".to_string());
        } else if message.contains("permission") || message.contains("denied") {
            error.suggestions.push("Check file permissions".to_string());
        }
        error
    }

    /// Input data or the identity mapping is inconsistent; nothing was written
    pub fn data_integrity(message: &str) -> Self {
        let mut error = Self::new(message, ErrorCategory::DataIntegrity);
        error
            .suggestions
            .push("Fix the reported records at the source, then run again".to_string());
        error
    }

    /// Classify a core error by what the operator has to fix
    pub fn from_core(error: orgsync_core::Error) -> Self {
        use orgsync_core::Error;

        let message = error.to_string();
        let mut cli_error = match &error {
            Error::Structural(_) => Self::data_integrity(&message),
            Error::Integrity(_) => Self::data_integrity(&message).with_suggestion(
                "Inspect the mapping file with 'orgsync mapping check'",
            ),
            Error::Catalog(_) | Error::Source(_) => Self::network(&message),
            Error::Store(StoreError::Locked { path }) => Self::filesystem(&message)
                .with_context("lock", &path.display().to_string())
                .with_suggestion(
                    "Another pass may be running; remove the lock file only if it is stale",
                ),
            Error::Store(_) => Self::filesystem(&message),
            Error::Validation(_) => Self::misuse(&message),
        };
        cli_error.source = Some(Box::new(error));
        cli_error
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Network => ExitCode::NetworkError,
            ErrorCategory::Filesystem => ExitCode::FilesystemError,
            ErrorCategory::DataIntegrity => ExitCode::DataIntegrityError,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Network => "Network Error",
            ErrorCategory::Filesystem => "File Error",
            ErrorCategory::DataIntegrity => "Data Integrity Error",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  - {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

/// Convert anyhow errors to CLI errors, keeping the category of a wrapped
/// core error or CLI error
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<CliError>() {
            Ok(cli_error) => return cli_error,
            Err(error) => error,
        };
        let message = format!("{error:#}");
        match error.downcast::<orgsync_core::Error>() {
            Ok(core_error) => {
                let mut cli_error = Self::from_core(core_error);
                cli_error.message = message;
                cli_error
            }
            Err(error) => {
                let mut cli_error = Self::general(&message);
                cli_error.source = Some(error.into());
                cli_error
            }
        }
    }
}
