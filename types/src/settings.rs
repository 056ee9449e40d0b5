//! Resolved configuration types shared across crates.
//!
//! These types represent fully-validated, resolved configuration state.
//! Raw deserialization structs stay private here; validation happens at the
//! parse boundary through `#[serde(try_from)]`.
//!
//! Existence of a value is the proof of its validity.

use serde::Deserialize;

/// Diagnostics cap applied when the client has not sent settings yet.
pub const DEFAULT_MAX_NUMBER_OF_PROBLEMS: usize = 100;

/// Upper bound on a single compiler run before it is killed.
pub const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;

/// Compiler executable looked up on `PATH` when none is configured.
pub const DEFAULT_COMPILER_COMMAND: &str = "gs2json";

#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("maxNumberOfProblems must not be negative (got {0})")]
    NegativeProblemLimit(i64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default = "default_max_problems")]
    max_number_of_problems: i64,
}

fn default_max_problems() -> i64 {
    DEFAULT_MAX_NUMBER_OF_PROBLEMS as i64
}

/// Client-controlled settings, delivered through `workspace/didChangeConfiguration`.
///
/// Replaced wholesale on every configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSettings")]
pub struct Settings {
    max_number_of_problems: usize,
}

impl TryFrom<RawSettings> for Settings {
    type Error = SettingsError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let max = usize::try_from(raw.max_number_of_problems)
            .map_err(|_| SettingsError::NegativeProblemLimit(raw.max_number_of_problems))?;
        Ok(Self {
            max_number_of_problems: max,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NUMBER_OF_PROBLEMS)
    }
}

impl Settings {
    #[must_use]
    pub fn new(max_number_of_problems: usize) -> Self {
        Self {
            max_number_of_problems,
        }
    }

    /// Maximum number of primary diagnostics published per document.
    #[must_use]
    pub fn max_number_of_problems(&self) -> usize {
        self.max_number_of_problems
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompilerConfigError {
    #[error("compiler command must not be empty")]
    EmptyCommand,
    #[error("compiler timeout must be at least one second")]
    ZeroTimeout,
}

#[derive(Deserialize)]
struct RawCompilerConfig {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_COMPILE_TIMEOUT_SECS
}

/// Validated compiler invocation settings.
///
/// The document path is appended after `args` on every run.
///
/// Invariant: `command` is non-empty and `timeout_secs` is non-zero (enforced via
/// `#[serde(try_from)]` at the deserialization boundary).
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawCompilerConfig")]
pub struct CompilerConfig {
    command: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl TryFrom<RawCompilerConfig> for CompilerConfig {
    type Error = CompilerConfigError;

    fn try_from(raw: RawCompilerConfig) -> Result<Self, Self::Error> {
        if raw.command.trim().is_empty() {
            return Err(CompilerConfigError::EmptyCommand);
        }
        if raw.timeout_secs == 0 {
            return Err(CompilerConfigError::ZeroTimeout);
        }
        Ok(Self {
            command: raw.command,
            args: raw.args,
            timeout_secs: raw.timeout_secs,
        })
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMPILER_COMMAND.to_string(),
            args: Vec::new(),
            timeout_secs: DEFAULT_COMPILE_TIMEOUT_SECS,
        }
    }
}

impl CompilerConfig {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        timeout_secs: u64,
    ) -> Result<Self, CompilerConfigError> {
        Self::try_from(RawCompilerConfig {
            command: command.into(),
            args,
            timeout_secs,
        })
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Same invocation with a different executable.
    pub fn with_command(self, command: impl Into<String>) -> Result<Self, CompilerConfigError> {
        Self::new(command, self.args, self.timeout_secs)
    }
}
