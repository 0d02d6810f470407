//! Top-level error types for the `viewer_manifest` command.
//!
//! Engine failures live in [`crate::bundler::Error`]; this module wraps
//! them together with argument and configuration problems.

use thiserror::Error;

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for a `viewer_manifest` run
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Staging or packaging errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// A flag value could not be interpreted
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Required setting absent from both flags and the config file
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl BundlerError {
    /// Hints printed under the error message.
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BundlerError::Cli(CliError::MissingArgument { argument }) => vec![format!(
                "Pass --{argument} or set it in the file given to --config"
            )],
            BundlerError::Cli(_) => vec!["Run with --help to see accepted values".to_string()],
            BundlerError::Toml(_) => vec!["Check the syntax of the --config file".to_string()],
            BundlerError::Bundler(crate::bundler::Error::MissingSource { .. }) => vec![
                "Check that the viewer was built with the selected configuration".to_string(),
            ],
            _ => vec!["Run with --verbose for per-file detail".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_argument_names_the_flag() {
        let err = BundlerError::from(CliError::MissingArgument {
            argument: "channel".into(),
        });
        assert_eq!(err.to_string(), "CLI error: Missing required argument: channel");
        assert!(err.recovery_suggestions()[0].contains("--channel"));
    }
}
