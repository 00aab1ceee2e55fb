use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type shared by every resolver in the crate.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("cannot parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("{what} not found; attempted sources: {}", attempted.join(", "))]
    NotFound { what: String, attempted: Vec<String> },

    #[error("cannot extract '{archive}': {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("'{subject}' is incompatible: requires {required}, got {actual}")]
    IncompatibleVersion {
        subject: String,
        required: String,
        actual: String,
    },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("malformed XML document from {source_name}: {reason}")]
    Xml { source_name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ResolverError {
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>, attempted: Vec<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            attempted,
        }
    }

    pub fn extraction(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            reason: reason.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn xml(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Xml {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for ResolverError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Crate-wide result type.
pub type ResolverResult<T> = Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_attempted_sources() {
        let err = ResolverError::not_found(
            "com.jetbrains:jbre:jbr-17",
            vec!["https://a.example".to_string(), "https://b.example".to_string()],
        );
        let message = err.to_string();
        assert!(message.contains("https://a.example"));
        assert!(message.contains("https://b.example"));
    }

    #[test]
    fn incompatible_version_names_both_ranges() {
        let err = ResolverError::IncompatibleVersion {
            subject: "org.example.plugin".to_string(),
            required: "since 211.0, until 212.*".to_string(),
            actual: "213.1234".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("211.0"));
        assert!(message.contains("213.1234"));
    }
}
