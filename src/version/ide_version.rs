use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::constants::platform_types;
use crate::error::{ResolverError, ResolverResult};

/// Product-qualified IDE version spec: `IC-2021.3.2`, `2021.3`, `213.1234.56`.
///
/// A spec without a platform type prefix defaults to IntelliJ Community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeVersionSpec {
    pub platform_type: String,
    pub version: String,
}

fn build_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{3}(\.\d+)+$").unwrap())
}

impl IdeVersionSpec {
    pub fn parse(input: &str) -> ResolverResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ResolverError::parse(input, "empty IDE version"));
        }
        let (platform_type, version) = match trimmed.split_once('-') {
            Some((kind, version)) if !version.is_empty() => (kind.to_string(), version.to_string()),
            _ => (
                platform_types::INTELLIJ_COMMUNITY.to_string(),
                trimmed.to_string(),
            ),
        };
        Ok(Self {
            platform_type,
            version,
        })
    }

    /// Cache directory name for the resolved distribution.
    pub fn directory_name(&self) -> String {
        format!("{}-{}", self.platform_type, self.version)
    }

    /// Query parameter name used by the download service: build numbers like
    /// `202.7660.26` go through `build`, marketing versions like `2020.1`
    /// through `version`.
    pub fn version_parameter(&self) -> &'static str {
        if build_number_pattern().is_match(&self.version) {
            "build"
        } else {
            "version"
        }
    }

    pub fn is_android_studio(&self) -> bool {
        self.platform_type == platform_types::ANDROID_STUDIO
    }
}

impl FromStr for IdeVersionSpec {
    type Err = ResolverError;

    fn from_str(s: &str) -> ResolverResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for IdeVersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.platform_type, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_version_defaults_to_community() {
        let spec = IdeVersionSpec::parse("2021.3").unwrap();
        assert_eq!(spec.platform_type, "IC");
        assert_eq!(spec.version, "2021.3");
        assert_eq!(spec.directory_name(), "IC-2021.3");
    }

    #[test]
    fn qualified_version_keeps_type() {
        let spec = IdeVersionSpec::parse("PS-2021.3.2").unwrap();
        assert_eq!(spec.platform_type, "PS");
        assert_eq!(spec.version, "2021.3.2");
    }

    #[test]
    fn version_parameter_detection() {
        assert_eq!(IdeVersionSpec::parse("202.7660.26").unwrap().version_parameter(), "build");
        assert_eq!(IdeVersionSpec::parse("2020.1").unwrap().version_parameter(), "version");
        assert_eq!(IdeVersionSpec::parse("2020.2.3").unwrap().version_parameter(), "version");
    }

    #[test]
    fn empty_spec_is_rejected() {
        assert!(IdeVersionSpec::parse(" ").is_err());
    }
}
