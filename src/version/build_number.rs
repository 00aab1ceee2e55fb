use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{ResolverError, ResolverResult};

/// Trailing marker of a build number.
///
/// `*` matches any suffix and sorts above every concrete component;
/// `SNAPSHOT` sorts above `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Star,
    Snapshot,
}

/// Platform build number: `213.1234.56`, `IC-213.1234`, `213.*`, `213.SNAPSHOT`.
///
/// Ordering and equality consider the numeric components and the trailing
/// marker only; the product code is carried along for display and feed
/// deduplication but never participates in comparison. Missing trailing
/// components are treated as absent, not zero, so `213.1234` sorts below
/// `213.1234.0`.
#[derive(Debug, Clone)]
pub struct BuildNumber {
    product_code: Option<String>,
    components: Vec<u32>,
    marker: Option<Marker>,
}

/// Returns true for the two component spellings that terminate a build number.
pub fn is_wildcard_or_snapshot(component: &str) -> bool {
    component == "*" || component == "SNAPSHOT"
}

impl BuildNumber {
    /// Parses a build number string, with or without a product code prefix.
    ///
    /// Malformed input (empty string, non-numeric leading component, marker
    /// in a non-trailing position) is a fatal configuration error.
    pub fn parse(input: &str) -> ResolverResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ResolverError::parse(input, "empty build number"));
        }

        let (product_code, rest) = match trimmed.split_once('-') {
            Some((code, rest))
                if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphabetic()) =>
            {
                (Some(code.to_string()), rest)
            }
            _ => (None, trimmed),
        };

        let mut components = Vec::new();
        let mut marker = None;
        let parts: Vec<&str> = rest.split('.').collect();
        for (index, part) in parts.iter().enumerate() {
            if marker.is_some() {
                return Err(ResolverError::parse(
                    input,
                    format!("component after trailing '{part}' marker"),
                ));
            }
            if is_wildcard_or_snapshot(part) {
                marker = Some(if *part == "*" { Marker::Star } else { Marker::Snapshot });
                continue;
            }
            match part.parse::<u32>() {
                Ok(value) => components.push(value),
                Err(_) => {
                    return Err(ResolverError::parse(
                        input,
                        format!("non-numeric component '{part}' at position {index}"),
                    ))
                }
            }
        }

        if components.is_empty() {
            return Err(ResolverError::parse(input, "no numeric components"));
        }

        Ok(Self {
            product_code,
            components,
            marker,
        })
    }

    /// Builds a number from raw components, no product code or marker.
    /// An empty list becomes `0` so the result is always comparable.
    pub fn from_components(components: Vec<u32>) -> Self {
        let components = if components.is_empty() { vec![0] } else { components };
        Self {
            product_code: None,
            components,
            marker: None,
        }
    }

    /// Applies `code` when the parsed string carried no product prefix.
    pub fn or_product_code(mut self, code: &str) -> Self {
        if self.product_code.is_none() {
            self.product_code = Some(code.to_string());
        }
        self
    }

    pub fn product_code(&self) -> Option<&str> {
        self.product_code.as_deref()
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }

    pub fn marker(&self) -> Option<Marker> {
        self.marker
    }

    /// First component, e.g. `213` for `213.1234.56`.
    pub fn baseline_version(&self) -> u32 {
        self.components[0]
    }

    /// The `since-build` value derived from this build: `{major}.{minor}`,
    /// product code stripped. A missing minor component is rendered as `0`.
    pub fn since_build(&self) -> String {
        let minor = self.components.get(1).copied().unwrap_or(0);
        format!("{}.{}", self.baseline_version(), minor)
    }

    /// The `until-build` value: `{major}.*`, or `{since}.*` when the
    /// same-since-until mode is requested.
    pub fn until_build(&self, same_since_until: bool) -> String {
        if same_since_until {
            format!("{}.*", self.since_build())
        } else {
            format!("{}.*", self.baseline_version())
        }
    }

    /// Drops every numeric component past the third, keeping a trailing
    /// marker. Some products append build metadata (e.g. an Android Studio
    /// build `AI-203.7717.56.2031.7935034`) that breaks downstream numeric
    /// lookups; those lookups operate on the first three components only.
    pub fn strip_excess_components(&self) -> Self {
        Self {
            product_code: self.product_code.clone(),
            components: self.components.iter().take(3).copied().collect(),
            marker: self.marker,
        }
    }

    /// Renders the components and marker without the product prefix.
    pub fn as_string_without_product_code(&self) -> String {
        let mut out = self
            .components
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");
        match self.marker {
            Some(Marker::Star) => out.push_str(".*"),
            Some(Marker::Snapshot) => out.push_str(".SNAPSHOT"),
            None => {}
        }
        out
    }

    /// True when this build falls inside the inclusive `[since, until]`
    /// range; a missing bound is unbounded on that side.
    pub fn is_within(&self, since: Option<&BuildNumber>, until: Option<&BuildNumber>) -> bool {
        since.map_or(true, |s| s <= self) && until.map_or(true, |u| self <= u)
    }

    /// Element at position `i` of the comparison sequence: components first,
    /// then the marker slot, then absent. Rank orders absent < concrete <
    /// `*` < `SNAPSHOT`.
    fn element_rank(&self, i: usize) -> (u8, u32) {
        if i < self.components.len() {
            (1, self.components[i])
        } else if i == self.components.len() {
            match self.marker {
                None => (0, 0),
                Some(Marker::Star) => (2, 0),
                Some(Marker::Snapshot) => (3, 0),
            }
        } else {
            (0, 0)
        }
    }
}

impl PartialEq for BuildNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BuildNumber {}

impl Hash for BuildNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
        self.marker.hash(state);
    }
}

impl Ord for BuildNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len()) + 1;
        for i in 0..len {
            let ord = self.element_rank(i).cmp(&other.element_rank(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for BuildNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for BuildNumber {
    type Err = ResolverError;

    fn from_str(s: &str) -> ResolverResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.product_code {
            write!(f, "{code}-")?;
        }
        write!(f, "{}", self.as_string_without_product_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> BuildNumber {
        BuildNumber::parse(s).unwrap()
    }

    #[test]
    fn parses_product_code_prefix() {
        let build = b("IC-213.1234.56");
        assert_eq!(build.product_code(), Some("IC"));
        assert_eq!(build.components(), &[213, 1234, 56]);
        assert_eq!(build.to_string(), "IC-213.1234.56");
    }

    #[test]
    fn bare_number_defaults_product_code() {
        let build = b("213.1234").or_product_code("IC");
        assert_eq!(build.product_code(), Some("IC"));
        let prefixed = b("PS-213.1234").or_product_code("IC");
        assert_eq!(prefixed.product_code(), Some("PS"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(BuildNumber::parse("").is_err());
        assert!(BuildNumber::parse("abc.123").is_err());
        assert!(BuildNumber::parse("213.*.56").is_err());
        assert!(BuildNumber::parse("IC-").is_err());
    }

    #[test]
    fn ordering_is_componentwise() {
        assert!(b("213.1234.56") < b("213.1234.57"));
        assert!(b("213.1234") < b("213.1234.56"));
        assert!(b("212.9999.99") < b("213.1"));
        assert_eq!(b("213.1234.56").cmp(&b("213.1234.56")), Ordering::Equal);
    }

    #[test]
    fn star_outranks_concrete_suffix() {
        assert!(b("213.*") > b("213.1234.56"));
        assert!(b("213.*") > b("213.999999"));
        assert!(b("213.*") < b("214.1"));
    }

    #[test]
    fn snapshot_is_maximal_within_baseline() {
        assert!(b("213.SNAPSHOT") > b("213.*"));
        assert!(b("213.SNAPSHOT") > b("213.99999.99"));
        assert!(b("213.SNAPSHOT") < b("214.1"));
    }

    #[test]
    fn product_code_does_not_affect_comparison() {
        assert_eq!(b("IC-213.1234").cmp(&b("AI-213.1234")), Ordering::Equal);
    }

    #[test]
    fn since_until_derivation() {
        let build = b("213.1234.56");
        assert_eq!(build.since_build(), "213.1234");
        assert_eq!(build.until_build(false), "213.*");
        assert_eq!(build.until_build(true), "213.1234.*");
    }

    #[test]
    fn strip_excess_components_is_idempotent() {
        let build = b("AI-203.7717.56.2031.7935034");
        let stripped = build.strip_excess_components();
        assert_eq!(stripped.as_string_without_product_code(), "203.7717.56");
        assert_eq!(stripped.strip_excess_components(), stripped);

        let snapshot = b("203.7717.56.2031.SNAPSHOT").strip_excess_components();
        assert_eq!(snapshot.as_string_without_product_code(), "203.7717.56.SNAPSHOT");
    }

    #[test]
    fn range_check_honours_wildcard_bounds() {
        let target = b("213.1234.56");
        let since = b("211.0");
        let until = b("213.*");
        assert!(target.is_within(Some(&since), Some(&until)));
        assert!(target.is_within(None, Some(&until)));
        assert!(target.is_within(Some(&since), None));
        assert!(!b("214.1").is_within(Some(&since), Some(&until)));
    }
}
