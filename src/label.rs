// src/label.rs

//! Conary-style labels naming points along a branch's ancestry
//!
//! Labels use the format `repository@namespace:tag`:
//! - `conary.example.com@rpl:2` - rPath Linux 2 from conary.example.com
//! - `conary.example.com@rpl:devel` - a development label
//! - `local@local:COOK` - the throwaway label used by local cooks
//!
//! A label path is an ordered list of labels searched closest-first when
//! looking for troves across shadow history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host name reserved for labels that never leave the build machine
pub const LOCAL_HOST: &str = "local";

/// A Conary-style label identifying a point in a branch's ancestry
///
/// Format: `repository@namespace:tag`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    /// Repository hostname or identifier
    pub repository: String,
    /// Namespace within the repository
    pub namespace: String,
    /// Branch or version tag
    pub tag: String,
}

impl Label {
    /// Create a new label
    pub fn new(
        repository: impl Into<String>,
        namespace: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            namespace: namespace.into(),
            tag: tag.into(),
        }
    }

    /// Label used for builds that are never committed (`local@local:LOCAL`)
    pub fn local() -> Self {
        Self::new(LOCAL_HOST, LOCAL_HOST, "LOCAL")
    }

    /// Label used by `cvc cook` style local cooks (`local@local:COOK`)
    pub fn cook() -> Self {
        Self::new(LOCAL_HOST, LOCAL_HOST, "COOK")
    }

    /// Label used by emerge builds (`local@local:EMERGE`)
    pub fn emerge() -> Self {
        Self::new(LOCAL_HOST, LOCAL_HOST, "EMERGE")
    }

    /// Parse a label from string format `repository@namespace:tag`
    pub fn parse(s: &str) -> Result<Self, LabelParseError> {
        let at_pos = s
            .find('@')
            .ok_or_else(|| LabelParseError::MissingAt(s.to_string()))?;

        let colon_pos = s[at_pos..]
            .find(':')
            .map(|p| at_pos + p)
            .ok_or_else(|| LabelParseError::MissingColon(s.to_string()))?;

        let repository = &s[..at_pos];
        let namespace = &s[at_pos + 1..colon_pos];
        let tag = &s[colon_pos + 1..];

        if repository.is_empty() {
            return Err(LabelParseError::EmptyRepository(s.to_string()));
        }
        if namespace.is_empty() {
            return Err(LabelParseError::EmptyNamespace(s.to_string()));
        }
        if tag.is_empty() {
            return Err(LabelParseError::EmptyTag(s.to_string()));
        }

        let valid_chars = |c: char| c.is_alphanumeric() || c == '.' || c == '-' || c == '_';

        if !repository.chars().all(valid_chars) {
            return Err(LabelParseError::InvalidRepository(repository.to_string()));
        }
        if !namespace.chars().all(valid_chars) {
            return Err(LabelParseError::InvalidNamespace(namespace.to_string()));
        }
        if !tag.chars().all(valid_chars) {
            return Err(LabelParseError::InvalidTag(tag.to_string()));
        }

        Ok(Self {
            repository: repository.to_string(),
            namespace: namespace.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Whether this label lives on the reserved local host
    ///
    /// Troves on local labels are never committed to a repository, so no
    /// repository history exists for them.
    pub fn is_local(&self) -> bool {
        self.repository == LOCAL_HOST
    }

    /// Check if this label is on the same repository and namespace as another
    pub fn same_namespace(&self, other: &Label) -> bool {
        self.repository == other.repository && self.namespace == other.namespace
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.repository, self.namespace, self.tag)
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s)
    }
}

impl TryFrom<String> for Label {
    type Error = LabelParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Label::parse(&s)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

/// Errors that can occur when parsing a label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelParseError {
    /// Missing @ separator
    MissingAt(String),
    /// Missing : separator
    MissingColon(String),
    /// Empty repository component
    EmptyRepository(String),
    /// Empty namespace component
    EmptyNamespace(String),
    /// Empty tag component
    EmptyTag(String),
    /// Invalid characters in repository
    InvalidRepository(String),
    /// Invalid characters in namespace
    InvalidNamespace(String),
    /// Invalid characters in tag
    InvalidTag(String),
}

impl fmt::Display for LabelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelParseError::MissingAt(s) => write!(f, "Missing '@' in label: {}", s),
            LabelParseError::MissingColon(s) => write!(f, "Missing ':' in label: {}", s),
            LabelParseError::EmptyRepository(s) => write!(f, "Empty repository in label: {}", s),
            LabelParseError::EmptyNamespace(s) => write!(f, "Empty namespace in label: {}", s),
            LabelParseError::EmptyTag(s) => write!(f, "Empty tag in label: {}", s),
            LabelParseError::InvalidRepository(s) => write!(f, "Invalid repository name: {}", s),
            LabelParseError::InvalidNamespace(s) => write!(f, "Invalid namespace: {}", s),
            LabelParseError::InvalidTag(s) => write!(f, "Invalid tag: {}", s),
        }
    }
}

impl std::error::Error for LabelParseError {}

impl From<LabelParseError> for crate::error::Error {
    fn from(err: LabelParseError) -> Self {
        crate::error::Error::ParseError(err.to_string())
    }
}

/// A label path defines the search order for trove lookups
///
/// Labels earlier in the path have higher priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPath {
    /// Ordered list of labels (highest priority first)
    labels: Vec<Label>,
}

impl LabelPath {
    /// Create a new empty label path
    pub fn new() -> Self {
        Self { labels: Vec::new() }
    }

    /// Create a label path from a list of labels
    pub fn from_labels(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    /// Add a label to the end of the path (lowest priority)
    pub fn push(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Get the labels in order
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Check if the path contains a label
    pub fn contains(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Get the priority of a label (0 = highest, None = not found)
    pub fn priority(&self, label: &Label) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Check if the path is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Get the number of labels in the path
    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

impl FromIterator<Label> for LabelPath {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for LabelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.labels.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", labels.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse() {
        let label = Label::parse("conary.example.com@rpl:2").unwrap();
        assert_eq!(label.repository, "conary.example.com");
        assert_eq!(label.namespace, "rpl");
        assert_eq!(label.tag, "2");
    }

    #[test]
    fn test_label_display() {
        let label = Label::new("repo", "ns", "tag");
        assert_eq!(label.to_string(), "repo@ns:tag");
    }

    #[test]
    fn test_label_parse_errors() {
        assert!(Label::parse("missing-at").is_err());
        assert!(Label::parse("repo@missing-colon").is_err());
        assert!(Label::parse("@ns:tag").is_err()); // empty repo
        assert!(Label::parse("repo@:tag").is_err()); // empty ns
        assert!(Label::parse("repo@ns:").is_err()); // empty tag
        assert!(Label::parse("repo@ns:t/g").is_err());
    }

    #[test]
    fn test_local_labels() {
        assert!(Label::local().is_local());
        assert!(Label::cook().is_local());
        assert_eq!(Label::emerge().to_string(), "local@local:EMERGE");
        assert!(!Label::parse("conary.example.com@rpl:2").unwrap().is_local());
    }

    #[test]
    fn test_label_serde_string_form() {
        let label: Label = serde_json::from_str("\"repo@ns:1\"").unwrap();
        assert_eq!(label, Label::new("repo", "ns", "1"));
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"repo@ns:1\"");
        assert!(serde_json::from_str::<Label>("\"nope\"").is_err());
    }

    #[test]
    fn test_label_path() {
        let path: LabelPath = ["repo1@ns:1", "repo2@ns:2"]
            .iter()
            .map(|s| Label::parse(s).unwrap())
            .collect();

        assert_eq!(path.len(), 2);
        assert_eq!(path.priority(&Label::parse("repo1@ns:1").unwrap()), Some(0));
        assert_eq!(path.priority(&Label::parse("repo2@ns:2").unwrap()), Some(1));
        assert!(!path.contains(&Label::local()));
        assert_eq!(path.to_string(), "repo1@ns:1 repo2@ns:2");
    }

    #[test]
    fn test_same_namespace() {
        let label1 = Label::parse("repo@ns:1").unwrap();
        let label2 = Label::parse("repo@ns:2").unwrap();
        let label3 = Label::parse("repo@other:1").unwrap();

        assert!(label1.same_namespace(&label2));
        assert!(!label1.same_namespace(&label3));
    }
}
