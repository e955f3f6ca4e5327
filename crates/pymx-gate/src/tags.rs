//! Gate tag vocabulary and tag selection

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Known gate tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GateTag {
    Junit,
    Unittest,
    UnittestSandboxed,
    UnittestMultiContext,
    UnittestJython,
    TaggedUnittest,
    SvmUnittest,
    SvmUnittestSandboxed,
    SharedLibrary,
    SharedLibrarySandboxed,
    Graalvm,
    GraalvmSandboxed,
    Svm,
    NativeImageEmbedder,
    License,
    Style,
}

impl GateTag {
    pub const ALL: [GateTag; 16] = [
        GateTag::Junit,
        GateTag::Unittest,
        GateTag::UnittestSandboxed,
        GateTag::UnittestMultiContext,
        GateTag::UnittestJython,
        GateTag::TaggedUnittest,
        GateTag::SvmUnittest,
        GateTag::SvmUnittestSandboxed,
        GateTag::SharedLibrary,
        GateTag::SharedLibrarySandboxed,
        GateTag::Graalvm,
        GateTag::GraalvmSandboxed,
        GateTag::Svm,
        GateTag::NativeImageEmbedder,
        GateTag::License,
        GateTag::Style,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Junit => "python-junit",
            Self::Unittest => "python-unittest",
            Self::UnittestSandboxed => "python-unittest-sandboxed",
            Self::UnittestMultiContext => "python-unittest-multi-context",
            Self::UnittestJython => "python-unittest-jython",
            Self::TaggedUnittest => "python-tagged-unittest",
            Self::SvmUnittest => "python-svm-unittest",
            Self::SvmUnittestSandboxed => "python-svm-unittest-sandboxed",
            Self::SharedLibrary => "python-so",
            Self::SharedLibrarySandboxed => "python-so-sandboxed",
            Self::Graalvm => "python-graalvm",
            Self::GraalvmSandboxed => "python-graalvm-sandboxed",
            Self::Svm => "python-svm",
            Self::NativeImageEmbedder => "python-native-image-embedder",
            Self::License => "python-license",
            Self::Style => "style",
        }
    }

    /// Whether the tag needs sandboxed execution support
    pub fn is_sandboxed(&self) -> bool {
        self.as_str().ends_with("-sandboxed")
    }

    /// Tags run when no explicit selection is given: `style` plus either
    /// the sandboxed or the plain `python-*` tags, never both
    pub fn defaults(sandboxed: bool) -> Vec<GateTag> {
        Self::ALL
            .iter()
            .copied()
            .filter(|t| *t == Self::Style || t.is_sandboxed() == sandboxed)
            .collect()
    }
}

impl fmt::Display for GateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown gate tag: {}", s))
    }
}

/// Requested tags for one gate run. Empty selects every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelection {
    tags: BTreeSet<String>,
}

impl TagSelection {
    /// Selection running every task
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list. Blank entries are ignored, so an empty
    /// string selects every task.
    pub fn parse(list: &str) -> Self {
        Self::from_tags(
            list.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        )
    }

    /// Default selection: `style` with the sandboxed `python-*` tags when
    /// sandboxed support is available, the plain ones otherwise
    pub fn defaults(sandboxed: bool) -> Self {
        Self::from_tags(GateTag::defaults(sandboxed).iter().map(GateTag::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Whether a task carrying `task_tags` runs under this selection
    pub fn matches<S: AsRef<str>>(&self, task_tags: &[S]) -> bool {
        self.is_empty() || task_tags.iter().any(|t| self.tags.contains(t.as_ref()))
    }

    /// Requested tags outside the known vocabulary
    pub fn unknown(&self) -> Vec<&str> {
        self.iter()
            .filter(|t| t.parse::<GateTag>().is_err())
            .collect()
    }
}

impl fmt::Display for TagSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<all>")
        } else {
            f.write_str(&self.iter().collect::<Vec<_>>().join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_strings_roundtrip() {
        for tag in GateTag::ALL {
            assert_eq!(tag.as_str().parse::<GateTag>().unwrap(), tag);
        }
        assert!("python-unknown".parse::<GateTag>().is_err());
    }

    #[test]
    fn test_defaults_without_sandboxed() {
        let tags = GateTag::defaults(false);
        assert!(tags.contains(&GateTag::Style));
        assert!(tags.contains(&GateTag::Junit));
        assert!(tags.iter().all(|t| !t.is_sandboxed()));
        assert_eq!(tags.len(), 12);
    }

    #[test]
    fn test_defaults_with_sandboxed() {
        let selection = TagSelection::defaults(true);
        assert!(selection.contains("python-unittest-sandboxed"));
        assert!(selection.contains("python-svm-unittest-sandboxed"));
        assert!(selection.contains("python-so-sandboxed"));
        assert!(selection.contains("python-graalvm-sandboxed"));
        assert!(selection.contains("style"));
        assert!(!selection.contains("python-junit"));
        assert!(!selection.contains("python-unittest"));
        assert_eq!(selection.iter().count(), 5);
    }

    #[test]
    fn test_parse() {
        let selection = TagSelection::parse("python-junit, style,,");
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec!["python-junit", "style"]);
        assert!(TagSelection::parse("").is_empty());
        assert!(TagSelection::parse(" , ").is_empty());
    }

    #[test]
    fn test_matches() {
        let selection = TagSelection::from_tags(["y"]);
        assert!(!selection.matches(&["x"]));
        assert!(selection.matches(&["y"]));
        assert!(selection.matches(&["x", "y"]));
        assert!(!selection.matches::<&str>(&[]));

        let all = TagSelection::all();
        assert!(all.matches(&["x"]));
        assert!(all.matches::<&str>(&[]));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let selection = TagSelection::from_tags(["Style"]);
        assert!(!selection.matches(&["style"]));
    }

    #[test]
    fn test_unknown_tags() {
        let selection = TagSelection::parse("style,python-nope");
        assert_eq!(selection.unknown(), vec!["python-nope"]);
    }
}
