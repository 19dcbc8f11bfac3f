//! Source selection using glob patterns.

use glob::Pattern;

use crate::{Error, Result};

/// Source selector based on include and exclude glob patterns.
///
/// With no include patterns every path is a candidate; otherwise a path must
/// match at least one include. A path matching any exclude is dropped.
#[derive(Debug, Clone, Default)]
pub struct FileSelector {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileSelector {
    /// Creates a selector from pattern strings.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Returns true if the selector keeps every path.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Checks if a source path passes the selection.
    pub fn matches(&self, path: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(path)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(path))
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Pattern::new(p).map_err(|e| Error::InvalidPattern {
                pattern: p.to_string(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selects_all() {
        let selector = FileSelector::default();
        assert!(selector.is_empty());
        assert!(selector.matches("anything/at/all"));
    }

    #[test]
    fn test_exclude() {
        let selector = FileSelector::new(&[] as &[&str], &["**/*.class"]).unwrap();
        assert!(selector.matches("src/A.java"));
        assert!(!selector.matches("out/A.class"));
    }

    #[test]
    fn test_include_and_exclude() {
        let selector = FileSelector::new(&["res/**"], &["res/raw/*"]).unwrap();
        assert!(selector.matches("res/values/strings.xml"));
        assert!(!selector.matches("res/raw/blob.bin"));
        assert!(!selector.matches("src/Main.java"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = FileSelector::new(&["a[b"], &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
