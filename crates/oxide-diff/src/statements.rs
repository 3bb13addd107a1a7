//! Rendered statement sequences and the safety gate.

use std::ops::Add;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::error::{DiffError, Result};

/// Separator appended after every rendered fragment.
pub const SEPARATOR: &str = "\n\n";

/// Default pattern for raw fragments: anything starting with `DROP`.
pub const DEFAULT_DESTRUCTIVE_PATTERN: &str = r"(?i)^\s*drop\b";

static DEFAULT_RE: OnceLock<Regex> = OnceLock::new();

fn default_regex() -> &'static Regex {
    DEFAULT_RE.get_or_init(|| Regex::new(DEFAULT_DESTRUCTIVE_PATTERN).expect("valid regex"))
}

/// Decides whether a caller-supplied fragment is destructive.
///
/// Structural changes carry an explicit tag; this pattern is only consulted
/// for raw SQL whose effect cannot be known from catalog data.
#[derive(Debug, Clone)]
pub struct DestructivePattern {
    pattern: Regex,
}

impl DestructivePattern {
    /// Creates a pattern from a regular expression.
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Returns true if `sql` matches.
    #[must_use]
    pub fn is_match(&self, sql: &str) -> bool {
        self.pattern.is_match(sql)
    }

    /// The underlying expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for DestructivePattern {
    fn default() -> Self {
        Self {
            pattern: default_regex().clone(),
        }
    }
}

impl PartialEq for DestructivePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for DestructivePattern {}

/// One SQL fragment with its destructiveness tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// SQL text.
    pub sql: String,
    /// Whether the fragment may discard data or break a dependent.
    pub destructive: bool,
}

impl Fragment {
    /// Creates a tagged fragment.
    #[must_use]
    pub fn new(sql: impl Into<String>, destructive: bool) -> Self {
        Self {
            sql: sql.into(),
            destructive,
        }
    }

    /// Creates a fragment classified by `pattern`.
    #[must_use]
    pub fn raw(sql: impl Into<String>, pattern: &DestructivePattern) -> Self {
        let sql = sql.into();
        let destructive = pattern.is_match(&sql);
        Self { sql, destructive }
    }
}

/// An ordered sequence of SQL fragments guarded by a safety gate.
///
/// While `safe` is true, rendering fails if any fragment is destructive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statements {
    fragments: Vec<Fragment>,
    /// Block destructive fragments when rendering.
    pub safe: bool,
}

impl Default for Statements {
    fn default() -> Self {
        Self {
            fragments: Vec::new(),
            safe: true,
        }
    }
}

impl Statements {
    /// Creates statements from raw SQL, classified by the default pattern.
    #[must_use]
    pub fn new<I, S>(sql: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_pattern(sql, &DestructivePattern::default())
    }

    /// Creates statements from raw SQL, classified by `pattern`.
    #[must_use]
    pub fn with_pattern<I, S>(sql: I, pattern: &DestructivePattern) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: sql.into_iter().map(|s| Fragment::raw(s, pattern)).collect(),
            safe: true,
        }
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    /// Fragments in order.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Iterates over the SQL text of every fragment.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|f| f.sql.as_str())
    }

    /// Number of fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if there are no fragments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Returns true if any fragment is destructive.
    #[must_use]
    pub fn has_destructive(&self) -> bool {
        self.fragments.iter().any(|f| f.destructive)
    }

    /// Removes every fragment. The gate is left unchanged.
    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    /// Renders every fragment followed by [`SEPARATOR`].
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::UnsafeMigration`] if the gate is enabled and
    /// any fragment is destructive.
    pub fn sql(&self) -> Result<String> {
        if self.safe && self.has_destructive() {
            let count = self.fragments.iter().filter(|f| f.destructive).count();
            warn!(destructive = count, "Blocked destructive statements");
            return Err(DiffError::UnsafeMigration);
        }
        Ok(self
            .fragments
            .iter()
            .map(|f| format!("{}{SEPARATOR}", f.sql))
            .collect())
    }
}

impl Extend<Fragment> for Statements {
    fn extend<T: IntoIterator<Item = Fragment>>(&mut self, iter: T) {
        self.fragments.extend(iter);
    }
}

impl Add for Statements {
    type Output = Self;

    /// Concatenates in order. The result's gate is reset to enabled.
    fn add(mut self, rhs: Self) -> Self {
        self.fragments.extend(rhs.fragments);
        self.safe = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenation_and_gate() {
        let a = Statements::new(["select 1;"]);
        let b = Statements::new(["select 2;"]);
        let c = Statements::new(["drop table x;"]);

        let mut all = a + b + c;
        assert_eq!(all.len(), 3);
        assert!(matches!(all.sql(), Err(DiffError::UnsafeMigration)));

        all.safe = false;
        assert_eq!(
            all.sql().unwrap(),
            "select 1;\n\nselect 2;\n\ndrop table x;\n\n"
        );
    }

    #[test]
    fn test_add_resets_gate() {
        let mut a = Statements::new(["select 1;"]);
        a.safe = false;
        let mut b = Statements::new(["drop table x;"]);
        b.safe = false;
        let joined = a + b;
        assert!(joined.safe);
        assert!(joined.sql().is_err());
    }

    #[test]
    fn test_default_pattern() {
        let pattern = DestructivePattern::default();
        assert!(pattern.is_match("DROP TABLE x;"));
        assert!(pattern.is_match("  drop view v;"));
        assert!(!pattern.is_match("select 'drop';"));
        assert!(!pattern.is_match("create table dropped();"));
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = DestructivePattern::new(r"(?i)^\s*(drop|truncate|delete)\b").unwrap();
        let statements = Statements::with_pattern(["truncate t;"], &pattern);
        assert!(statements.has_destructive());
        assert!(DestructivePattern::new("(").is_err());
    }

    #[test]
    fn test_tagged_fragment_overrides_pattern() {
        let mut statements = Statements::default();
        statements.push(Fragment::new("drop view \"public\".\"v\";", false));
        assert_eq!(statements.sql().unwrap(), "drop view \"public\".\"v\";\n\n");
    }

    #[test]
    fn test_empty_renders_empty() {
        assert_eq!(Statements::default().sql().unwrap(), "");
    }
}
