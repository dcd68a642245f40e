//! Path rewriting for forwarded requests.
//!
//! Rewrite rules are an ordered sequence with first-match-wins semantics:
//! the first rule whose substitution actually changes the path is applied
//! and no further rule is consulted. A rule that matches but produces a
//! textually identical path counts as "no change".

use super::ConfigError;
use regex::Regex;

/// A single path rewriting strategy.
///
/// Only one implementation exists today (regex substitution); the trait is
/// the seam for other strategies (e.g. literal prefix swapping) without
/// touching the forwarding path.
pub trait PathRewriter: Send + Sync {
    /// Rewrite `path`, returning `None` when the path is left unchanged.
    fn rewrite(&self, path: &str) -> Option<String>;
}

/// Regex-based rewriter applying a `pattern` -> `replacement` substitution.
///
/// The replacement may reference capture groups (`$1`, `${name}`).
pub struct RegexRewriter {
    pattern: Regex,
    replacement: String,
}

impl RegexRewriter {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, ConfigError> {
        let compiled = Regex::new(pattern).map_err(|source| ConfigError::RewritePattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            replacement: replacement.to_string(),
        })
    }
}

impl PathRewriter for RegexRewriter {
    fn rewrite(&self, path: &str) -> Option<String> {
        let replaced = self.pattern.replace_all(path, self.replacement.as_str());
        if replaced == path {
            return None;
        }
        Some(replaced.into_owned())
    }
}

/// An ordered set of rewrite rules.
///
/// Declaration order is preserved and significant. At most one rule is
/// applied per request.
pub struct RewriteSet {
    rules: Vec<Box<dyn PathRewriter>>,
}

impl std::fmt::Debug for RewriteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteSet")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl RewriteSet {
    /// Compile `(pattern, replacement)` pairs in declaration order.
    ///
    /// Any invalid pattern fails the whole set; partial success is not
    /// allowed.
    pub fn compile(pairs: &[(String, String)]) -> Result<Self, ConfigError> {
        let mut rules: Vec<Box<dyn PathRewriter>> = Vec::with_capacity(pairs.len());
        for (pattern, replacement) in pairs {
            rules.push(Box::new(RegexRewriter::new(pattern, replacement)?));
        }
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite `path` through the first effective rule.
    ///
    /// `None` means no rule changed the path.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.rewrite(path))
    }
}
