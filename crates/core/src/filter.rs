//! Include/exclude filter language.
//!
//! A filter is a plain string whose meaning is determined by its shape:
//!
//! | Shape | Kind | Example |
//! |-------|------|---------|
//! | `*` or `.*` | match-all | `*` |
//! | starts and ends with `/` | regex | `/^GET \/users\/([0-9]+)\/$/` |
//! | contains `*` | wildcard, anchored both ends | `POST /api/*` |
//! | contains a namespace separator | prefix | `App\Http\Controllers` |
//! | anything else | exact | `GET /` |
//!
//! Namespace separators are `\`, `::`, and `.` when the pattern has no `/`
//! and no whitespace (so `App.Http.Controllers` is a prefix, while
//! `GET /index.html` stays exact).
//!
//! A set of filters matches when any filter matches any component. An empty
//! set never matches.

use crate::error::{ConfigError, ConfigResult};
use regex::Regex;

/// One compiled filter pattern.
#[derive(Debug, Clone)]
pub enum FilterPattern {
    /// `*` or `.*`
    MatchAll,
    /// `/.../` delimited, used verbatim (unanchored unless the body anchors)
    Regex(Regex),
    /// Glob with `*` expanded to "any substring", anchored both ends
    Wildcard(Regex),
    /// Literal namespace prefix
    Prefix(String),
    /// Literal full-string match
    Exact(String),
}

impl FilterPattern {
    /// Classify and compile a pattern.
    ///
    /// Fails only for regex patterns whose body is not a valid expression.
    pub fn parse(pattern: &str) -> ConfigResult<Self> {
        if pattern == "*" || pattern == ".*" {
            return Ok(FilterPattern::MatchAll);
        }

        if is_regex(pattern) {
            let body = &pattern[1..pattern.len() - 1];
            let re = Regex::new(body).map_err(|e| invalid(pattern, e))?;
            return Ok(FilterPattern::Regex(re));
        }

        if pattern.contains('*') {
            let expr = pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            let re = Regex::new(&format!("^(?s:{})$", expr)).map_err(|e| invalid(pattern, e))?;
            return Ok(FilterPattern::Wildcard(re));
        }

        if has_namespace_separator(pattern) {
            return Ok(FilterPattern::Prefix(pattern.to_string()));
        }

        Ok(FilterPattern::Exact(pattern.to_string()))
    }

    /// Check a single component against this pattern.
    pub fn is_match(&self, component: &str) -> bool {
        match self {
            FilterPattern::MatchAll => true,
            FilterPattern::Regex(re) | FilterPattern::Wildcard(re) => re.is_match(component),
            FilterPattern::Prefix(prefix) => component.starts_with(prefix.as_str()),
            FilterPattern::Exact(literal) => component == literal,
        }
    }

    /// Whether this is the match-all pattern.
    pub fn is_match_all(&self) -> bool {
        matches!(self, FilterPattern::MatchAll)
    }
}

fn is_regex(pattern: &str) -> bool {
    pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/')
}

fn has_namespace_separator(pattern: &str) -> bool {
    if pattern.contains('\\') || pattern.contains("::") {
        return true;
    }
    pattern.contains('.') && !pattern.contains('/') && !pattern.chars().any(char::is_whitespace)
}

fn invalid(pattern: &str, e: regex::Error) -> ConfigError {
    ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    }
}

/// A compiled list of patterns.
///
/// Compile once per configuration and reuse across calls; matching is then
/// allocation-free and safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    patterns: Vec<FilterPattern>,
    match_all: bool,
}

impl FilterSet {
    /// Compile every pattern in `patterns`.
    pub fn compile<I, S>(patterns: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| FilterPattern::parse(p.as_ref()))
            .collect::<ConfigResult<Vec<_>>>()?;
        let match_all = patterns.iter().any(FilterPattern::is_match_all);
        Ok(Self {
            patterns,
            match_all,
        })
    }

    /// True if no patterns are configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Does any pattern match any component?
    pub fn matches<S: AsRef<str>>(&self, components: &[S]) -> bool {
        if self.match_all {
            return true;
        }
        self.patterns
            .iter()
            .any(|p| components.iter().any(|c| p.is_match(c.as_ref())))
    }
}

/// One-shot form of [`FilterSet::matches`]: compile `patterns` and test them
/// against `components`.
pub fn matches<C, P>(components: &[C], patterns: &[P]) -> ConfigResult<bool>
where
    C: AsRef<str>,
    P: AsRef<str>,
{
    if patterns.is_empty() {
        return Ok(false);
    }
    Ok(FilterSet::compile(patterns)?.matches(components))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m(components: &[&str], patterns: &[&str]) -> bool {
        matches(components, patterns).unwrap()
    }

    fn request_components() -> Vec<&'static str> {
        vec![
            "GET /",
            "GET /example",
            "POST /api/users",
            "App\\Http\\Controllers\\UserController",
            "UserController",
        ]
    }

    #[test]
    fn test_classification() {
        assert!(matches!(FilterPattern::parse("*").unwrap(), FilterPattern::MatchAll));
        assert!(matches!(FilterPattern::parse(".*").unwrap(), FilterPattern::MatchAll));
        assert!(matches!(FilterPattern::parse("/^a$/").unwrap(), FilterPattern::Regex(_)));
        assert!(matches!(FilterPattern::parse("GET /a/*").unwrap(), FilterPattern::Wildcard(_)));
        assert!(matches!(FilterPattern::parse("App\\Http").unwrap(), FilterPattern::Prefix(_)));
        assert!(matches!(FilterPattern::parse("App.Http").unwrap(), FilterPattern::Prefix(_)));
        assert!(matches!(FilterPattern::parse("app::jobs").unwrap(), FilterPattern::Prefix(_)));
        assert!(matches!(FilterPattern::parse("GET /").unwrap(), FilterPattern::Exact(_)));
        assert!(matches!(FilterPattern::parse("GET /a.html").unwrap(), FilterPattern::Exact(_)));
        // A lone slash is a path, not an empty regex
        assert!(matches!(FilterPattern::parse("/").unwrap(), FilterPattern::Exact(_)));
    }

    #[test]
    fn test_request_filter_table() {
        let c = request_components();
        let cases: Vec<(Vec<&str>, bool)> = vec![
            (vec!["GET /"], true),
            (vec!["POST /api/*"], true),
            (vec!["App\\Http\\Controllers"], true),
            (vec!["UserController"], true),
            (vec!["/^App\\\\Http\\\\Controllers\\\\.*$/"], true),
            (vec!["GET /invalid", "POST /other"], false),
            (vec![], false),
            (vec!["*"], true),
            (vec!["/^GET \\/example\\/([0-9]+)\\/$/"], false),
            (vec!["GET /example/*"], false),
            (vec!["GET /example"], true),
            (vec!["UserController", "App\\Http\\Controllers"], true),
        ];
        for (patterns, expected) in cases {
            assert_eq!(m(&c, &patterns), expected, "patterns {:?}", patterns);
        }
    }

    #[test]
    fn test_exact() {
        assert!(m(&["GET /"], &["GET /"]));
        assert!(!m(&["GET /"], &["GET /other"]));
        assert!(!m(&["GET /other"], &["GET /"]));
    }

    #[test]
    fn test_wildcard_is_anchored() {
        assert!(m(&["POST /api/users"], &["POST /api/*"]));
        assert!(!m(&["GET /api/users"], &["POST /api/*"]));
        assert!(m(&["GET /api/v1/users"], &["GET /api/*/users"]));
        assert!(!m(&["GET /api/v1/users/7"], &["GET /api/*/users"]));
    }

    #[test]
    fn test_wildcard_escapes_metacharacters() {
        assert!(m(&["GET /a.b/x"], &["GET /a.b/*"]));
        assert!(!m(&["GET /aXb/x"], &["GET /a.b/*"]));
        assert!(m(&["GET /search?q=1"], &["GET /search?*"]));
    }

    #[test]
    fn test_prefix() {
        assert!(m(
            &["App.Http.Controllers.UserController"],
            &["App.Http.Controllers"]
        ));
        assert!(m(&["App\\Jobs\\SendMail"], &["App\\Jobs"]));
        assert!(!m(&["Lib\\App\\Jobs"], &["App\\Jobs"]));
    }

    #[test]
    fn test_regex() {
        assert!(m(&["GET /users/123/"], &["/^GET \\/users\\/([0-9]+)\\/$/"]));
        assert!(!m(&["GET /users/abc/"], &["/^GET \\/users\\/([0-9]+)\\/$/"]));
        // Unanchored regex matches a substring
        assert!(m(&["POST /api/users"], &["/users/"]));
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let err = matches(&["x"], &["/([a-/"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_match_all_short_circuits_over_components() {
        let empty: [&str; 0] = [];
        assert!(m(&empty, &["*"]));
        assert!(m(&empty, &[".*"]));
        assert!(!m(&empty, &["GET /"]));
    }

    #[test]
    fn test_filter_set_reuse() {
        let set = FilterSet::compile(["GET /health", "App\\Internal"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches(&["GET /health"]));
        assert!(set.matches(&["App\\Internal\\Probe"]));
        assert!(!set.matches(&["GET /users"]));
        assert!(FilterSet::default().is_empty());
        assert!(!FilterSet::default().matches(&["anything"]));
    }

    proptest! {
        #[test]
        fn prop_empty_patterns_never_match(components in prop::collection::vec(".*", 0..8)) {
            let none: [&str; 0] = [];
            prop_assert!(!matches(&components, &none).unwrap());
        }

        #[test]
        fn prop_match_all_always_matches(components in prop::collection::vec(".*", 0..8)) {
            prop_assert!(matches(&components, &["*"]).unwrap());
            prop_assert!(matches(&components, &[".*"]).unwrap());
        }

        #[test]
        fn prop_literal_matches_itself(literal in "[A-Za-z0-9 /:_-]{1,24}") {
            // Slash-delimited literals are regexes; skip those shapes.
            prop_assume!(!(literal.len() >= 2 && literal.starts_with('/') && literal.ends_with('/')));
            prop_assert!(matches(&[literal.as_str()], &[literal.as_str()]).unwrap());
        }
    }
}
