//! Route rules: an ordered list of path patterns mapped to access policies.
//!
//! # Pattern Syntax
//!
//! - a literal path such as `/` or `/login` matches exactly that path
//! - `*` matches exactly one path segment
//! - `?` and `*` inside a segment match one / any number of characters
//! - `**` matches zero or more path segments
//!
//! # Example
//!
//! ```
//! use actix_login_gate_core::http::security::route::{AccessPolicy, RouteRules};
//!
//! let rules = RouteRules::new()
//!     .permit_all(&["/", "/login", "/assets/**"])
//!     .any_request(AccessPolicy::Authenticated);
//!
//! assert_eq!(rules.decide("/"), AccessPolicy::Public);
//! assert_eq!(rules.decide("/assets/css/site.css"), AccessPolicy::Public);
//! assert_eq!(rules.decide("/dashboard"), AccessPolicy::Authenticated);
//! ```
//!
//! # Spring Equivalent
//!
//! `authorizeHttpRequests(r -> r.requestMatchers(...).permitAll().anyRequest().authenticated())`

use std::fmt;

/// Access policy attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPolicy {
    /// Anonymous access is allowed.
    Public,
    /// An authenticated session is required.
    Authenticated,
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPolicy::Public => write!(f, "PUBLIC"),
            AccessPolicy::Authenticated => write!(f, "AUTHENTICATED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    /// `*`
    Single,
    /// `**`
    Many,
    /// a segment containing `*` or `?`
    Glob(String),
}

/// A compiled request path pattern.
///
/// # Spring Equivalent
/// `PathPatternRequestMatcher` / `AntPathRequestMatcher`
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        let segments = split_segments(pattern)
            .into_iter()
            .map(|part| match part {
                "**" => Segment::Many,
                "*" => Segment::Single,
                p if p.contains('*') || p.contains('?') => Segment::Glob(p.to_string()),
                p => Segment::Literal(p.to_string()),
            })
            .collect();

        PathPattern {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        match_segments(&self.segments, &split_segments(path))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl From<&str> for PathPattern {
    fn from(pattern: &str) -> Self {
        PathPattern::new(pattern)
    }
}

// "/" has no segments; a trailing slash yields a trailing empty segment
// so that "/login/" and "/login" stay distinct.
fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Many, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            None => false,
            Some((head, tail)) => segment_matches(segment, head) && match_segments(rest, tail),
        },
    }
}

fn segment_matches(segment: &Segment, part: &str) -> bool {
    match segment {
        Segment::Literal(literal) => literal == part,
        Segment::Single => !part.is_empty(),
        Segment::Glob(glob) => glob_match(glob.as_bytes(), part.as_bytes()),
        Segment::Many => true,
    }
}

fn glob_match(glob: &[u8], text: &[u8]) -> bool {
    match glob.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|skip| glob_match(rest, &text[skip..])),
        Some((b'?', rest)) => !text.is_empty() && glob_match(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && glob_match(rest, &text[1..]),
    }
}

/// One entry of the rule list.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pattern: PathPattern,
    policy: AccessPolicy,
}

impl RouteRule {
    pub fn new(pattern: impl Into<PathPattern>, policy: AccessPolicy) -> Self {
        RouteRule {
            pattern: pattern.into(),
            policy,
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }
}

/// Ordered route rules. The first matching rule wins; paths no rule
/// matches get the default policy, which is `Authenticated` unless
/// [`RouteRules::any_request`] says otherwise.
#[derive(Debug, Clone)]
pub struct RouteRules {
    rules: Vec<RouteRule>,
    default_policy: AccessPolicy,
}

impl RouteRules {
    pub fn new() -> Self {
        RouteRules {
            rules: Vec::new(),
            default_policy: AccessPolicy::Authenticated,
        }
    }

    /// Appends a rule.
    pub fn rule(mut self, pattern: &str, policy: AccessPolicy) -> Self {
        self.rules.push(RouteRule::new(pattern, policy));
        self
    }

    /// # Spring Equivalent
    /// `requestMatchers("/", "/login").permitAll()`
    pub fn permit_all(self, patterns: &[&str]) -> Self {
        patterns
            .iter()
            .fold(self, |rules, p| rules.rule(p, AccessPolicy::Public))
    }

    /// # Spring Equivalent
    /// `requestMatchers("/account/**").authenticated()`
    pub fn authenticated(self, patterns: &[&str]) -> Self {
        patterns
            .iter()
            .fold(self, |rules, p| rules.rule(p, AccessPolicy::Authenticated))
    }

    /// Sets the policy for paths no rule matches.
    ///
    /// # Spring Equivalent
    /// `anyRequest().authenticated()`
    pub fn any_request(mut self, policy: AccessPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Classifies a request path.
    pub fn decide(&self, path: &str) -> AccessPolicy {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.policy)
            .unwrap_or(self.default_policy)
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn default_policy(&self) -> AccessPolicy {
        self.default_policy
    }
}

impl Default for RouteRules {
    fn default() -> Self {
        Self::new()
    }
}
