// * Resolver rule set: custom resolvers, per-site scan limits and title rewrite rules.
// * Held per resolver instance; nothing here is process-global.

use crate::config::ConfigError;
use regex::Regex;
use std::sync::Arc;

/// Domain-specific shortcut producing a title from the URL alone.
pub type CustomResolver = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Regex replace applied to every fetched title, in registration order.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: compile(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    pub fn apply(&self, title: &str) -> String {
        self.pattern
            .replace_all(title, self.replacement.as_str())
            .into_owned()
    }
}

#[derive(Clone, Default)]
pub struct ResolverRules {
    resolvers: Vec<CustomResolver>,
    scan_limits: Vec<(Regex, usize)>,
    rewrites: Vec<RewriteRule>,
}

impl ResolverRules {
    pub fn new() -> Self {
        Self::default()
    }

    // * Custom resolvers ---------------------------------------------------

    pub fn add_resolver<F>(&mut self, resolver: F)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.resolvers.push(Arc::new(resolver));
    }

    /// Registers a resolver that turns URLs matching `pattern` into `template`,
    /// expanding capture groups (`$1`, `$name`).
    pub fn add_pattern_resolver(&mut self, pattern: &str, template: &str) -> Result<(), ConfigError> {
        let regex = compile(pattern)?;
        let template = template.to_string();
        self.add_resolver(move |url| {
            regex.captures(url).map(|caps| {
                let mut title = String::new();
                caps.expand(&template, &mut title);
                title
            })
        });
        Ok(())
    }

    pub fn clear_resolvers(&mut self) {
        self.resolvers.clear();
    }

    /// First non-empty answer of the registered resolvers
    pub fn custom_title(&self, url: &str) -> Option<String> {
        self.resolvers
            .iter()
            .filter_map(|r| r(url))
            .find(|t| !t.trim().is_empty())
    }

    // * Scan limits ---------------------------------------------------------

    pub fn add_scan_limit(&mut self, pattern: &str, limit: usize) -> Result<(), ConfigError> {
        self.scan_limits.push((compile(pattern)?, limit));
        Ok(())
    }

    pub fn clear_scan_limits(&mut self) {
        self.scan_limits.clear();
    }

    /// Limit of the first matching pattern, `default` otherwise
    pub fn scan_limit_for(&self, url: &str, default: usize) -> usize {
        self.scan_limits
            .iter()
            .find(|(p, _)| p.is_match(url))
            .map(|(_, limit)| *limit)
            .unwrap_or(default)
    }

    // * Rewrites ------------------------------------------------------------

    pub fn add_rewrite(&mut self, pattern: &str, replacement: &str) -> Result<(), ConfigError> {
        self.rewrites.push(RewriteRule::new(pattern, replacement)?);
        Ok(())
    }

    pub fn clear_rewrites(&mut self) {
        self.rewrites.clear();
    }

    /// Unescapes HTML entities and applies the rewrite rules in order.
    pub fn post_process(&self, raw: &str) -> String {
        let unescaped = html_escape::decode_html_entities(raw);
        let rewritten = self
            .rewrites
            .iter()
            .fold(unescaped.into_owned(), |title, rule| rule.apply(&title));
        rewritten.trim().to_string()
    }
}

impl std::fmt::Debug for ResolverRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRules")
            .field("resolvers", &self.resolvers.len())
            .field("scan_limits", &self.scan_limits.len())
            .field("rewrites", &self.rewrites)
            .finish()
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
