//! User whitelist rules.

use regex::Regex;

#[derive(Debug, Clone)]
enum Rule {
    Pattern(Regex),
    Fragment(String),
}

/// Parsed whitelist. Rules are separated by whitespace; a rule wrapped in
/// slashes (`/docs\.rs/`) is a regular expression, anything else matches as a
/// substring of the URL.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    rules: Vec<Rule>,
}

impl Whitelist {
    pub fn parse(raw: &str) -> Self {
        let rules = raw
            .split_whitespace()
            .filter_map(|item| {
                if item.len() > 2 && item.starts_with('/') && item.ends_with('/') {
                    match Regex::new(&item[1..item.len() - 1]) {
                        Ok(re) => Some(Rule::Pattern(re)),
                        Err(e) => {
                            tracing::warn!(rule = item, error = %e, "Skipping invalid whitelist pattern");
                            None
                        }
                    }
                } else {
                    Some(Rule::Fragment(item.to_string()))
                }
            })
            .collect();
        Self { rules }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.rules.iter().any(|rule| match rule {
            Rule::Pattern(re) => re.is_match(url),
            Rule::Fragment(fragment) => url.contains(fragment.as_str()),
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Appends `rule` to the raw whitelist unless an identical rule exists.
pub fn add_rule(raw: &str, rule: &str) -> String {
    if raw.split_whitespace().any(|existing| existing == rule) {
        return raw.to_string();
    }
    let trimmed = raw.trim_end();
    if trimmed.is_empty() {
        rule.to_string()
    } else {
        format!("{}\n{}", trimmed, rule)
    }
}

/// Drops every rule that matches `url`.
pub fn remove_matching(raw: &str, url: &str) -> String {
    raw.split_whitespace()
        .filter(|item| !Whitelist::parse(item).matches(url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The host (and optionally the path) of `url` without scheme, query or
/// fragment. Used to derive whitelist rules.
pub fn root_url(url: &str, include_path: bool) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let without_extras = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let root = if include_path {
        without_extras
    } else {
        without_extras.split('/').next().unwrap_or(without_extras)
    };
    root.trim_end_matches('/').to_string()
}
