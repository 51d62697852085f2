//! URL rule matching
//!
//! Pure functions that evaluate a visitor's page URL against an organization's
//! ordered rule list. Nothing here touches engine state.

use std::collections::HashMap;

use tracing::debug;
use url::{form_urlencoded, Url};

use super::rules::{ConditionTarget, MatchOperator, OrganizationRoutingConfig, RoutingCondition, RoutingRule};
use crate::ids::PoolId;

/// The parts of a page URL that rules can inspect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlContext {
    /// Host name; empty for bare paths
    pub domain: String,
    pub path: String,
    /// Query parameters keyed by lowercased name
    pub query_params: HashMap<String, String>,
}

impl UrlContext {
    /// Split a page URL into domain, path and query parameters.
    ///
    /// Input that is not an absolute URL is treated as a bare path (a leading
    /// `/` is added when missing) and its `?key=value&...` suffix is decoded
    /// the same way as an absolute URL's query.
    pub fn parse(page_url: &str) -> Self {
        match Url::parse(page_url) {
            Ok(url) => {
                let query_params = url
                    .query_pairs()
                    .map(|(key, value)| (key.to_lowercase(), value.into_owned()))
                    .collect();
                Self {
                    domain: url.host_str().unwrap_or_default().to_string(),
                    path: url.path().to_string(),
                    query_params,
                }
            }
            Err(_) => Self::parse_bare_path(page_url),
        }
    }

    fn parse_bare_path(raw: &str) -> Self {
        let full = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{}", raw)
        };

        let mut query_params = HashMap::new();
        let path = match full.split_once('?') {
            Some((path, query)) => {
                for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                    if !key.is_empty() {
                        query_params.insert(key.to_lowercase(), value.into_owned());
                    }
                }
                path.to_string()
            }
            None => full,
        };

        Self { domain: String::new(), path, query_params }
    }
}

/// Evaluate one condition against a parsed URL.
///
/// A `query_param` condition whose parameter is absent fails, except under
/// `does_not_contain`, where a missing parameter trivially does not contain
/// the value.
pub fn match_condition(context: &UrlContext, condition: &RoutingCondition) -> bool {
    let candidate = match &condition.target {
        ConditionTarget::Domain => context.domain.as_str(),
        ConditionTarget::Path => context.path.as_str(),
        ConditionTarget::QueryParam { param_name } => {
            match context.query_params.get(&param_name.to_lowercase()) {
                Some(value) => value.as_str(),
                None if condition.operator == MatchOperator::DoesNotContain => "",
                None => return false,
            }
        }
    };

    condition
        .operator
        .apply(&candidate.to_lowercase(), &condition.value.to_lowercase())
}

/// Legacy domain pattern: `*`, exact host, `*.base` (base or any subdomain),
/// otherwise substring containment.
pub fn match_domain_pattern(domain: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let domain = domain.to_lowercase();
    let pattern = pattern.to_lowercase();
    if domain == pattern {
        return true;
    }
    if let Some(base) = pattern.strip_prefix("*.") {
        return domain == base || domain.ends_with(&format!(".{}", base));
    }
    domain.contains(&pattern)
}

fn trim_trailing_slashes(value: &str) -> &str {
    let trimmed = value.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Legacy path pattern.
///
/// - exact: `/pricing`
/// - `/docs/**`: `/docs` itself and every descendant
/// - `/docs/*`: direct children of `/docs` only
/// - `/doc*`: any path starting with `/doc`
///
/// Trailing slashes are ignored on both sides.
pub fn match_path_pattern(path: &str, pattern: &str) -> bool {
    let path = path.to_lowercase();
    let pattern = pattern.to_lowercase();
    let path = trim_trailing_slashes(&path);
    let pattern = trim_trailing_slashes(&pattern);

    if path == pattern {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix("/**") {
        return path == prefix || path.starts_with(&format!("{}/", prefix));
    }

    if let Some(prefix) = pattern.strip_suffix("/*") {
        return match path.strip_prefix(&format!("{}/", prefix)) {
            Some(remainder) => !remainder.contains('/'),
            None => false,
        };
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return path.starts_with(prefix);
    }

    false
}

/// Whether a single rule matches the URL
pub fn rule_matches(context: &UrlContext, rule: &RoutingRule) -> bool {
    if !rule.conditions.is_empty() {
        return rule
            .conditions
            .iter()
            .all(|condition| match_condition(context, condition));
    }
    match_domain_pattern(&context.domain, &rule.domain_pattern)
        && match_path_pattern(&context.path, &rule.path_pattern)
}

/// Resolve a page URL to a pool: first matching rule wins, otherwise the
/// organization's default pool.
pub fn resolve(config: &OrganizationRoutingConfig, page_url: &str) -> Option<PoolId> {
    let context = UrlContext::parse(page_url);

    for rule in config.rules.iter().filter(|rule| rule.is_active) {
        if rule_matches(&context, rule) {
            debug!("🧭 {} matched rule {} -> pool {}", page_url, rule.id, rule.pool_id);
            return Some(rule.pool_id.clone());
        }
    }

    debug!(
        "🧭 {} matched no rule for org {}, default pool {:?}",
        page_url, config.organization_id, config.default_pool_id
    );
    config.default_pool_id.clone()
}
