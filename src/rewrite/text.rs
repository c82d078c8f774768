//! Textual brand and domain substitution.
//!
//! Rules are an ordered table of (pattern, replacement) pairs applied to raw
//! bytes. Nothing here understands markup: a match inside an attribute,
//! a script or visible text is replaced all the same.

use std::borrow::Cow;

use regex::bytes::{NoExpand, Regex};

use crate::config::{BrandConfig, FeatureConfig};

/// Where a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Header values and HTML bodies.
    Everywhere,
    /// HTML bodies only.
    Body,
    /// HTML bodies of feature-triggered requests only.
    Feature,
}

#[derive(Debug, Clone)]
enum Replacement {
    /// The client's current base host, known per request.
    BaseHost,
    Fixed(String),
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    replacement: Replacement,
    scope: Scope,
}

/// Ordered substitution table.
#[derive(Debug, Clone)]
pub struct TextRewriter {
    rules: Vec<Rule>,
}

impl TextRewriter {
    pub fn new(brand: &BrandConfig, feature: &FeatureConfig) -> Result<Self, regex::Error> {
        let label = regex::escape(&brand.origin_label);

        // Literal suffixes go first so `off.ai` is not cut short at `of`.
        let mut tlds: Vec<String> = brand
            .origin_domain_suffixes
            .iter()
            .map(|s| regex::escape(s))
            .collect();
        tlds.push(r"(com|[a-z]{2})(\.[a-z]{2})?".to_string());
        let domain = format!(r"(?i)(?-u:\b){label}\.({})", tlds.join("|"));

        let mut rules = vec![
            Rule {
                pattern: Regex::new(&domain)?,
                replacement: Replacement::BaseHost,
                scope: Scope::Everywhere,
            },
            Rule {
                pattern: Regex::new(&format!("(?i){label}"))?,
                replacement: Replacement::Fixed(brand.public_name.clone()),
                scope: Scope::Body,
            },
        ];

        if feature.enabled {
            rules.push(Rule {
                pattern: Regex::new(&format!("(?i){}", regex::escape(&feature.term)))?,
                replacement: Replacement::Fixed(brand.public_name.clone()),
                scope: Scope::Feature,
            });
        }

        Ok(Self { rules })
    }

    /// Domain pass over one header value.
    pub fn rewrite_header<'a>(&self, value: &'a [u8], base_host: &str) -> Cow<'a, [u8]> {
        self.apply(value, base_host, |scope| scope == Scope::Everywhere)
    }

    /// Domain pass, then brand pass, then the feature pass when `feature` is set.
    pub fn rewrite_body<'a>(&self, body: &'a [u8], base_host: &str, feature: bool) -> Cow<'a, [u8]> {
        self.apply(body, base_host, |scope| scope != Scope::Feature || feature)
    }

    fn apply<'a, F>(&self, input: &'a [u8], base_host: &str, include: F) -> Cow<'a, [u8]>
    where
        F: Fn(Scope) -> bool,
    {
        let mut text = Cow::Borrowed(input);
        for rule in self.rules.iter().filter(|rule| include(rule.scope)) {
            let replacement = match &rule.replacement {
                Replacement::BaseHost => base_host,
                Replacement::Fixed(value) => value.as_str(),
            };
            let replaced = match rule
                .pattern
                .replace_all(&text, NoExpand(replacement.as_bytes()))
            {
                Cow::Owned(replaced) => replaced,
                Cow::Borrowed(_) => continue,
            };
            text = Cow::Owned(replaced);
        }
        text
    }
}
