use quiver_types::VName;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::{RewriteError, RewriteResult};

/// Identifier template with capture-group markers in its fields.
///
/// Fields use the expansion syntax of [`Regex::replace`]: `${1}`, `${name}`,
/// and `$$` for a literal dollar. [`Rules::parse_json`] additionally accepts
/// the `@n@` marker form used in rule files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VNameTemplate {
    pub corpus: String,
    pub root: String,
    pub path: String,
    pub signature: String,
}

/// A single rewrite rule: a pattern and the identifier template it expands.
#[derive(Clone, Debug)]
pub struct Rule {
    pattern: Regex,
    template: VNameTemplate,
}

impl Rule {
    /// Compile a rule. The pattern is implicitly anchored at both ends.
    pub fn new(pattern: &str, template: VNameTemplate) -> RewriteResult<Self> {
        let anchored = anchor(pattern);
        let pattern =
            Regex::new(&anchored).map_err(|e| RewriteError::InvalidPattern(e.to_string()))?;
        Ok(Self { pattern, template })
    }

    /// Apply this rule to an input, expanding the template from the match's
    /// capture groups. Returns `None` if the input does not match.
    pub fn apply(&self, input: &str) -> Option<VName> {
        let captures = self.pattern.captures(input)?;
        Some(VName {
            signature: expand(&captures, &self.template.signature),
            corpus: expand(&captures, &self.template.corpus),
            root: expand(&captures, &self.template.root),
            path: expand(&captures, &self.template.path),
            language: String::new(),
        })
    }
}

/// An ordered set of rewrite rules; the first matching rule wins.
#[derive(Clone, Debug, Default)]
pub struct Rules(Vec<Rule>);

impl Rules {
    /// Build a rule set from compiled rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply each rule in order; the first match yields the identifier.
    pub fn apply(&self, input: &str) -> Option<VName> {
        self.0.iter().find_map(|rule| rule.apply(input))
    }

    /// As [`apply`](Rules::apply), falling back to `default` when no rule
    /// matches.
    pub fn apply_default(&self, input: &str, default: VName) -> VName {
        self.apply(input).unwrap_or(default)
    }

    /// Parse a JSON rules file.
    ///
    /// Each element carries an RE2-style pattern and an identifier template;
    /// `@n@` markers in template fields refer to the n'th capture group of
    /// the pattern, and patterns are anchored at both ends.
    pub fn parse_json(data: &[u8]) -> RewriteResult<Self> {
        let raw: Vec<RawRule> = serde_json::from_slice(data)?;
        let mut rules = Vec::with_capacity(raw.len());
        for rule in raw {
            let template = VNameTemplate {
                corpus: fix_template(&rule.vname.corpus),
                root: fix_template(&rule.vname.root),
                path: fix_template(&rule.vname.path),
                signature: fix_template(&rule.vname.signature),
            };
            rules.push(Rule::new(&rule.pattern, template)?);
        }
        Ok(Self(rules))
    }
}

/// Rule file element: pattern plus raw (un-fixed) template.
#[derive(Deserialize)]
struct RawRule {
    pattern: String,
    #[serde(default)]
    vname: VNameTemplate,
}

/// Anchor a pattern at both ends unless already anchored.
fn anchor(pattern: &str) -> String {
    let mut anchored = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('^') {
        anchored.push('^');
    }
    anchored.push_str(pattern);
    if !pattern.ends_with('$') {
        anchored.push('$');
    }
    anchored
}

/// Rewrite `@n@` markers to the `${n}` form, escaping any literal `$`.
fn fix_template(template: &str) -> String {
    if template.is_empty() {
        return String::new();
    }
    let escaped = template.replace('$', "$$");
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped.as_str();
    while let Some(start) = rest.find('@') {
        let after = &rest[start + 1..];
        match after.find('@') {
            Some(len) if after[..len].chars().all(|c| c.is_alphanumeric() || c == '_') => {
                out.push_str(&rest[..start]);
                out.push_str("${");
                out.push_str(&after[..len]);
                out.push('}');
                rest = &after[len + 1..];
            }
            _ => {
                out.push_str(&rest[..start + 1]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Expand a template against a match's capture groups.
fn expand(captures: &Captures<'_>, template: &str) -> String {
    if template.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    captures.expand(template, &mut out);
    out
}
