//! The source rewrite engine.
//!
//! A `Rewriter` is built once per run, after discovery has completed,
//! from the global namespace set and the namespace prefix. Rule sets are
//! compiled per namespace up front and applied to every file in the same
//! fixed order, so the transformation is identical across packages.
//!
//! Substitution rules for a namespace run most specific first: the
//! declaration and import anchors before the generic occurrence rules.
//! Occurrences are matched both in plain form (`Acme\Foo\`) and in the
//! escaped-separator form PHP string literals use (`Acme\\Foo\\`), each
//! anchored on the preceding character (whitespace, quote, or escaped
//! backslash) so a namespace is never rewritten as a substring of a
//! longer identifier.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;

use crate::hooks::HookRegistry;
use crate::rewrite::discover::{self, NamespaceSet};
use crate::util::fs as fsutil;

/// Placeholder protecting freshly prefixed call expressions from being
/// matched again by later substitution passes.
const GUARD_TOKEN: &str = "__ISOPACK_GUARD__";

/// One substitution rule: a compiled pattern and its replacement template.
struct Rule {
    regex: Regex,
    replacement: String,
}

/// All rules for a single namespace, applied in declaration order.
struct NamespaceRules {
    namespace: String,
    rules: Vec<Rule>,
}

/// Applies the namespace prefix across PHP sources.
pub struct Rewriter {
    prefix: String,
    rules: Vec<NamespaceRules>,
    guard: Rule,
    hooks: Arc<HookRegistry>,
}

impl Rewriter {
    /// Build a rewriter for the completed global namespace set.
    ///
    /// `prefix` must carry its trailing separator (`Iso\`). Namespaces
    /// that already start with the prefix compile to an empty rule set,
    /// which is what makes a rerun over rewritten output a no-op.
    pub fn new(namespaces: &NamespaceSet, prefix: &str, hooks: Arc<HookRegistry>) -> Result<Self> {
        let mut rules = Vec::with_capacity(namespaces.len());
        for namespace in namespaces.iter() {
            rules.push(NamespaceRules {
                namespace: namespace.to_string(),
                rules: if namespace.starts_with(prefix) {
                    Vec::new()
                } else {
                    compile_rules(namespace, prefix)?
                },
            });
        }

        let guard = Rule {
            regex: Regex::new(&format!(r"(\s){}(.*)\(", regex::escape(prefix)))
                .context("failed to compile guard pattern")?,
            replacement: format!("${{1}}\\{GUARD_TOKEN}${{2}}("),
        };

        Ok(Rewriter {
            prefix: prefix.to_string(),
            rules,
            guard,
            hooks,
        })
    }

    /// Rewrite one file in place.
    ///
    /// `prefix_declaration` is false for files of excluded packages and
    /// the root project: their own declarations keep their names, but
    /// references to other packages' namespaces are still rewritten.
    pub fn rewrite_file(&self, path: &Path, package: &str, prefix_declaration: bool) -> Result<()> {
        let source = fsutil::read_to_string(path)?;
        let rewritten = self.rewrite_source(source, package, path, prefix_declaration)?;
        fsutil::write_string(path, &rewritten)
    }

    /// Run the full rewrite pipeline over one file's contents.
    pub fn rewrite_source(
        &self,
        mut source: String,
        package: &str,
        file: &Path,
        prefix_declaration: bool,
    ) -> Result<String> {
        let current = discover::current_namespace(&source);
        let current_ref = current.as_deref();

        source = self
            .hooks
            .start(source, current_ref, &self.prefix, package, file)?;

        if prefix_declaration {
            if let Some(cur) = current_ref {
                if !cur.starts_with(&self.prefix) {
                    source = self.rewrite_declaration(source, cur)?;
                }
            }
        }

        for set in &self.rules {
            source = self.hooks.before(
                source,
                &set.namespace,
                current_ref,
                &self.prefix,
                package,
                file,
            )?;

            for rule in &set.rules {
                source = rule
                    .regex
                    .replace_all(&source, rule.replacement.as_str())
                    .into_owned();
            }

            // Shield prefixed call expressions behind a placeholder, then
            // restore; generic occurrence rules cannot re-match them.
            source = self
                .guard
                .regex
                .replace_all(&source, self.guard.replacement.as_str())
                .into_owned();
            source = source.replace(GUARD_TOKEN, &self.prefix);

            source = self.hooks.after(
                source,
                &set.namespace,
                current_ref,
                &self.prefix,
                package,
                file,
            )?;
        }

        source = self
            .hooks
            .end(source, current_ref, &self.prefix, package, file)?;

        Ok(source)
    }

    /// Normalize and prefix the file's own declaration statement.
    ///
    /// Both accepted input forms collapse to the canonical output:
    /// the opening tag on its own line, a blank line, the declaration.
    fn rewrite_declaration(&self, source: String, current: &str) -> Result<String> {
        let escaped = regex::escape(current);
        let prefix = &self.prefix;

        let bare = Regex::new(&format!(r"(?m)^\s*namespace\s+{escaped}\s*;"))
            .context("failed to compile declaration pattern")?;
        let replacement = format!("\nnamespace {prefix}{current};");
        let source = bare.replace_all(&source, replacement.as_str()).into_owned();

        let inline = Regex::new(&format!(r"(?m)^\s*<\?php\s+namespace\s+{escaped}\s*;"))
            .context("failed to compile declaration pattern")?;
        let replacement = format!("<?php\n\nnamespace {prefix}{current};");
        let source = inline.replace_all(&source, replacement.as_str()).into_owned();

        Ok(source)
    }
}

/// Compile the substitution rules for one namespace, most specific first.
fn compile_rules(namespace: &str, prefix: &str) -> Result<Vec<Rule>> {
    let ns_slash = format!("{namespace}\\");
    let ns_dbl = ns_slash.replace('\\', "\\\\");
    let pfx_dbl = prefix.replace('\\', "\\\\");

    let es_ns = regex::escape(namespace);
    let es_slash = regex::escape(&ns_slash);
    let es_dbl = regex::escape(&ns_dbl);

    let table: Vec<(String, String)> = vec![
        // Import statements, plain and partial.
        (
            format!(r"(?m)^(\s*)use\s+{es_slash}"),
            format!("${{1}}use {prefix}{ns_slash}"),
        ),
        (
            format!(r"(?m)^(\s*)use\s+{es_ns};"),
            format!("${{1}}use {prefix}{namespace};"),
        ),
        // Escaped-separator occurrences, as found inside string literals.
        (
            format!(r"(\s){es_dbl}"),
            format!("${{1}}{pfx_dbl}{ns_dbl}"),
        ),
        (format!("\"{es_dbl}"), format!("\"{pfx_dbl}{ns_dbl}")),
        (format!("'{es_dbl}"), format!("'{pfx_dbl}{ns_dbl}")),
        (
            format!(r"(\s)\\\\{es_dbl}"),
            format!(r"${{1}}\\{pfx_dbl}{ns_dbl}"),
        ),
        (
            format!(r#""\\\\{es_dbl}"#),
            format!(r#""\\{pfx_dbl}{ns_dbl}"#),
        ),
        (format!(r"'\\\\{es_dbl}"), format!(r"'\\{pfx_dbl}{ns_dbl}")),
        // Plain fully-qualified occurrences.
        (
            format!(r"(\s){es_slash}"),
            format!("${{1}}{prefix}{ns_slash}"),
        ),
        (format!("\"{es_slash}"), format!("\"{prefix}{ns_slash}")),
        (format!("'{es_slash}"), format!("'{prefix}{ns_slash}")),
        (format!(r"'\\{es_slash}"), format!(r"'\{prefix}{ns_slash}")),
        // Leading-backslash absolute references in call expressions.
        (
            format!(r"\((\s*)\\{es_slash}"),
            format!(r"(${{1}}\{prefix}{ns_slash}"),
        ),
        (
            format!(r"(\s)\\{es_slash}"),
            format!(r"${{1}}\{prefix}{ns_slash}"),
        ),
    ];

    table
        .into_iter()
        .map(|(pattern, replacement)| {
            Ok(Rule {
                regex: Regex::new(&pattern).with_context(|| {
                    format!("failed to compile rewrite pattern for namespace {namespace}")
                })?,
                replacement,
            })
        })
        .collect()
}
