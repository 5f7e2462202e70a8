//! Namespace discovery.
//!
//! Two declaration forms are recognized: a bare `namespace X;` line, and
//! the one-line variant where the declaration directly follows the
//! opening tag (`<?php namespace X;`). The second form is only consulted
//! for files where the first yields nothing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Artifact of dynamically composed namespace strings; never a real
/// declaration, always skipped.
const DYNAMIC_NAMESPACE: &str = "'.__NAMESPACE__.'";

static DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*namespace\s+([^\s;]+)").unwrap());

static DECL_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*<\?php\s+namespace\s+([^\s;]+)").unwrap());

static CURRENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*namespace\s+([^;]+)").unwrap());

static CURRENT_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*<\?php\s+namespace\s+([^;]+)").unwrap());

/// Every namespace declared in `source`, deduplicated, in order of
/// appearance.
pub fn declared_namespaces(source: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();

    fn collect(
        regex: &Regex,
        source: &str,
        found: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) {
        for capture in regex.captures_iter(source) {
            let ns = &capture[1];
            if ns == DYNAMIC_NAMESPACE {
                continue;
            }
            if seen.insert(ns.to_string()) {
                found.push(ns.to_string());
            }
        }
    }

    collect(&DECL, source, &mut found, &mut seen);
    if found.is_empty() {
        collect(&DECL_INLINE, source, &mut found, &mut seen);
    }

    found
}

/// The namespace a file's own symbols belong to, if it declares one.
pub fn current_namespace(source: &str) -> Option<String> {
    CURRENT
        .captures(source)
        .or_else(|| CURRENT_INLINE.captures(source))
        .map(|capture| capture[1].trim().to_string())
}

/// The global set of namespaces discovered across all packages.
///
/// Deduplicated and insertion-ordered: rewrite rules are applied over the
/// set in one fixed order for every file of every package in a run.
/// Completed during the discovery phase and immutable afterwards.
#[derive(Debug, Default)]
pub struct NamespaceSet {
    list: Vec<String>,
    seen: HashSet<String>,
}

impl NamespaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace; returns false if it was already present.
    pub fn insert(&mut self, namespace: String) -> bool {
        if self.seen.contains(&namespace) {
            return false;
        }
        self.seen.insert(namespace.clone());
        self.list.push(namespace);
        true
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, namespaces: I) {
        for ns in namespaces {
            self.insert(ns);
        }
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.seen.contains(namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.list.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_declaration() {
        let source = "<?php\n\nnamespace Acme\\Foo;\n\nclass Bar {}\n";
        assert_eq!(declared_namespaces(source), vec!["Acme\\Foo"]);
    }

    #[test]
    fn test_inline_declaration() {
        let source = "<?php namespace Acme\\Foo;\nclass Bar {}\n";
        assert_eq!(declared_namespaces(source), vec!["Acme\\Foo"]);
    }

    #[test]
    fn test_inline_only_used_as_fallback() {
        // A bare declaration wins; the inline form is not re-scanned.
        let source = "<?php namespace Inline\\Ns;\nnamespace Bare\\Ns;\n";
        assert_eq!(declared_namespaces(source), vec!["Bare\\Ns"]);
    }

    #[test]
    fn test_multiple_declarations_deduplicated() {
        let source = "namespace A;\nnamespace B;\nnamespace A;\n";
        assert_eq!(declared_namespaces(source), vec!["A", "B"]);
    }

    #[test]
    fn test_dynamic_namespace_artifact_skipped() {
        let source = "namespace '.__NAMESPACE__.';\nnamespace Real\\Ns;\n";
        assert_eq!(declared_namespaces(source), vec!["Real\\Ns"]);
    }

    #[test]
    fn test_no_namespace() {
        assert!(declared_namespaces("<?php\necho 'hi';\n").is_empty());
        assert_eq!(current_namespace("<?php\necho 'hi';\n"), None);
    }

    #[test]
    fn test_current_namespace_both_forms() {
        assert_eq!(
            current_namespace("<?php\nnamespace Acme\\Foo;\n"),
            Some("Acme\\Foo".to_string())
        );
        assert_eq!(
            current_namespace("<?php namespace Acme\\Foo;\n"),
            Some("Acme\\Foo".to_string())
        );
    }

    #[test]
    fn test_namespace_set_order_and_dedup() {
        let mut set = NamespaceSet::new();
        set.extend(["B".to_string(), "A".to_string(), "B".to_string()]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("A"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["B", "A"]);
    }
}
