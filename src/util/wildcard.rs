//! Shell-style wildcard matching for package identifiers.
//!
//! The blacklist in the hook configuration is a list of glob patterns
//! (`*`, `?`, bracket classes, optional backslash escaping). Patterns are
//! translated into anchored regexes; every non-glob character is escaped
//! first so regex metacharacters in package names cannot leak through.

use regex::Regex;

/// Options controlling how a wildcard pattern is interpreted.
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// Whether matching is case sensitive.
    pub case_sensitive: bool,

    /// Whether `\` escapes the following pattern character.
    pub escape: bool,

    /// Whether `*` and `?` refuse to cross path separators (`/` or `\`).
    pub file_path: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            case_sensitive: true,
            escape: true,
            file_path: false,
        }
    }
}

/// Test `subject` against a wildcard `pattern` with default options.
pub fn match_wildcard(pattern: &str, subject: &str) -> bool {
    match_wildcard_with(pattern, subject, MatchOptions::default())
}

/// Test `subject` against a wildcard `pattern`.
pub fn match_wildcard_with(pattern: &str, subject: &str, opts: MatchOptions) -> bool {
    if pattern == "*" && !opts.file_path {
        return true;
    }

    match Regex::new(&translate(pattern, opts)) {
        Ok(re) => re.is_match(subject),
        // An untranslatable pattern matches nothing.
        Err(_) => false,
    }
}

/// Translate a glob pattern into an anchored regex.
fn translate(pattern: &str, opts: MatchOptions) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    if !opts.case_sensitive {
        out.push_str("(?i)");
    }
    out.push('^');

    let (any_run, any_one) = if opts.file_path {
        (r"[^/\\]*", r"[^/\\]")
    } else {
        (".*", ".")
    };

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if opts.escape => match chars.next() {
                Some(escaped) => push_literal(&mut out, escaped),
                None => push_literal(&mut out, '\\'),
            },
            '*' => out.push_str(any_run),
            '?' => out.push_str(any_one),
            '[' => match take_class(&mut chars) {
                Some(class) => push_class(&mut out, &class),
                // Unterminated class: treat the bracket literally.
                None => push_literal(&mut out, '['),
            },
            _ => push_literal(&mut out, c),
        }
    }

    out.push('$');
    out
}

/// Consume a bracket class body up to (not including) the closing `]`.
///
/// Returns `None` when the class never closes, in which case the caller
/// falls back to a literal `[`. The consumed characters are re-emitted by
/// the caller through `push_class`, so nothing is lost either way.
fn take_class(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<String> {
    let rest: String = chars.clone().collect();
    let end = rest.find(']')?;
    let class = rest[..end].to_string();
    for _ in 0..=class.chars().count() {
        chars.next();
    }
    Some(class)
}

fn push_class(out: &mut String, class: &str) {
    out.push('[');
    let mut first = true;
    for c in class.chars() {
        match c {
            '!' if first => out.push('^'),
            // `^` only negates in glob syntax via `!`; keep it literal.
            '^' if first => out.push_str(r"\^"),
            '-' => out.push('-'),
            '\\' => out.push_str(r"\\"),
            _ => push_literal(out, c),
        }
        first = false;
    }
    out.push(']');
}

fn push_literal(out: &mut String, c: char) {
    if c.is_ascii_punctuation() {
        out.push('\\');
    }
    out.push(c);
}
