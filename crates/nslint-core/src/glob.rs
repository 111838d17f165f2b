//! Glob to regular expression translation for descriptor paths.

/// Returns true if `entry` contains a wildcard (`*` or `?`).
#[must_use]
pub fn has_wildcard(entry: &str) -> bool {
    entry.contains(['*', '?'])
}

/// Translates a glob into regular expression source.
///
/// - `*` becomes `.*` and therefore also matches across `/`
/// - `?` becomes `.`
/// - `[` and `]` pass through so character classes keep working; `*` and `?`
///   inside a class are literal
/// - `\ ^ $ . { } ( ) + |` are escaped
///
/// The result is unanchored; callers must match it against the whole path.
/// Unbalanced brackets pass through verbatim and may not compile.
///
/// # Example
///
/// ```
/// use nslint_core::glob::glob_to_regex;
///
/// assert_eq!(glob_to_regex("OSGI-INF/*.xml"), r"OSGI-INF/.*\.xml");
/// assert_eq!(glob_to_regex("Component?.xml"), r"Component.\.xml");
/// ```
#[must_use]
pub fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() * 2);
    let mut in_class = false;

    for c in glob.chars() {
        match c {
            '*' if in_class => regex.push('*'),
            '*' => regex.push_str(".*"),
            '?' if in_class => regex.push('?'),
            '?' => regex.push('.'),
            '[' => {
                in_class = true;
                regex.push(c);
            }
            ']' => {
                in_class = false;
                regex.push(c);
            }
            '\\' | '^' | '$' | '.' | '{' | '}' | '(' | ')' | '+' | '|' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }

    regex
}
