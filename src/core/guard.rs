//! Pure helpers for the guards attached to transitions.
//!
//! Transitions reference activity properties in two ways: by name, for the
//! boolean property that enables them, and through `${name}` placeholders
//! embedded in role overrides and resource references. Both are resolved
//! here without touching the activity itself; callers supply a lookup.

use tracing::trace;

/// Substitute every `${name}` placeholder in `expr` with the value returned
/// by `lookup`, or with the empty string when the property is absent.
///
/// Unterminated placeholders are kept verbatim. A placeholder needs at least
/// one character between the braces, so `${}` only terminates at the next
/// closing brace.
///
/// # Example
///
/// ```rust
/// use ledgerflow::core::resolve_value;
///
/// let lookup = |name: &str| (name == "Dept").then(|| "QA".to_string());
///
/// assert_eq!(resolve_value("${Dept}Manager", lookup), "QAManager");
/// assert_eq!(resolve_value("${Missing}Manager", lookup), "Manager");
/// assert_eq!(resolve_value("${Dept", lookup), "${Dept");
/// ```
pub fn resolve_value<F>(expr: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(expr.len());
    let mut rest = expr;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        // skip the first character so an empty name cannot close the token
        let Some(first) = after.chars().next() else {
            break;
        };
        let Some(close) = after[first.len_utf8()..].find('}') else {
            break;
        };
        let name_len = first.len_utf8() + close;
        let name = &after[..name_len];

        result.push_str(&rest[..start]);
        result.push_str(&lookup(name).unwrap_or_default());
        rest = &after[name_len + 1..];
    }
    result.push_str(rest);

    trace!(expr, resolved = %result, "resolved property placeholders");
    result
}

/// Interpret a property value as a flag: only a case-insensitive `"true"`
/// enables.
pub fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Blank means absent or whitespace only.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn props() -> HashMap<String, String> {
        HashMap::from([
            ("Role".to_string(), "Reviewer".to_string()),
            ("Site".to_string(), "Geneva".to_string()),
        ])
    }

    fn resolve(expr: &str) -> String {
        let props = props();
        resolve_value(expr, |name| props.get(name).cloned())
    }

    #[test]
    fn substitutes_known_properties() {
        assert_eq!(resolve("${Role}"), "Reviewer");
        assert_eq!(resolve("${Site}-${Role}"), "Geneva-Reviewer");
    }

    #[test]
    fn repeated_placeholders_are_all_replaced() {
        assert_eq!(resolve("${Role}/${Role}"), "Reviewer/Reviewer");
    }

    #[test]
    fn missing_properties_become_empty() {
        assert_eq!(resolve("x${Nope}y"), "xy");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(resolve("Operator"), "Operator");
        assert_eq!(resolve(""), "");
    }

    #[test]
    fn mismatched_braces_are_left_verbatim() {
        assert_eq!(resolve("${Role"), "${Role");
        assert_eq!(resolve("$Role}"), "$Role}");
        assert_eq!(resolve("${Role}${"), "Reviewer${");
        assert_eq!(resolve("${"), "${");
    }

    #[test]
    fn empty_name_extends_to_next_brace() {
        // "${}Role}" names the property "}Role", which is absent
        assert_eq!(resolve("${}Role}"), "");
        assert_eq!(resolve("${}"), "${}");
    }

    #[test]
    fn truthiness_is_case_insensitive() {
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("True"));
        assert!(!is_truthy(" True "));
        assert!(!is_truthy("yes"));
        assert!(!is_truthy("1"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("  ")));
        assert!(!is_blank(Some("alice")));
    }
}
