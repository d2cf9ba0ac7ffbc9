//! Helpers the grammar actions call on raw token text

/// Strip the surrounding single quotes and resolve backslash escapes.
/// `\'` → `'`, `\\` → `\`, any other escaped character stands for itself.
pub fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_plain() {
        assert_eq!(unquote("'pump'"), "pump");
        assert_eq!(unquote("''"), "");
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r"'O\'Brien'"), "O'Brien");
        assert_eq!(unquote(r"'C:\\tmp'"), r"C:\tmp");
        assert_eq!(unquote(r"'\n'"), "n");
    }
}
