//! Classification of a single rendered header line

/// Why a line produced no header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty or whitespace only
    Blank,
    /// No `:` anywhere on the line
    MissingColon,
}

/// What a trimmed line turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// `:name: value` or `:name`; the value is never kept
    Pseudo(String),
    /// `name: value`, split on the first colon
    Regular { name: &'a str, value: &'a str },
    Skipped(SkipReason),
}

/// Classify one line of rendered header text
///
/// Only the first colon separates a regular name from its value, so
/// `X-Test: a:b:c` has the value `a:b:c`. A line whose first character is a
/// colon is a pseudo-header: its name runs up to the second colon.
pub fn classify_line(line: &str) -> LineClass<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineClass::Skipped(SkipReason::Blank);
    }

    let Some((key_part, value_part)) = line.split_once(':') else {
        return LineClass::Skipped(SkipReason::MissingColon);
    };

    if key_part.trim().is_empty() && line.starts_with(':') {
        let suffix = match value_part.split_once(':') {
            Some((name, _value)) => name.trim(),
            None => value_part.trim(),
        };
        return LineClass::Pseudo(format!(":{suffix}"));
    }

    LineClass::Regular {
        name: key_part.trim(),
        value: value_part.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular<'a>(name: &'a str, value: &'a str) -> LineClass<'a> {
        LineClass::Regular { name, value }
    }

    #[test]
    fn test_regular_header() {
        assert_eq!(classify_line("Accept: text/html"), regular("Accept", "text/html"));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(
            classify_line("  User-Agent :   curl/8.0  \r"),
            regular("User-Agent", "curl/8.0")
        );
    }

    #[test]
    fn test_value_keeps_later_colons() {
        assert_eq!(classify_line("X-Test: a:b:c"), regular("X-Test", "a:b:c"));
    }

    #[test]
    fn test_empty_value() {
        assert_eq!(classify_line("X-Empty:"), regular("X-Empty", ""));
    }

    #[test]
    fn test_pseudo_header_with_value() {
        assert_eq!(classify_line(":method: GET"), LineClass::Pseudo(":method".to_string()));
    }

    #[test]
    fn test_pseudo_header_value_with_colons() {
        assert_eq!(
            classify_line(":authority: example.com:443"),
            LineClass::Pseudo(":authority".to_string())
        );
    }

    #[test]
    fn test_pseudo_header_without_value() {
        assert_eq!(classify_line(":method"), LineClass::Pseudo(":method".to_string()));
    }

    #[test]
    fn test_pseudo_header_spaced_name() {
        assert_eq!(classify_line(":  path : /"), LineClass::Pseudo(":path".to_string()));
    }

    #[test]
    fn test_lone_colon_is_bare_pseudo_name() {
        assert_eq!(classify_line(":"), LineClass::Pseudo(":".to_string()));
        assert_eq!(classify_line("  ::x"), LineClass::Pseudo(":".to_string()));
    }

    #[test]
    fn test_indented_pseudo_header() {
        assert_eq!(classify_line("   :scheme: https"), LineClass::Pseudo(":scheme".to_string()));
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(classify_line(""), LineClass::Skipped(SkipReason::Blank));
        assert_eq!(classify_line(" \t "), LineClass::Skipped(SkipReason::Blank));
    }

    #[test]
    fn test_missing_colon() {
        assert_eq!(
            classify_line("not a header"),
            LineClass::Skipped(SkipReason::MissingColon)
        );
    }
}
