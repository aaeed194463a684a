//! Upload filename sanitizing
//!
//! The grid's file-transfer endpoints only accept names made of ASCII
//! letters, digits, underscores and periods.

use std::path::Path;

/// Return the basename of `path` reduced to `[A-Za-z0-9_.]`.
///
/// Dashes become underscores; every other disallowed character is dropped.
pub fn sanitized_filename(path: impl AsRef<Path>) -> String {
    let base = path
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    base.chars()
        .map(|c| if c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_plain_name() {
        assert_eq!(sanitized_filename("ranges.csv"), "ranges.csv");
    }

    #[test]
    fn test_strips_directories() {
        assert_eq!(sanitized_filename("/tmp/imports/hosts.csv"), "hosts.csv");
        assert_eq!(sanitized_filename("../../etc/hosts.csv"), "hosts.csv");
    }

    #[test]
    fn test_dash_becomes_underscore() {
        assert_eq!(sanitized_filename("my-ranges-2024.csv"), "my_ranges_2024.csv");
    }

    #[test]
    fn test_drops_other_characters() {
        assert_eq!(sanitized_filename("a b(c)+d#e.csv"), "abcde.csv");
        assert_eq!(sanitized_filename("réseau.csv"), "rseau.csv");
    }

    #[test]
    fn test_output_alphabet() {
        let inputs = [
            "x-y z.csv",
            "~!@#$%^&*().csv",
            "tab\there.csv",
            "日本-語.csv",
            "",
        ];
        for input in inputs {
            let out = sanitized_filename(input);
            assert!(
                out.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
                "unexpected character in {:?}",
                out
            );
        }
    }

    #[test]
    fn test_empty_path() {
        assert_eq!(sanitized_filename(""), "");
    }
}
