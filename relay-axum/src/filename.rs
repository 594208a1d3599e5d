/// Fallback display name when nothing printable is left.
pub const FALLBACK_FILE_NAME: &str = "file";

/// Reduce a display name to characters that are safe inside a quoted
/// `Content-Disposition` filename.
///
/// Keeps ASCII alphanumerics, space, `.`, `_` and `-`, then trims trailing
/// whitespace.
pub fn sanitize_file_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect();
    let kept = kept.trim_end();

    if kept.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        kept.to_string()
    }
}
