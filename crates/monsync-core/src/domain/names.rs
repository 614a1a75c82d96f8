//! Path-safe names
//!
//! Monitor and instance names become directory names, so they are checked
//! (instances) or sanitized (monitors) against the characters most
//! filesystems reject.

/// Characters that cannot appear in a folder name
pub const UNSAFE_PATH_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Whether `name` can be used verbatim as a directory name
#[must_use]
pub fn is_path_safe(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(' ')
        && name != "."
        && name != ".."
        && !name.chars().any(|c| UNSAFE_PATH_CHARS.contains(&c) || c.is_control())
}

/// Folder name for a monitor name
///
/// Unsafe and control characters become `_`, leading spaces and trailing
/// dots or spaces are trimmed. Never returns an empty string or a dot name.
#[must_use]
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if UNSAFE_PATH_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced
        .trim_start_matches(' ')
        .trim_end_matches(|c| c == '.' || c == ' ');
    let mut out = trimmed.to_string();
    // Hidden folders are skipped on load
    if out.starts_with('.') {
        out.replace_range(0..1, "_");
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
