//! Folder naming for monitors
//!
//! A monitor folder is named after the sanitized monitor name. When that
//! name is already taken by a differently identified monitor the folder
//! gets a numeric suffix: `cpu-alert (2)`, `cpu-alert (3)`, ...

use monsync_core::domain::sanitize_folder_name;

/// Generates folder names for monitors
pub struct FolderNamer;

impl FolderNamer {
    /// Preferred folder name for a monitor name
    pub fn preferred(monitor_name: &str) -> String {
        sanitize_folder_name(monitor_name)
    }

    /// First free variant of the preferred folder name
    ///
    /// `taken` is asked about each candidate in turn.
    pub fn generate_unique<F>(monitor_name: &str, mut taken: F) -> String
    where
        F: FnMut(&str) -> bool,
    {
        let base = Self::preferred(monitor_name);
        if !taken(&base) {
            return base;
        }
        let mut i = 2usize;
        loop {
            let candidate = format!("{base} ({i})");
            if !taken(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }
}
