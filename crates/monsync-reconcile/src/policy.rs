//! Deduplication policy
//!
//! When several local folders hold a monitor with the same name, exactly
//! one of them is kept. The choice must not depend on directory listing
//! order, so repeated runs always keep the same folder:
//!
//! 1. A folder already named after the sanitized monitor name wins.
//! 2. Otherwise (or among several such folders) the lexicographically
//!    earliest folder path wins.

use std::path::Path;

use monsync_core::domain::MonitorRecord;

use crate::namer::FolderNamer;

/// Selects the canonical folder among same-name local records
pub struct DedupPolicy;

impl DedupPolicy {
    /// Index of the record to keep, or `None` for an empty slice
    pub fn select_canonical(candidates: &[&MonitorRecord]) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|&(_, record)| Self::rank(record))
            .map(|(i, _)| i)
    }

    fn rank<'a>(record: &'a MonitorRecord) -> (bool, bool, Option<&'a Path>) {
        let preferred = FolderNamer::preferred(record.name());
        let well_named = record.folder_name() == Some(preferred.as_str());
        // Records without a folder sort last
        (!well_named, record.folder.is_none(), record.folder.as_deref())
    }
}
