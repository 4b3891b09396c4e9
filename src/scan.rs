use crate::dlog;
use crate::error::ScanError;
use crate::parse::parse_file;
use crate::types::ActivityRecord;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Parse every file under `root/<type>/`.
///
/// Entries directly under `root` that are not directories are skipped. Inside a
/// type directory every entry is parsed, and the first failure aborts the whole
/// scan: a bulk load never runs on a partial record set.
pub fn scan_tree(root: &Path) -> Result<Vec<ActivityRecord>, ScanError> {
    let mut out = Vec::new();

    for dir in children(root) {
        let dir = dir?;
        if !dir.file_type().is_dir() {
            dlog!("scan_skip_non_dir path={}", dir.path().display());
            continue;
        }

        let before = out.len();
        for entry in children(dir.path()) {
            let entry = entry?;
            out.push(parse_file(entry.path())?);
        }
        dlog!(
            "scan_dir path={} records={}",
            dir.path().display(),
            out.len() - before
        );
    }

    Ok(out)
}

fn children(dir: &Path) -> impl Iterator<Item = Result<DirEntry, ScanError>> + '_ {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .map(move |r| {
            r.map_err(|source| ScanError::Walk {
                path: source.path().unwrap_or(dir).to_path_buf(),
                source,
            })
        })
}
