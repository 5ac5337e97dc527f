use std::path::{Path, PathBuf};

use anyhow::Context;

/// Finds every regular file named `report_file_name` below `testlogs_dir`.
///
/// `testlogs_dir` is resolved first so that a symlinked build output tree (`bazel-testlogs`)
/// is walked through. Paths are returned sorted, which fixes the order reports are merged in.
pub fn scan_reports<T: AsRef<Path>>(
    testlogs_dir: T,
    report_file_name: &str,
) -> anyhow::Result<Vec<PathBuf>> {
    let testlogs_dir = testlogs_dir.as_ref();
    let root = std::fs::canonicalize(testlogs_dir)
        .with_context(|| format!("Error evaluating symlinks of {:?}", testlogs_dir))?;
    let root_str = root
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Testlogs dir {:?} is not valid UTF-8", root))?;

    let path_to_scan = format!(
        "{}/**/{}",
        glob::Pattern::escape(root_str),
        glob::Pattern::escape(report_file_name)
    );

    let mut files = Vec::new();
    glob::glob(&path_to_scan)?.try_for_each(|entry| {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                return Err(anyhow::anyhow!("Error scanning {:?}: {:?}", root, e));
            }
        };

        if !path.is_file() {
            return Ok::<(), anyhow::Error>(());
        }

        files.push(path);
        Ok(())
    })?;

    files.sort();
    Ok(files)
}
