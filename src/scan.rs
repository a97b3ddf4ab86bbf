use anyhow::Result;
use ignore::WalkBuilder;
use log::debug;
use std::path::PathBuf;

/// Discovers every `*.rs` file under the given roots. Gitignore rules are
/// respected; unreadable entries are skipped. The result is sorted so a
/// rebuild processes files in a stable order.
pub fn scan_rust_files(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for root in roots {
        let walker = WalkBuilder::new(root).hidden(false).build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping walk entry under {}: {err}", root.display());
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "rs") {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
