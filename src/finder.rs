use anyhow::Result;
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use crate::classify::classify_params;
use crate::index::{Location, QueryMode, SystemIndex};
use crate::parse::parse_source;
use crate::scan::scan_rust_files;

#[derive(Debug, Serialize)]
pub struct RebuildStats {
    pub files_scanned: usize,
    pub files_failed: usize,
    pub systems_indexed: usize,
    pub duration_ms: u64,
}

/// Owns the index plus the file sources its locations point back into.
/// `rebuild` takes `&mut self`, so a pass has exclusive access to the index
/// for its whole duration.
#[derive(Debug, Default)]
pub struct SystemFinder {
    index: SystemIndex,
    sources: HashMap<PathBuf, String>,
}

impl SystemFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears and repopulates the index from every recognized source file
    /// under the given roots. Files that cannot be read or parsed are
    /// counted and logged; they never abort the pass.
    pub fn rebuild(&mut self, roots: &[PathBuf]) -> Result<RebuildStats> {
        let start = Instant::now();
        self.index.clear();
        self.index.bump_generation();
        self.sources.clear();

        let files = scan_rust_files(roots)?;
        let files_scanned = files.len();
        let mut files_failed = 0usize;

        for path in files {
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    warn!("Failed to read {}: {err}", path.display());
                    files_failed += 1;
                    continue;
                }
            };

            let parsed = match parse_source(&path, &source) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!("{err:#}");
                    files_failed += 1;
                    continue;
                }
            };

            for decl in &parsed.decls {
                if !self.index.record_declaration(&decl.name, decl.location.clone()) {
                    continue;
                }
                classify_params(&mut self.index, &decl.name, &decl.generics, &decl.params);
            }

            self.sources.insert(path, source);
        }

        self.index.mark_initialized();

        Ok(RebuildStats {
            files_scanned,
            files_failed,
            systems_indexed: self.index.declared_count(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    pub fn query(&self, text: &str) -> (Vec<String>, QueryMode) {
        self.index.query(text)
    }

    pub fn location(&self, system: &str) -> Option<&Location> {
        self.index.location(system)
    }

    /// The raw source slice of a system's recorded span, or "" when the
    /// system (or its file) is unknown.
    pub fn declaration_text(&self, system: &str) -> &str {
        let Some(location) = self.index.location(system) else {
            return "";
        };
        let Some(source) = self.sources.get(&location.file) else {
            return "";
        };
        source
            .get(location.start_byte..location.end_byte)
            .unwrap_or("")
    }

    pub fn index(&self) -> &SystemIndex {
        &self.index
    }
}
