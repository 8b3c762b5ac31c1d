use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{partition, OutputPage};

/// Writes paginated resource documents into one directory.
pub struct PageWriter {
    dir: PathBuf,
    page_size: usize,
}

impl PageWriter {
    pub fn new(dir: impl Into<PathBuf>, page_size: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { dir, page_size })
    }

    /// Partition `records`, write every page as
    /// `{[header_key: header,] key: [...], "pagination": {...}}`, then drop
    /// higher-numbered pages left over from a previous, larger run.
    ///
    /// Returns the written file names in page order.
    pub fn write_resource<T: Serialize>(
        &self,
        key: &str,
        base_name: &str,
        records: &[T],
        header: Option<(&str, Value)>,
    ) -> Result<Vec<String>> {
        let pages = partition(records, self.page_size, base_name);
        let mut written = Vec::with_capacity(pages.len());

        for page in &pages {
            let doc = page_document(key, page, header.as_ref())?;
            let path = self.dir.join(&page.file_name);
            write_json_atomic(&path, &doc)?;
            debug!(
                file = %path.display(),
                page = page.pagination.current_page,
                items = page.pagination.items_in_page,
                "Wrote page"
            );
            written.push(page.file_name.clone());
        }

        let removed = self.prune_stale_pages(base_name, pages.len())?;
        info!(
            resource = base_name,
            records = records.len(),
            pages = written.len(),
            stale_removed = removed,
            "Saved resource"
        );
        Ok(written)
    }

    /// Remove `<base>_page<N>.json` for every `N > keep`.
    pub fn prune_stale_pages(&self, base_name: &str, keep: usize) -> Result<usize> {
        let prefix = format!("{}_page", base_name);
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).with_context(|| format!("Failed to list {}", self.dir.display()))? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let stale = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|n| n.parse::<usize>().ok())
                .is_some_and(|n| n > keep);
            if stale {
                fs::remove_file(entry.path())
                    .with_context(|| format!("Failed to remove stale {}", name))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn page_document<T: Serialize>(
    key: &str,
    page: &OutputPage<'_, T>,
    header: Option<&(&str, Value)>,
) -> Result<Value> {
    let mut doc = Map::new();
    if let Some((header_key, header)) = header {
        doc.insert(header_key.to_string(), header.clone());
    }
    doc.insert(key.to_string(), serde_json::to_value(page.records)?);
    doc.insert("pagination".to_string(), serde_json::to_value(&page.pagination)?);
    Ok(Value::Object(doc))
}

/// Serialize to a temp file beside `path`, then rename over it: the target
/// is either fully replaced or untouched.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
