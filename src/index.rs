//! Manifest of every written page set, as `data_index.json` and a short
//! plain-text `data_index.txt`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::output::page_file_name;
use crate::output::writer::{write_atomic, write_json_atomic};

pub const INDEX_JSON: &str = "data_index.json";
pub const INDEX_TEXT: &str = "data_index.txt";
pub const COLLECTIONS_DIR: &str = "collections";

static COLLECTION_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)_products(?:_page(\d+))?\.json$").unwrap());

/// Relative paths of the pages found on disk, each list in page order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageSet {
    pub products: Vec<String>,
    pub collections: Vec<String>,
    pub blogs: Vec<String>,
    pub collection_products: BTreeMap<String, Vec<String>>,
}

pub struct IndexOptions {
    pub shop_domain: String,
    pub currency: Option<String>,
    pub page_size: usize,
    pub public_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FileEntry {
    Single(String),
    Paged { total_pages: usize, files: Map<String, Value> },
}

impl FileEntry {
    pub fn page_count(&self) -> usize {
        match self {
            FileEntry::Single(_) => 1,
            FileEntry::Paged { total_pages, .. } => *total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestFiles {
    pub products: FileEntry,
    pub collections: FileEntry,
    pub blogs: FileEntry,
    pub collection_products: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub shop_domain: String,
    pub currency: Option<String>,
    pub pagination_size: usize,
    pub total_collections: usize,
    pub files: ManifestFiles,
}

/// Collect page files under `dir`. Main resources stop at the first gap in
/// the `_page<N>` sequence.
pub fn scan_output(dir: &Path) -> Result<PageSet> {
    let consecutive = |base: &str| -> Vec<String> {
        (0..)
            .map(|i| page_file_name(base, i))
            .take_while(|name| dir.join(name).is_file())
            .collect()
    };

    let mut grouped: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();
    let collections_dir = dir.join(COLLECTIONS_DIR);
    if collections_dir.is_dir() {
        for entry in fs::read_dir(&collections_dir)
            .with_context(|| format!("Failed to list {}", collections_dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(caps) = COLLECTION_PAGE_RE.captures(name) else { continue };
            let page = caps
                .get(2)
                .and_then(|n| n.as_str().parse().ok())
                .unwrap_or(1);
            grouped
                .entry(caps[1].to_string())
                .or_default()
                .push((page, format!("{}/{}", COLLECTIONS_DIR, name)));
        }
    }

    let collection_products = grouped
        .into_iter()
        .map(|(handle, mut pages)| {
            pages.sort_by_key(|(n, _)| *n);
            (handle, pages.into_iter().map(|(_, path)| path).collect())
        })
        .collect();

    Ok(PageSet {
        products: consecutive("products"),
        collections: consecutive("collections"),
        blogs: consecutive("blogs"),
        collection_products,
    })
}

pub fn build_index(pages: &PageSet, opts: &IndexOptions) -> Manifest {
    let entry = |files: &[String]| file_entry(files, &opts.public_base_url);
    Manifest {
        shop_domain: opts.shop_domain.clone(),
        currency: opts.currency.clone(),
        pagination_size: opts.page_size,
        total_collections: pages.collection_products.len(),
        files: ManifestFiles {
            products: entry(&pages.products),
            collections: entry(&pages.collections),
            blogs: entry(&pages.blogs),
            collection_products: pages
                .collection_products
                .iter()
                .map(|(handle, files)| (handle.clone(), entry(files)))
                .collect(),
        },
    }
}

fn file_entry(files: &[String], base_url: &str) -> FileEntry {
    if let [single] = files {
        return FileEntry::Single(public_url(base_url, single));
    }
    let mut map = Map::new();
    for (i, file) in files.iter().enumerate() {
        map.insert(format!("page_{}", i + 1), Value::String(public_url(base_url, file)));
    }
    FileEntry::Paged {
        total_pages: files.len(),
        files: map,
    }
}

fn public_url(base_url: &str, path: &str) -> String {
    if base_url.is_empty() || base_url.ends_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}

pub fn render_text(manifest: &Manifest) -> String {
    let files = &manifest.files;
    let mut out = format!(
        "SHOPIFY DATA INDEX\n\
         Shop: {}\n\
         Currency: {}\n\
         Pagination: {} items per page\n\
         \n\
         === MAIN FILES ===\n\
         Products: {} pages\n\
         Collections: {} pages\n\
         Blogs: {} pages\n\
         \n\
         === COLLECTION PRODUCTS ===\n\
         Total Collections: {}\n",
        manifest.shop_domain,
        manifest.currency.as_deref().unwrap_or("unknown"),
        manifest.pagination_size,
        files.products.page_count(),
        files.collections.page_count(),
        files.blogs.page_count(),
        manifest.total_collections,
    );
    for (handle, entry) in &files.collection_products {
        out.push_str(&format!("  {}: {} pages\n", handle, entry.page_count()));
    }
    out
}

/// Scan `dir`, then write both index files into it.
pub fn write_index(dir: &Path, opts: &IndexOptions) -> Result<Manifest> {
    let pages = scan_output(dir)?;
    let manifest = build_index(&pages, opts);
    write_json_atomic(&dir.join(INDEX_JSON), &manifest)?;
    write_atomic(&dir.join(INDEX_TEXT), render_text(&manifest).as_bytes())?;
    info!(
        products = manifest.files.products.page_count(),
        collections = manifest.files.collections.page_count(),
        blogs = manifest.files.blogs.page_count(),
        collection_products = manifest.total_collections,
        "Wrote index"
    );
    Ok(manifest)
}
