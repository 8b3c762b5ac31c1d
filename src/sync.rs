use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{ping, Transport};
use crate::config::Settings;
use crate::error::ErrorKind;
use crate::fetch::{Fetcher, ResourceResult};
use crate::index::{self, IndexOptions, COLLECTIONS_DIR};
use crate::normalize::Normalizer;
use crate::output::writer::write_json_atomic;
use crate::output::PageWriter;
use crate::records::CollectionHeader;

pub const SUMMARY_FILE: &str = "sync_summary.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOutcome {
    pub name: String,
    pub records: usize,
    pub pages: usize,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub shop_domain: String,
    pub currency: Option<String>,
    pub finished_at: DateTime<Utc>,
    pub resources: Vec<ResourceOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.resources.iter().filter(|r| r.succeeded).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.resources.iter().filter(|r| !r.succeeded)
    }

    /// A run counts as successful when at least one resource made it.
    pub fn is_success(&self) -> bool {
        self.succeeded() > 0
    }

    /// Summary of a previous run, if one was written.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(SUMMARY_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let summary = serde_json::from_str(&raw).with_context(|| format!("Invalid {}", path.display()))?;
        Ok(Some(summary))
    }
}

fn outcome<R>(result: &ResourceResult<R>, pages: usize) -> ResourceOutcome {
    ResourceOutcome {
        name: result.name.clone(),
        records: result.records.len(),
        pages,
        succeeded: result.succeeded(),
        error_kind: result.error.as_ref().map(|e| e.kind()),
        error: result.error.as_ref().map(|e| e.to_string()),
    }
}

/// Outcome of a fetched resource once its pages were written, or failed to be.
fn written<R>(result: &ResourceResult<R>, pages: Result<Vec<String>>) -> ResourceOutcome {
    match pages {
        Ok(pages) => outcome(result, pages.len()),
        Err(e) => {
            warn!(resource = %result.name, error = %format!("{:#}", e), "Failed to write pages");
            ResourceOutcome {
                succeeded: false,
                error_kind: Some(ErrorKind::Write),
                error: Some(format!("{:#}", e)),
                ..outcome(result, 0)
            }
        }
    }
}

/// Full snapshot: connectivity check, then blogs, products, collections and
/// each collection's products, then the index and the run summary.
///
/// A failed connectivity check, or failing to create the output directory or
/// write the index or summary, is returned as `Err`. Fetch and page-write
/// failures are recorded per resource and never abort the run.
pub async fn run<T: Transport>(transport: &T, settings: &Settings) -> Result<RunSummary> {
    let shop = ping(transport, settings).await?;
    let delay = settings.request_delay();
    let fetcher = Fetcher::new(transport, settings, Normalizer::new(shop.currency.clone()));
    let writer = PageWriter::new(&settings.output_dir, settings.page_size)?;
    let mut resources = Vec::new();

    transport.pause(delay).await;
    let blogs = fetcher.fetch_blogs().await;
    let pages = writer.write_resource("blogs", "blogs", &blogs.records, None);
    resources.push(written(&blogs, pages));

    transport.pause(delay).await;
    let products = fetcher.fetch_products().await;
    let pages = writer.write_resource("products", "products", &products.records, None);
    resources.push(written(&products, pages));

    transport.pause(delay).await;
    let collections = fetcher.fetch_collections().await;
    let pages = writer.write_resource("collections", "collections", &collections.records, None);
    resources.push(written(&collections, pages));

    if !collections.records.is_empty() {
        let collection_writer = PageWriter::new(settings.output_dir.join(COLLECTIONS_DIR), settings.page_size)?;
        let pb = ProgressBar::new(collections.records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );

        for collection in &collections.records {
            pb.set_message(collection.handle.clone().unwrap_or_default());
            transport.pause(delay).await;
            let result = fetcher.fetch_collection_products(collection).await;

            let record = match collection.handle.as_deref() {
                Some(handle) => {
                    let header = CollectionHeader::new(collection, handle, result.records.len());
                    let pages = serde_json::to_value(&header)
                        .map_err(anyhow::Error::from)
                        .and_then(|header| {
                            collection_writer.write_resource(
                                "products",
                                &format!("{}_products", handle),
                                &result.records,
                                Some(("collection", header)),
                            )
                        });
                    written(&result, pages)
                }
                None => outcome(&result, 0),
            };
            resources.push(record);
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    // A partial collection list cannot tell a deleted collection from an
    // unfetched one.
    if collections.succeeded() {
        let live: HashSet<&str> = collections
            .records
            .iter()
            .filter_map(|c| c.handle.as_deref())
            .collect();
        match prune_removed_collections(&settings.output_dir, &live) {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Removed product files of deleted collections"),
            Err(e) => warn!(error = %format!("{:#}", e), "Failed to remove deleted collections"),
        }
    }

    index::write_index(
        &settings.output_dir,
        &IndexOptions {
            shop_domain: settings.shop_domain.clone(),
            currency: shop.currency.clone(),
            page_size: settings.page_size,
            public_base_url: settings.public_base_url.clone(),
        },
    )?;

    let summary = RunSummary {
        shop_domain: settings.shop_domain.clone(),
        currency: shop.currency,
        finished_at: Utc::now(),
        resources,
    };
    write_json_atomic(&settings.output_dir.join(SUMMARY_FILE), &summary)?;

    for failed in summary.failed() {
        warn!(
            resource = %failed.name,
            kind = ?failed.error_kind,
            error = failed.error.as_deref().unwrap_or(""),
            "Resource did not complete"
        );
    }
    info!(
        succeeded = summary.succeeded(),
        total = summary.resources.len(),
        "Sync finished"
    );
    Ok(summary)
}

/// Delete `collections/<handle>_products*.json` for every handle not in `live`.
fn prune_removed_collections(output_dir: &Path, live: &HashSet<&str>) -> Result<usize> {
    let pages = index::scan_output(output_dir)?;
    let mut removed = 0;
    for (handle, files) in pages.collection_products {
        if live.contains(handle.as_str()) {
            continue;
        }
        for file in files {
            let path = output_dir.join(&file);
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use crate::error::FetchError;
    use crate::testing::{collection_products_page, graphql_product, rest_product, ScriptedTransport};
    use serde_json::{json, Value};

    fn script_shop(t: &ScriptedTransport, s: &Settings) {
        t.on_get(
            &s.rest_url("shop.json"),
            json!({ "shop": { "name": "Demo", "currency": "GBP" } }),
            None,
        );
    }

    fn read(dir: &Path, name: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn partial_failure_keeps_pages_and_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = test_settings(tmp.path());
        s.page_size = 2;
        let t = ScriptedTransport::new();
        script_shop(&t, &s);
        fs::create_dir_all(tmp.path().join("collections")).unwrap();
        fs::write(tmp.path().join("collections/retired_products.json"), "{}").unwrap();

        t.on_get(&s.rest_url("blogs.json?limit=2"), json!({ "blogs": [] }), None);

        // Five pages advertised, the third never answers.
        let p = |n: u32| s.rest_url(&format!("products.json?limit=2&page_info=p{}", n));
        t.on_get(
            &s.rest_url("products.json?limit=2"),
            json!({ "products": [rest_product(1, "A"), rest_product(2, "B")] }),
            Some(p(2).as_str()),
        );
        t.on_get(&p(2), json!({ "products": [rest_product(3, "C"), rest_product(4, "D")] }), Some(p(3).as_str()));
        t.fail_get(&p(3), FetchError::Status { status: 500, url: p(3) });

        t.on_get(
            &s.rest_url("smart_collections.json?limit=2"),
            json!({ "smart_collections": [] }),
            None,
        );
        t.on_get(
            &s.rest_url("custom_collections.json?limit=2"),
            json!({ "custom_collections": [{ "id": 9, "handle": "mugs", "title": "Mugs" }] }),
            None,
        );
        t.push_graphql(collection_products_page(vec![graphql_product(5, "E")], false, 0));

        let summary = run(&t, &s).await.unwrap();
        assert!(summary.is_success());

        let products = summary.resources.iter().find(|r| r.name == "products").unwrap();
        assert!(!products.succeeded);
        assert_eq!(products.records, 4);
        assert_eq!(products.pages, 2);
        assert_eq!(products.error_kind, Some(ErrorKind::Transport));
        assert_eq!(summary.succeeded(), 3);

        let dir = tmp.path();
        assert_eq!(read(dir, "products.json")["pagination"]["total_items"], 4);
        assert_eq!(read(dir, "products_page2.json")["products"][1]["id"], "4");
        assert_eq!(read(dir, "blogs.json")["pagination"]["total_pages"], 0);

        let mugs = read(&dir.join("collections"), "mugs_products.json");
        assert_eq!(mugs["collection"]["handle"], "mugs");
        assert_eq!(mugs["collection"]["products_count"], 1);
        assert_eq!(mugs["products"][0]["variants"][0]["price"]["currency_code"], "GBP");

        assert!(!dir.join("collections/retired_products.json").exists());

        let index = read(dir, "data_index.json");
        assert_eq!(index["currency"], "GBP");
        assert_eq!(index["files"]["products"]["total_pages"], 2);
        assert_eq!(index["total_collections"], 1);

        let saved = RunSummary::load(dir).unwrap().unwrap();
        assert_eq!(saved.resources.len(), 4);
    }

    #[tokio::test]
    async fn unwritable_collection_is_recorded_and_run_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let s = test_settings(tmp.path());
        let t = ScriptedTransport::new();
        script_shop(&t, &s);
        // A directory where the mugs page should go makes that write fail.
        fs::create_dir_all(tmp.path().join("collections/mugs_products.json")).unwrap();

        t.on_get(&s.rest_url("blogs.json?limit=250"), json!({ "blogs": [] }), None);
        t.on_get(
            &s.rest_url("products.json?limit=250"),
            json!({ "products": [rest_product(1, "A")] }),
            None,
        );
        t.on_get(
            &s.rest_url("smart_collections.json?limit=250"),
            json!({ "smart_collections": [] }),
            None,
        );
        t.on_get(
            &s.rest_url("custom_collections.json?limit=250"),
            json!({ "custom_collections": [
                { "id": 9, "handle": "mugs", "title": "Mugs" },
                { "id": 10, "handle": "tea", "title": "Tea" }
            ] }),
            None,
        );
        t.push_graphql(collection_products_page(vec![graphql_product(5, "E")], false, 0));
        t.push_graphql(collection_products_page(vec![graphql_product(6, "F")], false, 0));

        let summary = run(&t, &s).await.unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.resources.len(), 5);

        let mugs = summary.failed().next().unwrap();
        assert!(mugs.name.contains("mugs"));
        assert_eq!(mugs.records, 1);
        assert_eq!(mugs.pages, 0);
        assert_eq!(mugs.error_kind, Some(ErrorKind::Write));
        assert!(mugs.error.is_some());
        assert_eq!(summary.succeeded(), 4);

        let dir = tmp.path();
        let tea = read(&dir.join("collections"), "tea_products.json");
        assert_eq!(tea["collection"]["handle"], "tea");
        assert_eq!(tea["products"][0]["title"], "F");

        let index = read(dir, "data_index.json");
        assert_eq!(index["total_collections"], 1);
        assert!(index["files"]["collection_products"].get("tea").is_some());

        let saved = read(dir, SUMMARY_FILE);
        assert_eq!(saved["resources"].as_array().unwrap().len(), 5);
        assert!(saved["resources"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["error_kind"] == "write"));
    }

    #[tokio::test]
    async fn connectivity_failure_aborts_before_resources() {
        let tmp = tempfile::tempdir().unwrap();
        let s = test_settings(tmp.path());
        let t = ScriptedTransport::new();

        let err = run(&t, &s).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<FetchError>(), Some(FetchError::Connectivity(_))));
        assert_eq!(t.calls().len(), 1);
        assert!(!tmp.path().join("products.json").exists());
    }

    #[tokio::test]
    async fn every_resource_failing_is_unsuccessful() {
        let tmp = tempfile::tempdir().unwrap();
        let s = test_settings(tmp.path());
        let t = ScriptedTransport::new();
        script_shop(&t, &s);

        let summary = run(&t, &s).await.unwrap();
        assert!(!summary.is_success());
        assert_eq!(summary.resources.len(), 3);
        assert!(summary.failed().all(|r| r.error_kind == Some(ErrorKind::Transport)));
        // Empty documents are still written.
        assert_eq!(read(tmp.path(), "collections.json")["collections"], json!([]));
        assert!(tmp.path().join(SUMMARY_FILE).exists());
    }
}
