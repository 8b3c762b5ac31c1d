use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: usize = 250;
/// Largest `limit`/`first` the Admin API accepts.
pub const MAX_PAGE_SIZE: usize = 250;

const CONFIG_FILE: &str = "shopify_snapshot";
const ENV_PREFIX: &str = "SHOPIFY";

/// Which API serves the per-collection product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionProductsApi {
    #[default]
    Graphql,
    Rest,
}

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub shop_domain: String,
    pub access_token: String,
    pub api_version: String,
    pub page_size: usize,
    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub output_dir: PathBuf,
    pub public_base_url: String,
    pub collection_products_api: CollectionProductsApi,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("page_size", &self.page_size)
            .field("request_delay_ms", &self.request_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("output_dir", &self.output_dir)
            .field("public_base_url", &self.public_base_url)
            .field("collection_products_api", &self.collection_products_api)
            .finish()
    }
}

impl Settings {
    /// Layered load: defaults, then the config file (explicit path, or an
    /// optional `shopify_snapshot.{toml,json,yaml}` in the working dir), then
    /// `SHOPIFY_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("shop_domain", "")?
            .set_default("access_token", "")?
            .set_default("api_version", "2023-10")?
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("request_delay_ms", 500_i64)?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("output_dir", ".")?
            .set_default("public_base_url", "")?
            .set_default("collection_products_api", "graphql")?;

        builder = match path {
            Some(p) => builder.add_source(File::from(p)),
            None => builder.add_source(File::with_name(CONFIG_FILE).required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate_paging()?;
        Ok(settings.normalized())
    }

    fn normalized(mut self) -> Self {
        self.shop_domain = self
            .shop_domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        self.access_token = self.access_token.trim().to_string();
        self
    }

    fn validate_paging(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            bail!("page_size must be between 1 and {}, got {}", MAX_PAGE_SIZE, self.page_size);
        }
        Ok(())
    }

    /// Required before anything talks to the store.
    pub fn validate_credentials(&self) -> Result<()> {
        if self.shop_domain.is_empty() {
            bail!("Missing shop domain (set SHOPIFY_SHOP_DOMAIN)");
        }
        if self.access_token.is_empty() {
            bail!("Missing access token (set SHOPIFY_ACCESS_TOKEN)");
        }
        Ok(())
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}/{}",
            self.shop_domain,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    pub fn graphql_url(&self) -> String {
        self.rest_url("graphql.json")
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_settings(output_dir: &Path) -> Settings {
    Settings {
        shop_domain: "demo.myshopify.com".into(),
        access_token: "shpat_test".into(),
        api_version: "2023-10".into(),
        page_size: DEFAULT_PAGE_SIZE,
        request_delay_ms: 0,
        request_timeout_secs: 30,
        output_dir: output_dir.to_path_buf(),
        public_base_url: "https://cdn.example.com/data/".into(),
        collection_products_api: CollectionProductsApi::Graphql,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_fill_missing_keys() {
        let (_dir, path) = write_config(
            "shop_domain = \"https://demo.myshopify.com/\"\naccess_token = \"shpat_abc\"\n",
        );
        let s = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(s.shop_domain, "demo.myshopify.com");
        assert_eq!(s.page_size, 250);
        assert_eq!(s.api_version, "2023-10");
        assert_eq!(s.collection_products_api, CollectionProductsApi::Graphql);
        assert_eq!(s.request_delay(), Duration::from_millis(500));
        s.validate_credentials().unwrap();
    }

    #[test]
    fn rejects_oversized_page() {
        let (_dir, path) = write_config("page_size = 500\n");
        assert!(Settings::load(Some(path.as_path())).is_err());
    }

    #[test]
    fn missing_credentials() {
        let (_dir, path) = write_config("collection_products_api = \"rest\"\n");
        let s = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(s.collection_products_api, CollectionProductsApi::Rest);
        assert!(s.validate_credentials().is_err());
    }

    #[test]
    fn endpoint_urls() {
        let s = test_settings(Path::new("."));
        assert_eq!(
            s.rest_url("/products.json?limit=250"),
            "https://demo.myshopify.com/admin/api/2023-10/products.json?limit=250"
        );
        assert_eq!(s.graphql_url(), "https://demo.myshopify.com/admin/api/2023-10/graphql.json");
    }

    #[test]
    fn debug_redacts_token() {
        let s = test_settings(Path::new("."));
        assert!(!format!("{:?}", s).contains("shpat_test"));
    }
}
