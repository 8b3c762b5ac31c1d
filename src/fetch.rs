use serde_json::Value;
use tracing::{info, warn};

use crate::client::Transport;
use crate::config::{CollectionProductsApi, Settings};
use crate::error::FetchError;
use crate::normalize::{numeric_id, Normalizer};
use crate::records::{Article, Blog, Collection, Product};
use crate::traverse::{drain, ConnectionTraversal, LinkTraversal};

const COLLECTION_PRODUCTS_PATH: &[&str] = &["collectionByHandle", "products"];

const PRODUCT_FIELDS: &str = "id title handle descriptionHtml vendor productType status \
createdAt updatedAt publishedAt tags \
options { id name position values } \
images(first: 50) { edges { node { id url altText width height } } } \
variants(first: 100) { edges { node { id title price compareAtPrice sku barcode position \
inventoryQuantity weight weightUnit createdAt updatedAt } } }";

/// Everything one resource produced: the records gathered before any
/// failure, and that failure.
#[derive(Debug)]
pub struct ResourceResult<R> {
    pub name: String,
    pub records: Vec<R>,
    pub error: Option<FetchError>,
}

impl<R> ResourceResult<R> {
    fn new(name: impl Into<String>, records: Vec<R>, error: Option<FetchError>) -> Self {
        let result = Self {
            name: name.into(),
            records,
            error,
        };
        match &result.error {
            None => info!(resource = %result.name, records = result.records.len(), "Fetched resource"),
            Some(e) => warn!(
                resource = %result.name,
                records = result.records.len(),
                error = %e,
                "Resource failed, keeping partial records"
            ),
        }
        result
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Fetcher<'a, T> {
    transport: &'a T,
    settings: &'a Settings,
    normalizer: Normalizer,
}

impl<'a, T: Transport> Fetcher<'a, T> {
    pub fn new(transport: &'a T, settings: &'a Settings, normalizer: Normalizer) -> Self {
        Self {
            transport,
            settings,
            normalizer,
        }
    }

    fn listing(&self, path: &str, items_key: &'a str) -> LinkTraversal<'a, T> {
        let settings: &'a Settings = self.settings;
        LinkTraversal::new(
            self.transport,
            settings.rest_url(path),
            items_key,
            &settings.shop_domain,
            settings.request_delay(),
        )
    }

    async fn pause(&self) {
        self.transport.pause(self.settings.request_delay()).await;
    }

    pub async fn fetch_products(&self) -> ResourceResult<Product> {
        let mut traversal = self.listing(&format!("products.json?limit={}", self.settings.page_size), "products");
        let mut records = Vec::new();
        let result = drain(&mut traversal, &mut records, |node| self.normalizer.product(node)).await;
        ResourceResult::new("products", records, result.err())
    }

    /// Smart collections first, then custom ones, into one list.
    pub async fn fetch_collections(&self) -> ResourceResult<Collection> {
        let mut records = Vec::new();
        for (i, kind) in ["smart_collections", "custom_collections"].into_iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }
            let mut traversal = self.listing(&format!("{}.json?limit={}", kind, self.settings.page_size), kind);
            if let Err(e) = drain(&mut traversal, &mut records, |node| self.normalizer.collection(node)).await {
                return ResourceResult::new("collections", records, Some(e));
            }
        }
        ResourceResult::new("collections", records, None)
    }

    /// Blog list, then every blog's articles. A failed article listing keeps
    /// the blog with the articles read so far and stops the resource.
    pub async fn fetch_blogs(&self) -> ResourceResult<Blog> {
        let page_size = self.settings.page_size;
        let mut listing = self.listing(&format!("blogs.json?limit={}", page_size), "blogs");
        let mut nodes: Vec<Value> = Vec::new();
        let mut error = drain(&mut listing, &mut nodes, Ok).await.err();

        let mut blogs = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Some(blog_id) = node_id(&node) else {
                error.get_or_insert(FetchError::Decode("blog without an id".into()));
                break;
            };

            self.pause().await;
            let mut articles: Vec<Article> = Vec::new();
            let mut traversal = self.listing(&format!("blogs/{}/articles.json?limit={}", blog_id, page_size), "articles");
            let article_error = drain(&mut traversal, &mut articles, |raw| self.normalizer.article(raw, &blog_id))
                .await
                .err();
            info!(blog_id = %blog_id, articles = articles.len(), "Fetched blog articles");

            match self.normalizer.blog(node, articles) {
                Ok(blog) => blogs.push(blog),
                Err(e) => {
                    error.get_or_insert(e);
                    break;
                }
            }
            if let Some(e) = article_error {
                error.get_or_insert(e);
                break;
            }
        }

        ResourceResult::new("blogs", blogs, error)
    }

    pub async fn fetch_collection_products(&self, collection: &Collection) -> ResourceResult<Product> {
        let Some(handle) = collection.handle.as_deref() else {
            return ResourceResult::new(
                format!("collection:{}", collection.id),
                Vec::new(),
                Some(FetchError::Decode(format!("collection {} has no handle", collection.id))),
            );
        };
        let name = format!("collection:{}", handle);
        let mut records = Vec::new();

        let result = match self.settings.collection_products_api {
            CollectionProductsApi::Graphql => {
                let first = self.settings.page_size;
                let mut traversal = ConnectionTraversal::new(
                    self.transport,
                    |after: Option<&str>| collection_products_query(handle, first, after),
                    COLLECTION_PRODUCTS_PATH,
                    self.settings.request_delay(),
                );
                drain(&mut traversal, &mut records, |node| self.normalizer.product(node)).await
            }
            CollectionProductsApi::Rest => {
                let path = format!(
                    "products.json?collection_id={}&limit={}",
                    collection.id, self.settings.page_size
                );
                let mut traversal = self.listing(&path, "products");
                drain(&mut traversal, &mut records, |node| self.normalizer.product(node)).await
            }
        };

        ResourceResult::new(name, records, result.err())
    }
}

/// `collectionByHandle` products page; string arguments go through JSON
/// escaping so a handle or cursor can never break out of its literal.
pub fn collection_products_query(handle: &str, first: usize, after: Option<&str>) -> String {
    let after = after
        .map(|cursor| format!(", after: {}", Value::from(cursor)))
        .unwrap_or_default();
    format!(
        "{{ collectionByHandle(handle: {}) {{ products(first: {}{}) {{ edges {{ cursor node {{ {} }} }} pageInfo {{ hasNextPage endCursor }} }} }} }}",
        Value::from(handle),
        first,
        after,
        PRODUCT_FIELDS
    )
}

fn node_id(node: &Value) -> Option<String> {
    match node.get("id")? {
        Value::String(s) => Some(numeric_id(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
