//! Canonical, flat record shapes written to the snapshot files.
//!
//! Every optional field serializes (as `null`) so all records of one type
//! carry the same key set. `id` is always the numeric id.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub amount: String,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub admin_graphql_api_id: String,
    pub title: Option<String>,
    pub handle: Option<String>,
    pub body_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub published_at: Option<String>,
    pub tags: String,
    pub variants_count: usize,
    pub images_count: usize,
    pub variants: Vec<Variant>,
    pub images: Vec<Image>,
    pub options: Vec<ProductOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub title: Option<String>,
    pub price: Option<Price>,
    pub compare_at_price: Option<Price>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub position: Option<i64>,
    pub inventory_quantity: Option<i64>,
    pub weight: Option<f64>,
    pub weight_unit: Option<String>,
    pub grams: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub id: String,
    pub product_id: String,
    pub position: Option<i64>,
    pub src: Option<String>,
    pub alt: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductOption {
    pub id: Option<String>,
    pub name: Option<String>,
    pub position: Option<i64>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: String,
    pub admin_graphql_api_id: String,
    pub handle: Option<String>,
    pub title: Option<String>,
    pub body_html: Option<String>,
    pub collection_type: String,
    pub sort_order: Option<String>,
    pub published_at: Option<String>,
    pub updated_at: Option<String>,
    pub image_src: Option<String>,
}

/// The `collection` block at the top of every collection-products file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionHeader {
    pub id: String,
    pub handle: String,
    pub title: Option<String>,
    pub body_html: Option<String>,
    pub products_count: usize,
}

impl CollectionHeader {
    pub fn new(collection: &Collection, handle: &str, products_count: usize) -> Self {
        Self {
            id: collection.id.clone(),
            handle: handle.to_string(),
            title: collection.title.clone(),
            body_html: collection.body_html.clone(),
            products_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blog {
    pub id: String,
    pub admin_graphql_api_id: String,
    pub title: Option<String>,
    pub handle: Option<String>,
    pub commentable: Option<String>,
    pub tags: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub articles_count: usize,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: String,
    pub blog_id: String,
    pub title: Option<String>,
    pub handle: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub tags: String,
    pub status: ArticleStatus,
    pub is_published: bool,
    pub published_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub image_src: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArticleStatus {
    Published,
    Draft,
}
