use serde::Deserialize;
use serde_json::Value;

use super::{join_tags, unwrap_seq, weight_in_grams, Normalizer, RawId, RawMoney, RawTags, Seq};
use crate::error::FetchError;
use crate::records::{Image, Product, ProductOption, Variant};

// Field names are the REST ones; aliases accept the GraphQL spelling.

#[derive(Deserialize)]
struct RawProduct {
    id: RawId,
    #[serde(alias = "adminGraphqlApiId")]
    admin_graphql_api_id: Option<String>,
    title: Option<String>,
    handle: Option<String>,
    #[serde(alias = "descriptionHtml")]
    body_html: Option<String>,
    vendor: Option<String>,
    #[serde(alias = "productType")]
    product_type: Option<String>,
    status: Option<String>,
    #[serde(alias = "createdAt")]
    created_at: Option<String>,
    #[serde(alias = "updatedAt")]
    updated_at: Option<String>,
    #[serde(alias = "publishedAt")]
    published_at: Option<String>,
    tags: Option<RawTags>,
    variants: Option<Seq<RawVariant>>,
    images: Option<Seq<RawImage>>,
    options: Option<Seq<RawOption>>,
}

#[derive(Deserialize)]
struct RawVariant {
    id: RawId,
    product_id: Option<RawId>,
    title: Option<String>,
    #[serde(alias = "priceV2")]
    price: Option<RawMoney>,
    #[serde(alias = "compareAtPrice", alias = "compareAtPriceV2")]
    compare_at_price: Option<RawMoney>,
    sku: Option<String>,
    barcode: Option<String>,
    position: Option<i64>,
    #[serde(alias = "inventoryQuantity")]
    inventory_quantity: Option<i64>,
    weight: Option<f64>,
    #[serde(alias = "weightUnit")]
    weight_unit: Option<String>,
    grams: Option<i64>,
    #[serde(alias = "createdAt")]
    created_at: Option<String>,
    #[serde(alias = "updatedAt")]
    updated_at: Option<String>,
}

#[derive(Deserialize)]
struct RawImage {
    id: RawId,
    product_id: Option<RawId>,
    position: Option<i64>,
    #[serde(alias = "url", alias = "originalSrc")]
    src: Option<String>,
    #[serde(alias = "altText")]
    alt: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
}

#[derive(Deserialize)]
struct RawOption {
    id: Option<RawId>,
    name: Option<String>,
    position: Option<i64>,
    #[serde(default)]
    values: Vec<String>,
}

impl Normalizer {
    pub fn product(&self, node: Value) -> Result<Product, FetchError> {
        let raw: RawProduct = serde_json::from_value(node)?;
        let id = raw.id.numeric();

        let variants: Vec<Variant> = unwrap_seq(raw.variants)
            .into_iter()
            .map(|v| self.variant(v, &id))
            .collect();
        let images: Vec<Image> = unwrap_seq(raw.images)
            .into_iter()
            .map(|i| image(i, &id))
            .collect();
        let options = unwrap_seq(raw.options).into_iter().map(option).collect();

        Ok(Product {
            admin_graphql_api_id: raw.id.global("Product", raw.admin_graphql_api_id),
            title: raw.title,
            handle: raw.handle,
            body_html: raw.body_html,
            vendor: raw.vendor,
            product_type: raw.product_type,
            status: raw.status.map(|s| s.to_lowercase()),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            published_at: raw.published_at,
            tags: join_tags(raw.tags),
            variants_count: variants.len(),
            images_count: images.len(),
            variants,
            images,
            options,
            id,
        })
    }

    fn variant(&self, raw: RawVariant, product_id: &str) -> Variant {
        let (weight_unit, grams) = weight_in_grams(raw.weight, raw.weight_unit.as_deref(), raw.grams);
        Variant {
            id: raw.id.numeric(),
            product_id: raw
                .product_id
                .map(|p| p.numeric())
                .unwrap_or_else(|| product_id.to_string()),
            title: raw.title,
            price: self.price(raw.price),
            compare_at_price: self.price(raw.compare_at_price),
            sku: raw.sku,
            barcode: raw.barcode,
            position: raw.position,
            inventory_quantity: raw.inventory_quantity,
            weight: raw.weight,
            weight_unit,
            grams,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

fn image(raw: RawImage, product_id: &str) -> Image {
    Image {
        id: raw.id.numeric(),
        product_id: raw
            .product_id
            .map(|p| p.numeric())
            .unwrap_or_else(|| product_id.to_string()),
        position: raw.position,
        src: raw.src,
        alt: raw.alt,
        width: raw.width,
        height: raw.height,
    }
}

fn option(raw: RawOption) -> ProductOption {
    ProductOption {
        id: raw.id.map(|i| i.numeric()),
        name: raw.name,
        position: raw.position,
        values: raw.values,
    }
}
