use serde::Deserialize;
use serde_json::Value;

use super::{Normalizer, RawId};
use crate::error::FetchError;
use crate::records::Collection;

#[derive(Deserialize)]
struct RawCollection {
    id: RawId,
    #[serde(alias = "adminGraphqlApiId")]
    admin_graphql_api_id: Option<String>,
    handle: Option<String>,
    title: Option<String>,
    #[serde(alias = "descriptionHtml")]
    body_html: Option<String>,
    #[serde(alias = "sortOrder")]
    sort_order: Option<String>,
    #[serde(alias = "publishedAt")]
    published_at: Option<String>,
    #[serde(alias = "updatedAt")]
    updated_at: Option<String>,
    /// Present (non-null) only on smart collections.
    #[serde(alias = "ruleSet")]
    rules: Option<Value>,
    image: Option<RawCollectionImage>,
}

#[derive(Deserialize)]
struct RawCollectionImage {
    #[serde(alias = "url")]
    src: Option<String>,
}

impl Normalizer {
    pub fn collection(&self, node: Value) -> Result<Collection, FetchError> {
        let raw: RawCollection = serde_json::from_value(node)?;
        let collection_type = if raw.rules.is_some() { "smart" } else { "custom" };

        Ok(Collection {
            id: raw.id.numeric(),
            admin_graphql_api_id: raw.id.global("Collection", raw.admin_graphql_api_id),
            handle: raw.handle,
            title: raw.title,
            body_html: raw.body_html,
            collection_type: collection_type.to_string(),
            sort_order: raw.sort_order.map(|s| s.to_lowercase()),
            published_at: raw.published_at,
            updated_at: raw.updated_at,
            image_src: raw.image.and_then(|i| i.src),
        })
    }
}
