//! Scripted in-memory transport shared by the async tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use crate::client::{RestResponse, Transport};
use crate::error::FetchError;

#[derive(Default)]
pub struct ScriptedTransport {
    rest: Mutex<HashMap<String, Result<RestResponse, FetchError>>>,
    graphql: Mutex<VecDeque<Result<Value, FetchError>>>,
    calls: Mutex<Vec<String>>,
    pauses: Mutex<Vec<Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(&self, url: &str, body: Value, next: Option<&str>) {
        let link = next.map(|n| format!("<{}>; rel=\"next\"", n));
        self.rest
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(RestResponse { body, link }));
    }

    pub fn fail_get(&self, url: &str, err: FetchError) {
        self.rest.lock().unwrap().insert(url.to_string(), Err(err));
    }

    pub fn push_graphql(&self, body: Value) {
        self.graphql.lock().unwrap().push_back(Ok(body));
    }

    pub fn fail_graphql(&self, err: FetchError) {
        self.graphql.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pauses(&self) -> usize {
        self.pauses.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<RestResponse, FetchError> {
        self.calls.lock().unwrap().push(format!("GET {}", url));
        self.rest
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                })
            })
    }

    async fn graphql(&self, query: &str) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(format!("POST {}", query));
        self.graphql
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Api("no scripted response".into())))
    }

    async fn pause(&self, delay: Duration) {
        self.pauses.lock().unwrap().push(delay);
    }
}

/// `{data: {collectionByHandle: {products: <connection>}}}` with one edge
/// per node; cursors are `c<index>`.
pub fn collection_products_page(nodes: Vec<Value>, has_next: bool, offset: usize) -> Value {
    let edges: Vec<Value> = nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| json!({ "node": node, "cursor": format!("c{}", offset + i) }))
        .collect();
    let end = if edges.is_empty() {
        Value::Null
    } else {
        json!(format!("c{}", offset + edges.len() - 1))
    };
    json!({
        "data": {
            "collectionByHandle": {
                "products": {
                    "edges": edges,
                    "pageInfo": { "hasNextPage": has_next, "endCursor": end }
                }
            }
        }
    })
}

pub fn rest_product(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "handle": title.to_lowercase().replace(' ', "-"),
        "body_html": "<p>desc</p>",
        "vendor": "Acme",
        "product_type": "Widget",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-02T00:00:00Z",
        "published_at": "2024-01-01T00:00:00Z",
        "tags": "sale, new",
        "variants": [
            {
                "id": id * 10,
                "product_id": id,
                "title": "Default Title",
                "price": "19.99",
                "compare_at_price": null,
                "sku": format!("SKU-{}", id),
                "position": 1,
                "inventory_quantity": 5,
                "barcode": null,
                "weight": 0.25,
                "weight_unit": "kg",
                "grams": 250
            }
        ],
        "images": [],
        "options": [{ "id": id * 100, "name": "Title", "position": 1, "values": ["Default Title"] }]
    })
}

pub fn graphql_product(id: u64, title: &str) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{}", id),
        "title": title,
        "handle": title.to_lowercase().replace(' ', "-"),
        "descriptionHtml": "<p>desc</p>",
        "vendor": "Acme",
        "productType": "Widget",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-02T00:00:00Z",
        "publishedAt": "2024-01-01T00:00:00Z",
        "tags": ["sale", "new"],
        "images": { "edges": [] },
        "variants": {
            "edges": [
                {
                    "node": {
                        "id": format!("gid://shopify/ProductVariant/{}", id * 10),
                        "title": "Default Title",
                        "price": "19.99",
                        "compareAtPrice": null,
                        "sku": format!("SKU-{}", id),
                        "position": 1,
                        "inventoryQuantity": 5,
                        "barcode": null,
                        "weight": 0.25,
                        "weightUnit": "KILOGRAMS"
                    }
                }
            ]
        },
        "options": [
            {
                "id": format!("gid://shopify/ProductOption/{}", id * 100),
                "name": "Title",
                "position": 1,
                "values": ["Default Title"]
            }
        ]
    })
}
