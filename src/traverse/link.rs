use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Traversal, TraversalState};
use crate::client::Transport;
use crate::error::FetchError;

static NEXT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).unwrap());

/// REST listing pagination driven by the `Link: <...>; rel="next"` header.
pub struct LinkTraversal<'a, T> {
    transport: &'a T,
    next_url: Option<String>,
    items_key: &'a str,
    shop_domain: &'a str,
    delay: Duration,
    state: TraversalState,
    pages: usize,
}

impl<'a, T: Transport> LinkTraversal<'a, T> {
    /// `items_key` names the array in each page body (`products`,
    /// `smart_collections`, `articles`, ...).
    pub fn new(
        transport: &'a T,
        first_url: String,
        items_key: &'a str,
        shop_domain: &'a str,
        delay: Duration,
    ) -> Self {
        Self {
            transport,
            next_url: Some(first_url),
            items_key,
            shop_domain,
            delay,
            state: TraversalState::Start,
            pages: 0,
        }
    }

    fn fail(&mut self, url: &str, err: FetchError) {
        warn!(error = %err, %url, page = self.pages + 1, "Link traversal failed");
        self.state = TraversalState::Failed(err);
    }
}

impl<'a, T: Transport> Traversal for LinkTraversal<'a, T> {
    async fn next_page(&mut self) -> Option<Vec<Value>> {
        match self.state {
            TraversalState::Exhausted | TraversalState::Failed(_) => return None,
            TraversalState::Accumulating => self.transport.pause(self.delay).await,
            TraversalState::Start | TraversalState::Requesting => {}
        }

        let Some(url) = self.next_url.take() else {
            self.state = TraversalState::Exhausted;
            return None;
        };

        self.state = TraversalState::Requesting;
        let response = match self.transport.get(&url).await {
            Ok(r) => r,
            Err(e) => {
                self.fail(&url, e);
                return None;
            }
        };
        let items = match take_items(response.body, self.items_key) {
            Ok(items) => items,
            Err(e) => {
                self.fail(&url, e);
                return None;
            }
        };
        self.pages += 1;

        let next = response
            .link
            .as_deref()
            .and_then(|header| next_link(header, self.shop_domain));
        match next {
            Some(next) if !items.is_empty() => {
                self.next_url = Some(next);
                self.state = TraversalState::Accumulating;
            }
            _ => self.state = TraversalState::Exhausted,
        }

        debug!(page = self.pages, items = items.len(), key = self.items_key, "Link page");
        Some(items)
    }

    fn state(&self) -> &TraversalState {
        &self.state
    }
}

/// Target of the `rel="next"` relation, verbatim when absolute, else on the
/// shop's own host.
pub fn next_link(header: &str, shop_domain: &str) -> Option<String> {
    let target = NEXT_LINK_RE.captures(header)?.get(1)?.as_str().trim();
    if target.is_empty() {
        return None;
    }
    if target.starts_with("http://") || target.starts_with("https://") {
        Some(target.to_string())
    } else if target.starts_with('/') {
        Some(format!("https://{}{}", shop_domain, target))
    } else {
        Some(format!("https://{}/{}", shop_domain, target))
    }
}

fn take_items(body: Value, key: &str) -> Result<Vec<Value>, FetchError> {
    let Value::Object(mut map) = body else {
        return Err(FetchError::Decode("response body is not an object".into()));
    };
    if let Some(errors) = map.remove("errors") {
        return Err(FetchError::Api(errors.to_string()));
    }
    match map.remove(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(FetchError::Decode(format!("`{}` is not an array", key))),
        None => Err(FetchError::Decode(format!("response has no `{}`", key))),
    }
}
