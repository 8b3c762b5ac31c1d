use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Traversal, TraversalState};
use crate::client::Transport;
use crate::error::FetchError;

/// GraphQL cursor-connection pagination (`edges`/`pageInfo`).
///
/// `query` renders the full query for an optional `after` cursor; `path`
/// leads from `data` to the connection object.
pub struct ConnectionTraversal<'a, T, Q> {
    transport: &'a T,
    query: Q,
    path: &'a [&'a str],
    after: Option<String>,
    delay: Duration,
    state: TraversalState,
    pages: usize,
}

impl<'a, T, Q> ConnectionTraversal<'a, T, Q>
where
    T: Transport,
    Q: Fn(Option<&str>) -> String,
{
    pub fn new(transport: &'a T, query: Q, path: &'a [&'a str], delay: Duration) -> Self {
        Self {
            transport,
            query,
            path,
            after: None,
            delay,
            state: TraversalState::Start,
            pages: 0,
        }
    }

    fn fail(&mut self, err: FetchError) {
        warn!(error = %err, page = self.pages + 1, path = ?self.path, "Connection traversal failed");
        self.state = TraversalState::Failed(err);
    }
}

impl<'a, T, Q> Traversal for ConnectionTraversal<'a, T, Q>
where
    T: Transport,
    Q: Fn(Option<&str>) -> String,
{
    async fn next_page(&mut self) -> Option<Vec<Value>> {
        match self.state {
            TraversalState::Exhausted | TraversalState::Failed(_) => return None,
            TraversalState::Accumulating => self.transport.pause(self.delay).await,
            TraversalState::Start | TraversalState::Requesting => {}
        }

        self.state = TraversalState::Requesting;
        let query = (self.query)(self.after.as_deref());
        let connection = match self.transport.graphql(&query).await {
            Ok(body) => match decode_connection(body, self.path) {
                Ok(c) => c,
                Err(e) => {
                    self.fail(e);
                    return None;
                }
            },
            Err(e) => {
                self.fail(e);
                return None;
            }
        };
        self.pages += 1;

        let has_next = connection.page_info.has_next_page;
        let next_cursor = connection
            .page_info
            .end_cursor
            .or_else(|| connection.edges.last().and_then(|e| e.cursor.clone()));
        let nodes: Vec<Value> = connection.edges.into_iter().map(|e| e.node).collect();

        // An empty page ends the loop even if the server claims more.
        if !has_next || nodes.is_empty() {
            self.state = TraversalState::Exhausted;
        } else if let Some(cursor) = next_cursor {
            self.after = Some(cursor);
            self.state = TraversalState::Accumulating;
        } else {
            self.fail(FetchError::Decode("hasNextPage is true but no cursor was returned".into()));
        }

        debug!(page = self.pages, nodes = nodes.len(), has_next, "Connection page");
        Some(nodes)
    }

    fn state(&self) -> &TraversalState {
        &self.state
    }
}

#[derive(Deserialize)]
struct GraphQlBody {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
    edges: Vec<Edge>,
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct Edge {
    node: Value,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

fn decode_connection(body: Value, path: &[&str]) -> Result<Connection, FetchError> {
    let body: GraphQlBody = serde_json::from_value(body)?;
    if let Some(message) = body.errors.as_ref().and_then(error_message) {
        return Err(FetchError::Api(message));
    }

    let mut current = body
        .data
        .ok_or_else(|| FetchError::Api("response carries no data".into()))?;
    for key in path {
        current = match current {
            Value::Object(mut map) => map.remove(*key).unwrap_or(Value::Null),
            _ => Value::Null,
        };
        if current.is_null() {
            return Err(FetchError::Api(format!("`{}` is null or missing", key)));
        }
    }
    Ok(serde_json::from_value(current)?)
}

/// `errors` is normally `[{message, ...}]`, but some failures send a bare
/// string or object. `None` when there is nothing to report.
fn error_message(errors: &Value) -> Option<String> {
    let message = match errors {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|e| match e.get("message").and_then(Value::as_str) {
                Some(m) => m.to_string(),
                None => e.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(m) => m.to_string(),
            None => errors.to_string(),
        },
        other => other.to_string(),
    };
    (!message.is_empty()).then_some(message)
}
