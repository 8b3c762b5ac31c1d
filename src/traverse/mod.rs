pub mod connection;
pub mod link;

use serde_json::Value;

use crate::error::FetchError;

pub use connection::ConnectionTraversal;
pub use link::LinkTraversal;

/// Where a traversal is in its request loop. `Exhausted` and `Failed` are
/// terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalState {
    Start,
    Requesting,
    Accumulating,
    Exhausted,
    Failed(FetchError),
}

impl TraversalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraversalState::Exhausted | TraversalState::Failed(_))
    }
}

/// A finite, non-restartable sequence of raw node pages. The cursor lives
/// inside the traversal and only moves forward.
pub trait Traversal {
    /// Next page of raw nodes, or `None` once the traversal is `Exhausted`
    /// or `Failed`.
    async fn next_page(&mut self) -> Option<Vec<Value>>;

    fn state(&self) -> &TraversalState;
}

/// Drive `traversal` to its end, normalizing every node as it arrives.
///
/// Records accumulated before a failure stay in `records`; the failure
/// (traversal or normalization) is returned.
pub async fn drain<Tr, R, F>(traversal: &mut Tr, records: &mut Vec<R>, mut normalize: F) -> Result<(), FetchError>
where
    Tr: Traversal,
    F: FnMut(Value) -> Result<R, FetchError>,
{
    while let Some(page) = traversal.next_page().await {
        for node in page {
            records.push(normalize(node)?);
        }
    }
    debug_assert!(traversal.state().is_terminal());
    match traversal.state() {
        TraversalState::Failed(e) => Err(e.clone()),
        _ => Ok(()),
    }
}
