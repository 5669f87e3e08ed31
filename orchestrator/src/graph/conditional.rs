//! Conditional edges: route to the next node based on the state returned by
//! the source node, instead of a single statically-wired edge.

use std::collections::HashMap;
use std::sync::Arc;

/// `(state) -> key`; the returned key is the next node id, or looked up in a
/// `path_map` when one is provided to `add_conditional_edges`.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// A routing function plus an optional key -> node-id map.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub path: ConditionalRouterFn<S>,
    pub path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S> {
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id for the given state.
    pub fn route(&self, state: &S) -> String {
        let key = (self.path)(state);
        match &self.path_map {
            Some(map) => map.get(&key).cloned().unwrap_or(key),
            None => key,
        }
    }
}

/// A compiled entry in the node -> next-step map: either a single statically
/// wired edge, or a conditional router resolved against the node's output state.
#[derive(Clone)]
pub enum NextEntry<S> {
    Unconditional(String),
    Conditional(ConditionalRouter<S>),
}
