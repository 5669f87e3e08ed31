//! Render a compiled graph's node/edge structure for inspection: `generate_dot`
//! produces Graphviz DOT, `generate_text` a plain-text edge list. Neither is
//! wired into the HTTP API; both are consumed by an external renderer or a
//! developer running them ad hoc.

use std::fmt::Debug;

use super::compiled::CompiledStateGraph;
use super::conditional::NextEntry;
use super::state_graph::{END, START};

/// Graphviz DOT source for the graph's static structure. Conditional edges are
/// rendered as dashed, labeled `cond`.
pub fn generate_dot<S>(graph: &CompiledStateGraph<S>) -> String
where
    S: Clone + Send + Sync + Debug + 'static,
{
    let mut out = String::from("digraph StateGraph {\n");
    out.push_str("    __start__ [shape=point];\n");
    out.push_str("    __end__ [shape=doublecircle];\n");
    for id in graph.node_ids() {
        out.push_str(&format!("    \"{id}\" [shape=box];\n"));
    }
    out.push_str(&format!("    __start__ -> \"{}\";\n", graph.first_node_id()));
    for (from, entry) in graph.next_map() {
        match entry {
            NextEntry::Unconditional(to) => {
                let to_label = if to == END { "__end__".to_string() } else { format!("\"{to}\"") };
                out.push_str(&format!("    \"{from}\" -> {to_label};\n"));
            }
            NextEntry::Conditional(router) => {
                if let Some(path_map) = &router.path_map {
                    for target in path_map.values() {
                        let to_label = if target == END {
                            "__end__".to_string()
                        } else {
                            format!("\"{target}\"")
                        };
                        out.push_str(&format!("    \"{from}\" -> {to_label} [style=dashed, label=\"cond\"];\n"));
                    }
                }
            }
        }
    }
    out.push_str("}\n");
    out
}

/// Plain-text `from -> to` edge list, one per line, in compiled edge order.
pub fn generate_text<S>(graph: &CompiledStateGraph<S>) -> String
where
    S: Clone + Send + Sync + Debug + 'static,
{
    let mut lines = vec![format!("{START} -> {}", graph.first_node_id())];
    for (from, entry) in graph.next_map() {
        match entry {
            NextEntry::Unconditional(to) => lines.push(format!("{from} -> {to}")),
            NextEntry::Conditional(router) => {
                if let Some(path_map) = &router.path_map {
                    for (key, target) in path_map {
                        lines.push(format!("{from} -> {target} [{key}]"));
                    }
                } else {
                    lines.push(format!("{from} -> <conditional>"));
                }
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::OrchestratorError;
    use crate::graph::{Next, Node, StateGraph};

    use super::*;

    #[derive(Clone, Debug)]
    struct S(i32);

    struct N(&'static str);

    #[async_trait]
    impl Node<S> for N {
        fn id(&self) -> &str {
            self.0
        }
        async fn run(&self, state: S) -> Result<(S, Next), OrchestratorError> {
            Ok((state, Next::Continue))
        }
    }

    #[test]
    fn generate_dot_includes_all_nodes() {
        let mut graph = StateGraph::<S>::new();
        graph.add_node("a", Arc::new(N("a")));
        graph.add_node("b", Arc::new(N("b")));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        let compiled = graph.compile().unwrap();

        let dot = generate_dot(&compiled);
        assert!(dot.contains("\"a\""));
        assert!(dot.contains("\"b\""));
        assert!(dot.starts_with("digraph StateGraph {"));
    }

    #[test]
    fn generate_text_lists_edges() {
        let mut graph = StateGraph::<S>::new();
        graph.add_node("a", Arc::new(N("a")));
        graph.add_edge(START, "a");
        graph.add_edge("a", END);
        let compiled = graph.compile().unwrap();

        let text = generate_text(&compiled);
        assert!(text.contains("__start__ -> a"));
        assert!(text.contains("a -> __end__"));
    }
}
