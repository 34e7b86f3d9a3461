// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! static recursion detection
//!
//! Every signature becomes a node and every call site an edge from caller to callee, so a
//! node's callers are its incoming edges. Nodes that have no callers or no callees can't
//! be part of a cycle; they are removed repeatedly until nothing changes. Whatever is
//! left is reported as recursive. This over-approximates: a signature on a path between
//! two disjoint cycles survives the stripping too and is reported as well.

use crate::diagnostics::Diagnostics;
use crate::errors::StaticRecursion;
use glsl_linker_ir::visit::for_each_call;
use glsl_linker_ir::Shader;
use glsl_linker_ir::SignatureKey;
use hashbrown::HashMap;
use petgraph::prelude::*;
use petgraph::stable_graph::IndexType;
use petgraph::stable_graph::NodeIndex;
use petgraph::stable_graph::StableGraph;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[repr(transparent)]
pub struct CallGraphIndexType(usize);

unsafe impl IndexType for CallGraphIndexType {
    fn new(v: usize) -> Self {
        CallGraphIndexType(v)
    }
    fn index(&self) -> usize {
        self.0
    }
    fn max() -> Self {
        CallGraphIndexType(usize::max_value())
    }
}

pub type CallGraphNodeIndex = NodeIndex<CallGraphIndexType>;

type Graph = StableGraph<SignatureKey, (), Directed, CallGraphIndexType>;

/// who calls whom, one edge per call site
#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    graph: Graph,
    nodes: HashMap<SignatureKey, CallGraphNodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }
    /// the call graph of every defined signature of `shader`
    pub fn build(shader: &Shader) -> Self {
        let mut retval = Self::new();
        for function in &shader.functions {
            for signature in &function.signatures {
                if !signature.is_defined {
                    continue;
                }
                let caller = shader.signature_key(&function.name, signature);
                retval.add_signature(caller.clone());
                for_each_call(&signature.body, |call| {
                    retval.add_call(&caller, &call.callee);
                });
            }
        }
        retval
    }
    pub fn add_signature(&mut self, key: SignatureKey) -> CallGraphNodeIndex {
        if let Some(&node) = self.nodes.get(&key) {
            return node;
        }
        let node = self.graph.add_node(key.clone());
        self.nodes.insert(key, node);
        node
    }
    pub fn add_call(&mut self, caller: &SignatureKey, callee: &SignatureKey) {
        let caller = self.add_signature(caller.clone());
        let callee = self.add_signature(callee.clone());
        self.graph.add_edge(caller, callee, ());
    }
    fn neighbors(&self, key: &SignatureKey, direction: Direction) -> Vec<&SignatureKey> {
        match self.nodes.get(key) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, direction)
                .map(|neighbor| &self.graph[neighbor])
                .collect(),
            None => Vec::new(),
        }
    }
    /// the signatures `key` calls, once per call site
    pub fn callees(&self, key: &SignatureKey) -> Vec<&SignatureKey> {
        self.neighbors(key, Outgoing)
    }
    /// the signatures calling `key`, once per call site
    pub fn callers(&self, key: &SignatureKey) -> Vec<&SignatureKey> {
        self.neighbors(key, Incoming)
    }
    /// strip nodes without callers or callees to a fixed point; returns the survivors in
    /// the order they were added
    pub fn recursive_signatures(&self) -> Vec<SignatureKey> {
        let mut graph = self.graph.clone();
        loop {
            let removable: Vec<_> = graph
                .node_indices()
                .filter(|&node| {
                    graph.neighbors_directed(node, Incoming).next().is_none()
                        || graph.neighbors_directed(node, Outgoing).next().is_none()
                })
                .collect();
            if removable.is_empty() {
                break;
            }
            for node in removable {
                graph.remove_node(node);
            }
        }
        let mut survivors: Vec<_> = graph.node_indices().collect();
        survivors.sort();
        survivors
            .into_iter()
            .filter_map(|node| graph.remove_node(node))
            .collect()
    }
}

/// report every signature of `shader` that may recurse; returns `true` if any was found
pub fn detect_recursion(shader: &Shader, diagnostics: &mut Diagnostics) -> bool {
    let recursive = CallGraph::build(shader).recursive_signatures();
    for key in &recursive {
        tracing::debug!(stage = %shader.stage, signature = %key, "static recursion");
        diagnostics.error(StaticRecursion {
            function: key.name.clone(),
        });
    }
    !recursive.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsl_linker_ir::Type;

    fn key(name: &str) -> SignatureKey {
        SignatureKey::new(name, Vec::new())
    }

    macro_rules! call_graph {
        ($($caller:ident -> $callee:ident),* $(,)?) => {{
            let mut graph = CallGraph::new();
            $(graph.add_call(&key(stringify!($caller)), &key(stringify!($callee)));)*
            graph
        }};
    }

    fn recursive_names(graph: &CallGraph) -> Vec<String> {
        graph
            .recursive_signatures()
            .into_iter()
            .map(|key| key.name)
            .collect()
    }

    #[test]
    fn test_acyclic() {
        let graph = call_graph![main -> a, main -> b, a -> c, b -> c, c -> d];
        assert!(recursive_names(&graph).is_empty());
    }

    #[test]
    fn test_mutual_recursion() {
        let graph = call_graph![main -> a, a -> b, b -> a];
        assert_eq!(recursive_names(&graph), vec!["a", "b"]);
    }

    #[test]
    fn test_self_recursion() {
        let graph = call_graph![main -> f, f -> f, f -> g];
        assert_eq!(recursive_names(&graph), vec!["f"]);
    }

    #[test]
    fn test_path_between_cycles_is_reported() {
        let graph = call_graph![a -> b, b -> a, b -> c, c -> d, d -> e, e -> d];
        assert_eq!(recursive_names(&graph), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_multi_edges() {
        let graph = call_graph![main -> a, main -> a, a -> b];
        assert_eq!(graph.callees(&key("main")).len(), 2);
        assert_eq!(graph.callers(&key("a")).len(), 2);
        assert!(recursive_names(&graph).is_empty());
    }

    #[test]
    fn test_overloads_are_distinct_nodes() {
        let mut graph = CallGraph::new();
        let f_float = SignatureKey::new("f", vec![Type::float()]);
        let f_int = SignatureKey::new("f", vec![Type::int()]);
        graph.add_call(&f_float, &f_int);
        assert!(graph.recursive_signatures().is_empty());
    }
}
