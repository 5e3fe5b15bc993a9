use std::collections::HashMap;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};

use crate::analysis::{CoverabilityTree, NodeTag};
use crate::net::{Net, NodeId};
use crate::report::{RenderOptions, format_marking};

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// 以 Graphviz DOT 输出覆盖树，节点标签为 `n<id>` 与标识，边标签为迁移名。
pub fn tree_to_dot(tree: &CoverabilityTree, net: &Net, options: &RenderOptions) -> String {
    let mut graph: DiGraph<NodeId, String> = DiGraph::with_capacity(tree.len(), tree.len());
    let mut indices: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(tree.len());
    for (id, _) in tree.nodes() {
        indices.insert(id, graph.add_node(id));
    }
    for (id, node) in tree.nodes() {
        for (name, child) in node.children() {
            graph.add_edge(indices[&id], indices[child], name.clone());
        }
    }

    let edge_attr = |_, edge: EdgeReference<String>| -> String {
        format!("label=\"{}\"", escape(edge.weight()))
    };

    let node_attr = |_, (_idx, id): (NodeIndex, &NodeId)| -> String {
        let node = tree.node(*id);
        let mut label = format!(
            "{}\\n{}",
            id,
            escape(&format_marking(net, node.marking(), options.include_zero_tokens))
        );
        if options.show_tags && node.tag() != NodeTag::Expanded {
            label.push_str(&format!("\\n[{}]", node.tag()));
        }
        let style = match node.tag() {
            NodeTag::Old => ", style=dashed",
            NodeTag::DeadEnd => ", style=filled, fillcolor=\"#ffcdd2\"",
            NodeTag::New => ", style=dotted",
            NodeTag::Expanded => "",
        };
        let shape = if node.marking().has_omega() {
            ", shape=doubleoctagon"
        } else {
            ", shape=box"
        };
        format!("label=\"{}\"{}{}", label, shape, style)
    };

    format!(
        "{:?}",
        Dot::with_attr_getters(
            &graph,
            &[Config::EdgeNoLabel, Config::NodeNoLabel],
            &edge_attr,
            &node_attr
        )
    )
}
