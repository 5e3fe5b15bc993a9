use std::fmt::Write;

use crate::analysis::{CoverabilityTree, NodeTag};
use crate::net::{Marking, Net, NodeId};
use crate::report::RenderOptions;

/// `P0=1 | P1=ω`，可选择省略 0 分量。
pub fn format_marking(net: &Net, marking: &Marking, include_zero_tokens: bool) -> String {
    marking
        .iter()
        .filter(|(_, tokens)| include_zero_tokens || tokens.finite() != Some(0))
        .map(|(place, tokens)| format!("{}={}", net.place_name(place), tokens))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// 缩进文本形式的覆盖树：每层缩进两个空格，子节点前输出 `--t-->` 行。
pub fn render_tree(tree: &CoverabilityTree, net: &Net, options: &RenderOptions) -> String {
    let mut out = String::new();
    // (node, level)
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((id, level)) = stack.pop() {
        write_node(&mut out, tree, net, options, id, level);
        let node = tree.node(id);
        for child in node.children().values().rev() {
            stack.push((*child, level + 1));
        }
    }
    out
}

fn write_node(
    out: &mut String,
    tree: &CoverabilityTree,
    net: &Net,
    options: &RenderOptions,
    id: NodeId,
    level: usize,
) {
    let node = tree.node(id);
    let indent = "  ".repeat(level);
    if let Some(transition) = node.transition() {
        let parent_indent = "  ".repeat(level.saturating_sub(1));
        let _ = writeln!(
            out,
            "{}  --{}-->",
            parent_indent,
            net.transitions()[transition].name
        );
    }

    let marking = format_marking(net, node.marking(), options.include_zero_tokens);
    if options.show_tags && node.tag() != NodeTag::Expanded {
        let _ = writeln!(out, "{}{} [{}]", indent, marking, node.tag());
    } else {
        let _ = writeln!(out, "{}{}", indent, marking);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::run;

    fn producer() -> Net {
        let mut net = Net::new("producer");
        net.add_places(["P0", "P1"]).unwrap();
        net.set_initial_marking([("P0", 1)]).unwrap();
        net.add_transition("t1", [("P0", 1)], [("P0", 1), ("P1", 1)])
            .unwrap();
        net
    }

    #[test]
    fn producer_tree_text() {
        let net = producer();
        let tree = run(&net);
        let text = render_tree(&tree, &net, &RenderOptions::default());
        let expected = "\
P0=1 | P1=0
  --t1-->
  P0=1 | P1=ω
    --t1-->
    P0=1 | P1=ω [old]
";
        assert_eq!(text, expected);
    }

    #[test]
    fn options_hide_tags_and_zeros() {
        let net = producer();
        let tree = run(&net);
        let options = RenderOptions {
            show_tags: false,
            include_zero_tokens: false,
        };
        let text = render_tree(&tree, &net, &options);
        assert_eq!(text.lines().next(), Some("P0=1"));
        assert!(!text.contains("[old]"));
    }

    #[test]
    fn siblings_keep_declaration_order() {
        let mut net = Net::new("choice");
        net.add_places(["P0", "A", "B"]).unwrap();
        net.set_initial_marking([("P0", 1)]).unwrap();
        net.add_transition("tb", [("P0", 1)], [("B", 1)]).unwrap();
        net.add_transition("ta", [("P0", 1)], [("A", 1)]).unwrap();

        let tree = run(&net);
        let options = RenderOptions {
            show_tags: true,
            include_zero_tokens: false,
        };
        let text = render_tree(&tree, &net, &options);
        let expected = "\
P0=1
  --tb-->
  B=1 [dead-end]
  --ta-->
  A=1 [dead-end]
";
        assert_eq!(text, expected);
    }
}
