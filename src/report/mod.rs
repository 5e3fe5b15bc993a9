//! 覆盖树分析结果的呈现：文本树、DOT 图与汇总报告.
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::analysis::{BoundnessResult, CoverabilityTree, TreeProperties, TreeStatistics};
use crate::net::Net;

mod dot;
mod tree;

pub use dot::tree_to_dot;
pub use tree::{format_marking, render_tree};

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub show_tags: bool,
    pub include_zero_tokens: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_tags: true,
            include_zero_tokens: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadMarkingEntry {
    pub node: String,
    pub marking: String,
    pub trace: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverabilityReport {
    pub net_name: String,
    pub statistics: TreeStatistics,
    pub bounded: Option<bool>,
    pub unbounded_places: Vec<String>,
    pub unbounded_witness: Vec<String>,
    pub dead_markings: Vec<DeadMarkingEntry>,
    pub has_repeated_marking: bool,
    pub complete: bool,
    pub analysis_time: Duration,
}

impl CoverabilityReport {
    pub fn new(net: &Net, tree: &CoverabilityTree, analysis_time: Duration) -> Self {
        let properties = TreeProperties::from_tree(tree);
        let (bounded, unbounded_places, unbounded_witness) = match &properties.boundness {
            BoundnessResult::Bounded => (Some(true), Vec::new(), Vec::new()),
            BoundnessResult::Unbounded {
                unbounded_places,
                witness_sequence,
            } => (
                Some(false),
                unbounded_places
                    .iter()
                    .map(|place| net.place_name(*place).to_string())
                    .collect(),
                TreeProperties::witness_names(net, witness_sequence),
            ),
            BoundnessResult::Unknown { .. } => (None, Vec::new(), Vec::new()),
        };

        Self {
            net_name: net.name().to_string(),
            statistics: tree.statistics(),
            bounded,
            unbounded_places,
            unbounded_witness,
            dead_markings: properties
                .dead_markings
                .iter()
                .map(|dead| DeadMarkingEntry {
                    node: dead.node.to_string(),
                    marking: format_marking(net, &dead.marking, true),
                    trace: TreeProperties::witness_names(net, &dead.witness),
                })
                .collect(),
            has_repeated_marking: properties.has_repeated_marking,
            complete: properties.complete,
            analysis_time,
        }
    }
}

impl fmt::Display for CoverabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.statistics;
        writeln!(f, "覆盖树分析报告: {}", self.net_name)?;
        writeln!(f, "分析时间: {:?}", self.analysis_time)?;
        writeln!(
            f,
            "节点总数: {} (new {}, old {}, dead-end {})",
            stats.total_nodes, stats.new_nodes, stats.old_nodes, stats.dead_end_nodes
        )?;
        writeln!(f, "最大深度: {}", stats.max_depth)?;
        writeln!(f, "不同标识数: {}", stats.unique_markings)?;
        if !self.complete {
            writeln!(f, "覆盖树在节点上限处被截断")?;
        }

        match self.bounded {
            Some(true) => writeln!(f, "\n✓ 有界")?,
            Some(false) => {
                writeln!(f, "\n✗ 无界，无界库所: {}", self.unbounded_places.join(", "))?;
                writeln!(f, "  见证序列: {}", self.unbounded_witness.join(" "))?;
            }
            None => writeln!(f, "\n? 有界性未知")?,
        }

        if self.dead_markings.is_empty() {
            writeln!(f, "✓ 无死标识")?;
        } else {
            writeln!(f, "✗ 发现 {} 个死标识:", self.dead_markings.len())?;
            for dead in &self.dead_markings {
                writeln!(f, "  {} ({}) <- {}", dead.node, dead.marking, dead.trace.join(" "))?;
            }
        }

        if self.has_repeated_marking {
            writeln!(f, "存在回到祖先标识的循环")?;
        }

        Ok(())
    }
}
