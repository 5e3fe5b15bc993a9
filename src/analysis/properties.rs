//! 基于覆盖树的性质判定：有界性、死标识与回到祖先标识的循环。
use std::fmt;

use itertools::Itertools;

use crate::analysis::coverability::{CoverabilityTree, NodeTag, Termination};
use crate::net::core::Net;
use crate::net::ids::{NodeId, PlaceId, TransitionId};
use crate::net::structure::Marking;

/// 有界性检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundnessResult {
    Bounded,
    Unbounded {
        /// 在某个节点上取值为 ω 的库所
        unbounded_places: Vec<PlaceId>,
        /// 到达第一个含 ω 节点的迁移序列
        witness_sequence: Vec<TransitionId>,
    },
    /// 覆盖树被截断且尚未出现 ω
    Unknown { reason: String },
}

impl fmt::Display for BoundnessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundnessResult::Bounded => write!(f, "Petri网是有界的"),
            BoundnessResult::Unbounded {
                unbounded_places,
                witness_sequence,
            } => write!(
                f,
                "Petri网是无界的，无界库所: {:?}，见证序列: {:?}",
                unbounded_places, witness_sequence
            ),
            BoundnessResult::Unknown { reason } => write!(f, "无法确定有界性: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadMarking {
    pub node: NodeId,
    pub marking: Marking,
    pub witness: Vec<TransitionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeProperties {
    pub boundness: BoundnessResult,
    pub dead_markings: Vec<DeadMarking>,
    /// 存在 `old` 节点，即某条路径回到了祖先的标识
    pub has_repeated_marking: bool,
    pub complete: bool,
}

impl TreeProperties {
    pub fn from_tree(tree: &CoverabilityTree) -> Self {
        let first_omega = tree
            .nodes()
            .find(|(_, node)| node.marking().has_omega())
            .map(|(id, _)| id);

        let boundness = match (first_omega, tree.termination()) {
            (Some(node), _) => BoundnessResult::Unbounded {
                unbounded_places: tree
                    .nodes()
                    .flat_map(|(_, node)| node.marking().omega_places().collect::<Vec<_>>())
                    .sorted()
                    .dedup()
                    .collect(),
                witness_sequence: tree.firing_sequence(node),
            },
            (None, Termination::Complete) => BoundnessResult::Bounded,
            (None, Termination::NodeLimit(limit)) => BoundnessResult::Unknown {
                reason: format!("超过节点上限 {}", limit),
            },
        };

        let dead_markings = tree
            .nodes_tagged(NodeTag::DeadEnd)
            .map(|node| DeadMarking {
                node,
                marking: tree.node(node).marking().clone(),
                witness: tree.firing_sequence(node),
            })
            .collect();

        Self {
            boundness,
            dead_markings,
            has_repeated_marking: tree.nodes_tagged(NodeTag::Old).next().is_some(),
            complete: tree.is_complete(),
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self.boundness, BoundnessResult::Bounded)
    }

    /// Returns the transition names along a witness.
    pub fn witness_names(net: &Net, witness: &[TransitionId]) -> Vec<String> {
        witness
            .iter()
            .map(|t| net.transitions()[*t].name.clone())
            .collect()
    }
}
