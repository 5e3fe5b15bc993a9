//! Karp-Miller 覆盖树构造
//!
//! 从初始标识出发，反复取出一个 `new` 节点 `M` 处理：
//! 1. 若 `M` 与某个严格祖先分量完全相同，标记为 `old`，该分支终止；
//! 2. 若没有可激发迁移，标记为 `dead-end`；
//! 3. 否则按迁移声明顺序逐一发射得到 `M'`，沿根到 `M` 的路径寻找第一个被
//!    `M'` 覆盖且不相等的祖先 `M''`，把 `M'[p] > M''[p]` 的分量提升为 ω，
//!    再以 `new` 标记挂到 `M` 之下。
//!
//! 节点按创建顺序（FIFO 队列）取出，与按节点列表顺序查找第一个 `new`
//! 节点等价。第 3 步的 ω 加速保证了树的有限性（Dickson 引理）。
use std::collections::{HashSet, VecDeque};
use std::fmt;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Serialize;

use crate::net::core::Net;
use crate::net::ids::{NodeId, PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::Marking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    /// 等待处理
    New,
    /// 与路径上的某个祖先重复
    Old,
    /// 无可激发迁移
    DeadEnd,
    /// 已展开，子节点挂在其下
    Expanded,
}

impl NodeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeTag::New => "new",
            NodeTag::Old => "old",
            NodeTag::DeadEnd => "dead-end",
            NodeTag::Expanded => "",
        }
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records which ancestor a node was found to strictly cover and which
/// places were promoted to ω as a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceleration {
    pub ancestor: NodeId,
    pub promoted: Vec<PlaceId>,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    marking: Marking,
    tag: NodeTag,
    parent: Option<NodeId>,
    transition: Option<TransitionId>,
    children: IndexMap<String, NodeId>,
    depth: usize,
    acceleration: Option<Acceleration>,
}

impl TreeNode {
    fn root(marking: Marking) -> Self {
        Self {
            marking,
            tag: NodeTag::New,
            parent: None,
            transition: None,
            children: IndexMap::new(),
            depth: 1,
            acceleration: None,
        }
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    pub fn tag(&self) -> NodeTag {
        self.tag
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// 从父节点到达该节点所发射的迁移；根节点为 `None`。
    pub fn transition(&self) -> Option<TransitionId> {
        self.transition
    }

    /// Children keyed by the name of the transition that produced them.
    pub fn children(&self) -> &IndexMap<String, NodeId> {
        &self.children
    }

    pub fn child(&self, transition: &str) -> Option<NodeId> {
        self.children.get(transition).copied()
    }

    /// Length of the path to the root, counting the node itself.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn acceleration(&self) -> Option<&Acceleration> {
        self.acceleration.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Complete,
    /// 达到节点上限后停止，未处理的节点仍保留 `new` 标记。
    NodeLimit(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeStatistics {
    pub total_nodes: usize,
    pub new_nodes: usize,
    pub old_nodes: usize,
    pub dead_end_nodes: usize,
    pub has_omega: bool,
    pub max_depth: usize,
    pub unique_markings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub node: NodeId,
    pub marking: Marking,
    pub tag: NodeTag,
    /// 迁移名 -> 子节点在视图中的位置
    pub children: IndexMap<String, usize>,
}

/// 只读视图，供外部渲染使用；与树内部结构不共享可变状态。
///
/// 节点按创建顺序平铺存放，根位于位置 0，任意深度的树都不会引起递归。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeView {
    nodes: Vec<ViewNode>,
}

impl TreeView {
    pub fn root(&self) -> &ViewNode {
        &self.nodes[0]
    }

    pub fn get(&self, position: usize) -> Option<&ViewNode> {
        self.nodes.get(position)
    }

    pub fn child(&self, node: &ViewNode, transition: &str) -> Option<&ViewNode> {
        node.children
            .get(transition)
            .and_then(|position| self.nodes.get(*position))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ViewNode> {
        self.nodes.iter()
    }
}

#[derive(Debug, Clone)]
pub struct CoverabilityTree {
    nodes: IndexVec<NodeId, TreeNode>,
    termination: Termination,
}

impl CoverabilityTree {
    fn new(initial: Marking) -> Self {
        let mut nodes = IndexVec::new();
        nodes.push(TreeNode::root(initial));
        Self {
            nodes,
            termination: Termination::Complete,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter_enumerated()
    }

    pub fn nodes_tagged(&self, tag: NodeTag) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(move |(_, node)| node.tag == tag)
            .map(|(id, _)| id)
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Complete
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.nodes[id].parent,
        }
    }

    /// 根到 `id`（含）的路径。
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        path
    }

    /// 从根出发到达 `id` 的迁移序列。
    pub fn firing_sequence(&self, id: NodeId) -> Vec<TransitionId> {
        self.path_to_root(id)
            .into_iter()
            .filter_map(|node| self.nodes[node].transition)
            .collect()
    }

    pub fn statistics(&self) -> TreeStatistics {
        let count = |tag: NodeTag| self.nodes.iter().filter(|node| node.tag == tag).count();
        let unique: HashSet<&Marking> = self.nodes.iter().map(|node| &node.marking).collect();
        TreeStatistics {
            total_nodes: self.len(),
            new_nodes: count(NodeTag::New),
            old_nodes: count(NodeTag::Old),
            dead_end_nodes: count(NodeTag::DeadEnd),
            has_omega: self.nodes.iter().any(|node| node.marking.has_omega()),
            max_depth: self.nodes.iter().map(|node| node.depth).max().unwrap_or(0),
            unique_markings: unique.len(),
        }
    }

    pub fn tree_structure(&self) -> TreeView {
        TreeView {
            nodes: self
                .nodes()
                .map(|(id, node)| ViewNode {
                    node: id,
                    marking: node.marking.clone(),
                    tag: node.tag,
                    children: node
                        .children
                        .iter()
                        .map(|(name, child)| (name.clone(), child.index()))
                        .collect(),
                })
                .collect(),
        }
    }
}

pub struct Ancestors<'tree> {
    tree: &'tree CoverabilityTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.nodes[current].parent;
        Some(current)
    }
}

pub struct CoverabilityBuilder<'net> {
    net: &'net Net,
    node_limit: Option<usize>,
}

impl<'net> CoverabilityBuilder<'net> {
    pub fn new(net: &'net Net) -> Self {
        Self {
            net,
            node_limit: None,
        }
    }

    /// 在展开每个节点前检查树的规模，达到上限即停止。
    pub fn with_node_limit(mut self, limit: Option<usize>) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn build(self) -> CoverabilityTree {
        let mut tree = CoverabilityTree::new(self.net.initial_marking());
        let mut queue = VecDeque::from([tree.root()]);

        while let Some(id) = queue.pop_front() {
            if let Step::LimitReached(limit) = self.expand(&mut tree, id, &mut queue) {
                warn!(
                    "覆盖树达到节点上限 {}，剩余 {} 个 new 节点未处理",
                    limit,
                    queue.len() + 1
                );
                tree.termination = Termination::NodeLimit(limit);
                break;
            }
        }

        let stats = tree.statistics();
        info!(
            "{}: 覆盖树共 {} 个节点 (old {}, dead-end {}), 深度 {}, ω: {}",
            self.net.name(),
            stats.total_nodes,
            stats.old_nodes,
            stats.dead_end_nodes,
            stats.max_depth,
            stats.has_omega
        );
        tree
    }

    fn expand(
        &self,
        tree: &mut CoverabilityTree,
        id: NodeId,
        queue: &mut VecDeque<NodeId>,
    ) -> Step {
        let marking = tree.nodes[id].marking.clone();

        let duplicate = tree
            .ancestors(id)
            .find(|ancestor| tree.nodes[*ancestor].marking == marking);
        if let Some(duplicate) = duplicate {
            debug!("{id}: {marking} repeats ancestor {duplicate}, tagged old");
            tree.nodes[id].tag = NodeTag::Old;
            return Step::Continue;
        }

        let enabled = self.net.enabled_transitions(&marking);
        if enabled.is_empty() {
            debug!("{id}: {marking} enables nothing, tagged dead-end");
            tree.nodes[id].tag = NodeTag::DeadEnd;
            return Step::Continue;
        }

        // a node gets all of its children or none, so it stays `new` here
        if let Some(limit) = self.node_limit {
            if tree.len() + enabled.len() > limit {
                return Step::LimitReached(limit);
            }
        }

        tree.nodes[id].tag = NodeTag::Expanded;
        let path = tree.path_to_root(id);
        let depth = tree.nodes[id].depth + 1;

        for transition_id in enabled {
            let transition = &self.net.transitions()[transition_id];
            let mut next = transition.try_fire(&marking).unwrap_or_else(|place| {
                warn!(
                    "{id}: firing {} overflows the count of {place}, recorded as ω",
                    transition.name
                );
                transition.fire(&marking)
            });
            let acceleration = accelerate(tree, &path, &mut next);

            let child = tree.nodes.push(TreeNode {
                marking: next,
                tag: NodeTag::New,
                parent: Some(id),
                transition: Some(transition_id),
                children: IndexMap::new(),
                depth,
                acceleration,
            });
            debug!(
                "{id} --{}--> {child}: {}",
                transition.name, tree.nodes[child].marking
            );
            tree.nodes[id]
                .children
                .insert(transition.name.clone(), child);
            queue.push_back(child);
        }
        Step::Continue
    }
}

enum Step {
    Continue,
    LimitReached(usize),
}

/// 只有路径上第一个被严格覆盖的祖先决定哪些分量变为 ω。
fn accelerate(
    tree: &CoverabilityTree,
    path: &[NodeId],
    next: &mut Marking,
) -> Option<Acceleration> {
    for &ancestor in path {
        let covered = &tree.nodes[ancestor].marking;
        if next.covers(covered) && next != covered {
            let promoted = next.accelerate(covered);
            if !promoted.is_empty() {
                debug!("{next} strictly covers {ancestor}, promoted {promoted:?} to ω");
            }
            return Some(Acceleration { ancestor, promoted });
        }
    }
    None
}

/// Builds the complete coverability tree of `net` without a node limit.
pub fn run(net: &Net) -> CoverabilityTree {
    CoverabilityBuilder::new(net).build()
}
