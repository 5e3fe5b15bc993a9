pub mod coverability;
pub mod properties;

pub use coverability::{
    Acceleration, CoverabilityBuilder, CoverabilityTree, NodeTag, Termination, TreeNode,
    TreeStatistics, TreeView, ViewNode, run,
};
pub use properties::{BoundnessResult, DeadMarking, TreeProperties};
