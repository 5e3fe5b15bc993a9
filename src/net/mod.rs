//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设库所集合 `P` 与迁移集合 `T`。每个迁移 `t` 带有输入 / 输出弧权
//! `Pre[·, t]`、`Post[·, t]`，迁移效应矩阵为 `C = Post - Pre`。
//! 标识 `M ∈ (ℕ ∪ {ω})^{|P|}` 按库所声明顺序排列：
//!
//! * 迁移 `t` **可激发** 当且仅当 `∀p ∈ P: M[p] ≥ Pre[p, t]`（ω 总是满足）；
//! * 迁移 **发射** 得到 `M' = M - Pre[:, t] + Post[:, t]`，ω 分量保持 ω。
//!
//! ## 示例
//!
//! ```rust
//! use pn_cover::net::*;
//!
//! let mut net = Net::new("example");
//! net.add_places(["p0", "p1"]).unwrap();
//! net.set_initial_marking([("p0", 1)]).unwrap();
//! let t0 = net.add_transition("t0", [("p0", 1)], [("p1", 1)]).unwrap();
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(&marking), vec![t0]);
//! let next = net.fire_transition(&marking, t0).unwrap();
//! assert_eq!(next.tokens(PlaceId::new(0)), Tokens::Finite(0));
//! assert_eq!(next.tokens(PlaceId::new(1)), Tokens::Finite(1));
//! ```

pub mod core;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod structure;
pub mod token;

pub use self::core::{DiagnosticReport, FireError, Net, NetError};
pub use ids::{NodeId, PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use io::{IoError, NetDefinition, TransitionDefinition, load_net};
pub use structure::{ArcMap, Marking, Place, Transition, Weight};
pub use token::Tokens;
