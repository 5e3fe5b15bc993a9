//! Karp-Miller 覆盖树分析：Petri 网模型、覆盖树构造与结果呈现。
#![warn(non_snake_case)]

pub mod analysis;
pub mod config;
pub mod net;
pub mod options;
pub mod report;
