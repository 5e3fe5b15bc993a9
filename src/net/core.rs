//! 网结构: 构造校验、可发生集、发生语义与连通性诊断.
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry;
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{ArcMap, Marking, Place, Transition, Weight};
use crate::net::token::Tokens;

/// 构造期错误，均在出错的调用点立即报告，且不会留下部分修改。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("place `{0}` already exists")]
    DuplicatePlace(String),
    #[error("transition `{0}` already exists")]
    DuplicateTransition(String),
    #[error("{context} references undeclared place `{place}`")]
    UnknownPlace { place: String, context: String },
    #[error("arcs of transition `{transition}` on place `{place}` add up past u64::MAX")]
    WeightOverflow { transition: String, place: String },
}

#[derive(Debug, Error)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {0:?} is not enabled under the supplied marking")]
    NotEnabled(TransitionId),
    #[error("firing transition {transition:?} overflows the token count of {place:?}")]
    TokenOverflow {
        transition: TransitionId,
        place: PlaceId,
    },
}

/// Petri 网连通性诊断报告
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    /// 孤立库所（无任何连接的弧）
    pub isolated_places: Vec<(PlaceId, String)>,
    /// 孤立变迁（无任何连接的弧）
    pub isolated_transitions: Vec<(TransitionId, String)>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

#[derive(Clone)]
pub struct Net {
    name: String,
    places: IndexVec<PlaceId, Place>,
    place_index: IndexMap<String, PlaceId>,
    transitions: IndexVec<TransitionId, Transition>,
    transition_index: IndexMap<String, TransitionId>,
    pre: Incidence<u64>,
    post: Incidence<u64>,
    initial: Option<Marking>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("name", &self.name)
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("initial", &self.initial)
            .finish()
    }
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PetriNet('{}', places={}, transitions={})",
            self.name,
            self.places_len(),
            self.transitions_len()
        )
    }
}

impl Net {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            places: IndexVec::new(),
            place_index: IndexMap::new(),
            transitions: IndexVec::new(),
            transition_index: IndexMap::new(),
            pre: Incidence::new(0, 0, 0u64),
            post: Incidence::new(0, 0, 0u64),
            initial: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明顺序即所有标识向量的下标约定。
    pub fn add_place(&mut self, name: impl Into<String>) -> Result<PlaceId, NetError> {
        let name = name.into();
        if self.place_index.contains_key(&name) {
            return Err(NetError::DuplicatePlace(name));
        }
        let place_id = self.places.push(Place::new(name.clone()));
        self.place_index.insert(name, place_id);
        self.pre.push_place_with_default(0);
        self.post.push_place_with_default(0);
        if let Some(initial) = self.initial.as_mut() {
            initial.0.push(Tokens::ZERO);
        }
        Ok(place_id)
    }

    /// Adds every place or none of them.
    pub fn add_places<I, S>(&mut self, names: I) -> Result<Vec<PlaceId>, NetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for (idx, name) in names.iter().enumerate() {
            if self.place_index.contains_key(name) || names[..idx].contains(name) {
                return Err(NetError::DuplicatePlace(name.clone()));
            }
        }
        names.into_iter().map(|name| self.add_place(name)).collect()
    }

    /// 先校验弧引用的库所与迁移名，全部通过后才登记迁移。
    pub fn add_transition<I, O, S, R>(
        &mut self,
        name: impl Into<String>,
        input_arcs: I,
        output_arcs: O,
    ) -> Result<TransitionId, NetError>
    where
        I: IntoIterator<Item = (S, Weight)>,
        O: IntoIterator<Item = (R, Weight)>,
        S: AsRef<str>,
        R: AsRef<str>,
    {
        let name = name.into();
        let input = self.resolve_arcs(&name, input_arcs)?;
        let output = self.resolve_arcs(&name, output_arcs)?;
        if self.transition_index.contains_key(&name) {
            return Err(NetError::DuplicateTransition(name));
        }

        let transition = Transition::new(name.clone(), input, output);
        let transition_id = self.transitions.next_index();
        self.pre.push_transition_with_default(0);
        self.post.push_transition_with_default(0);
        for (&place, &weight) in transition.input_arcs() {
            self.pre.set(place, transition_id, weight);
        }
        for (&place, &weight) in transition.output_arcs() {
            self.post.set(place, transition_id, weight);
        }
        self.transitions.push(transition);
        self.transition_index.insert(name, transition_id);
        Ok(transition_id)
    }

    fn resolve_arcs<A, S>(&self, transition: &str, arcs: A) -> Result<ArcMap, NetError>
    where
        A: IntoIterator<Item = (S, Weight)>,
        S: AsRef<str>,
    {
        let mut resolved = ArcMap::new();
        for (place, weight) in arcs {
            let place = place.as_ref();
            let place_id = self.place_id(place).ok_or_else(|| NetError::UnknownPlace {
                place: place.to_string(),
                context: format!("transition `{transition}`"),
            })?;
            match resolved.entry(place_id) {
                Entry::Occupied(mut entry) => {
                    let sum = entry.get().checked_add(weight).ok_or_else(|| {
                        NetError::WeightOverflow {
                            transition: transition.to_string(),
                            place: place.to_string(),
                        }
                    })?;
                    *entry.get_mut() = sum;
                }
                Entry::Vacant(entry) => {
                    entry.insert(weight);
                }
            }
        }
        Ok(resolved)
    }

    /// 未指定的库所默认为 0，替换先前的初始标识。
    pub fn set_initial_marking<I, S>(&mut self, tokens: I) -> Result<(), NetError>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut marking = Marking::zeros(self.places_len());
        for (place, count) in tokens {
            let place = place.as_ref();
            let place_id = self.place_id(place).ok_or_else(|| NetError::UnknownPlace {
                place: place.to_string(),
                context: "initial marking".to_string(),
            })?;
            *marking.tokens_mut(place_id) = Tokens::Finite(count);
        }
        self.initial = Some(marking);
        Ok(())
    }

    pub fn initial_marking(&self) -> Marking {
        self.initial
            .clone()
            .unwrap_or_else(|| Marking::zeros(self.places_len()))
    }

    pub fn places(&self) -> &IndexVec<PlaceId, Place> {
        &self.places
    }

    pub fn transitions(&self) -> &IndexVec<TransitionId, Transition> {
        &self.transitions
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn place_id(&self, name: &str) -> Option<PlaceId> {
        self.place_index.get(name).copied()
    }

    pub fn place_name(&self, place: PlaceId) -> &str {
        &self.places[place].name
    }

    pub fn transition_id(&self, name: &str) -> Option<TransitionId> {
        self.transition_index.get(name).copied()
    }

    pub fn transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn transition_by_name(&self, name: &str) -> Option<&Transition> {
        self.transition_id(name)
            .and_then(|transition| self.transition(transition))
    }

    pub fn pre(&self) -> &Incidence<u64> {
        &self.pre
    }

    pub fn post(&self) -> &Incidence<u64> {
        &self.post
    }

    pub fn c_matrix(&self) -> Incidence<i64> {
        self.post.difference(&self.pre)
    }

    /// `C[t][p] = Post(p, t) - Pre(p, t)`，每个迁移一行、每个库所一列。
    pub fn incidence_matrix(&self) -> Vec<Vec<i64>> {
        self.c_matrix().transposed()
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transitions
            .iter_enumerated()
            .filter(|(_, transition)| transition.is_enabled(marking))
            .map(|(transition_id, _)| transition_id)
            .collect()
    }

    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, FireError> {
        let Some(t) = self.transitions.get(transition) else {
            return Err(FireError::OutOfBounds(transition));
        };
        if !t.is_enabled(marking) {
            return Err(FireError::NotEnabled(transition));
        }
        t.try_fire(marking)
            .map_err(|place| FireError::TokenOverflow { transition, place })
    }

    /// 诊断信息：检测 Petri 网中的孤立节点和连通性问题
    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let mut isolated_places = Vec::new();
        let mut isolated_transitions = Vec::new();
        let mut warnings = Vec::new();
        let initial = self.initial_marking();

        for (place_id, place) in self.places.iter_enumerated() {
            let consumed = self.pre.rows()[place_id].iter().any(|w| *w > 0);
            let produced = self.post.rows()[place_id].iter().any(|w| *w > 0);

            if !consumed && !produced {
                isolated_places.push((place_id, place.name.clone()));
            } else if !produced && initial.tokens(place_id) == Tokens::ZERO {
                warnings.push(format!(
                    "库所 '{}' (id={}) 无输入弧且初始标记为 0，其后继迁移永远无法触发",
                    place.name,
                    place_id.index()
                ));
            }
        }

        for (trans_id, trans) in self.transitions.iter_enumerated() {
            let has_preset = !trans.input_arcs().is_empty();
            let has_postset = !trans.output_arcs().is_empty();

            if !has_preset && !has_postset {
                isolated_transitions.push((trans_id, trans.name.clone()));
            } else if !has_preset {
                warnings.push(format!(
                    "变迁 '{}' (id={}) 无前置库所，始终可触发",
                    trans.name,
                    trans_id.index()
                ));
            }
        }

        DiagnosticReport {
            isolated_places,
            isolated_transitions,
            warnings,
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
        }
    }

    /// 打印诊断报告到日志
    pub fn log_diagnostics(&self) {
        let report = self.diagnose_connectivity();

        if !report.has_issues() {
            log::info!("Petri 网连通性检查通过，无孤立节点");
            return;
        }

        log::warn!(
            "{}: {} 个库所, {} 个变迁",
            self.name,
            report.total_places,
            report.total_transitions
        );
        for (id, name) in &report.isolated_places {
            log::warn!("  孤立库所 [{}] {}", id.index(), name);
        }
        for (id, name) in &report.isolated_transitions {
            log::warn!("  孤立变迁 [{}] {}", id.index(), name);
        }
        for warning in &report.warnings {
            log::warn!("  - {}", warning);
        }
    }

    pub fn to_dot(&self) -> String {
        let initial = self.initial_marking();
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph \"{}\" {{", escape_label(&self.name));
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for (place_id, place) in self.places.iter_enumerated() {
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}\\n{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                place_id.index(),
                escape_label(&place.name),
                initial.tokens(place_id)
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let node = format!("trans_{}", transition_id.index());
            let _ = writeln!(
                &mut dot,
                "    {} [label=\"{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                node,
                escape_label(&transition.name)
            );
            for (place, weight) in transition.input_arcs() {
                write_arc(&mut dot, &format!("place_{}", place.index()), &node, *weight);
            }
            for (place, weight) in transition.output_arcs() {
                write_arc(&mut dot, &node, &format!("place_{}", place.index()), *weight);
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::new("PetriNet")
    }
}

fn write_arc(dot: &mut String, from: &str, to: &str, weight: Weight) {
    if weight == 1 {
        let _ = writeln!(dot, "    {} -> {};", from, to);
    } else {
        let _ = writeln!(dot, "    {} -> {} [label=\"{}\"];", from, to, weight);
    }
}

pub(crate) fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ARCS: [(&str, Weight); 0] = [];

    fn cycle_net() -> Net {
        let mut net = Net::new("cycle");
        net.add_places(["P0", "P1", "P2"]).unwrap();
        net.set_initial_marking([("P0", 1), ("P2", 1)]).unwrap();
        net.add_transition("t1", [("P0", 1)], [("P1", 1)]).unwrap();
        net.add_transition("t2", [("P1", 1)], [("P0", 1), ("P2", 1)])
            .unwrap();
        net
    }

    #[test]
    fn duplicate_place_is_rejected() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        assert_eq!(
            net.add_place("P0"),
            Err(NetError::DuplicatePlace("P0".to_string()))
        );
        assert_eq!(net.places_len(), 1);
    }

    #[test]
    fn add_places_is_all_or_nothing() {
        let mut net = Net::new("n");
        net.add_place("P1").unwrap();
        let err = net.add_places(["P0", "P1", "P2"]).unwrap_err();
        assert_eq!(err, NetError::DuplicatePlace("P1".to_string()));
        assert_eq!(net.places_len(), 1);

        let err = net.add_places(["A", "A"]).unwrap_err();
        assert_eq!(err, NetError::DuplicatePlace("A".to_string()));
        assert_eq!(net.places_len(), 1);
    }

    #[test]
    fn unknown_place_leaves_transitions_untouched() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        let err = net
            .add_transition("t1", [("P0", 1)], [("P9", 1)])
            .unwrap_err();

        assert!(matches!(err, NetError::UnknownPlace { ref place, .. } if place == "P9"));
        assert_eq!(net.transitions_len(), 0);
        assert_eq!(net.pre().transitions(), 0);
        assert!(net.transition_by_name("t1").is_none());
    }

    #[test]
    fn repeated_arcs_accumulate_without_overflow() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        let t = net
            .add_transition("t1", [("P0", 2), ("P0", 3)], NO_ARCS)
            .unwrap();
        assert_eq!(net.transitions()[t].input_vector(1), vec![5]);

        let err = net
            .add_transition("t2", NO_ARCS, [("P0", u64::MAX), ("P0", 1)])
            .unwrap_err();
        assert_eq!(
            err,
            NetError::WeightOverflow {
                transition: "t2".to_string(),
                place: "P0".to_string(),
            }
        );
        assert_eq!(net.transitions_len(), 1);
        assert_eq!(net.post().transitions(), 1);
    }

    #[test]
    fn checked_fire_rejects_token_overflow() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        let t = net.add_transition("fill", NO_ARCS, [("P0", 2)]).unwrap();

        let full = Marking::from_counts([u64::MAX - 1]);
        assert!(matches!(
            net.fire_transition(&full, t),
            Err(FireError::TokenOverflow { place, .. }) if place == PlaceId::new(0)
        ));
    }

    #[test]
    fn duplicate_transition_is_rejected() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        net.add_transition("t1", [("P0", 1)], NO_ARCS).unwrap();
        let err = net.add_transition("t1", NO_ARCS, [("P0", 1)]).unwrap_err();
        assert_eq!(err, NetError::DuplicateTransition("t1".to_string()));
        assert_eq!(net.transitions_len(), 1);
    }

    #[test]
    fn initial_marking_defaults_to_zero() {
        let mut net = Net::new("n");
        net.add_places(["P0", "P1"]).unwrap();
        assert_eq!(net.initial_marking(), Marking::from_counts([0, 0]));

        net.set_initial_marking([("P1", 4)]).unwrap();
        assert_eq!(net.initial_marking(), Marking::from_counts([0, 4]));

        net.set_initial_marking([("P0", 2)]).unwrap();
        assert_eq!(net.initial_marking(), Marking::from_counts([2, 0]));

        net.add_place("P2").unwrap();
        assert_eq!(net.initial_marking(), Marking::from_counts([2, 0, 0]));
    }

    #[test]
    fn initial_marking_rejects_unknown_place() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        net.set_initial_marking([("P0", 1)]).unwrap();
        let err = net.set_initial_marking([("Q", 1)]).unwrap_err();
        assert!(matches!(err, NetError::UnknownPlace { .. }));
        assert_eq!(net.initial_marking(), Marking::from_counts([1]));
    }

    #[test]
    fn incidence_matrix_is_transition_major() {
        let net = cycle_net();
        assert_eq!(
            net.incidence_matrix(),
            vec![vec![-1, 1, 0], vec![1, -1, 1]]
        );
    }

    #[test]
    fn enabled_and_checked_fire() {
        let net = cycle_net();
        let m0 = net.initial_marking();
        let t1 = net.transition_id("t1").unwrap();
        let t2 = net.transition_id("t2").unwrap();

        assert_eq!(net.enabled_transitions(&m0), vec![t1]);
        assert!(matches!(
            net.fire_transition(&m0, t2),
            Err(FireError::NotEnabled(_))
        ));
        assert!(matches!(
            net.fire_transition(&m0, TransitionId::new(9)),
            Err(FireError::OutOfBounds(_))
        ));
        let m1 = net.fire_transition(&m0, t1).unwrap();
        assert_eq!(m1, Marking::from_counts([0, 1, 1]));
    }

    #[test]
    fn repeated_arc_weights_accumulate() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        let t = net
            .add_transition("t", [("P0", 1), ("P0", 2)], NO_ARCS)
            .unwrap();
        assert_eq!(*net.pre().get(PlaceId::new(0), t), 3);
    }

    #[test]
    fn diagnostics_report_isolated_nodes() {
        let mut net = cycle_net();
        net.add_place("lonely").unwrap();
        net.add_transition("noop", NO_ARCS, NO_ARCS).unwrap();

        let report = net.diagnose_connectivity();
        assert!(report.has_issues());
        assert_eq!(report.isolated_places.len(), 1);
        assert_eq!(report.isolated_places[0].1, "lonely");
        assert_eq!(report.isolated_transitions.len(), 1);
        assert!(!cycle_net().diagnose_connectivity().has_issues());
    }

    #[test]
    fn dot_contains_places_and_weighted_arcs() {
        let mut net = Net::new("n");
        net.add_place("P0").unwrap();
        net.add_transition("t", [("P0", 2)], NO_ARCS).unwrap();
        let dot = net.to_dot();
        assert!(dot.contains("place_0 [label=\"P0\\n0\""));
        assert!(dot.contains("place_0 -> trans_0 [label=\"2\"];"));
    }
}
