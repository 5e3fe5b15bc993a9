//! P/T 网静态结构元素：库所、迁移与标识。
use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use log::trace;

use crate::net::ids::PlaceId;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::token::Tokens;

pub type Weight = u64;

/// 弧权映射：库所 -> 权重，按声明顺序保存。
pub type ArcMap = IndexMap<PlaceId, Weight>;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub name: String,
}

impl Place {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Transition {
    pub name: String,
    input: ArcMap,
    output: ArcMap,
}

impl Transition {
    /// 零权重的弧既不约束可激发性也不改变标识，构造时直接丢弃。
    pub fn new(name: impl Into<String>, input: ArcMap, output: ArcMap) -> Self {
        Self {
            name: name.into(),
            input: input.into_iter().filter(|(_, w)| *w > 0).collect(),
            output: output.into_iter().filter(|(_, w)| *w > 0).collect(),
        }
    }

    pub fn input_arcs(&self) -> &ArcMap {
        &self.input
    }

    pub fn output_arcs(&self) -> &ArcMap {
        &self.output
    }

    /// Input weights laid out along the first `places` place indices.
    pub fn input_vector(&self, places: usize) -> Vec<Weight> {
        arc_vector(&self.input, places)
    }

    pub fn output_vector(&self, places: usize) -> Vec<Weight> {
        arc_vector(&self.output, places)
    }

    /// `∀p: M[p] ≥ Pre[p, t]`。输入弧引用了标识中不存在的库所时视为不可激发。
    pub fn is_enabled(&self, marking: &Marking) -> bool {
        for (&place, &weight) in &self.input {
            match marking.get(place) {
                None => {
                    trace!(
                        "transition {} references {:?}, absent from a marking of {} places",
                        self.name,
                        place,
                        marking.len()
                    );
                    return false;
                }
                Some(tokens) if !tokens.satisfies(weight) => {
                    trace!(
                        "transition {} blocked on {:?}: {} < {}",
                        self.name, place, tokens, weight
                    );
                    return false;
                }
                Some(_) => {}
            }
        }
        true
    }

    /// Like [`Transition::fire`], but reports the first output place whose
    /// finite count would exceed `u64::MAX` instead of turning it into ω.
    pub fn try_fire(&self, marking: &Marking) -> Result<Marking, PlaceId> {
        debug_assert!(
            self.is_enabled(marking),
            "transition {} fired on a marking where it is not enabled",
            self.name
        );
        let mut next = marking.clone();
        for (&place, &weight) in &self.input {
            *next.tokens_mut(place) -= weight;
        }
        for (&place, &weight) in &self.output {
            let tokens = next.tokens_mut(place);
            *tokens = tokens.checked_add(weight).ok_or(place)?;
        }
        Ok(next)
    }

    /// Returns `M' = M - Pre[:, t] + Post[:, t]`; `marking` itself is untouched.
    /// A count pushed past `u64::MAX` becomes ω.
    ///
    /// Callers must check [`Transition::is_enabled`] first.
    pub fn fire(&self, marking: &Marking) -> Marking {
        debug_assert!(
            self.is_enabled(marking),
            "transition {} fired on a marking where it is not enabled",
            self.name
        );
        let mut next = marking.clone();
        for (&place, &weight) in &self.input {
            *next.tokens_mut(place) -= weight;
        }
        for (&place, &weight) in &self.output {
            *next.tokens_mut(place) += weight;
        }
        next
    }
}

fn arc_vector(arcs: &ArcMap, places: usize) -> Vec<Weight> {
    let mut vector = vec![0; places];
    for (place, weight) in arcs {
        if let Some(slot) = vector.get_mut(place.index()) {
            *slot = *weight;
        }
    }
    vector
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

/// 标识：按库所声明顺序排列的 token 向量。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Marking(pub IndexVec<PlaceId, Tokens>);

impl Marking {
    pub fn new(initial: IndexVec<PlaceId, Tokens>) -> Self {
        Self(initial)
    }

    pub fn zeros(places: usize) -> Self {
        Self(IndexVec::from_elem(Tokens::ZERO, places))
    }

    pub fn from_counts(counts: impl IntoIterator<Item = u64>) -> Self {
        Self(counts.into_iter().map(Tokens::Finite).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Tokens)> + '_ {
        self.0.iter_enumerated().map(|(place, tokens)| (place, *tokens))
    }

    pub fn tokens(&self, place: PlaceId) -> Tokens {
        self.0[place]
    }

    pub fn get(&self, place: PlaceId) -> Option<Tokens> {
        self.0.get(place).copied()
    }

    pub fn tokens_mut(&mut self, place: PlaceId) -> &mut Tokens {
        &mut self.0[place]
    }

    pub fn has_omega(&self) -> bool {
        self.0.iter().any(|tokens| tokens.is_omega())
    }

    pub fn omega_places(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.iter()
            .filter(|(_, tokens)| tokens.is_omega())
            .map(|(place, _)| place)
    }

    /// 乘积序下 `self ≥ other`，ω 支配一切有限值。
    pub fn covers(&self, other: &Marking) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(left, right)| left >= right)
    }

    /// Promotes every component strictly above `ancestor` to ω and returns
    /// the places that changed.
    pub fn accelerate(&mut self, ancestor: &Marking) -> Vec<PlaceId> {
        let mut promoted = Vec::new();
        for (place, tokens) in self.0.iter_mut().enumerate() {
            let place = PlaceId::from_usize(place);
            if !tokens.is_omega() && *tokens > ancestor.tokens(place) {
                *tokens = Tokens::Omega;
                promoted.push(place);
            }
        }
        promoted
    }

}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, &tokens);
        }
        map.finish()
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, tokens) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tokens}")?;
        }
        f.write_str("]")
    }
}

impl PartialOrd for Marking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.len() != other.len() {
            return None;
        }
        let mut less = false;
        let mut greater = false;
        for (left, right) in self.0.iter().zip(other.0.iter()) {
            match left.cmp(right) {
                Ordering::Less => less = true,
                Ordering::Greater => greater = true,
                Ordering::Equal => {}
            }
        }
        match (less, greater) {
            (true, true) => None,
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => Some(Ordering::Equal),
        }
    }
}
