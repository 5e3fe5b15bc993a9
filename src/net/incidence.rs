//! 输入 / 输出弧关系的稠密矩阵封装，行按库所、列按迁移.
use std::fmt;

use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};

type SmallRow<T> = SmallVec<[T; 4]>;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Incidence<T> {
    rows: IndexVec<PlaceId, SmallRow<T>>,
    cols: usize,
}

impl<T> Incidence<T>
where
    T: Clone,
{
    pub fn new(places: usize, transitions: usize, default: T) -> Self {
        let mut rows = IndexVec::with_capacity(places);
        for _ in 0..places {
            rows.push(SmallRow::from_elem(default.clone(), transitions));
        }
        Self {
            rows,
            cols: transitions,
        }
    }

    pub fn push_place_with_default(&mut self, default: T) -> PlaceId {
        let row = SmallRow::from_elem(default, self.cols);
        self.rows.push(row)
    }

    pub fn push_transition_with_default(&mut self, default: T) -> TransitionId {
        let next = self.cols;
        for row in self.rows.iter_mut() {
            row.push(default.clone());
        }
        self.cols += 1;
        TransitionId::from_usize(next)
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    pub fn set(&mut self, place: PlaceId, transition: TransitionId, value: T) {
        self.rows[place][transition.index()] = value;
    }

    pub fn get(&self, place: PlaceId, transition: TransitionId) -> &T {
        &self.rows[place][transition.index()]
    }

    pub fn rows(&self) -> &IndexVec<PlaceId, SmallRow<T>> {
        &self.rows
    }

    /// 单个迁移在所有库所上的取值（矩阵的一列）。
    pub fn column(&self, transition: TransitionId) -> Vec<T> {
        self.rows
            .iter()
            .map(|row| row[transition.index()].clone())
            .collect()
    }

    /// Transition-major copy: one row per transition, one column per place.
    pub fn transposed(&self) -> Vec<Vec<T>> {
        (0..self.cols)
            .map(|col| self.column(TransitionId::from_usize(col)))
            .collect()
    }
}

impl<T> fmt::Debug for Incidence<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incidence")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl Incidence<u64> {
    pub fn difference(&self, other: &Self) -> Incidence<i64> {
        assert_eq!(self.places(), other.places());
        assert_eq!(self.transitions(), other.transitions());
        let rows = self
            .rows
            .iter()
            .zip(other.rows.iter())
            .map(|(left, right)| {
                left.iter()
                    .zip(right.iter())
                    .map(|(l, r)| to_signed(*l) - to_signed(*r))
                    .collect::<SmallRow<_>>()
            })
            .collect();
        Incidence {
            rows,
            cols: self.cols,
        }
    }
}

/// Clamps to `i64::MAX`; both operands of a difference are non-negative so
/// the subtraction cannot overflow.
fn to_signed(weight: u64) -> i64 {
    i64::try_from(weight).unwrap_or(i64::MAX)
}
