//! 强类型索引向量：库所、迁移与覆盖树节点都以各自的标识符访问顺序容器。
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait implemented by identifier types that can index into [`IndexVec`].
pub trait Idx: Copy + Eq + PartialEq + Ord + fmt::Debug {
    fn index(self) -> usize;
    fn from_usize(idx: usize) -> Self;
}

/// A vector indexed by strongly typed identifiers.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IndexVec<I, T> {
    data: Vec<T>,
    _marker: PhantomData<I>,
}

impl<I, T> IndexVec<I, T>
where
    I: Idx,
{
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    pub fn from_elem(value: T, len: usize) -> Self
    where
        T: Clone,
    {
        Self {
            data: vec![value; len],
            _marker: PhantomData,
        }
    }

    /// Appends `value` and returns the identifier it was stored under.
    pub fn push(&mut self, value: T) -> I {
        let idx = self.data.len();
        self.data.push(value);
        I::from_usize(idx)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Identifier the next `push` will return.
    pub fn next_index(&self) -> I {
        I::from_usize(self.data.len())
    }

    pub fn indices(&self) -> impl Iterator<Item = I> + use<I, T> {
        (0..self.data.len()).map(I::from_usize)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(idx, value)| (I::from_usize(idx), value))
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    pub fn get(&self, index: I) -> Option<&T> {
        self.data.get(index.index())
    }

    pub fn get_mut(&mut self, index: I) -> Option<&mut T> {
        self.data.get_mut(index.index())
    }
}

impl<I, T> Default for IndexVec<I, T>
where
    I: Idx,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T> fmt::Debug for IndexVec<I, T>
where
    I: Idx,
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

impl<I, T> Index<I> for IndexVec<I, T>
where
    I: Idx,
{
    type Output = T;

    fn index(&self, index: I) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<I, T> IndexMut<I> for IndexVec<I, T>
where
    I: Idx,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.data[index.index()]
    }
}

impl<I, T> FromIterator<T> for IndexVec<I, T>
where
    I: Idx,
{
    fn from_iter<It: IntoIterator<Item = T>>(iter: It) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<I, T> From<Vec<T>> for IndexVec<I, T>
where
    I: Idx,
{
    fn from(data: Vec<T>) -> Self {
        Self {
            data,
            _marker: PhantomData,
        }
    }
}
