//! [`Pool`] implementation.

use std::{
    iter::Enumerate,
    ops::{Index, IndexMut},
};

use crate::NodeId;

/// [`PoolItem`] keeps a slot's occupancy and payload together for better
/// cache locality.
#[derive(Clone)]
pub(crate) enum PoolItem<T> {
    Filled(T),
    Empty,
}

impl<T> From<T> for PoolItem<T> {
    fn from(item: T) -> Self {
        PoolItem::Filled(item)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PoolItem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolItem::Filled(item) => write!(f, "Filled({:?})", item),
            PoolItem::Empty => write!(f, "Empty"),
        }
    }
}

/// [`Pool`] data structure.
///
/// Node arena of a [`Bvh`](crate::tree::Bvh). Released slots go to the
/// garbage list and are handed out again by the next insertion, so the
/// backing vector only grows when no released slot is left.
#[derive(Clone)]
pub struct Pool<T> {
    pub(crate) vec: Vec<PoolItem<T>>,
    pub(crate) garbage: Vec<usize>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool {
            vec: Default::default(),
            garbage: Default::default(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("vec", &self.vec)
            .field("garbage", &self.garbage)
            .finish()
    }
}

/// Indexing a [`pool`](Pool) with [`NodeId`]
///
/// ```ignore
/// let node = &tree.nodes[NodeId(42)];
/// ```
impl<T> Index<NodeId> for Pool<T> {
    type Output = T;

    fn index(&self, index: NodeId) -> &Self::Output {
        debug_assert!(!self.is_garbage(index), "Indexing garbage node: {index}");
        self.get_unchecked(index)
    }
}

/// Mutable Indexing a [`pool`](Pool) with [`NodeId`]
///
/// ```ignore
/// let mut node = &mut tree.nodes[NodeId(42)];
/// ```
impl<T> IndexMut<NodeId> for Pool<T> {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        debug_assert!(
            !self.is_garbage(index),
            "Mut Indexing garbaged node: {index}"
        );
        self.get_mut_unchecked(index)
    }
}

impl<T> Pool<T> {
    /// Construct a [`Pool`].
    ///
    /// Helps to reduce the amount of the memory reallocations.
    pub fn with_capacity(capacity: usize) -> Self {
        Pool {
            vec: Vec::with_capacity(capacity),
            garbage: Default::default(),
        }
    }

    /// Stores `t` in a free slot and returns its id.
    ///
    /// The most recently released slot is reused first.
    #[inline(always)]
    pub(crate) fn insert(&mut self, t: T) -> NodeId {
        if let Some(idx) = self.garbage.pop() {
            self.vec[idx] = PoolItem::Filled(t);
            idx.into()
        } else {
            self.vec.push(PoolItem::Filled(t));
            (self.vec.len() - 1).into()
        }
    }

    /// Releases the slot of `node`, returning what it held.
    ///
    /// The caller must have unlinked the node from the tree beforehand.
    #[inline(always)]
    pub(crate) fn remove(&mut self, node: NodeId) -> Option<T> {
        let index: usize = node.into();

        let mut item = PoolItem::Empty;
        std::mem::swap(&mut self.vec[index], &mut item);
        match item {
            PoolItem::Filled(item) => {
                self.garbage.push(index);
                Some(item)
            }
            PoolItem::Empty => None,
        }
    }

    /// Drops every item, keeping the allocation.
    pub fn clear(&mut self) {
        self.vec.clear();
        self.garbage.clear();
    }

    /// Returns the number of actual elements.
    ///
    /// Released slots are not counted.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.vec.len() - self.garbage_len()
    }

    /// Is the pool is empty.
    ///
    /// Released slots are not counted.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of released slots waiting for reuse.
    #[inline(always)]
    pub fn garbage_len(&self) -> usize {
        self.garbage.len()
    }

    /// Returns the number of slots, occupied or not.
    #[inline(always)]
    pub fn slots(&self) -> usize {
        self.vec.len()
    }

    #[inline(always)]
    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.vec.get(usize::from(node)).and_then(|item| {
            if let PoolItem::Filled(ref item) = item {
                Some(item)
            } else {
                None
            }
        })
    }

    #[inline(always)]
    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.vec.get_mut(usize::from(node)).and_then(|item| {
            if let PoolItem::Filled(ref mut item) = item {
                Some(item)
            } else {
                None
            }
        })
    }

    #[inline(always)]
    pub fn get_unchecked(&self, node: NodeId) -> &T {
        if let PoolItem::Filled(ref item) = self.vec[usize::from(node)] {
            item
        } else {
            unreachable!("Accessing released node: {node}")
        }
    }

    #[inline(always)]
    pub fn get_mut_unchecked(&mut self, node: NodeId) -> &mut T {
        if let PoolItem::Filled(ref mut item) = self.vec[usize::from(node)] {
            item
        } else {
            unreachable!("Accessing released node: {node}")
        }
    }

    #[inline(always)]
    pub fn is_garbage(&self, node: NodeId) -> bool {
        match self.vec.get(usize::from(node)) {
            Some(PoolItem::Filled(_)) => false,
            Some(PoolItem::Empty) | None => true,
        }
    }

    /// Returns a [`PoolIterator`], which iterates over an actual elements.
    ///
    /// Released slots are skipped.
    pub fn iter(&self) -> PoolIterator<'_, T> {
        PoolIterator::new(self)
    }

    /// Returns a [`PoolElementIterator`], which iterates over an actual
    /// elements and their ids.
    ///
    /// Released slots are skipped.
    pub fn iter_elements(&self) -> PoolElementIterator<'_, T> {
        PoolElementIterator::new(self)
    }
}

/// Iterator for a [`Pool`].
///
/// Yields only an actual elements.
/// Released slots are skipped.
#[derive(Clone)]
pub struct PoolIterator<'pool, T> {
    inner: std::slice::Iter<'pool, PoolItem<T>>,
    garbage_len: usize,
}

impl<'pool, T> PoolIterator<'pool, T> {
    fn new(pool: &'pool Pool<T>) -> Self {
        PoolIterator {
            inner: pool.vec.iter(),
            garbage_len: pool.garbage_len(),
        }
    }
}

impl<'pool, T> Iterator for PoolIterator<'pool, T> {
    type Item = &'pool T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                PoolItem::Filled(item) => return Some(item),
                PoolItem::Empty => continue,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let hint = self.inner.size_hint();
        (
            hint.0.saturating_sub(self.garbage_len),
            hint.1,
        )
    }
}

impl<'pool, T> std::iter::FusedIterator for PoolIterator<'pool, T> where
    std::slice::Iter<'pool, PoolItem<T>>: std::iter::FusedIterator
{
}

/// Iterator for a [`Pool`] that includes node ids.
///
/// Yields only an actual elements.
/// Released slots are skipped.
#[derive(Clone)]
pub struct PoolElementIterator<'pool, T> {
    inner: Enumerate<std::slice::Iter<'pool, PoolItem<T>>>,
    garbage_len: usize,
}

impl<'pool, T> PoolElementIterator<'pool, T> {
    fn new(pool: &'pool Pool<T>) -> Self {
        PoolElementIterator {
            inner: pool.vec.iter().enumerate(),
            garbage_len: pool.garbage_len(),
        }
    }
}

impl<'pool, T> Iterator for PoolElementIterator<'pool, T> {
    type Item = (NodeId, &'pool T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, item) = self.inner.next()?;
            match item {
                PoolItem::Filled(item) => return Some((index.into(), item)),
                PoolItem::Empty => continue,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let hint = self.inner.size_hint();
        (
            hint.0.saturating_sub(self.garbage_len),
            hint.1,
        )
    }
}

impl<'pool, T> std::iter::FusedIterator for PoolElementIterator<'pool, T> where
    std::slice::Iter<'pool, PoolItem<T>>: std::iter::FusedIterator
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut pool = Pool::<u8>::with_capacity(16);
        for i in 0..16u8 {
            assert_eq!(pool.insert(i), NodeId(i as u32));
            assert_eq!(pool.len(), (i + 1) as usize);
            assert_eq!(pool.garbage_len(), 0_usize);
        }

        for i in 0..8u32 {
            assert_eq!(pool.remove(NodeId(i)), Some(i as u8));
            assert_eq!(pool.len(), (15 - i) as usize);
            assert_eq!(pool.garbage_len(), (i + 1) as usize);
            assert!(pool.is_garbage(NodeId(i)));
            assert_eq!(pool.get(NodeId(i)), None);
        }

        // Double release is a no-op
        assert_eq!(pool.remove(NodeId(0)), None);
        assert_eq!(pool.garbage_len(), 8);
        assert_eq!(pool.slots(), 16);
    }

    #[test]
    fn test_reuse_released_slots() {
        let mut pool = Pool::<u8>::default();
        for i in 0..4u8 {
            pool.insert(i);
        }

        pool.remove(NodeId(1));
        pool.remove(NodeId(3));

        // Last released, first reused
        assert_eq!(pool.insert(30), NodeId(3));
        assert_eq!(pool.insert(10), NodeId(1));
        assert_eq!(pool.insert(4), NodeId(4));

        assert_eq!(pool.slots(), 5);
        assert_eq!(pool.garbage_len(), 0);
        assert_eq!(pool[NodeId(1)], 10);
        assert_eq!(pool[NodeId(3)], 30);
    }

    #[test]
    fn test_iterators() {
        let mut pool = Pool::<u8>::default();
        for i in 0..6u8 {
            pool.insert(i);
        }
        pool.remove(NodeId(2));
        pool.remove(NodeId(4));

        assert_eq!(pool.iter().copied().collect::<Vec<_>>(), vec![0, 1, 3, 5]);
        assert_eq!(
            pool.iter_elements()
                .map(|(id, item)| (id, *item))
                .collect::<Vec<_>>(),
            vec![(NodeId(0), 0), (NodeId(1), 1), (NodeId(3), 3), (NodeId(5), 5)]
        );

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.iter().count(), 0);
    }

    #[test]
    fn test_get_mut() {
        let mut pool = Pool::<u8>::default();
        let id = pool.insert(1);
        *pool.get_mut(id).unwrap() = 2;
        assert_eq!(pool[id], 2);
        pool[id] = 3;
        assert_eq!(pool.get(id), Some(&3));
        assert_eq!(pool.get(NodeId(10)), None);
    }
}
