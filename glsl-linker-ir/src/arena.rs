// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! Index-based arena

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;
use std::ops::Index;
use std::ops::IndexMut;

type IdPhantomData<T> = PhantomData<fn(T) -> T>;

/// typed index of a value in an `Arena<T>`
pub struct Id<T> {
    index: u32,
    _phantom: IdPhantomData<T>,
}

impl<T> Id<T> {
    /// create an `Id` from a raw index
    pub const fn from_index(index: u32) -> Self {
        Self {
            index,
            _phantom: PhantomData,
        }
    }
    /// the raw index
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, rhs: &Self) -> bool {
        self.index == rhs.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, rhs: &Self) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, rhs: &Self) -> Ordering {
        self.index.cmp(&rhs.index)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.index.hash(hasher)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// owning storage for values addressed by `Id<T>`; values are only ever appended and
/// are released together when the arena is dropped
#[derive(Clone)]
pub struct Arena<T> {
    values: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T> Arena<T> {
    /// create an empty arena
    pub fn new() -> Self {
        Self::default()
    }
    /// move `value` into the arena, returning its id
    pub fn alloc(&mut self, value: T) -> Id<T> {
        let index = self.values.len();
        assert!(index < u32::max_value() as usize, "arena is full");
        self.values.push(value);
        Id::from_index(index as u32)
    }
    /// get the value for `id`, if `id` belongs to this arena
    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.values.get(id.index())
    }
    /// get the value for `id` mutably, if `id` belongs to this arena
    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.values.get_mut(id.index())
    }
    /// the number of values in the arena
    pub fn len(&self) -> usize {
        self.values.len()
    }
    /// `true` if there are no values in the arena
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// iterate over all `(id, value)` pairs in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(index, value)| (Id::from_index(index as u32), value))
    }
    /// iterate mutably over all `(id, value)` pairs in allocation order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Id<T>, &mut T)> + '_ {
        self.values
            .iter_mut()
            .enumerate()
            .map(|(index, value)| (Id::from_index(index as u32), value))
    }
    /// iterate over all ids in allocation order
    pub fn ids(&self) -> impl Iterator<Item = Id<T>> {
        (0..self.values.len() as u32).map(Id::from_index)
    }
}

impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        &self.values[id.index()]
    }
}

impl<T> IndexMut<Id<T>> for Arena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.values[id.index()]
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_index() {
        let mut arena = Arena::new();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_ne!(a, b);
        assert_eq!(arena[a], "a");
        assert_eq!(arena[b], "b");
        arena[b] = "c";
        assert_eq!(arena.get(b), Some(&"c"));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(Id::from_index(2)), None);
        let ids: Vec<_> = arena.ids().collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(format!("{:?}", a), "#0");
    }
}
