//! Typed arenas for definitions that reference each other by id.
//!
//! Struct and union definitions may be mutually recursive (a union
//! member naming a struct whose property is that union), so they are
//! stored flat and referenced with stable integer ids instead of owned
//! subtrees.

use core::{fmt, hash::Hash, marker::PhantomData, ops::Index};

use serde_derive::{Deserialize, Serialize};

/// A stable integer id into an [`Arena`].
pub trait Key: Copy + Clone + fmt::Debug + Eq + PartialEq + Hash + Sized + 'static {
    /// Converts the key to a raw index.
    fn to_usize(self) -> usize;
    /// Converts a raw index to a key.
    fn from_usize(id: usize) -> Self;
}

/// A flat collection of `V` addressed by keys of type `K`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Arena<K, V> {
    items: Vec<V>,
    _marker: PhantomData<fn() -> K>,
}

impl<K, V> Arena<K, V> {
    /// Creates an empty arena.
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Reports whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K, V> Arena<K, V>
where
    K: Key,
{
    /// Inserts an item, returning its key.
    pub fn insert(&mut self, item: V) -> K {
        let id = K::from_usize(self.items.len());
        self.items.push(item);
        id
    }

    /// Returns the item with key `id`, if it exists.
    pub fn get(&self, id: K) -> Option<&V> {
        self.items.get(id.to_usize())
    }

    /// Returns the item with key `id` mutably, if it exists.
    pub fn get_mut(&mut self, id: K) -> Option<&mut V> {
        self.items.get_mut(id.to_usize())
    }

    /// Iterates over `(key, item)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_usize(i), v))
    }
}

impl<K, V> Index<K> for Arena<K, V>
where
    K: Key,
{
    type Output = V;

    fn index(&self, id: K) -> &Self::Output {
        &self.items[id.to_usize()]
    }
}

impl<K, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! new_key_type {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Copy,
            Clone,
            Default,
            Debug,
            Eq,
            PartialEq,
            Ord,
            PartialOrd,
            ::core::hash::Hash,
            ::serde_derive::Serialize,
            ::serde_derive::Deserialize,
        )]
        $vis struct $name(pub u32);

        impl $crate::arena::Key for $name {
            #[inline]
            fn to_usize(self) -> usize {
                self.0 as usize
            }

            #[inline]
            fn from_usize(id: usize) -> Self {
                Self(u32::try_from(id).expect("arena index fits in u32"))
            }
        }
    };
}
pub(crate) use new_key_type;
