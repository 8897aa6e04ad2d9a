// Copyright (c) 2013, 2014, 2015, 2016 Michael Woerister
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! The capabilities a trie needs from its caller.
//!
//! A trie never inspects keys or values itself. Hashing, equality and destruction are all routed
//! through a `TrieHandler`, and the same handler also receives notifications whenever the trie
//! grows a new level.

use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};

use rustc_hash::FxHasher;

//=-------------------------------------------------------------------------------------------------
// trait TrieHandler
//=-------------------------------------------------------------------------------------------------
/// Caller-supplied hashing, equality and destruction for the keys and values of a trie.
///
/// `hash` must be deterministic for every key ever inserted into a given trie, and `equals` must
/// be consistent with it: equal keys must hash equally. Breaking either contract corrupts the
/// trie without being detected.
pub trait TrieHandler<K, V> {
    fn hash(&self, key: &K) -> u64;

    fn equals(&self, a: &K, b: &K) -> bool;

    /// Called exactly once for every key the trie discards, either on replacement or on teardown.
    fn destroy_key(&self, key: K) {
        drop(key);
    }

    /// Called exactly once for every value the trie discards, either on replacement or on
    /// teardown.
    fn destroy_value(&self, value: V) {
        drop(value);
    }

    /// A leaf or overflow bucket has been pushed down into a new sub-trie, indexed by the hash
    /// bits starting at `bits_consumed`.
    fn sub_trie_created(&self, _bits_consumed: u32) {}

    /// Two distinct keys with the full hash value `hash` now share an overflow bucket.
    fn overflow_created(&self, _hash: u64) {}
}

impl<'a, K, V, H: TrieHandler<K, V> + ?Sized> TrieHandler<K, V> for &'a H {
    fn hash(&self, key: &K) -> u64 { (**self).hash(key) }
    fn equals(&self, a: &K, b: &K) -> bool { (**self).equals(a, b) }
    fn destroy_key(&self, key: K) { (**self).destroy_key(key) }
    fn destroy_value(&self, value: V) { (**self).destroy_value(value) }
    fn sub_trie_created(&self, bits_consumed: u32) { (**self).sub_trie_created(bits_consumed) }
    fn overflow_created(&self, hash: u64) { (**self).overflow_created(hash) }
}



//=-------------------------------------------------------------------------------------------------
// struct HashHandler
//=-------------------------------------------------------------------------------------------------
/// A handler for keys implementing `Hash + Eq`. Keys and values are dropped when discarded.
pub struct HashHandler<S = BuildHasherDefault<FxHasher>> {
    build_hasher: S,
}

/// Hashes keys with `rustc_hash::FxHasher`.
pub type FxHandler = HashHandler<BuildHasherDefault<FxHasher>>;

/// Hashes keys with the randomly seeded SipHash of the standard library.
pub type StdHandler = HashHandler<RandomState>;

impl<S: BuildHasher> HashHandler<S> {
    pub fn with_hasher(build_hasher: S) -> HashHandler<S> {
        HashHandler { build_hasher }
    }

    /// The `BuildHasher` used to hash keys.
    pub fn hasher(&self) -> &S {
        &self.build_hasher
    }
}

impl<S: BuildHasher + Default> Default for HashHandler<S> {
    fn default() -> HashHandler<S> {
        HashHandler::with_hasher(S::default())
    }
}

impl<S: BuildHasher + Clone> Clone for HashHandler<S> {
    fn clone(&self) -> HashHandler<S> {
        HashHandler::with_hasher(self.build_hasher.clone())
    }
}

impl<K, V, S> TrieHandler<K, V> for HashHandler<S>
    where K: Hash + Eq,
          S: BuildHasher
{
    fn hash(&self, key: &K) -> u64 {
        let mut h = self.build_hasher.build_hasher();
        key.hash(&mut h);
        h.finish()
    }

    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}



//=-------------------------------------------------------------------------------------------------
// struct Counting
//=-------------------------------------------------------------------------------------------------
/// Wraps another handler and counts how often the trie grew a sub-trie or an overflow bucket.
///
/// The counters live in the wrapper, so every trie (or every phase of a workload) can be
/// observed separately.
pub struct Counting<H> {
    inner: H,
    sub_tries: Cell<usize>,
    overflows: Cell<usize>,
}

impl<H> Counting<H> {
    pub fn new(inner: H) -> Counting<H> {
        Counting {
            inner,
            sub_tries: Cell::new(0),
            overflows: Cell::new(0),
        }
    }

    /// The number of sub-tries created so far.
    pub fn sub_tries(&self) -> usize {
        self.sub_tries.get()
    }

    /// The number of overflow buckets created so far.
    pub fn overflows(&self) -> usize {
        self.overflows.get()
    }

    pub fn reset(&self) {
        self.sub_tries.set(0);
        self.overflows.set(0);
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Unwraps the handler, dropping the counters.
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: Default> Default for Counting<H> {
    fn default() -> Counting<H> {
        Counting::new(H::default())
    }
}

impl<K, V, H: TrieHandler<K, V>> TrieHandler<K, V> for Counting<H> {
    fn hash(&self, key: &K) -> u64 {
        self.inner.hash(key)
    }

    fn equals(&self, a: &K, b: &K) -> bool {
        self.inner.equals(a, b)
    }

    fn destroy_key(&self, key: K) {
        self.inner.destroy_key(key)
    }

    fn destroy_value(&self, value: V) {
        self.inner.destroy_value(value)
    }

    fn sub_trie_created(&self, bits_consumed: u32) {
        self.sub_tries.set(self.sub_tries.get() + 1);
        self.inner.sub_trie_created(bits_consumed)
    }

    fn overflow_created(&self, hash: u64) {
        self.overflows.set(self.overflows.get() + 1);
        self.inner.overflow_created(hash)
    }
}
