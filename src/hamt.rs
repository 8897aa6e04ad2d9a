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

//! A mutable Hash Array Mapped Trie based on the
//! [Ideal Hash Trees](http://lampwww.epfl.ch/papers/idealhashtrees.pdf) paper by Phil Bagwell.
//! The root is a fixed table of 32 slots indexed by the lowest five bits of a key's hash. A slot
//! that sees its first collision is pushed down into a sub-trie which is addressed by the next
//! five bits of the same hash value, and so on. Sub-tries are compressed with an occupancy bitmap
//! but always have room for all 32 children, so they never have to be reallocated.
//! Keys whose full hash values are identical end up in a *collision bucket*, an idea taken from
//! Clojure's implementation.

use std::cmp;
use std::mem;

use log::{debug, trace};

use crate::bits::{window, ARITY, BITS_PER_LEVEL, HASH_BITS, MAX_DEPTH};
use crate::error::{Error, Result};
use crate::handler::{FxHandler, TrieHandler};
use crate::slot::{Bucket, Slot, SubTrie};

//=-------------------------------------------------------------------------------------------------
// Configuration
//=-------------------------------------------------------------------------------------------------
/// What `insert` does when the key is already present.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum OnDuplicate {
    /// Hand the stored key and value to the handler and store the new pair instead.
    #[default]
    Replace,
    /// Hand the incoming key and value to the handler and leave the stored pair alone.
    KeepExisting,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Config {
    pub on_duplicate: OnDuplicate,
}

impl Config {
    pub fn on_duplicate(mut self, on_duplicate: OnDuplicate) -> Config {
        self.on_duplicate = on_duplicate;
        self
    }
}

/// The outcome of a successful `insert`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// The key was not present before.
    Inserted,
    /// The key was present and its pair has been replaced.
    Replaced,
    /// The key was present and the incoming pair has been discarded.
    Kept,
}

impl Insertion {
    pub fn is_new(self) -> bool {
        self == Insertion::Inserted
    }
}

/// Structural statistics of a trie, see `Hamt::stats()`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TrieStats {
    /// The number of stored key-value pairs.
    pub entries: usize,
    /// The number of allocated sub-tries.
    pub sub_tries: usize,
    /// The number of buckets holding keys with identical hash values.
    pub overflow_buckets: usize,
    /// The number of sub-trie levels on the longest path below the root.
    pub max_depth: usize,
}



//=-------------------------------------------------------------------------------------------------
// Hamt
//=-------------------------------------------------------------------------------------------------
/// The trie itself. Hashing, equality and destruction are supplied per call through a
/// `TrieHandler`; the same handler (or one behaving identically) must be used for every call on a
/// given trie.
///
/// Dropping a `Hamt` frees all of its memory and drops keys and values normally. Use `destroy()`
/// to route them through a handler instead.
pub struct Hamt<K, V> {
    // Always exactly ARITY slots.
    root: Box<[Slot<K, V>]>,
    element_count: usize,
    config: Config,
}

impl<K, V> Hamt<K, V> {
    /// Creates a new, empty trie.
    pub fn new() -> Hamt<K, V> {
        Hamt::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Hamt<K, V> {
        Hamt {
            root: (0..ARITY).map(|_| Slot::Empty).collect(),
            element_count: 0,
            config,
        }
    }

    /// Creates a new, empty trie, reporting allocation failure instead of aborting.
    pub fn try_new() -> Result<Hamt<K, V>> {
        Hamt::try_with_config(Config::default())
    }

    pub fn try_with_config(config: Config) -> Result<Hamt<K, V>> {
        let mut root = Vec::new();
        root.try_reserve_exact(ARITY).map_err(|_| Error::OutOfMemory {
            bytes: ARITY * mem::size_of::<Slot<K, V>>(),
        })?;
        root.extend((0..ARITY).map(|_| Slot::Empty));

        Ok(Hamt {
            root: root.into_boxed_slice(),
            element_count: 0,
            config,
        })
    }

    /// The number of key-value pairs in the trie.
    pub fn len(&self) -> usize {
        self.element_count
    }

    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Inserts a key-value pair.
    ///
    /// If the key is not present yet, the pair is stored and `Insertion::Inserted` is returned.
    /// Otherwise the configured `OnDuplicate` policy decides whether the stored or the incoming
    /// pair is handed to `handler.destroy_key()`/`handler.destroy_value()`.
    ///
    /// On allocation failure the error is returned and the incoming pair is dropped; every
    /// previously inserted pair is still retrievable.
    pub fn insert<H>(&mut self, key: K, value: V, handler: &H) -> Result<Insertion>
        where H: TrieHandler<K, V>
    {
        let hash = handler.hash(&key);
        let on_duplicate = self.config.on_duplicate;
        let slot = &mut self.root[window(hash, 0)];

        let insertion = if slot.is_empty() {
            // Special case for the root table: no collision, just fill the slot.
            *slot = Slot::Leaf(key, value);
            Insertion::Inserted
        } else {
            insert_below(slot, BITS_PER_LEVEL, hash, key, value, handler, on_duplicate)?
        };

        if insertion.is_new() {
            self.element_count += 1;
        }

        Ok(insertion)
    }

    /// Looks up the value associated with `key`.
    pub fn search<H>(&self, key: &K, handler: &H) -> Option<&V>
        where H: TrieHandler<K, V>
    {
        let hash = handler.hash(key);
        let mut bits_consumed = 0;
        let mut current_slot = &self.root[window(hash, 0)];

        loop {
            debug_assert!(bits_consumed < HASH_BITS);

            match current_slot {
                Slot::Empty => return None,
                Slot::Leaf(existing_key, value) => return if handler.hash(existing_key) == hash
                                                            && handler.equals(existing_key, key) {
                    Some(value)
                } else {
                    None
                },
                Slot::Overflow(bucket) => return if bucket.hash() == hash {
                    bucket.find(key, handler)
                } else {
                    None
                },
                Slot::SubTrie(sub_trie) => {
                    bits_consumed += BITS_PER_LEVEL;
                    // A clear bit means there is nothing further down.
                    current_slot = sub_trie.get(window(hash, bits_consumed))?;
                }
            }
        }
    }

    /// Same as `search()` but allows modifying the value in place.
    pub fn search_mut<H>(&mut self, key: &K, handler: &H) -> Option<&mut V>
        where H: TrieHandler<K, V>
    {
        let hash = handler.hash(key);
        find_mut(&mut self.root[window(hash, 0)], BITS_PER_LEVEL, hash, key, handler)
    }

    pub fn contains_key<H>(&self, key: &K, handler: &H) -> bool
        where H: TrieHandler<K, V>
    {
        self.search(key, handler).is_some()
    }

    /// Tears the trie down, handing every key and every value to the handler exactly once.
    /// Sub-tries are freed after their children, the root last.
    pub fn destroy<H>(mut self, handler: &H)
        where H: TrieHandler<K, V>
    {
        let destroyed = self.teardown(handler);
        debug!("destroyed trie with {} entries", destroyed);
    }

    pub(crate) fn teardown<H>(&mut self, handler: &H) -> usize
        where H: TrieHandler<K, V>
    {
        let mut destroyed = 0;

        for slot in self.root.iter_mut() {
            destroyed += mem::replace(slot, Slot::Empty).teardown(handler);
        }

        debug_assert_eq!(destroyed, self.element_count);
        self.element_count = 0;
        destroyed
    }

    /// Walks the whole trie and reports its shape.
    pub fn stats(&self) -> TrieStats {
        let mut stats = TrieStats::default();

        for slot in self.root.iter() {
            collect_stats(slot, 0, &mut stats);
        }

        stats
    }

    #[cfg(test)]
    pub(crate) fn root_slots(&self) -> &[Slot<K, V>] {
        &self.root
    }
}

impl<K, V> Default for Hamt<K, V> {
    fn default() -> Hamt<K, V> {
        Hamt::new()
    }
}

// The per-level decision taken at an occupied slot that is not a sub-trie.
enum Action {
    Fill,
    // Same full hash, different key: start a collision bucket.
    Collide,
    // Different hash: push the occupant with the given hash down into a new sub-trie.
    Promote(u64),
}

// Inserts the pair at `slot`, which has been reached by consuming `bits_consumed` bits of `hash`.
fn insert_below<K, V, H>(slot: &mut Slot<K, V>,
                         bits_consumed: u32,
                         hash: u64,
                         key: K,
                         value: V,
                         handler: &H,
                         on_duplicate: OnDuplicate)
                      -> Result<Insertion>
    where H: TrieHandler<K, V>
{
    // Below the last sub-trie there are no bits left, only leaves and buckets.
    debug_assert!(bits_consumed <= HASH_BITS + BITS_PER_LEVEL);

    let action = match slot {
        Slot::SubTrie(sub_trie) => {
            return insert_into_sub_trie(sub_trie, bits_consumed, hash, key, value, handler,
                                        on_duplicate);
        }
        Slot::Empty => Action::Fill,
        Slot::Leaf(existing_key, existing_value) => {
            // `equals` is only consulted for matching hash values.
            let existing_hash = handler.hash(existing_key);
            if existing_hash != hash {
                Action::Promote(existing_hash)
            } else if !handler.equals(existing_key, &key) {
                Action::Collide
            } else {
                return Ok(match on_duplicate {
                    OnDuplicate::Replace => {
                        let old_key = mem::replace(existing_key, key);
                        let old_value = mem::replace(existing_value, value);
                        handler.destroy_key(old_key);
                        handler.destroy_value(old_value);
                        Insertion::Replaced
                    }
                    OnDuplicate::KeepExisting => {
                        handler.destroy_key(key);
                        handler.destroy_value(value);
                        Insertion::Kept
                    }
                });
            }
        }
        Slot::Overflow(bucket) => {
            if bucket.hash() == hash {
                return insert_into_bucket(bucket, key, value, handler, on_duplicate);
            }
            Action::Promote(bucket.hash())
        }
    };

    match action {
        Action::Fill => {
            *slot = Slot::Leaf(key, value);
            Ok(Insertion::Inserted)
        }
        Action::Collide => {
            let mut bucket = Bucket::alloc(hash)?;
            if let Slot::Leaf(existing_key, existing_value) = mem::replace(slot, Slot::Empty) {
                bucket.push_reserved(existing_key, existing_value);
            }
            bucket.push_reserved(key, value);
            *slot = Slot::Overflow(bucket);

            trace!("overflow bucket created for hash {:#018x}", hash);
            handler.overflow_created(hash);
            Ok(Insertion::Inserted)
        }
        Action::Promote(existing_hash) => {
            debug_assert!(bits_consumed <= MAX_DEPTH as u32 * BITS_PER_LEVEL);
            let mut sub_trie = SubTrie::alloc()?;
            let occupant = mem::replace(slot, Slot::Empty);
            // The occupant is the sole entry, so it lands at dense offset 0.
            sub_trie.insert(window(existing_hash, bits_consumed), occupant);

            trace!("sub-trie created at bit {} for hash {:#018x}", bits_consumed, existing_hash);
            handler.sub_trie_created(bits_consumed);

            // The new sub-trie still has to be examined for the incoming key at this level.
            let insertion = insert_into_sub_trie(&mut sub_trie, bits_consumed, hash, key, value,
                                                 handler, on_duplicate);
            *slot = Slot::SubTrie(sub_trie);
            insertion
        }
    }
}

fn insert_into_sub_trie<K, V, H>(sub_trie: &mut SubTrie<K, V>,
                                 bits_consumed: u32,
                                 hash: u64,
                                 key: K,
                                 value: V,
                                 handler: &H,
                                 on_duplicate: OnDuplicate)
                              -> Result<Insertion>
    where H: TrieHandler<K, V>
{
    let sub_index = window(hash, bits_consumed);

    match sub_trie.get_mut(sub_index) {
        // The child index is taken: another collision, one level further down.
        Some(child) => insert_below(child, bits_consumed + BITS_PER_LEVEL, hash, key, value,
                                    handler, on_duplicate),
        None => {
            sub_trie.insert(sub_index, Slot::Leaf(key, value));
            Ok(Insertion::Inserted)
        }
    }
}

fn insert_into_bucket<K, V, H>(bucket: &mut Bucket<K, V>,
                               key: K,
                               value: V,
                               handler: &H,
                               on_duplicate: OnDuplicate)
                            -> Result<Insertion>
    where H: TrieHandler<K, V>
{
    match bucket.position(&key, handler) {
        None => {
            bucket.push(key, value)?;
            Ok(Insertion::Inserted)
        }
        Some(index) => match on_duplicate {
            OnDuplicate::Replace => {
                let (old_key, old_value) = bucket.replace(index, key, value);
                handler.destroy_key(old_key);
                handler.destroy_value(old_value);
                Ok(Insertion::Replaced)
            }
            OnDuplicate::KeepExisting => {
                handler.destroy_key(key);
                handler.destroy_value(value);
                Ok(Insertion::Kept)
            }
        },
    }
}

fn find_mut<'a, K, V, H>(slot: &'a mut Slot<K, V>,
                         bits_consumed: u32,
                         hash: u64,
                         key: &K,
                         handler: &H)
                      -> Option<&'a mut V>
    where H: TrieHandler<K, V>
{
    match slot {
        Slot::Empty => None,
        Slot::Leaf(existing_key, value) => {
            if handler.hash(existing_key) == hash && handler.equals(existing_key, key) {
                Some(value)
            } else {
                None
            }
        }
        Slot::Overflow(bucket) => {
            if bucket.hash() == hash {
                bucket.find_mut(key, handler)
            } else {
                None
            }
        }
        Slot::SubTrie(sub_trie) => {
            let child = sub_trie.get_mut(window(hash, bits_consumed))?;
            find_mut(child, bits_consumed + BITS_PER_LEVEL, hash, key, handler)
        }
    }
}

fn collect_stats<K, V>(slot: &Slot<K, V>, depth: usize, stats: &mut TrieStats) {
    match slot {
        Slot::Empty => {}
        Slot::Leaf(..) => stats.entries += 1,
        Slot::Overflow(bucket) => {
            stats.overflow_buckets += 1;
            stats.entries += bucket.len();
        }
        Slot::SubTrie(sub_trie) => {
            stats.sub_tries += 1;
            stats.max_depth = cmp::max(stats.max_depth, depth + 1);

            for child in sub_trie.entries() {
                collect_stats(child, depth + 1, stats);
            }
        }
    }
}



//=-------------------------------------------------------------------------------------------------
// HamtMap
//=-------------------------------------------------------------------------------------------------
/// A `Hamt` bundled with the handler it is used with. Dropping the map tears the trie down
/// through the handler.
pub struct HamtMap<K, V, H = FxHandler>
    where H: TrieHandler<K, V>
{
    trie: Hamt<K, V>,
    handler: H,
}

impl<K, V, H> HamtMap<K, V, H>
    where H: TrieHandler<K, V>
{
    pub fn with_handler(handler: H) -> HamtMap<K, V, H> {
        HamtMap::with_handler_and_config(handler, Config::default())
    }

    pub fn with_handler_and_config(handler: H, config: Config) -> HamtMap<K, V, H> {
        HamtMap {
            trie: Hamt::with_config(config),
            handler,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<Insertion> {
        self.trie.insert(key, value, &self.handler)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.trie.search(key, &self.handler)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.trie.search_mut(key, &self.handler)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.trie.contains_key(key, &self.handler)
    }

    pub fn stats(&self) -> TrieStats {
        self.trie.stats()
    }
}

impl<K, V, H> HamtMap<K, V, H>
    where H: TrieHandler<K, V> + Default
{
    pub fn new() -> HamtMap<K, V, H> {
        HamtMap::with_handler(H::default())
    }
}

impl<K, V, H> Default for HamtMap<K, V, H>
    where H: TrieHandler<K, V> + Default
{
    fn default() -> HamtMap<K, V, H> {
        HamtMap::new()
    }
}

impl<K, V, H> Drop for HamtMap<K, V, H>
    where H: TrieHandler<K, V>
{
    fn drop(&mut self) {
        let destroyed = self.trie.teardown(&self.handler);
        debug!("dropped map with {} entries", destroyed);
    }
}
