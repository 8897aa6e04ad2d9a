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

//! The tagged slot representation and the storage behind sub-tries.

use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ptr::{self, NonNull};
use std::slice;

use crate::bits::{dense_index, popcount, Bitmap, ARITY};
use crate::error::{Error, Result};
use crate::handler::TrieHandler;

//=-------------------------------------------------------------------------------------------------
// Slot
//=-------------------------------------------------------------------------------------------------
// One position of the root or of a sub-trie. Only root slots can be `Empty`; every initialized
// entry of a sub-trie holds one of the other variants.
pub(crate) enum Slot<K, V> {
    Empty,
    Leaf(K, V),
    SubTrie(SubTrie<K, V>),
    // Distinct keys sharing one full hash value.
    Overflow(Bucket<K, V>),
}

impl<K, V> Slot<K, V> {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    // Hands every key and value below this slot to the handler and frees every sub-trie after its
    // children have been torn down.
    pub(crate) fn teardown<H: TrieHandler<K, V>>(self, handler: &H) -> usize {
        match self {
            Slot::Empty => 0,
            Slot::Leaf(key, value) => {
                handler.destroy_key(key);
                handler.destroy_value(value);
                1
            }
            Slot::SubTrie(sub_trie) => sub_trie.teardown(handler),
            Slot::Overflow(bucket) => {
                let count = bucket.entries.len();
                for (key, value) in bucket.entries {
                    handler.destroy_key(key);
                    handler.destroy_value(value);
                }
                count
            }
        }
    }
}



//=-------------------------------------------------------------------------------------------------
// SubTrie
//=-------------------------------------------------------------------------------------------------
// A bitmap-compressed trie level. The entry array is allocated once with room for all ARITY
// children and is never reallocated; only the first `popcount(bitmap)` entries are initialized,
// ordered by their logical child index.
pub(crate) struct SubTrie<K, V> {
    bitmap: Bitmap,
    entries: NonNull<Slot<K, V>>,
    _marker: PhantomData<Slot<K, V>>,
}

// A sub-trie uniquely owns its entries.
unsafe impl<K: Send, V: Send> Send for SubTrie<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for SubTrie<K, V> {}

impl<K, V> SubTrie<K, V> {
    fn layout() -> Layout {
        Layout::new::<[Slot<K, V>; ARITY]>()
    }

    // Allocates an empty sub-trie. Nothing is moved into it yet, so a failed allocation leaves
    // the caller's data untouched.
    pub(crate) fn alloc() -> Result<SubTrie<K, V>> {
        let layout = SubTrie::<K, V>::layout();
        debug_assert!(layout.size() != 0);

        let raw = unsafe { alloc::alloc(layout) } as *mut Slot<K, V>;

        match NonNull::new(raw) {
            Some(entries) => Ok(SubTrie {
                bitmap: 0,
                entries,
                _marker: PhantomData,
            }),
            None => Err(Error::OutOfMemory { bytes: layout.size() }),
        }
    }

    #[cfg(test)]
    pub(crate) fn bitmap(&self) -> Bitmap {
        self.bitmap
    }

    // The current number of entries. Always <= ARITY.
    pub(crate) fn len(&self) -> usize {
        popcount(u64::from(self.bitmap))
    }

    pub(crate) fn contains(&self, sub_index: usize) -> bool {
        debug_assert!(sub_index < ARITY);
        (self.bitmap & (1 << sub_index)) != 0
    }

    pub(crate) fn entries(&self) -> &[Slot<K, V>] {
        unsafe { slice::from_raw_parts(self.entries.as_ptr(), self.len()) }
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [Slot<K, V>] {
        unsafe { slice::from_raw_parts_mut(self.entries.as_ptr(), self.len()) }
    }

    pub(crate) fn get(&self, sub_index: usize) -> Option<&Slot<K, V>> {
        if !self.contains(sub_index) {
            return None;
        }

        let index = dense_index(self.bitmap, sub_index);
        Some(&self.entries()[index])
    }

    pub(crate) fn get_mut(&mut self, sub_index: usize) -> Option<&mut Slot<K, V>> {
        if !self.contains(sub_index) {
            return None;
        }

        let index = dense_index(self.bitmap, sub_index);
        Some(&mut self.entries_mut()[index])
    }

    // Inserts a new entry for the unoccupied child index `sub_index`, shifting all entries behind
    // its dense offset up by one.
    pub(crate) fn insert(&mut self, sub_index: usize, slot: Slot<K, V>) {
        debug_assert!(!self.contains(sub_index));
        debug_assert!(!slot.is_empty());

        let entry_count = self.len();
        debug_assert!(entry_count < ARITY);
        let index = dense_index(self.bitmap, sub_index);

        unsafe {
            let base = self.entries.as_ptr();

            // make place for new entry:
            if index < entry_count {
                ptr::copy(base.add(index), base.add(index + 1), entry_count - index);
            }

            ptr::write(base.add(index), slot);
        }

        self.bitmap |= 1 << sub_index;
        debug_assert!(self.len() == entry_count + 1);
    }

    // Post-order teardown: children first, then the entry array itself. Returns the number of
    // key-value pairs handed to the handler.
    pub(crate) fn teardown<H: TrieHandler<K, V>>(self, handler: &H) -> usize {
        let this = ManuallyDrop::new(self);
        let base = this.entries.as_ptr();
        let mut destroyed = 0;

        for i in 0..this.len() {
            let slot = unsafe { ptr::read(base.add(i)) };
            destroyed += slot.teardown(handler);
        }

        unsafe {
            alloc::dealloc(base as *mut u8, SubTrie::<K, V>::layout());
        }

        destroyed
    }
}

impl<K, V> Drop for SubTrie<K, V> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(self.entries_mut() as *mut [Slot<K, V>]);
            alloc::dealloc(self.entries.as_ptr() as *mut u8, SubTrie::<K, V>::layout());
        }
    }
}



//=-------------------------------------------------------------------------------------------------
// Bucket
//=-------------------------------------------------------------------------------------------------
// A linear list of key-value pairs whose keys are pairwise distinct but share the full hash value
// `hash`. No bits are left to tell them apart, so they are compared with `equals` one by one.
pub(crate) struct Bucket<K, V> {
    hash: u64,
    entries: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    // Allocates an empty bucket with room for the two pairs that start every collision, so the
    // first two pushes cannot fail.
    pub(crate) fn alloc(hash: u64) -> Result<Bucket<K, V>> {
        let mut entries = Vec::new();
        entries.try_reserve_exact(2).map_err(|_| Error::OutOfMemory {
            bytes: 2 * mem::size_of::<(K, V)>(),
        })?;
        Ok(Bucket { hash, entries })
    }

    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[(K, V)] {
        &self.entries
    }

    pub(crate) fn position<H: TrieHandler<K, V>>(&self, key: &K, handler: &H) -> Option<usize> {
        self.entries.iter().position(|(k, _)| handler.equals(k, key))
    }

    pub(crate) fn find<H: TrieHandler<K, V>>(&self, key: &K, handler: &H) -> Option<&V> {
        self.entries.iter().find(|(k, _)| handler.equals(k, key)).map(|(_, v)| v)
    }

    pub(crate) fn find_mut<H: TrieHandler<K, V>>(&mut self, key: &K, handler: &H) -> Option<&mut V> {
        self.entries.iter_mut().find(|(k, _)| handler.equals(k, key)).map(|(_, v)| v)
    }

    // Swaps in a new pair at `index` and returns the previous one.
    pub(crate) fn replace(&mut self, index: usize, key: K, value: V) -> (K, V) {
        mem::replace(&mut self.entries[index], (key, value))
    }

    // Pushes into capacity reserved by `alloc`.
    pub(crate) fn push_reserved(&mut self, key: K, value: V) {
        debug_assert!(self.entries.len() < self.entries.capacity());
        self.entries.push((key, value));
    }

    pub(crate) fn push(&mut self, key: K, value: V) -> Result<()> {
        self.entries.try_reserve(1).map_err(|_| Error::OutOfMemory {
            bytes: mem::size_of::<(K, V)>(),
        })?;
        self.entries.push((key, value));
        Ok(())
    }
}
