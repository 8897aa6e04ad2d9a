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

//! Bit-level helpers shared by the insert and search paths.

// The number of hash-value bits used per tree-level.
pub const BITS_PER_LEVEL: u32 = 5;
// The fan-out of the root and of every sub-trie.
pub const ARITY: usize = 1 << BITS_PER_LEVEL;
// Used to mask off any unused bits from the hash value at a given level.
pub const LEVEL_BIT_MASK: u64 = (ARITY as u64) - 1;
// The width of the hash values produced by a `TrieHandler`.
pub const HASH_BITS: u32 = u64::BITS;
// The deepest number of sub-trie levels below the root. The last level only sees the four
// topmost hash bits.
pub const MAX_DEPTH: usize = ((HASH_BITS - 1) / BITS_PER_LEVEL) as usize;

/// Occupancy bitmap of a sub-trie. Bit `i` is set if child index `i` is occupied.
pub type Bitmap = u32;

/// Returns the number of set bits in `word`.
#[inline]
pub fn popcount(word: u64) -> usize {
    word.count_ones() as usize
}

/// Translates the logical child index `sub_index` into the offset of its entry within the dense
/// entry array of a sub-trie with the given bitmap.
#[inline]
pub fn dense_index(bitmap: Bitmap, sub_index: usize) -> usize {
    debug_assert!(sub_index < ARITY);
    let bits_set_up_to_index = (1 << sub_index) - 1;
    popcount(u64::from(bitmap & bits_set_up_to_index))
}

/// The 5-bit window of `hash` that selects a child once `bits_consumed` bits have been used up
/// by the levels above.
#[inline]
pub fn window(hash: u64, bits_consumed: u32) -> usize {
    (hash.checked_shr(bits_consumed).unwrap_or(0) & LEVEL_BIT_MASK) as usize
}
