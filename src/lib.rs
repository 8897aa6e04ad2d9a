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

//! A mutable Hash Array Mapped Trie (HAMT) for use as an associative container.
//!
//! Keys are placed by successive five-bit windows of a 64-bit hash value: a fixed table of 32
//! slots at the root, then sub-tries that are compressed with an occupancy bitmap. The trie never
//! looks at keys or values itself. Hashing, equality and destruction are supplied by the caller
//! through the `TrieHandler` trait.
//!
//! ```
//! use hamt_trie::{FxHandler, Hamt, Insertion};
//!
//! let handler = FxHandler::default();
//! let mut trie = Hamt::new();
//!
//! assert_eq!(trie.insert("one", 1, &handler), Ok(Insertion::Inserted));
//! assert_eq!(trie.insert("one", 2, &handler), Ok(Insertion::Replaced));
//! assert_eq!(trie.search(&"one", &handler), Some(&2));
//! assert_eq!(trie.search(&"two", &handler), None);
//!
//! trie.destroy(&handler);
//! ```

pub use bits::popcount;
pub use error::{Error, Result};
pub use handler::{Counting, FxHandler, HashHandler, StdHandler, TrieHandler};
pub use hamt::{Config, Hamt, HamtMap, Insertion, OnDuplicate, TrieStats};

mod bits;
mod error;
mod handler;
mod hamt;
mod slot;


#[cfg(test)]
mod proptests;
