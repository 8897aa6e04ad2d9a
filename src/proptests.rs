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

use proptest::prelude::*;
use std::collections::HashMap;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher};

use rustc_hash::FxHasher;

use crate::testing::{validate, TrackingHandler};
use crate::{Config, Hamt, Insertion, OnDuplicate, TrieHandler};

// Fx hashing with most bits masked off. Small masks force deep sub-tries and overflow buckets.
struct MaskedHandler {
    mask: u64,
}

impl TrieHandler<u64, u64> for MaskedHandler {
    fn hash(&self, key: &u64) -> u64 {
        let mut hasher = BuildHasherDefault::<FxHasher>::default().build_hasher();
        hasher.write_u64(*key);
        hasher.finish() & self.mask
    }

    fn equals(&self, a: &u64, b: &u64) -> bool {
        a == b
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u64, u64),
    Search(u64),
    Update(u64, u64),
}

fn mask_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(u64::MAX),
        Just(0xff),
        Just(0x3ff),
        // Only the bits of the root and of the deepest level.
        Just(0xf000_0000_0000_001f),
        Just(0),
        any::<u64>(),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // A small key space keeps replacements frequent.
    let key = 0u64..512;
    let op = prop_oneof![
        60 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Search),
        10 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Update(k, v)),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_replace(mask in mask_strategy(), ops in ops_strategy()) {
        let handler = TrackingHandler::new(MaskedHandler { mask });
        let mut t: Hamt<u64, u64> = Hamt::new();
        let mut m: HashMap<u64, u64> = HashMap::new();
        let mut replaced: Vec<u64> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let insertion = t.insert(key, value, &handler).unwrap();
                    match m.insert(key, value) {
                        None => {
                            prop_assert_eq!(insertion, Insertion::Inserted);
                        }
                        Some(old) => {
                            prop_assert_eq!(insertion, Insertion::Replaced);
                            replaced.push(old);
                        }
                    }
                }
                Op::Search(key) => {
                    prop_assert_eq!(t.search(&key, &handler), m.get(&key));
                }
                Op::Update(key, value) => {
                    let got_t = t.search_mut(&key, &handler).map(|v| { *v = value; *v });
                    let got_m = m.get_mut(&key).map(|v| { *v = value; *v });
                    prop_assert_eq!(got_t, got_m);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        let stats = validate(&t, &handler);
        prop_assert_eq!(stats.entries, m.len());

        let mut values = handler.destroyed_values();
        values.sort();
        replaced.sort();
        prop_assert_eq!(values, replaced);

        handler.clear();
        t.destroy(&handler);

        let mut keys = handler.destroyed_keys();
        keys.sort();
        let mut expected: Vec<u64> = m.keys().copied().collect();
        expected.sort();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn prop_equivalence_keep_existing(mask in mask_strategy(), ops in ops_strategy()) {
        let handler = MaskedHandler { mask };
        let config = Config::default().on_duplicate(OnDuplicate::KeepExisting);
        let mut t: Hamt<u64, u64> = Hamt::with_config(config);
        let mut m: HashMap<u64, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let expected = if m.contains_key(&key) {
                        Insertion::Kept
                    } else {
                        Insertion::Inserted
                    };
                    m.entry(key).or_insert(value);
                    prop_assert_eq!(t.insert(key, value, &handler).unwrap(), expected);
                }
                Op::Search(key) | Op::Update(key, _) => {
                    prop_assert_eq!(t.search(&key, &handler), m.get(&key));
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate(&t, &handler);
    }
}

#[test]
fn exhaustive_insert_order_small_colliding_set() {
    // Every key lands in root slot 1 and all but 33 share the second level as well. Every
    // insertion order must produce the same contents.
    let keys = [1u64, 33, 1025, 2049, (1 << 40) | 1];
    let handler = crate::testing::IdentityHandler;

    let mut order: Vec<usize> = (0..keys.len()).collect();
    for _ in 0..120 {
        let mut t = Hamt::new();
        for &i in &order {
            t.insert(keys[i], i as u64, &handler).unwrap();
        }

        for (i, key) in keys.iter().enumerate() {
            assert_eq!(t.search(key, &handler), Some(&(i as u64)));
        }
        let stats = validate(&t, &handler);
        assert_eq!(stats.entries, keys.len());
        assert_eq!(stats.overflow_buckets, 0);

        next_permutation(&mut order);
    }
}

// Lexicographic successor; wraps around to the first permutation.
fn next_permutation(items: &mut [usize]) {
    let n = items.len();
    if n < 2 {
        return;
    }

    let mut i = n - 1;
    while i > 0 && items[i - 1] >= items[i] {
        i -= 1;
    }

    if i == 0 {
        items.reverse();
        return;
    }

    let mut j = n - 1;
    while items[j] <= items[i - 1] {
        j -= 1;
    }
    items.swap(i - 1, j);
    items[i..].reverse();
}
