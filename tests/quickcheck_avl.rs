use itertools::Itertools;
use quickcheck::{Arbitrary, Gen, TestResult};
use quickcheck_macros::*;
use rand::prelude::*;
use rand_pcg::Pcg64;
use std::collections::BTreeSet;

use baltree::BalancedTree;

#[derive(Clone, Debug)]
enum TreeOp {
    Insert(i16),
    Delete(i16),
    Contains(i16),
    Min,
    Max,
}

#[derive(Clone, Debug)]
struct Ops {
    ops: Vec<TreeOp>,
}

// Keys come from a narrow range so deletes and duplicates actually hit.
fn small_key(g: &mut Gen) -> i16 {
    i16::arbitrary(g) % 64
}

impl Arbitrary for TreeOp {
    fn arbitrary(g: &mut Gen) -> Self {
        let op = usize::arbitrary(g) % 100;
        let key = small_key(g);
        match op {
            0..55 => TreeOp::Insert(key),
            55..85 => TreeOp::Delete(key),
            85..95 => TreeOp::Contains(key),
            95..98 => TreeOp::Min,
            98..100 => TreeOp::Max,
            _ => unreachable!(),
        }
    }
}

impl Arbitrary for Ops {
    fn arbitrary(g: &mut Gen) -> Self {
        let ops = Vec::<TreeOp>::arbitrary(g);
        Ops { ops }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.ops.shrink().map(|ops| Ops { ops }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OpRes {
    Unit,
    Bool(bool),
    Key(Option<i16>),
}

fn apply(tree: &mut BalancedTree<i16>, op: &TreeOp) -> OpRes {
    match op {
        TreeOp::Insert(k) => {
            tree.insert(*k);
            OpRes::Unit
        }
        TreeOp::Delete(k) => {
            tree.delete(k);
            OpRes::Unit
        }
        TreeOp::Contains(k) => OpRes::Bool(tree.contains(k)),
        TreeOp::Min => OpRes::Key(tree.min().copied()),
        TreeOp::Max => OpRes::Key(tree.max().copied()),
    }
}

fn apply_naive(set: &mut BTreeSet<i16>, op: &TreeOp) -> OpRes {
    match op {
        TreeOp::Insert(k) => {
            set.insert(*k);
            OpRes::Unit
        }
        TreeOp::Delete(k) => {
            set.remove(k);
            OpRes::Unit
        }
        TreeOp::Contains(k) => OpRes::Bool(set.contains(k)),
        TreeOp::Min => OpRes::Key(set.first().copied()),
        TreeOp::Max => OpRes::Key(set.last().copied()),
    }
}

fn height_bound(n: usize) -> f64 {
    1.44 * ((n + 2) as f64).log2() - 0.33
}

#[quickcheck]
fn qc_prop_tree_matches_naive(ops: Ops) -> TestResult {
    let mut tree = BalancedTree::new();
    let mut naive = BTreeSet::new();

    for op in &ops.ops {
        let res = apply(&mut tree, op);
        let res_naive = apply_naive(&mut naive, op);
        if let Err(e) = tree.check_invariants() {
            println!("Invariant broken after {:?}: {}", op, e);
            return TestResult::failed();
        }
        let keys = tree.iter().copied().collect_vec();
        let keys_naive = naive.iter().copied().collect_vec();
        if res != res_naive || keys != keys_naive || tree.len() != naive.len() {
            println!(
                "Failed on op: {:?}\ngood: {:?} ({:?})\nnaive: {:?} ({:?})",
                op, res, keys, res_naive, keys_naive
            );
            return TestResult::failed();
        }
    }

    TestResult::passed()
}

#[quickcheck]
fn qc_inorder_is_sorted_unique(keys: Vec<i32>) -> bool {
    let tree: BalancedTree<i32> = keys.iter().copied().collect();
    let expected = keys.into_iter().sorted().dedup().collect_vec();
    tree.iter().copied().collect_vec() == expected
}

#[quickcheck]
fn qc_delete_member_removes_exactly_it(keys: Vec<i32>, pick: usize) -> TestResult {
    if keys.is_empty() {
        return TestResult::discard();
    }
    let k = keys[pick % keys.len()];
    let mut tree: BalancedTree<i32> = keys.iter().copied().collect();
    tree.delete(&k);

    let expected = keys
        .into_iter()
        .filter(|&x| x != k)
        .sorted()
        .dedup()
        .collect_vec();
    TestResult::from_bool(
        tree.check_invariants().is_ok() && tree.iter().copied().collect_vec() == expected,
    )
}

#[quickcheck]
fn qc_duplicate_insert_keeps_shape(keys: Vec<i32>, pick: usize) -> TestResult {
    if keys.is_empty() {
        return TestResult::discard();
    }
    let mut tree: BalancedTree<i32> = keys.iter().copied().collect();
    let before = tree.snapshot();
    tree.insert(keys[pick % keys.len()]);
    TestResult::from_bool(tree.snapshot() == before)
}

#[quickcheck]
fn qc_delete_absent_keeps_shape(keys: Vec<i32>, absent: i32) -> TestResult {
    if keys.contains(&absent) {
        return TestResult::discard();
    }
    let mut tree: BalancedTree<i32> = keys.iter().copied().collect();
    let before = tree.snapshot();
    tree.delete(&absent);
    TestResult::from_bool(tree.snapshot() == before)
}

#[quickcheck]
fn qc_height_within_avl_bound(keys: Vec<u32>) -> bool {
    let tree: BalancedTree<u32> = keys.into_iter().collect();
    tree.height() as f64 <= height_bound(tree.len())
}

#[test]
fn height_bound_holds_for_10000_random_keys() {
    let mut rng = Pcg64::seed_from_u64(5);
    let mut tree = BalancedTree::new();
    for i in 1..=10_000 {
        tree.insert(rng.random_range(0..1_000_000u32));
        if i % 1000 == 0 {
            assert!(
                tree.height() as f64 <= height_bound(tree.len()),
                "height {} exceeds bound for {} keys",
                tree.height(),
                tree.len()
            );
        }
    }
    assert_eq!(tree.check_invariants(), Ok(()));
}

#[test]
fn interleaved_random_ops_stay_balanced() {
    let mut rng = Pcg64::seed_from_u64(11);
    let mut tree = BalancedTree::new();
    let mut naive = BTreeSet::new();
    for _ in 0..5_000 {
        let key = rng.random_range(0..512i32);
        if rng.random_ratio(2, 3) {
            tree.insert(key);
            naive.insert(key);
        } else {
            tree.delete(&key);
            naive.remove(&key);
        }
    }
    assert_eq!(tree.check_invariants(), Ok(()));
    assert_eq!(
        tree.iter().copied().collect_vec(),
        naive.into_iter().collect_vec()
    );
    assert!(tree.height() as f64 <= height_bound(tree.len()));
}
