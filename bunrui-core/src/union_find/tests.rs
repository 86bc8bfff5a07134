//! Unit and property tests for the union-find structures.

use proptest::prelude::*;
use rstest::rstest;

use super::{TreeUnionFind, UnionFind, UnionFindError};
use crate::test_utils::suite_proptest_config;

#[test]
fn fresh_structure_is_all_fixed_points() {
    let forest = UnionFind::new(5);
    assert_eq!(forest.capacity(), 9);
    assert_eq!(forest.next_label(), 5);
    assert!((0..9).all(|id| forest.find(id) == id));
    assert_eq!(forest.size_of(0), 1);
    assert_eq!(forest.size_of(7), 0);
}

#[test]
fn documented_fixed_point_layout() {
    let mut forest = UnionFind::new(5);
    assert_eq!(forest.union(3, 4), Ok(5));
    let before = forest.clone();

    let err = forest
        .union(usize::MAX, usize::MAX - 1)
        .expect_err("ids beyond the structure are rejected");
    assert_eq!(
        err,
        UnionFindError::OutOfRange {
            id: usize::MAX,
            capacity: 9,
        }
    );
    assert_eq!(forest, before);
    assert_eq!(forest.parents(), &[0, 1, 2, 5, 5, 5, 6, 7, 8]);
    assert_eq!(forest.find(6), 6);
}

#[test]
fn unions_accumulate_sizes() {
    let mut forest = UnionFind::new(4);
    let left = forest.union(0, 1).expect("first merge");
    let right = forest.union(2, 3).expect("second merge");
    let root = forest.union(left, right).expect("third merge");
    assert_eq!(root, 6);
    assert_eq!(forest.size_of(0), 4);
    assert_eq!(forest.fast_find(0), 6);
    assert_eq!(forest.parents()[0], 6);
}

#[test]
fn exhausted_labels_are_reported() {
    let mut forest = UnionFind::new(2);
    forest.union(0, 1).expect("only merge");
    let err = forest.union(0, 1).expect_err("no labels left");
    assert_eq!(err, UnionFindError::Exhausted { capacity: 3 });
    assert_eq!(err.code().as_str(), "UNION_FIND_EXHAUSTED");
}

#[rstest]
#[case::chain(vec![(0, 1), (1, 2), (2, 3)], 3)]
#[case::star(vec![(0, 1), (0, 2), (0, 3)], 0)]
fn tree_union_find_keeps_parent_representative(
    #[case] unions: Vec<(usize, usize)>,
    #[case] leaf: usize,
) {
    let mut forest = TreeUnionFind::new(4);
    for (parent, child) in unions {
        forest.union(parent, child);
    }
    assert_eq!(forest.find(leaf), 0);
    assert_eq!(forest.components(), vec![0]);
    assert!(forest.is_component(0));
    assert!(!forest.is_component(1));
}

#[test]
fn tree_union_find_tracks_independent_components() {
    let mut forest = TreeUnionFind::new(6);
    forest.union(4, 0);
    forest.union(4, 1);
    forest.union(5, 2);
    assert_eq!(forest.find(1), 4);
    assert_eq!(forest.find(2), 5);
    assert_eq!(forest.components(), vec![3, 4, 5]);
    assert_eq!(forest.len(), 6);
}

proptest! {
    #![proptest_config(suite_proptest_config(64))]

    #[test]
    fn find_is_idempotent_and_sizes_are_true(
        n in 2_usize..40,
        picks in prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 0..39),
    ) {
        let mut forest = UnionFind::new(n);
        for (left, right) in picks.into_iter().take(n - 1) {
            let upper = forest.next_label();
            let a = left.index(upper);
            let b = right.index(upper);
            forest.union(a, b).expect("ids drawn from allocated labels");
            for x in 0..forest.capacity() {
                let root = forest.find(x);
                prop_assert_eq!(forest.find(root), root);
            }
        }
        for x in 0..forest.next_label() {
            let root = forest.find(x);
            let members = (0..n).filter(|&leaf| forest.find(leaf) == root).count();
            prop_assert_eq!(forest.size_of(x), members);
        }
    }
}
