use std::collections::BTreeMap;

use compare::{Compare, natural};
use log::LevelFilter;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use ranked_tree::{Error, Rank, RankedTree};
use simplelog::{Config, TestLogger};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

type Model = BTreeMap<i64, Vec<i64>>;

/// Keys drawn from a narrow range so keys collect several values.
fn key_strategy() -> impl Strategy<Value = i64> {
    -200i64..200i64
}

/// Values drawn from a narrow range so deletes regularly hit.
fn value_strategy() -> impl Strategy<Value = i64> {
    0i64..8i64
}

fn model_delete(model: &mut Model, key: i64, value: i64) -> bool {
    let Some(values) = model.get_mut(&key) else {
        return false;
    };
    let Some(index) = values.iter().position(|&v| v == value) else {
        return false;
    };

    values.remove(index);
    if values.is_empty() {
        model.remove(&key);
    }
    true
}

fn flatten(model: &Model) -> Vec<(i64, i64)> {
    model.iter().flat_map(|(&k, values)| values.iter().map(move |&v| (k, v))).collect()
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(i64, i64),
    Delete(i64, i64),
    Find(i64),
    Rank(i64),
    Select(usize),
}

fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        6 => (key_strategy(), value_strategy()).prop_map(|(k, v)| TreeOp::Insert(k, v)),
        4 => (key_strategy(), value_strategy()).prop_map(|(k, v)| TreeOp::Delete(k, v)),
        2 => key_strategy().prop_map(TreeOp::Find),
        2 => key_strategy().prop_map(TreeOp::Rank),
        2 => (0usize..1_000).prop_map(TreeOp::Select),
    ]
}

// ─── Core operations ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of operations on both RankedTree and a
    /// BTreeMap of value lists and asserts identical results at every step.
    #[test]
    fn tree_ops_match_model(ops in proptest::collection::vec(tree_op_strategy(), TEST_SIZE)) {
        let mut tree: RankedTree<i64, i64> = RankedTree::new();
        let mut model = Model::new();

        for op in &ops {
            match *op {
                TreeOp::Insert(k, v) => {
                    let fresh = !model.contains_key(&k);
                    model.entry(k).or_default().push(v);
                    prop_assert_eq!(tree.insert(k, v), fresh, "insert({}, {})", k, v);
                }
                TreeOp::Delete(k, v) => {
                    let expected = model_delete(&mut model, k, v);
                    prop_assert_eq!(tree.delete(&k, &v), expected, "delete({}, {})", k, v);
                }
                TreeOp::Find(k) => {
                    prop_assert_eq!(tree.find(&k), model.get(&k).map(Vec::as_slice), "find({})", k);
                    prop_assert_eq!(tree.contains_key(&k), model.contains_key(&k));
                }
                TreeOp::Rank(k) => {
                    let expected = model
                        .contains_key(&k)
                        .then(|| model.range(..k).map(|(_, values)| values.len()).sum::<usize>());
                    prop_assert_eq!(tree.rank(&k), expected, "rank({})", k);
                }
                TreeOp::Select(position) => {
                    let flat = flatten(&model);
                    let expected = flat
                        .get(position)
                        .map(|&(k, _)| model[&k].as_slice())
                        .ok_or(Error::OutOfRange { position, len: flat.len() });
                    prop_assert_eq!(tree.select(position), expected, "select({})", position);
                }
            }

            prop_assert_eq!(tree.len(), model.values().map(Vec::len).sum::<usize>());
        }

        let pairs: Vec<_> = tree.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(pairs, flatten(&model));
    }

    /// Every position maps back to the rank of the key covering it.
    #[test]
    fn rank_select_duality(entries in proptest::collection::vec((key_strategy(), value_strategy()), 1..TEST_SIZE)) {
        let tree: RankedTree<i64, i64> = entries.into_iter().collect();

        for position in 0..tree.len() {
            let (key, values) = tree.select_entry(position).unwrap();
            let rank = tree.rank(key).unwrap();
            prop_assert!(rank <= position && position < rank + values.len());
            prop_assert_eq!(tree.select(rank), Ok(values));
        }
        prop_assert_eq!(tree.select(tree.len()), Err(Error::OutOfRange { position: tree.len(), len: tree.len() }));
    }

    /// Deleting everything, in any order, empties the tree.
    #[test]
    fn delete_all_empties_tree(entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE)) {
        let mut tree: RankedTree<i64, i64> = entries.iter().copied().collect();

        for (k, v) in entries.iter().rev() {
            prop_assert!(tree.delete(k, v));
        }
        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.iter().next(), None);
        prop_assert_eq!(tree.first(), None);
    }

    /// The owning iterator yields the same pairs as the borrowing one.
    #[test]
    fn into_iter_matches_iter(entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE)) {
        let tree: RankedTree<i64, i64> = entries.into_iter().collect();
        let borrowed: Vec<_> = tree.iter().map(|(&k, &v)| (k, v)).collect();

        let mut owned = tree.clone().into_iter();
        prop_assert_eq!(owned.len(), borrowed.len());
        let first = owned.next();
        prop_assert_eq!(first, borrowed.first().copied());
        prop_assert_eq!(owned.len(), borrowed.len().saturating_sub(1));

        let rest: Vec<_> = owned.collect();
        prop_assert_eq!(&rest[..], borrowed.get(1..).unwrap_or_default());
    }
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn values_share_a_key() {
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
    let mut tree = RankedTree::new();

    assert!(tree.insert(1, "jeff"));
    assert!(!tree.insert(1, "bob"));
    assert!(!tree.insert(1, "barry"));
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.keys().count(), 1);

    assert!(tree.delete(&1, &"bob"));
    assert_eq!(tree.find(&1), Some(&["jeff", "barry"][..]));
    assert_eq!(tree.len(), 2);

    tree.insert(2, "bob");
    tree.insert(3, "garry");
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.rank(&2), Some(2));
    assert_eq!(tree.select(3), Ok(&["garry"][..]));
}

#[test]
fn missing_value_leaves_tree_alone() {
    let mut tree = RankedTree::from([(1, 'a'), (2, 'b'), (2, 'c')]);
    let before = format!("{tree:?}");

    assert!(!tree.delete(&2, &'z'));
    assert!(!tree.delete(&9, &'a'));
    assert_eq!(format!("{tree:?}"), before);
    assert_eq!(tree.len(), 3);

    assert!(tree.delete(&1, &'a'));
    assert!(!tree.delete(&1, &'a'));
    assert_eq!(tree.len(), 2);
}

#[test]
fn empty_tree_queries() {
    let tree: RankedTree<u32, u32> = RankedTree::default();

    assert!(tree.is_empty());
    assert_eq!(tree.find(&0), None);
    assert_eq!(tree.rank(&0), None);
    assert_eq!(tree.select(0), Err(Error::OutOfRange { position: 0, len: 0 }));
    assert_eq!(tree.first(), None);
    assert_eq!(tree.last(), None);
    assert_eq!(format!("{tree:?}"), "[]");
}

#[test]
fn descending_comparator_reverses_positions() {
    let mut tree = RankedTree::with_comparator(natural().rev());
    for (score, name) in [(10, "ann"), (30, "bea"), (20, "cal"), (30, "dee")] {
        tree.insert(score, name);
    }

    assert_eq!(tree.rank(&30), Some(0));
    assert_eq!(tree.rank(&20), Some(2));
    assert_eq!(tree.select(1), Ok(&["bea", "dee"][..]));
    assert_eq!(tree.first(), Some((&30, &["bea", "dee"][..])));
    assert_eq!(tree.last(), Some((&10, &["ann"][..])));
}

#[test]
fn closure_comparator() {
    let mut tree = RankedTree::with_capacity_and_comparator(8, |a: &String, b: &String| {
        a.to_lowercase().cmp(&b.to_lowercase())
    });
    tree.insert("Beta".to_string(), 2);
    tree.insert("alpha".to_string(), 1);
    tree.insert("BETA".to_string(), 3);

    assert!(tree.capacity() >= 8);
    assert_eq!(tree.find(&"beta".to_string()), Some(&[2, 3][..]));
    assert_eq!(tree.rank(&"Beta".to_string()), Some(1));
}

// ─── Indexing, iteration and formatting ──────────────────────────────────────

#[test]
fn index_by_rank() {
    let tree = RankedTree::from([("a", 1), ("b", 2), ("b", 3), ("c", 4)]);

    assert_eq!(tree[Rank(0)], [1]);
    assert_eq!(tree[Rank(1)], [2, 3]);
    assert_eq!(tree[Rank(2)], [2, 3]);
    assert_eq!(tree[Rank(3)], [4]);
}

#[test]
#[should_panic(expected = "index out of bounds: position 4 is out of range for a tree of 4 values")]
fn index_by_rank_out_of_bounds() {
    let tree = RankedTree::from([("a", 1), ("b", 2), ("b", 3), ("c", 4)]);
    let _ = &tree[Rank(4)];
}

#[test]
fn iterators_report_exact_length() {
    let tree = RankedTree::from([(3, 'c'), (1, 'a'), (3, 'd'), (2, 'b')]);

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 4);
    iter.next();
    let snapshot = iter.clone();
    assert_eq!(iter.len(), 3);
    assert_eq!(iter.collect::<Vec<_>>(), [(&2, &'b'), (&3, &'c'), (&3, &'d')]);
    assert_eq!(snapshot.count(), 3);

    assert_eq!(tree.keys().copied().collect::<Vec<_>>(), [1, 2, 3]);
    assert_eq!((&tree).into_iter().count(), tree.len());
}

#[test]
fn debug_lists_pairs_in_order() {
    let tree = RankedTree::from([(2, "b"), (1, "a"), (2, "c")]);
    assert_eq!(format!("{tree:?}"), r#"[(1, "a"), (2, "b"), (2, "c")]"#);
}

#[test]
fn clone_is_independent() {
    let mut tree = RankedTree::from([(1, 1), (2, 2)]);
    let copy = tree.clone();

    tree.insert(3, 3);
    tree.delete(&1, &1);

    assert_eq!(copy.iter().collect::<Vec<_>>(), [(&1, &1), (&2, &2)]);
    assert_eq!(tree.iter().collect::<Vec<_>>(), [(&2, &2), (&3, &3)]);
}

#[test]
fn clear_then_reuse() {
    let mut tree = RankedTree::with_capacity(4);
    tree.extend((0..16).map(|i| (i % 4, i)));
    assert_eq!(tree.len(), 16);

    tree.clear();
    assert!(tree.is_empty());

    tree.insert(7, 7);
    assert_eq!(tree.select(0), Ok(&[7][..]));
}
