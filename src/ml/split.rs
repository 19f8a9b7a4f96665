use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seeded shuffle, then split into (train, test).
///
/// The test side gets `ceil(len * test_ratio)` items, clamped so that both
/// sides are non-empty whenever there are at least two items. The same seed
/// always yields the same partition.
pub fn train_test_split<T>(mut items: Vec<T>, test_ratio: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total = items.len();
    let mut test_len = ((total as f64) * test_ratio).ceil() as usize;
    if total >= 2 {
        test_len = test_len.clamp(1, total - 1);
    } else {
        test_len = test_len.min(total);
    }

    let test = items.split_off(total - test_len);

    tracing::debug!(
        "Dataset split: {} training, {} test (seed {})",
        items.len(),
        test.len(),
        seed
    );

    (items, test)
}

/// Contiguous k-fold partitions over `0..len` as (train, validation) index
/// lists. The first `len % k` folds get one extra item.
pub fn kfold_indices(len: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let k = k.min(len);
    if k < 2 {
        return Vec::new();
    }

    let base = len / k;
    let extra = len % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;

    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let end = start + size;
        let validation: Vec<usize> = (start..end).collect();
        let train: Vec<usize> = (0..start).chain(end..len).collect();
        folds.push((train, validation));
        start = end;
    }

    folds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test) = train_test_split(items, 0.25, 42);
        assert_eq!(train.len(), 75);
        assert_eq!(test.len(), 25);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test) = train_test_split(items, 0.3, 1);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = train_test_split((0..40).collect::<Vec<usize>>(), 0.25, 7);
        let b = train_test_split((0..40).collect::<Vec<usize>>(), 0.25, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_datasets() {
        let (train, test) = train_test_split(vec![1, 2], 0.1, 0);
        assert_eq!((train.len(), test.len()), (1, 1));
        let (train, test) = train_test_split(Vec::<u8>::new(), 0.25, 0);
        assert!(train.is_empty() && test.is_empty());
    }

    #[test]
    fn test_kfold_covers_every_index_once() {
        let folds = kfold_indices(10, 3);
        assert_eq!(folds.len(), 3);
        let sizes: Vec<usize> = folds.iter().map(|(_, v)| v.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, v)| v.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for (train, validation) in &folds {
            assert_eq!(train.len() + validation.len(), 10);
            assert!(validation.iter().all(|i| !train.contains(i)));
        }
    }

    #[test]
    fn test_kfold_needs_two_items() {
        assert!(kfold_indices(1, 3).is_empty());
        assert_eq!(kfold_indices(2, 5).len(), 2);
    }
}
