//! Small list helpers shared by the corpus loaders and the trainer.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, WenziError};

/// Seed derived from the wall clock, used when the caller does not pin one.
pub fn entropy_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

/// Shuffle `items` in place (Fisher-Yates).
pub fn shuffle_in_place<T>(items: &mut [T], rng: &mut oorandom::Rand64) {
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

/// Shuffle two parallel lists with the same permutation.
///
/// The pair `(a[i], b[i])` stays together; only the order of pairs changes.
/// With `seed = None` the permutation is drawn from the clock.
///
/// # Examples
/// ```
/// use wenzi_core::utils::unison_shuffled_copies;
///
/// let (x, y) = unison_shuffled_copies(vec![1, 2, 3], vec!['a', 'b', 'c'], Some(7)).unwrap();
/// for (n, c) in x.iter().zip(&y) {
///     assert_eq!((*n as u8 - 1 + b'a') as char, *c);
/// }
/// ```
pub fn unison_shuffled_copies<A, B>(
    a: Vec<A>,
    b: Vec<B>,
    seed: Option<u64>,
) -> Result<(Vec<A>, Vec<B>)> {
    if a.len() != b.len() {
        return Err(WenziError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut rng = oorandom::Rand64::new(u128::from(seed.unwrap_or_else(entropy_seed)));
    let mut pairs: Vec<(A, B)> = a.into_iter().zip(b).collect();
    shuffle_in_place(&mut pairs, &mut rng);

    Ok(pairs.into_iter().unzip())
}

/// Pick `target[i]` for every `i` in `index_list`, skipping indices past the end.
pub fn get_list_subset<T: Clone>(target: &[T], index_list: &[usize]) -> Vec<T> {
    index_list
        .iter()
        .filter_map(|&i| target.get(i).cloned())
        .collect()
}
