//! Weighted random choice by cumulative scan.

use rand::Rng;

use crate::error::{Result, ReviewError};

/// Pick one item with probability proportional to its weight.
///
/// Negative, NaN and infinite weights count as zero. When every weight is
/// zero the first item is returned. Floating-point overscan lands on the
/// last item.
pub fn weighted_choice<'a, T, R>(items: &'a [T], weights: &[f64], rng: &mut R) -> Result<&'a T>
where
    R: Rng + ?Sized,
{
    let (Some(first), Some(last)) = (items.first(), items.last()) else {
        return Err(ReviewError::EmptyPool);
    };

    let clean = |w: &f64| if w.is_finite() && *w > 0.0 { *w } else { 0.0 };
    let mut total: f64 = weights.iter().take(items.len()).map(clean).sum();
    if !total.is_finite() {
        total = f64::MAX;
    }
    if total == 0.0 {
        return Ok(first);
    }

    let draw = rng.random_range(0.0..=total);
    let mut running = 0.0;
    for (item, w) in items.iter().zip(weights.iter().map(clean)) {
        running += w;
        if w > 0.0 && running >= draw {
            return Ok(item);
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn empty_is_an_error() {
        let mut rng = StdRng::seed_from_u64(42);
        let items: [u8; 0] = [];
        assert_eq!(weighted_choice(&items, &[], &mut rng), Err(ReviewError::EmptyPool));
    }

    #[test]
    fn single_item_regardless_of_weight() {
        let mut rng = StdRng::seed_from_u64(42);
        for w in [0.0, -1.0, f64::NAN, 1e-300, 1e300] {
            assert_eq!(*weighted_choice(&["only"], &[w], &mut rng).unwrap(), "only");
        }
    }

    #[test]
    fn zero_weight_items_are_never_drawn() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = ["a", "b", "c"];
        for _ in 0..500 {
            let got = *weighted_choice(&items, &[0.0, 1.0, 0.0], &mut rng).unwrap();
            assert_eq!(got, "b");
        }
    }

    #[test]
    fn proportions_roughly_follow_weights() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = [0usize, 1];
        let mut hits = [0u32; 2];
        for _ in 0..10_000 {
            hits[*weighted_choice(&items, &[1.0, 3.0], &mut rng).unwrap()] += 1;
        }
        let share = f64::from(hits[1]) / 10_000.0;
        assert!((0.72..0.78).contains(&share), "share={share}");
    }
}
