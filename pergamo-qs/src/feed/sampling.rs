//! Presentation-order sampling
//!
//! Sessions shuffle their feed once. Balanced ordering groups questions by
//! year, shuffles each bucket, then draws one question per year per round
//! (in a freshly shuffled year order each round), so every prefix of the
//! result stays close to an even spread across years.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::Question;

/// Ordering policy for a practice session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPolicy {
    #[default]
    Shuffled,
    BalancedByYear,
}

/// Fisher-Yates shuffle into a new vector
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// Round-robin across shuffled per-year buckets
pub fn balanced_by_year<R: Rng + ?Sized>(
    items: &[Arc<Question>],
    rng: &mut R,
) -> Vec<Arc<Question>> {
    let mut buckets: BTreeMap<u16, Vec<Arc<Question>>> = BTreeMap::new();
    for question in items {
        buckets
            .entry(question.year)
            .or_default()
            .push(Arc::clone(question));
    }

    let mut buckets: Vec<Vec<Arc<Question>>> = buckets
        .into_values()
        .map(|mut bucket| {
            bucket.shuffle(rng);
            bucket
        })
        .collect();

    let mut out = Vec::with_capacity(items.len());
    loop {
        let mut round: Vec<Arc<Question>> = buckets.iter_mut().filter_map(Vec::pop).collect();
        if round.is_empty() {
            break;
        }
        round.shuffle(rng);
        out.extend(round);
    }
    out
}

/// Order a feed according to `policy`
pub fn order<R: Rng + ?Sized>(
    items: &[Arc<Question>],
    policy: OrderPolicy,
    rng: &mut R,
) -> Vec<Arc<Question>> {
    match policy {
        OrderPolicy::Shuffled => shuffled(items, rng),
        OrderPolicy::BalancedByYear => balanced_by_year(items, rng),
    }
}
