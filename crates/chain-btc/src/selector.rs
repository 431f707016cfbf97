//! Deterministic coin selection.
//!
//! In order of preference: a UTXO worth exactly the target (lowest height
//! first), the smallest single UTXO covering it, then the first run of the
//! largest UTXOs that covers it.

use tracing::debug;

use crate::utxo::Utxo;

/// Indices into the candidate slice plus their summed amount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSelection {
    pub indices: Vec<usize>,
    pub amount: i64,
}

impl UtxoSelection {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn from_indices<U: AsRef<Utxo>>(utxos: &[U], indices: Vec<usize>) -> Self {
        let amount = indices.iter().map(|&i| utxos[i].as_ref().amount()).sum();
        Self { indices, amount }
    }
}

/// Pick UTXOs whose sum covers `target`. Returns an empty selection for a
/// non-positive target or when the candidates cannot cover it.
pub fn select_utxos<U: AsRef<Utxo>>(utxos: &[U], target: i64) -> UtxoSelection {
    if target <= 0 {
        return UtxoSelection::default();
    }

    let selection = if let Some(index) = find_exact(utxos, target) {
        UtxoSelection::from_indices(utxos, vec![index])
    } else if let Some(index) = find_smallest_covering(utxos, target) {
        UtxoSelection::from_indices(utxos, vec![index])
    } else {
        let indices = find_window(utxos, target);
        UtxoSelection::from_indices(utxos, indices)
    };

    debug!(
        target_amount = target,
        selected = selection.indices.len(),
        amount = selection.amount,
        "utxo selection"
    );
    selection
}

fn find_exact<U: AsRef<Utxo>>(utxos: &[U], target: i64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, utxo) in utxos.iter().map(|u| u.as_ref()).enumerate() {
        if utxo.amount() != target {
            continue;
        }
        match best {
            Some(b) if utxos[b].as_ref().height() <= utxo.height() => {}
            _ => best = Some(i),
        }
    }
    best
}

fn find_smallest_covering<U: AsRef<Utxo>>(utxos: &[U], target: i64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, utxo) in utxos.iter().map(|u| u.as_ref()).enumerate() {
        if utxo.amount() < target {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) => {
                let current = utxos[b].as_ref();
                utxo.amount() < current.amount()
                    || (utxo.amount() == current.amount() && utxo.height() < current.height())
            }
        };
        if better {
            best = Some(i);
        }
    }
    best
}

/// Slide windows of growing size over the candidates sorted by descending
/// (amount, height). The window offset carries over between sizes. Within a
/// size the scan stops once sums drop below the target, or at the first
/// overshoot after an exact hit; the first size that records a window wins.
fn find_window<U: AsRef<Utxo>>(utxos: &[U], target: i64) -> Vec<usize> {
    let count = utxos.len();
    if count < 2 {
        return Vec::new();
    }

    let mut sorted: Vec<usize> = (0..count).collect();
    sorted.sort_by(|&a, &b| {
        let (a, b) = (utxos[a].as_ref(), utxos[b].as_ref());
        (b.amount(), b.height()).cmp(&(a.amount(), a.height()))
    });

    let mut best: Vec<usize> = Vec::new();
    let mut offset = 0;
    for limit in 2..=count {
        let mut exact_found = false;
        while offset + limit <= count {
            let window = &sorted[offset..offset + limit];
            let amount: i64 = window.iter().map(|&i| utxos[i].as_ref().amount()).sum();
            if amount < target {
                break;
            }
            if amount == target {
                exact_found = true;
            } else if exact_found {
                break;
            }
            best = window.to_vec();
            offset += 1;
        }
        if !best.is_empty() {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::CoinId;
    use proptest::prelude::*;

    fn make_utxos(values: &[(i64, i64)]) -> Vec<Utxo> {
        values
            .iter()
            .enumerate()
            .map(|(i, &(amount, height))| {
                Utxo::new(CoinId::Bitcoin, format!("{i:064x}"), 0, height, amount)
            })
            .collect()
    }

    fn amounts(utxos: &[Utxo], selection: &UtxoSelection) -> Vec<i64> {
        selection.indices.iter().map(|&i| utxos[i].amount()).collect()
    }

    #[test]
    fn non_positive_target_selects_nothing() {
        let utxos = make_utxos(&[(5, 1)]);
        assert!(select_utxos(&utxos, 0).is_empty());
        assert!(select_utxos(&utxos, -3).is_empty());
    }

    #[test]
    fn single_utxo_covers_small_target() {
        let utxos = make_utxos(&[(5, 1)]);
        let selection = select_utxos(&utxos, 1);
        assert_eq!(amounts(&utxos, &selection), vec![5]);
        assert_eq!(selection.amount, 5);
    }

    #[test]
    fn exact_and_smallest_covering() {
        let utxos = make_utxos(&[(20, 1), (100, 1), (1, 1)]);
        for (target, expected) in [(20, 20), (100, 100), (70, 100), (10, 20), (1, 1), (21, 100)] {
            assert_eq!(
                amounts(&utxos, &select_utxos(&utxos, target)),
                vec![expected],
                "target {target}"
            );
        }
    }

    #[test]
    fn combines_when_no_single_covers() {
        let utxos = make_utxos(&[(20, 1), (100, 1), (1, 1)]);
        let selection = select_utxos(&utxos, 121);
        assert_eq!(amounts(&utxos, &selection), vec![100, 20, 1]);
        assert_eq!(selection.amount, 121);
        assert!(select_utxos(&utxos, 200).is_empty());
    }

    #[test]
    fn exact_hit_stops_the_window_scan() {
        let utxos = make_utxos(&[(40, 1), (30, 1), (30, 2), (5, 1)]);
        let selection = select_utxos(&utxos, 60);
        assert_eq!(selection.amount, 60);
        assert_eq!(selection.indices, vec![2, 1]);
    }

    #[test]
    fn window_offset_advances_while_covering() {
        let utxos = make_utxos(&[(10, 1), (10, 1), (10, 1), (10, 1)]);
        let selection = select_utxos(&utxos, 25);
        assert_eq!(selection.indices, vec![1, 2, 3]);
        assert_eq!(selection.amount, 30);
    }

    #[test]
    fn lowest_height_wins_ties() {
        let utxos = make_utxos(&[(50, 10), (50, 5), (50, 7)]);
        assert_eq!(select_utxos(&utxos, 50).indices, vec![1]);

        let utxos = make_utxos(&[(70, 9), (70, 3), (90, 1)]);
        assert_eq!(select_utxos(&utxos, 60).indices, vec![1]);
    }

    proptest! {
        #[test]
        fn selection_is_deterministic_and_covers(
            values in proptest::collection::vec((1i64..1_000_000, -1i64..800_000), 0..12),
            target in 1i64..3_000_000,
        ) {
            let utxos = make_utxos(&values);
            let first = select_utxos(&utxos, target);
            let second = select_utxos(&utxos, target);
            prop_assert_eq!(&first, &second);
            if !first.is_empty() {
                prop_assert!(first.amount >= target);
                let sum: i64 = first.indices.iter().map(|&i| utxos[i].amount()).sum();
                prop_assert_eq!(sum, first.amount);
            }
            if let Some(utxo) = utxos.iter().find(|u| u.amount() == target) {
                prop_assert_eq!(first.amount, utxo.amount());
                prop_assert_eq!(first.indices.len(), 1);
            }
        }
    }
}
