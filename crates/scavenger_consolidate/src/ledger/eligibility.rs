//! Per-address solution totals and donor selection.

use crate::ledger::Receipt;
use crate::wallet::DerivedAddress;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unknown address indexes: {0:?}")]
    UnknownIndexes(Vec<u32>),
    #[error("no eligible donors: {0}")]
    NoEligibleDonors(String),
}

/// Derived address that has solution credit to hand over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorCandidate {
    pub index: u32,
    pub bech32: String,
    pub total_user_solutions: u64,
}

/// Count non-dev-fee receipts per address. Addresses without an entry have zero.
pub fn solution_totals(receipts: &[Receipt]) -> HashMap<String, u64> {
    let mut totals = HashMap::new();
    for r in receipts.iter().filter(|r| !r.is_dev_fee) {
        *totals.entry(r.address.clone()).or_insert(0u64) += 1;
    }
    totals
}

/// Filter `addresses` down to donors.
///
/// `requested` restricts the candidate set; `None` or an empty slice means every derived
/// address. Requested indexes that are not derived fail the whole selection. When
/// `exclude` is set (the consolidation recipient) that address is never a donor.
/// Result order follows `addresses`.
pub fn select_donors(
    addresses: &[DerivedAddress],
    totals: &HashMap<String, u64>,
    requested: Option<&[u32]>,
    exclude: Option<&str>,
) -> Result<Vec<DonorCandidate>, SelectionError> {
    let requested: Option<BTreeSet<u32>> = requested
        .filter(|r| !r.is_empty())
        .map(|r| r.iter().copied().collect());

    if let Some(wanted) = &requested {
        let unknown: Vec<u32> = wanted
            .iter()
            .copied()
            .filter(|i| !addresses.iter().any(|a| a.index == *i))
            .collect();
        if !unknown.is_empty() {
            return Err(SelectionError::UnknownIndexes(unknown));
        }
    }

    let donors: Vec<DonorCandidate> = addresses
        .iter()
        .filter(|a| match &requested {
            Some(wanted) => wanted.contains(&a.index),
            None => true,
        })
        .filter(|a| exclude != Some(a.bech32.as_str()))
        .filter_map(|a| {
            let total = totals.get(&a.bech32).copied().unwrap_or(0);
            (total > 0).then(|| DonorCandidate {
                index: a.index,
                bech32: a.bech32.clone(),
                total_user_solutions: total,
            })
        })
        .collect();

    if donors.is_empty() {
        let reason = match exclude {
            Some(_) => "no selected address other than the recipient has user solutions",
            None => "no selected address has user solutions",
        };
        return Err(SelectionError::NoEligibleDonors(reason.to_string()));
    }
    Ok(donors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(index: u32, bech32: &str) -> DerivedAddress {
        DerivedAddress {
            index,
            bech32: bech32.to_string(),
            public_key_hex: String::new(),
            registered: true,
        }
    }

    fn wallet() -> Vec<DerivedAddress> {
        vec![addr(0, "addr1zero"), addr(1, "addr1one"), addr(2, "addr1two")]
    }

    #[test]
    fn totals_exclude_dev_fee_and_other_addresses() {
        let receipts = vec![
            Receipt::user("addr1one"),
            Receipt::user("addr1one"),
            Receipt::dev_fee("addr1one"),
            Receipt::user("addr1two"),
            Receipt::dev_fee("addr1zero"),
        ];
        let totals = solution_totals(&receipts);
        assert_eq!(totals.get("addr1one"), Some(&2));
        assert_eq!(totals.get("addr1two"), Some(&1));
        assert_eq!(totals.get("addr1zero"), None);
    }

    #[test]
    fn totals_order_independent() {
        let mut receipts = vec![
            Receipt::user("addr1one"),
            Receipt::user("addr1two"),
            Receipt::dev_fee("addr1two"),
            Receipt::user("addr1one"),
        ];
        let a = solution_totals(&receipts);
        receipts.reverse();
        assert_eq!(a, solution_totals(&receipts));
        assert!(solution_totals(&[]).is_empty());
    }

    #[test]
    fn selects_only_addresses_with_solutions() {
        let totals = solution_totals(&[Receipt::user("addr1one"), Receipt::user("addr1two")]);
        let donors = select_donors(&wallet(), &totals, None, None).unwrap();
        let idx: Vec<u32> = donors.iter().map(|d| d.index).collect();
        assert_eq!(idx, vec![1, 2]);
    }

    #[test]
    fn recipient_is_never_a_donor() {
        let totals = solution_totals(&[Receipt::user("addr1one"), Receipt::user("addr1two")]);
        let donors = select_donors(&wallet(), &totals, None, Some("addr1two")).unwrap();
        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].bech32, "addr1one");
    }

    #[test]
    fn requested_subset_respected() {
        let totals = solution_totals(&[Receipt::user("addr1one"), Receipt::user("addr1two")]);
        let donors = select_donors(&wallet(), &totals, Some(&[2, 0]), None).unwrap();
        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].index, 2);
        // empty request means all
        let all = select_donors(&wallet(), &totals, Some(&[]), None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn unknown_indexes_rejected() {
        let totals = solution_totals(&[Receipt::user("addr1one")]);
        let err = select_donors(&wallet(), &totals, Some(&[1, 7, 9]), None).unwrap_err();
        assert_eq!(err, SelectionError::UnknownIndexes(vec![7, 9]));
    }

    #[test]
    fn empty_selection_fails() {
        let totals = solution_totals(&[Receipt::dev_fee("addr1one")]);
        let err = select_donors(&wallet(), &totals, None, None).unwrap_err();
        assert!(matches!(err, SelectionError::NoEligibleDonors(_)));
        let only_recipient = solution_totals(&[Receipt::user("addr1one")]);
        let err = select_donors(&wallet(), &only_recipient, None, Some("addr1one")).unwrap_err();
        assert!(matches!(err, SelectionError::NoEligibleDonors(_)));
    }
}
