//! Per-record acceptance for the streaming path.

use std::collections::{BTreeMap, HashSet};

use concierge_core::CatalogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingId,
    /// The id was already accepted earlier in this run.
    Duplicate,
    GroupNotAllowed,
    GroupFull,
    OverallCapReached,
}

/// Counts accepted records per group (country code) against the per-group
/// and overall caps. An empty allow-list admits every group, and each hotel
/// id is admitted at most once.
#[derive(Debug)]
pub struct Acceptance {
    allowed: HashSet<String>,
    per_group_limit: usize,
    overall_limit: usize,
    counts: BTreeMap<String, u64>,
    seen: HashSet<String>,
    accepted: usize,
}

impl Acceptance {
    #[must_use]
    pub fn new(allowed: HashSet<String>, per_group_limit: usize, overall_limit: usize) -> Self {
        Self {
            allowed: allowed
                .into_iter()
                .map(|g| g.trim().to_ascii_uppercase())
                .collect(),
            per_group_limit,
            overall_limit,
            counts: BTreeMap::new(),
            seen: HashSet::new(),
            accepted: 0,
        }
    }

    /// Decide on `record`, counting it when accepted.
    ///
    /// # Errors
    ///
    /// The [`Rejection`] naming the first rule the record fails.
    pub fn admit(&mut self, record: &CatalogRecord) -> Result<String, Rejection> {
        let hotel_id = record.hotel_id.trim();
        if hotel_id.is_empty() {
            return Err(Rejection::MissingId);
        }
        if self.seen.contains(hotel_id) {
            return Err(Rejection::Duplicate);
        }
        if self.is_saturated() {
            return Err(Rejection::OverallCapReached);
        }
        let group = record.country_code().unwrap_or_default();
        if group.is_empty() || (!self.allowed.is_empty() && !self.allowed.contains(&group)) {
            return Err(Rejection::GroupNotAllowed);
        }
        let count = self.counts.entry(group.clone()).or_insert(0);
        if usize::try_from(*count).unwrap_or(usize::MAX) >= self.per_group_limit {
            return Err(Rejection::GroupFull);
        }
        *count += 1;
        self.accepted += 1;
        self.seen.insert(hotel_id.to_string());
        Ok(group)
    }

    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.accepted >= self.overall_limit
    }

    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    #[must_use]
    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    fn allow(groups: &[&str]) -> HashSet<String> {
        groups.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn caps_per_group_and_overall() {
        let mut acceptance = Acceptance::new(allow(&["A", "B"]), 2, 3);
        let verdicts: Vec<_> = ["A", "A", "A", "B", "B"]
            .iter()
            .enumerate()
            .map(|(i, g)| acceptance.admit(&record(&format!("H{i}"), g, "X")))
            .collect();

        assert_eq!(
            verdicts,
            vec![
                Ok("A".to_string()),
                Ok("A".to_string()),
                Err(Rejection::GroupFull),
                Ok("B".to_string()),
                Err(Rejection::OverallCapReached),
            ]
        );
        assert_eq!(acceptance.accepted(), 3);
        assert!(acceptance.is_saturated());
        assert_eq!(acceptance.counts().get("A"), Some(&2));
    }

    #[test]
    fn rejects_unknown_group_and_blank_id() {
        let mut acceptance = Acceptance::new(allow(&["fr"]), 5, 5);
        assert_eq!(
            acceptance.admit(&record("H1", "IT", "Rome")),
            Err(Rejection::GroupNotAllowed)
        );
        assert_eq!(
            acceptance.admit(&record("  ", "FR", "Paris")),
            Err(Rejection::MissingId)
        );
        let mut no_country = record("H2", "FR", "Paris");
        no_country.country = None;
        assert_eq!(acceptance.admit(&no_country), Err(Rejection::GroupNotAllowed));
        assert_eq!(acceptance.admit(&record("H3", "fr", "Paris")), Ok("FR".to_string()));
    }

    #[test]
    fn repeated_id_does_not_take_a_slot() {
        let mut acceptance = Acceptance::new(allow(&["A", "B"]), 2, 3);
        assert!(acceptance.admit(&record("H1", "A", "X")).is_ok());
        assert_eq!(
            acceptance.admit(&record("H1", "A", "X")),
            Err(Rejection::Duplicate)
        );
        assert_eq!(
            acceptance.admit(&record(" H1 ", "B", "Y")),
            Err(Rejection::Duplicate)
        );
        assert!(acceptance.admit(&record("H2", "B", "Y")).is_ok());
        assert!(acceptance.admit(&record("H3", "B", "Y")).is_ok());
        assert_eq!(acceptance.accepted(), 3);
        assert_eq!(acceptance.counts().get("A"), Some(&1));
        assert_eq!(acceptance.counts().get("B"), Some(&2));
    }

    #[test]
    fn empty_allow_list_admits_any_group() {
        let mut acceptance = Acceptance::new(HashSet::new(), 1, 10);
        assert!(acceptance.admit(&record("H1", "JP", "Tokyo")).is_ok());
        assert_eq!(
            acceptance.admit(&record("H2", "JP", "Kyoto")),
            Err(Rejection::GroupFull)
        );
    }
}
