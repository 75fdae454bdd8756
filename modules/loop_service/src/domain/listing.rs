//! Multi-source loop listing
//!
//! Plans the store queries for a browse request (one per archival state),
//! merges their results and runs the in-memory pass: fallback sort, review
//! tag filter and the final limit.

use super::ordering::{sort_loops, SortKey};
use super::query::{LoopFilter, SortOrder};
use super::review::ReviewFilter;
use crate::contract::{Loop, RecordId, UnknownValue};
use std::collections::HashMap;
use std::str::FromStr;

/// Which archival states a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchivedMode {
    #[default]
    Hide,
    Only,
    All,
}

impl ArchivedMode {
    /// `archived` flag of each store query to issue
    pub fn flags(self) -> &'static [bool] {
        match self {
            ArchivedMode::Hide => &[false],
            ArchivedMode::Only => &[true],
            ArchivedMode::All => &[false, true],
        }
    }
}

impl FromStr for ArchivedMode {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "hide" | "false" => Ok(ArchivedMode::Hide),
            "only" | "true" => Ok(ArchivedMode::Only),
            "all" => Ok(ArchivedMode::All),
            other => Err(UnknownValue::new("archived", other)),
        }
    }
}

/// Listing request that may need more than the store can do alone
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseRequest {
    /// Store predicates; `archived`, `sort`, `order` and `limit` are overridden
    pub filter: LoopFilter,
    pub archived: ArchivedMode,
    pub sort: Option<SortKey>,
    pub order: SortOrder,
    pub limit: Option<u64>,
    pub review: ReviewFilter,
}

impl BrowseRequest {
    fn key(&self) -> SortKey {
        self.sort
            .clone()
            .unwrap_or(SortKey::Store(self.filter.sort))
    }

    /// True when rows must be re-ordered after the store returns them
    pub fn needs_in_memory_sort(&self) -> bool {
        self.key().store_field().is_none() || self.archived == ArchivedMode::All
    }

    fn limit_in_memory(&self) -> bool {
        self.needs_in_memory_sort() || !self.review.is_empty()
    }

    /// Store queries to issue, one per archival state
    pub fn store_filters(&self) -> Vec<LoopFilter> {
        let sort = self.key().store_field().unwrap_or_default();
        let limit = if self.limit_in_memory() {
            None
        } else {
            self.limit
        };
        self.archived
            .flags()
            .iter()
            .map(|&archived| LoopFilter {
                archived,
                sort,
                order: self.order,
                limit,
                ..self.filter.clone()
            })
            .collect()
    }

    /// Merge the per-state result sets and run the in-memory pass
    pub fn finalize(&self, sets: Vec<Vec<Loop>>) -> Vec<Loop> {
        let mut rows = merge_archival_sets(sets);
        if self.needs_in_memory_sort() {
            sort_loops(&mut rows, &self.key(), self.order);
        }
        self.review.retain(&mut rows);
        if self.limit_in_memory() {
            if let Some(limit) = self.limit {
                rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            }
        }
        rows
    }
}

/// Concatenate result sets, de-duplicating by id.
///
/// A row keeps the position of its first occurrence and the value of its last.
pub fn merge_archival_sets(sets: Vec<Vec<Loop>>) -> Vec<Loop> {
    let mut merged: Vec<Loop> = Vec::new();
    let mut index: HashMap<RecordId, usize> = HashMap::new();
    for row in sets.into_iter().flatten() {
        match index.get(&row.id) {
            Some(&pos) => merged[pos] = row,
            None => {
                index.insert(row.id, merged.len());
                merged.push(row);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ComplianceRecord, ComplianceStatus, LoopStatus};
    use crate::domain::query::SortField;
    use crate::domain::review::ReviewTag;
    use chrono::{NaiveDate, Utc};

    fn lp(id: i64, archived: bool) -> Loop {
        let now = Utc::now();
        Loop {
            id,
            r#type: "Purchase".to_string(),
            sale: Some(id as f64 * 1000.0),
            creator_id: 1,
            creator_name: None,
            created_at: now,
            updated_at: now,
            start_date: None,
            end_date: None,
            tags: None,
            status: LoopStatus::Active,
            property_address: format!("{id} Oak Ave"),
            client_name: None,
            client_email: None,
            client_phone: None,
            notes: None,
            images: Vec::new(),
            participants: Vec::new(),
            archived,
            details: Default::default(),
            compliance: ComplianceRecord::default(),
        }
    }

    #[test]
    fn merge_never_duplicates_rows() {
        let mut stale = lp(2, false);
        stale.notes = Some("stale".to_string());
        let mut fresh = lp(2, true);
        fresh.notes = Some("fresh".to_string());

        let merged = merge_archival_sets(vec![vec![lp(1, false), stale], vec![fresh, lp(3, true)]]);
        assert_eq!(merged.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(merged[1].notes.as_deref(), Some("fresh"));
    }

    #[test]
    fn all_mode_issues_two_queries_without_store_limit() {
        let request = BrowseRequest {
            archived: ArchivedMode::All,
            limit: Some(5),
            ..Default::default()
        };
        let filters = request.store_filters();
        assert_eq!(filters.len(), 2);
        assert!(!filters[0].archived);
        assert!(filters[1].archived);
        assert!(filters.iter().all(|f| f.limit.is_none()));
    }

    #[test]
    fn pushdown_sort_keeps_store_limit() {
        let request = BrowseRequest {
            sort: Some(SortKey::Store(SortField::Sale)),
            order: SortOrder::Asc,
            limit: Some(5),
            ..Default::default()
        };
        assert!(!request.needs_in_memory_sort());
        let filters = request.store_filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].sort, SortField::Sale);
        assert_eq!(filters[0].order, SortOrder::Asc);
        assert_eq!(filters[0].limit, Some(5));
    }

    #[test]
    fn finalize_sorts_filters_then_limits() {
        let mut a = lp(1, false);
        a.start_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        let mut b = lp(2, false);
        b.start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        b.compliance.status = ComplianceStatus::Pending;
        let mut c = lp(3, true);
        c.start_date = NaiveDate::from_ymd_opt(2025, 2, 1);
        c.compliance.status = ComplianceStatus::Pending;
        let d = lp(4, true);

        let request = BrowseRequest {
            archived: ArchivedMode::All,
            sort: Some(SortKey::StartDate),
            order: SortOrder::Asc,
            limit: Some(1),
            review: ReviewFilter {
                listing: vec![ReviewTag::NeedReview],
                ..Default::default()
            },
            ..Default::default()
        };
        let rows = request.finalize(vec![vec![a, b], vec![c, d]]);
        assert_eq!(rows.iter().map(|l| l.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn archived_mode_parses_legacy_flags() {
        assert_eq!("true".parse(), Ok(ArchivedMode::Only));
        assert_eq!("".parse(), Ok(ArchivedMode::Hide));
        assert_eq!("all".parse(), Ok(ArchivedMode::All));
        assert!("sometimes".parse::<ArchivedMode>().is_err());
    }
}
