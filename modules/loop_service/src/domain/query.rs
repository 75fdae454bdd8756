//! Loop filter descriptor and its resolution into a store query
//!
//! The descriptor is what callers hand in (lenient, stringly parameters are
//! parsed here). [`LoopQuery`] is the resolved form the repositories execute:
//! calendar-relative predicates are turned into concrete date ranges and the
//! sort column is always one of the [`SortField`] allow-list.

use crate::contract::{Loop, LoopStatus, RecordId};
use chrono::{Datelike, Days, NaiveDate};

/// Columns the store is allowed to order by.
///
/// Anything outside this list never reaches query construction as an
/// identifier; see [`SortField::parse_or_default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    EndDate,
    Sale,
    Status,
    Type,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::EndDate,
        SortField::Sale,
        SortField::Status,
        SortField::Type,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::EndDate => "end_date",
            SortField::Sale => "sale",
            SortField::Status => "status",
            SortField::Type => "type",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        SortField::ALL.into_iter().find(|f| f.as_str() == raw)
    }

    /// Unknown or missing sort keys silently fall back to `created_at`
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(SortField::parse).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// Anything other than `asc`/`desc` falls back to `desc`
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Desc,
        }
    }
}

/// Calendar-relative end date predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndMonth {
    /// `end_date` within the first and last calendar day of the current month
    Current,
}

impl EndMonth {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some("current") => Some(EndMonth::Current),
            _ => None,
        }
    }
}

/// Filter descriptor for listing loops
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopFilter {
    pub status: Option<LoopStatus>,
    pub r#type: Option<String>,
    /// Case-insensitive substring match on address, client name or tags
    pub search: Option<String>,
    pub end_month: Option<EndMonth>,
    /// Forced to the caller's own id for non-admin actors
    pub creator_id: Option<RecordId>,
    pub archived: bool,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: Option<u64>,
}

impl LoopFilter {
    /// Resolve calendar-relative predicates against `today`
    pub fn resolve(&self, today: NaiveDate) -> LoopQuery {
        LoopQuery {
            status: self.status,
            r#type: non_empty(self.r#type.as_deref()),
            search: non_empty(self.search.as_deref()),
            end_date_between: self.end_month.map(|EndMonth::Current| month_bounds(today)),
            creator_id: self.creator_id,
            archived: self.archived,
            sort: self.sort,
            order: self.order,
            limit: self.limit.filter(|n| *n > 0),
        }
    }
}

/// Permissive `limit` parsing: anything that is not a positive integer means "no limit"
pub fn parse_limit(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n > 0)
}

/// Resolved query executed by a [`crate::domain::LoopRepository`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoopQuery {
    pub status: Option<LoopStatus>,
    pub r#type: Option<String>,
    pub search: Option<String>,
    /// Inclusive `end_date` range
    pub end_date_between: Option<(NaiveDate, NaiveDate)>,
    pub creator_id: Option<RecordId>,
    pub archived: bool,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: Option<u64>,
}

impl LoopQuery {
    /// In-memory evaluation of the query predicates (ordering and limit excluded)
    pub fn matches(&self, lp: &Loop) -> bool {
        if lp.archived != self.archived {
            return false;
        }
        if self.status.is_some_and(|s| s != lp.status) {
            return false;
        }
        if self.r#type.as_deref().is_some_and(|t| t != lp.r#type) {
            return false;
        }
        if self.creator_id.is_some_and(|c| c != lp.creator_id) {
            return false;
        }
        if let Some((from, to)) = self.end_date_between {
            match lp.end_date {
                Some(end) if end >= from && end <= to => {}
                _ => return false,
            }
        }
        if let Some(term) = self.search.as_deref() {
            return search_matches(lp, term);
        }
        true
    }
}

/// Case-insensitive substring match on property address, client name or tags
pub fn search_matches(lp: &Loop, term: &str) -> bool {
    let needle = term.to_lowercase();
    [
        Some(lp.property_address.as_str()),
        lp.client_name.as_deref(),
        lp.tags.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|hay| hay.to_lowercase().contains(&needle))
}

/// First and last calendar day of the month containing `today`
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    let next_month = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    };
    let last = next_month.and_then(|d| d.pred_opt()).unwrap_or(today);
    (first, last)
}

/// Inclusive `[today, today + days]` window used by the closing-soon view
pub fn closing_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let end = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    (today, end)
}

/// Loop still in flight whose end date falls inside `window`
pub fn is_closing_within(lp: &Loop, window: (NaiveDate, NaiveDate)) -> bool {
    !lp.archived
        && lp.status.is_open()
        && lp.end_date.is_some_and(|d| d >= window.0 && d <= window.1)
}

/// Loop still in flight whose end date lies before `today`
pub fn is_overdue(lp: &Loop, today: NaiveDate) -> bool {
    !lp.archived && lp.status.is_open() && lp.end_date.is_some_and(|d| d < today)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn adversarial_sort_key_falls_back_to_created_at() {
        assert_eq!(
            SortField::parse_or_default(Some("id; DROP TABLE loops")),
            SortField::CreatedAt
        );
        assert_eq!(SortField::parse_or_default(None), SortField::CreatedAt);
        assert_eq!(SortField::parse_or_default(Some("sale")), SortField::Sale);
    }

    #[test]
    fn unknown_order_falls_back_to_desc() {
        assert_eq!(SortOrder::parse_or_default(Some("ASC")), SortOrder::Desc);
        assert_eq!(SortOrder::parse_or_default(Some("asc")), SortOrder::Asc);
        assert_eq!(SortOrder::parse_or_default(None), SortOrder::Desc);
    }

    #[test]
    fn malformed_limit_means_unlimited() {
        assert_eq!(parse_limit(Some("abc")), None);
        assert_eq!(parse_limit(Some("0")), None);
        assert_eq!(parse_limit(Some("-3")), None);
        assert_eq!(parse_limit(Some("25")), Some(25));
        assert_eq!(parse_limit(None), None);
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        assert_eq!(
            month_bounds(date(2025, 2, 14)),
            (date(2025, 2, 1), date(2025, 2, 28))
        );
        assert_eq!(
            month_bounds(date(2024, 12, 31)),
            (date(2024, 12, 1), date(2024, 12, 31))
        );
        assert_eq!(
            month_bounds(date(2024, 2, 1)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
    }

    #[test]
    fn closing_window_is_inclusive_three_days() {
        assert_eq!(
            closing_window(date(2025, 1, 30), 3),
            (date(2025, 1, 30), date(2025, 2, 2))
        );
    }

    #[test]
    fn resolve_drops_blank_text_predicates() {
        let filter = LoopFilter {
            r#type: Some("  ".to_string()),
            search: Some(String::new()),
            end_month: Some(EndMonth::Current),
            limit: Some(0),
            ..Default::default()
        };
        let query = filter.resolve(date(2025, 3, 10));
        assert_eq!(query.r#type, None);
        assert_eq!(query.search, None);
        assert_eq!(query.limit, None);
        assert_eq!(
            query.end_date_between,
            Some((date(2025, 3, 1), date(2025, 3, 31)))
        );
    }
}
