//! Sort keys, the shared comparator and the in-memory sort backend
//!
//! A [`SortKey`] either names a column from the store allow-list (pushed down
//! into the query) or a key only the in-memory pass can order by. Both paths
//! go through [`compare_values`] when sorting happens in memory, so the
//! comparator is defined once.

use super::query::{SortField, SortOrder};
use crate::contract::{DetailValue, Loop, Task};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

/// Requested ordering key for a loop listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Column the store can order by
    Store(SortField),
    StartDate,
    ComplianceRequestedAt,
    /// Creator display name (case-insensitive)
    CreatorName,
    /// Any other loop attribute or `details` key
    Field(String),
}

impl SortKey {
    /// Parse a raw key; empty means the default `created_at`
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return SortKey::Store(SortField::default());
        }
        if let Some(field) = SortField::parse(raw) {
            return SortKey::Store(field);
        }
        match raw {
            "start_date" => SortKey::StartDate,
            "compliance_requested_at" => SortKey::ComplianceRequestedAt,
            "creator_name" | "agent" => SortKey::CreatorName,
            other => SortKey::Field(other.to_string()),
        }
    }

    /// Store column to push down, if the key is on the allow-list
    pub fn store_field(&self) -> Option<SortField> {
        match self {
            SortKey::Store(field) => Some(*field),
            _ => None,
        }
    }
}

/// Comparable projection of a loop attribute
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl SortValue {
    fn text(value: Option<&str>) -> Self {
        match value {
            Some(s) if !s.is_empty() => SortValue::Text(s.to_string()),
            _ => SortValue::Null,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, SortValue::Null)
    }
}

/// Getter used by the in-memory sort for every key
pub fn sort_value(lp: &Loop, key: &SortKey) -> SortValue {
    match key {
        SortKey::Store(SortField::CreatedAt) => SortValue::Timestamp(lp.created_at),
        SortKey::Store(SortField::UpdatedAt) => SortValue::Timestamp(lp.updated_at),
        SortKey::Store(SortField::EndDate) => lp.end_date.map_or(SortValue::Null, SortValue::Date),
        SortKey::Store(SortField::Sale) => lp.sale.map_or(SortValue::Null, SortValue::Number),
        SortKey::Store(SortField::Status) => SortValue::Text(lp.status.as_str().to_string()),
        SortKey::Store(SortField::Type) => SortValue::text(Some(&lp.r#type)),
        SortKey::StartDate => lp.start_date.map_or(SortValue::Null, SortValue::Date),
        SortKey::ComplianceRequestedAt => lp
            .compliance
            .requested_at
            .map_or(SortValue::Null, SortValue::Timestamp),
        SortKey::CreatorName => {
            SortValue::text(lp.creator_name.as_deref().map(str::to_lowercase).as_deref())
        }
        SortKey::Field(name) => field_value(lp, name),
    }
}

fn field_value(lp: &Loop, name: &str) -> SortValue {
    match name {
        "id" => SortValue::Number(lp.id as f64),
        "property_address" => SortValue::text(Some(&lp.property_address)),
        "client_name" => SortValue::text(lp.client_name.as_deref()),
        "client_email" => SortValue::text(lp.client_email.as_deref()),
        "client_phone" => SortValue::text(lp.client_phone.as_deref()),
        "tags" => SortValue::text(lp.tags.as_deref()),
        "notes" => SortValue::text(lp.notes.as_deref()),
        "compliance_status" => SortValue::Text(lp.compliance.status.as_str().to_string()),
        "compliance_reviewed_at" => lp
            .compliance
            .reviewed_at
            .map_or(SortValue::Null, SortValue::Timestamp),
        other => match lp.details.get(other) {
            Some(DetailValue::Text(s)) => SortValue::text(Some(s)),
            Some(DetailValue::Number(n)) => SortValue::Number(*n),
            Some(DetailValue::Null) | None => SortValue::Null,
        },
    }
}

/// Compare two values in the given direction.
///
/// Nulls and empty strings sort last regardless of direction. Text that parses
/// as a date on both sides compares as dates, then numerically, then
/// lexicographically.
pub fn compare_values(a: &SortValue, b: &SortValue, order: SortOrder) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let ord = compare_present(a, b);
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

fn compare_present(a: &SortValue, b: &SortValue) -> Ordering {
    use SortValue::*;
    match (a, b) {
        (Number(x), Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Date(x), Date(y)) => x.cmp(y),
        (Timestamp(x), Timestamp(y)) => x.cmp(y),
        (Date(x), Timestamp(y)) => x.cmp(&y.date_naive()),
        (Timestamp(x), Date(y)) => x.date_naive().cmp(y),
        _ => compare_text(&render(a), &render(b)),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    if let (Some(x), Some(y)) = (parse_date(a), parse_date(b)) {
        return x.cmp(&y);
    }
    if let (Ok(x), Ok(y)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    a.cmp(b)
}

fn render(value: &SortValue) -> String {
    match value {
        SortValue::Null => String::new(),
        SortValue::Text(s) => s.clone(),
        SortValue::Number(n) => n.to_string(),
        SortValue::Date(d) => d.to_string(),
        SortValue::Timestamp(t) => t.to_rfc3339(),
    }
}

/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|t| t.date_naive()))
}

/// Stable in-memory sort of loops by `key`
pub fn sort_loops(loops: &mut [Loop], key: &SortKey, order: SortOrder) {
    loops.sort_by(|a, b| compare_values(&sort_value(a, key), &sort_value(b, key), order));
}

/// Checklist order: incomplete first, then due date ascending (missing last),
/// then newest first
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
