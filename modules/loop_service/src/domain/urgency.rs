//! Due-date urgency classification
//!
//! Derived at request time, never persisted.

use super::ordering::parse_date;
use crate::contract::LoopStatus;
use chrono::NaiveDate;

/// Days ahead of the end date at which a loop counts as closing soon
pub const DUE_SOON_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// No end date, or the loop is closed/cancelled
    None,
    Overdue { days: i64 },
    DueToday,
    DueSoon { days: i64 },
    Normal,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::None => "none",
            Urgency::Overdue { .. } => "overdue",
            Urgency::DueToday => "due-today",
            Urgency::DueSoon { .. } => "due-soon",
            Urgency::Normal => "normal",
        }
    }

    /// Day count attached to the classification, if any
    pub fn magnitude(self) -> Option<i64> {
        match self {
            Urgency::Overdue { days } | Urgency::DueSoon { days } => Some(days),
            _ => None,
        }
    }

    /// Short list badge, e.g. `OVERDUE: 2 DAYS`
    pub fn badge_label(self) -> Option<String> {
        match self {
            Urgency::Overdue { days } => Some(format!("OVERDUE: {days} {}", day_word(days))),
            Urgency::DueToday => Some("DUE TODAY".to_string()),
            Urgency::DueSoon { days } => {
                Some(format!("CLOSING SOON: {days} {} LEFT", day_word(days)))
            }
            Urgency::None | Urgency::Normal => None,
        }
    }

    /// Countdown text shown on the loop detail header
    pub fn countdown_text(self) -> Option<String> {
        match self {
            Urgency::Overdue { days } => {
                Some(format!("{days} {} overdue", day_word(days).to_lowercase()))
            }
            Urgency::DueToday => Some("Closes today".to_string()),
            Urgency::DueSoon { days } => {
                Some(format!("{days} {} left", day_word(days).to_lowercase()))
            }
            Urgency::None | Urgency::Normal => None,
        }
    }
}

fn day_word(days: i64) -> &'static str {
    if days == 1 {
        "DAY"
    } else {
        "DAYS"
    }
}

/// Classify a loop's end date relative to `today`
pub fn classify(end_date: Option<NaiveDate>, status: LoopStatus, today: NaiveDate) -> Urgency {
    if matches!(status, LoopStatus::Closed | LoopStatus::Cancelled) {
        return Urgency::None;
    }
    let Some(end) = end_date else {
        return Urgency::None;
    };
    let days = (end - today).num_days();
    match days {
        d if d < 0 => Urgency::Overdue { days: -d },
        0 => Urgency::DueToday,
        d if d <= DUE_SOON_DAYS => Urgency::DueSoon { days: d },
        _ => Urgency::Normal,
    }
}

/// Same as [`classify`] for raw date strings; unparsable dates count as absent
pub fn classify_raw(end_date: Option<&str>, status: LoopStatus, today: NaiveDate) -> Urgency {
    classify(end_date.and_then(parse_date), status, today)
}
