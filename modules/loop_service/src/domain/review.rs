//! Review tag filter applied after the store query returns

use crate::contract::{ComplianceStatus, Loop, LoopStatus, UnknownValue};
use std::str::FromStr;

/// Filter category mapped onto `status` / `compliance_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewTag {
    NeedReview,
    ApprovedForCommission,
    ListingApproved,
    ReturnedToAgent,
    Terminated,
    Closed,
    ListingDocuments,
    ContractDocuments,
}

impl ReviewTag {
    pub const ALL: [ReviewTag; 8] = [
        ReviewTag::NeedReview,
        ReviewTag::ApprovedForCommission,
        ReviewTag::ListingApproved,
        ReviewTag::ReturnedToAgent,
        ReviewTag::Terminated,
        ReviewTag::Closed,
        ReviewTag::ListingDocuments,
        ReviewTag::ContractDocuments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewTag::NeedReview => "need_review",
            ReviewTag::ApprovedForCommission => "approved_for_commission",
            ReviewTag::ListingApproved => "listing_approved",
            ReviewTag::ReturnedToAgent => "returned_to_agent",
            ReviewTag::Terminated => "terminated",
            ReviewTag::Closed => "closed",
            ReviewTag::ListingDocuments => "listing_documents",
            ReviewTag::ContractDocuments => "contract_documents",
        }
    }

    /// `None` for document categories, which match everything
    fn predicate(self, lp: &Loop) -> Option<bool> {
        let compliance = lp.compliance.status;
        let hit = match self {
            ReviewTag::NeedReview => compliance == ComplianceStatus::Pending,
            ReviewTag::ApprovedForCommission | ReviewTag::ListingApproved => {
                compliance == ComplianceStatus::Approved
            }
            ReviewTag::ReturnedToAgent | ReviewTag::Terminated => {
                compliance == ComplianceStatus::Denied || lp.status == LoopStatus::Terminated
            }
            ReviewTag::Closed => lp.status == LoopStatus::Closed,
            ReviewTag::ListingDocuments | ReviewTag::ContractDocuments => return None,
        };
        Some(hit)
    }
}

impl FromStr for ReviewTag {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownValue::new("review_tag", s))
    }
}

/// Review-stage narrowing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewStage {
    #[default]
    Any,
    /// Compliance never requested
    Unsubmitted,
}

impl FromStr for ReviewStage {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "any" | "all" => Ok(ReviewStage::Any),
            "unsubmitted" => Ok(ReviewStage::Unsubmitted),
            other => Err(UnknownValue::new("review_stage", other)),
        }
    }
}

/// Listing-side and buying-side tag groups plus the review stage
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewFilter {
    pub listing: Vec<ReviewTag>,
    pub buying: Vec<ReviewTag>,
    pub stage: ReviewStage,
}

impl ReviewFilter {
    pub fn is_empty(&self) -> bool {
        self.listing.is_empty() && self.buying.is_empty() && self.stage == ReviewStage::Any
    }

    /// Both groups must pass; a group passes when any of its tags matches
    pub fn matches(&self, lp: &Loop) -> bool {
        if self.stage == ReviewStage::Unsubmitted
            && lp.compliance.status != ComplianceStatus::None
        {
            return false;
        }
        group_matches(&self.listing, lp) && group_matches(&self.buying, lp)
    }

    /// Keep matching rows, preserving their order
    pub fn retain(&self, loops: &mut Vec<Loop>) {
        if !self.is_empty() {
            loops.retain(|lp| self.matches(lp));
        }
    }
}

fn group_matches(tags: &[ReviewTag], lp: &Loop) -> bool {
    let mut predicates = tags.iter().filter_map(|tag| tag.predicate(lp)).peekable();
    if predicates.peek().is_none() {
        return true;
    }
    predicates.any(|hit| hit)
}

/// Parse a comma-separated tag list; blank entries are skipped
pub fn parse_tags(raw: Option<&str>) -> Result<Vec<ReviewTag>, UnknownValue> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
