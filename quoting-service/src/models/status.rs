//! Document status values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a quote or invoice.
///
/// Quotes move through `Draft`, `Sent`, `Approved`, `Rejected`, `Expired`,
/// `Invoiced` and `Cancelled`; invoices use `Draft`, `Issued`, `Paid` and
/// `Cancelled`. Which edges are legal for which kind lives in
/// [`crate::domain::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
    Expired,
    Invoiced,
    Issued,
    Paid,
    Cancelled,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 9] = [
        DocumentStatus::Draft,
        DocumentStatus::Sent,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
        DocumentStatus::Expired,
        DocumentStatus::Invoiced,
        DocumentStatus::Issued,
        DocumentStatus::Paid,
        DocumentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Expired => "expired",
            DocumentStatus::Invoiced => "invoiced",
            DocumentStatus::Issued => "issued",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown document status '{}'", s))
    }
}
