//! Wire types shared between the HTTP client and the state layer.
//!
//! Transaction records are open JSON objects rather than fixed structs:
//! the upstream normalizer emits whatever columns the uploaded files had,
//! and the grid derives its visible columns per page from the data itself.
//! Only the `id` field is structural.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::HashMap;

use serde_json::Value;

/// Field name of the immutable, server-assigned record identifier.
pub const ID_FIELD: &str = "id";

/// An open transaction record: field name to scalar value, plus `id`.
pub type Record = serde_json::Map<String, Value>;

/// Category-to-number payload backing the pie and bar charts.
pub type ChartData = HashMap<String, f64>;

/// The authenticated user's profile as reported by `/auth/me`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub is_superuser: bool,
    pub is_active: bool,
}

/// Successful `/auth/login` response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: Identity,
}

/// One page of records plus the collection's total row count.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct RecordPage {
    pub items: Vec<Record>,
    pub total: u64,
}

/// Named dashboard totals from the summary endpoints.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Summary {
    pub total_credit: f64,
    pub total_debit: f64,
    pub total_fees_collected: f64,
    pub transaction_count: u64,
    pub largest_payment: f64,
    pub average_payment: f64,
    pub latest_balance: f64,
}

/// `/auth/register` response: the created account plus its generated
/// password, returned exactly once for the operator to hand over.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub password: String,
}

/// A file queued for multipart upload.
#[derive(Clone, Debug)]
pub struct UploadPart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Which record collection an operation targets.
///
/// `Unified` and `Organization` are the editable collections with paired
/// save endpoints; `Mt940` is the fixed, read-only import view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dataset {
    Unified,
    Organization,
    Mt940,
}

impl Dataset {
    /// Paged record listing endpoint.
    #[must_use]
    pub fn records_path(self) -> &'static str {
        match self {
            Self::Unified => "/unified_transactions",
            Self::Organization => "/org_transactions",
            Self::Mt940 => "/transactions",
        }
    }

    /// Batch-save endpoint, if the collection is editable.
    #[must_use]
    pub fn save_path(self) -> Option<&'static str> {
        match self {
            Self::Unified => Some("/unified_transactions/save"),
            Self::Organization => Some("/org_transactions/save"),
            Self::Mt940 => None,
        }
    }

    /// Summary totals endpoint. `Mt940` shares the unified aggregates.
    #[must_use]
    pub fn summary_path(self) -> &'static str {
        match self {
            Self::Organization => "/org_summary",
            Self::Unified | Self::Mt940 => "/unified_summary",
        }
    }

    /// Pie chart (type counts) endpoint.
    #[must_use]
    pub fn pie_path(self) -> &'static str {
        match self {
            Self::Organization => "/org_pie_type",
            Self::Unified | Self::Mt940 => "/unified_pie_type",
        }
    }

    /// Bar chart (totals by source file) endpoint.
    #[must_use]
    pub fn bar_path(self) -> &'static str {
        match self {
            Self::Organization => "/org_bar_source",
            Self::Unified | Self::Mt940 => "/unified_bar_source",
        }
    }

    /// Multipart upload endpoint, if the collection accepts uploads.
    #[must_use]
    pub fn upload_path(self) -> Option<&'static str> {
        match self {
            Self::Unified => Some("/unified_upload"),
            Self::Organization => Some("/org_upload"),
            Self::Mt940 => None,
        }
    }
}

/// True when a cell value should count toward column visibility.
///
/// Mirrors the display rule: `null` and whitespace-only strings are empty,
/// everything else (including `0` and `false`) is non-empty.
#[must_use]
pub fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
