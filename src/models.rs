//! Data models for compliance news records and their processed representations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawRecord`]: One formatted bitable record as stored in a snapshot file
//! - [`Snapshot`]: Per-category JSON dump of up to 100 records
//! - [`NewsItem`]: Normalized item produced by the aggregation engine
//! - [`FilterRequest`] / [`FilterOptions`]: Filter query surface
//!
//! [`NewsItem`] serializes with camelCase field names to match the JSON shape
//! the web front end consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sources::DataSource;

/// Placeholder industry assigned to records with no classification.
pub const GENERAL_INDUSTRY: &str = "行业通用";

/// Industry classification as stored in the bitable.
///
/// Some tables store a single string, others a list of strings. The untagged
/// representation accepts both shapes; everything past ingestion works with
/// the list form via [`Industry::to_list`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Industry {
    One(String),
    Many(Vec<String>),
}

impl Default for Industry {
    fn default() -> Self {
        Industry::One(String::new())
    }
}

impl Industry {
    /// Flatten to the list representation used internally.
    ///
    /// An empty or missing single value becomes `["行业通用"]`; a list is
    /// preserved as-is.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Industry::One(s) if s.is_empty() => vec![GENERAL_INDUSTRY.to_string()],
            Industry::One(s) => vec![s.clone()],
            Industry::Many(v) => v.clone(),
        }
    }
}

/// One news record as formatted by the fetch job and stored in a snapshot.
///
/// Immutable once written; every text field defaults to an empty string so a
/// sparse record never fails to deserialize.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRecord {
    pub record_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub publisher: String,
    /// Publish date in `YYYY-MM-DD` format; empty when the source had none.
    #[serde(default)]
    pub publish_date: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub original_link: String,
    #[serde(default)]
    pub industry_category: Industry,
    #[serde(default)]
    pub relevance: String,
    #[serde(default)]
    pub role: String,
}

/// Identifies the bitable table a snapshot was fetched from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotSource {
    pub app_token: String,
    pub table_id: String,
    pub category: String,
}

/// A point-in-time JSON dump of up to 100 records for one news category.
///
/// Fully replaced on each fetch run; there is no historical versioning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Snapshot {
    /// ISO-8601 timestamp of the fetch run that produced this file.
    pub fetch_time: String,
    pub total_records: usize,
    pub source: SnapshotSource,
    pub records: Vec<RawRecord>,
}

/// A normalized news item as produced by the aggregation engine.
///
/// `category` is always the fixed label for `data_source` (a pure function of
/// it), and `industry` is always the flattened list representation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub publish_time: String,
    pub publisher: String,
    pub category: String,
    /// Coarse topical tag inferred from the industry classification.
    pub field: String,
    pub industry: Vec<String>,
    pub importance: String,
    pub region: String,
    pub link: String,
    pub data_source: DataSource,
}

/// Optional filter predicates, ANDed together. Absent or empty predicates
/// always pass; a `category` equal to the "all" sentinel is treated as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterRequest {
    pub category: Option<String>,
    pub publisher: Option<String>,
    pub field: Option<String>,
    pub industry: Option<String>,
    pub search: Option<String>,
}

/// Selectable filter values discovered from the merged collection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterOptions {
    pub publishers: Vec<String>,
    pub fields: Vec<String>,
    pub industries: Vec<String>,
    pub categories: Vec<String>,
}

/// Aggregate counts over the merged collection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsStats {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub last_updated: String,
}
