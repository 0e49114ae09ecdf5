//! The four fixed news categories and their bitable configuration.
//!
//! Each category maps to one bitable table and one snapshot file. The fetch
//! job and the aggregation engine both key everything off [`DataSource`], so
//! the category label of a normalized item is always a pure function of the
//! snapshot it came from.

use serde::{Deserialize, Serialize};

use crate::models::SnapshotSource;

/// Sentinel category value meaning "no category restriction".
pub const ALL_CATEGORIES: &str = "全部资讯";

/// One of the four news categories, identified by its data-source slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    ChinaSanctions,
    ForeignSanctions,
    ForeignMedia,
    DataCompliance,
}

/// All four sources, in the order the front end lists them.
pub const ALL_SOURCES: [DataSource; 4] = [
    DataSource::ChinaSanctions,
    DataSource::ForeignSanctions,
    DataSource::ForeignMedia,
    DataSource::DataCompliance,
];

impl DataSource {
    /// Stable slug used in snapshot filenames and the `dataSource` JSON tag.
    pub fn slug(&self) -> &'static str {
        match self {
            DataSource::ChinaSanctions => "china-sanctions",
            DataSource::ForeignSanctions => "foreign-sanctions",
            DataSource::ForeignMedia => "foreign-media",
            DataSource::DataCompliance => "data-compliance",
        }
    }

    /// Human-readable category label shown in the UI. Exactly four values
    /// exist; [`crate::engine`] relies on this table never producing a fifth.
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::ChinaSanctions => "中国管制/制裁",
            DataSource::ForeignSanctions => "外国管制/制裁",
            DataSource::ForeignMedia => "外国媒体报道",
            DataSource::DataCompliance => "数据合规/AI资讯",
        }
    }

    /// Bitable app token of the table backing this category.
    pub fn app_token(&self) -> &'static str {
        match self {
            DataSource::ChinaSanctions => "C3tXbZ9hoatPFrsw9v5cwZdlnog",
            DataSource::ForeignSanctions => "Bkasbun8ua4fQ6suGjvcKGT3nre",
            DataSource::ForeignMedia => "QfTWbGeJ2aHkPxswAvZcQm49nkc",
            DataSource::DataCompliance => "MxkwbaX9ia5W7Xsaw9gc1UZdnQd",
        }
    }

    /// Bitable table id of the table backing this category.
    pub fn table_id(&self) -> &'static str {
        match self {
            DataSource::ChinaSanctions => "tblxws3UgH8PrLNk",
            DataSource::ForeignSanctions => "tbl6aOnlKdxnVqj6",
            DataSource::ForeignMedia => "tblPmQe6vWrFh2Lc",
            DataSource::DataCompliance => "tblYatZd4nlatmkA",
        }
    }

    /// Fixed snapshot filename for this category.
    pub fn snapshot_filename(&self) -> String {
        format!("{}-news.json", self.slug())
    }

    /// Coarse region marker, inferred solely from the source slug.
    /// Known-approximate business rule carried over from the front end.
    pub fn region(&self) -> &'static str {
        if self.slug().contains("china") {
            "中国"
        } else {
            "国际"
        }
    }

    /// Whether the fetch request for this category filters on the relevance
    /// column. Only the foreign-sanctions table has the column on every row;
    /// the others omit the filter to tolerate per-table schema drift.
    pub fn filters_relevance(&self) -> bool {
        matches!(self, DataSource::ForeignSanctions)
    }

    /// Parse a slug back into a source.
    pub fn from_slug(slug: &str) -> Option<Self> {
        ALL_SOURCES.iter().copied().find(|s| s.slug() == slug)
    }

    /// Source descriptor embedded in the snapshot file.
    pub fn descriptor(&self) -> SnapshotSource {
        SnapshotSource {
            app_token: self.app_token().to_string(),
            table_id: self.table_id().to_string(),
            category: self.label().to_string(),
        }
    }
}
