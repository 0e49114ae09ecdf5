//! Paginated fetch job: pull up to 100 records for one category and build a
//! snapshot.
//!
//! One code path serves all four categories; everything category-specific
//! lives in [`DataSource`]. The loop requests pages strictly in sequence
//! (each request needs the previous page's continuation token), sleeps a
//! fixed delay between pages as a crude rate-limit accommodation, and stops
//! at the record cap, at the page cap, or when the API reports no more pages.
//! There is no retry policy; any failure aborts the run and no snapshot is
//! built.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::error::Error;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::api::{
    ApiRecord, FIELD_DATE, FIELD_INDUSTRY, FIELD_LINK, FIELD_PUBLISHER, FIELD_RELEVANCE,
    FIELD_ROLE, FIELD_SUMMARY, FIELD_TITLE, SearchRecords,
};
use crate::models::{Industry, RawRecord, Snapshot};
use crate::sources::DataSource;

/// Limits for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Stop once this many records have been accumulated; the final page is
    /// truncated to land exactly here.
    pub target_limit: usize,
    /// Hard cap on the number of page requests per run.
    pub page_limit: usize,
    /// Fixed delay between page requests while more pages are pending.
    pub inter_page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            target_limit: 100,
            page_limit: 10,
            inter_page_delay: Duration::from_millis(800),
        }
    }
}

/// Run the fetch loop for one category and build its snapshot.
///
/// The snapshot is only constructed after the loop completes; callers persist
/// it afterwards, so a failed run never leaves a partial file behind.
#[instrument(level = "info", skip_all, fields(source = source.slug()))]
pub async fn fetch_category(
    searcher: &impl SearchRecords,
    source: DataSource,
    options: &FetchOptions,
) -> Result<Snapshot, Box<dyn Error>> {
    let mut records: Vec<RawRecord> = Vec::new();
    let mut page_token: Option<String> = None;
    let mut has_more = true;
    let mut page_count = 0usize;

    while has_more && page_count < options.page_limit && records.len() < options.target_limit {
        page_count += 1;
        info!(page = page_count, "Requesting search page");

        let page = searcher.search_page(page_token.as_deref()).await?;
        records.extend(page.items.iter().map(format_record));

        if records.len() >= options.target_limit {
            records.truncate(options.target_limit);
            has_more = false;
        } else {
            has_more = page.has_more;
            page_token = page.page_token;
        }

        info!(
            accumulated = records.len(),
            target = options.target_limit,
            "Accumulated records"
        );

        if has_more {
            sleep(options.inter_page_delay).await;
        }
    }

    info!(count = records.len(), "Fetch loop complete");
    Ok(Snapshot {
        fetch_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        total_records: records.len(),
        source: source.descriptor(),
        records,
    })
}

/// Format one raw API record into the snapshot record shape.
///
/// Multi-value text columns contribute the text of their first segment; the
/// date column is a millisecond timestamp converted to `YYYY-MM-DD` (UTC);
/// the industry column keeps its string-or-list shape.
pub fn format_record(record: &ApiRecord) -> RawRecord {
    RawRecord {
        record_id: record.record_id.clone(),
        title: extract_text(&record.fields, FIELD_TITLE),
        publisher: extract_text(&record.fields, FIELD_PUBLISHER),
        publish_date: extract_date(&record.fields, FIELD_DATE),
        summary: extract_text(&record.fields, FIELD_SUMMARY),
        original_link: extract_text(&record.fields, FIELD_LINK),
        industry_category: extract_industry(&record.fields),
        relevance: extract_text(&record.fields, FIELD_RELEVANCE),
        role: extract_text(&record.fields, FIELD_ROLE),
    }
}

fn extract_text(fields: &Map<String, Value>, name: &str) -> String {
    fields
        .get(name)
        .and_then(Value::as_array)
        .and_then(|segments| segments.first())
        .and_then(|segment| segment.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn extract_date(fields: &Map<String, Value>, name: &str) -> String {
    fields
        .get(name)
        .and_then(|field| field.get("value"))
        .and_then(Value::as_array)
        .and_then(|values| values.first())
        .and_then(Value::as_f64)
        .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_default()
}

fn extract_industry(fields: &Map<String, Value>) -> Industry {
    match fields.get(FIELD_INDUSTRY) {
        Some(Value::String(s)) => Industry::One(s.clone()),
        Some(Value::Array(values)) => Industry::Many(
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => Industry::default(),
    }
}
