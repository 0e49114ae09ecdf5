//! News aggregation and filter engine.
//!
//! A pure, synchronous transform over the four snapshot files: load,
//! normalize each record into a [`NewsItem`], merge, sort by recency, and
//! answer filter / filter-option / stats queries. The engine holds no state
//! between calls and never fails: a missing or malformed snapshot contributes
//! zero items, and malformed record fields are defaulted.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::models::{FilterOptions, FilterRequest, NewsItem, NewsStats, RawRecord, Snapshot};
use crate::sources::{ALL_CATEGORIES, ALL_SOURCES, DataSource};

/// Importance marker assigned to every item. Known-approximate business rule
/// carried over from the front end, to be revisited with real scoring.
pub const IMPORTANCE_HIGH: &str = "高";

/// Field assigned when no keyword row matches.
pub const DEFAULT_FIELD: &str = "制裁合规";

/// Ordered keyword table for field inference: the first row with any keyword
/// contained in the joined, lowercased industry string wins.
const FIELD_RULES: &[(&[&str], &str)] = &[
    (&["金融", "保险"], "制裁合规"),
    (&["高科技", "芯片"], "出口管制"),
    (&["互联网", "数据", "ai"], "AI治理"),
    (&["能源", "光伏"], "投资审查"),
];

/// Infer the coarse topical field from the industry classification.
pub fn infer_field(industries: &[String]) -> &'static str {
    let joined = industries.join(" ").to_lowercase();
    FIELD_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| joined.contains(keyword)))
        .map(|(_, field)| *field)
        .unwrap_or(DEFAULT_FIELD)
}

/// Map one raw record to its normalized item.
///
/// The category label, region, and data-source tag all derive from `source`,
/// so they can never disagree.
pub fn normalize(record: &RawRecord, source: DataSource) -> NewsItem {
    let industries = record.industry_category.to_list();
    NewsItem {
        id: record.record_id.clone(),
        title: record.title.clone(),
        content: record.summary.clone(),
        publish_time: record.publish_date.clone(),
        publisher: record.publisher.clone(),
        category: source.label().to_string(),
        field: infer_field(&industries).to_string(),
        industry: industries,
        importance: IMPORTANCE_HIGH.to_string(),
        region: source.region().to_string(),
        link: if record.original_link.is_empty() {
            "#".to_string()
        } else {
            record.original_link.clone()
        },
        data_source: source,
    }
}

/// Load one category's snapshot, if present and well-formed.
pub fn load_snapshot(data_dir: &Path, source: DataSource) -> Option<Snapshot> {
    let path = data_dir.join(source.snapshot_filename());
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No snapshot for category");
            return None;
        }
    };
    match serde_json::from_slice::<Snapshot>(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed snapshot skipped");
            None
        }
    }
}

/// Load and normalize all four snapshots, merged and sorted by recency.
pub fn load_all(data_dir: &Path) -> Vec<NewsItem> {
    let mut items: Vec<NewsItem> = Vec::new();
    for source in ALL_SOURCES {
        let Some(snapshot) = load_snapshot(data_dir, source) else {
            continue;
        };
        debug!(
            source = source.slug(),
            records = snapshot.records.len(),
            "Loaded snapshot"
        );
        items.extend(snapshot.records.iter().map(|r| normalize(r, source)));
    }
    sort_by_recency(&mut items);
    items
}

/// Sort descending by parsed publish time. Unparseable timestamps sort as
/// epoch zero, pushing those items to the end.
pub fn sort_by_recency(items: &mut [NewsItem]) {
    items.sort_by_cached_key(|item| Reverse(parse_publish_time(&item.publish_time)));
}

/// Parse a publish timestamp, accepting `YYYY-MM-DD` or a full RFC 3339
/// datetime. Anything else parses as the epoch date.
pub fn parse_publish_time(value: &str) -> NaiveDate {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return datetime.date_naive();
    }
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn active(predicate: Option<&String>) -> Option<&str> {
    predicate.map(String::as_str).filter(|p| !p.is_empty())
}

/// Whether one item passes every provided predicate.
pub fn matches(item: &NewsItem, request: &FilterRequest) -> bool {
    let matches_category = match active(request.category.as_ref()) {
        None => true,
        Some(ALL_CATEGORIES) => true,
        Some(category) => item.category == category,
    };

    let matches_publisher =
        active(request.publisher.as_ref()).is_none_or(|p| item.publisher == p);

    let matches_field = active(request.field.as_ref()).is_none_or(|f| item.field == f);

    let matches_industry = active(request.industry.as_ref())
        .is_none_or(|industry| item.industry.iter().any(|i| i == industry));

    let matches_search = active(request.search.as_ref()).is_none_or(|needle| {
        let needle = needle.to_lowercase();
        item.title.to_lowercase().contains(&needle)
            || item.content.to_lowercase().contains(&needle)
    });

    matches_category && matches_publisher && matches_field && matches_industry && matches_search
}

/// Return the subset of items passing every predicate, in their merged order.
pub fn filter_news(items: &[NewsItem], request: &FilterRequest) -> Vec<NewsItem> {
    items
        .iter()
        .filter(|item| matches(item, request))
        .cloned()
        .collect()
}

/// Discover the selectable filter values from the merged collection.
///
/// Publishers, fields, and industries are the distinct non-empty values seen
/// in the items (industry lists flattened); categories are the fixed
/// four-label table. Every list is sorted and de-duplicated.
pub fn filter_options(items: &[NewsItem]) -> FilterOptions {
    FilterOptions {
        publishers: items
            .iter()
            .map(|item| item.publisher.clone())
            .filter(|p| !p.is_empty())
            .unique()
            .sorted()
            .collect(),
        fields: items
            .iter()
            .map(|item| item.field.clone())
            .filter(|f| !f.is_empty())
            .unique()
            .sorted()
            .collect(),
        industries: items
            .iter()
            .flat_map(|item| item.industry.iter().cloned())
            .filter(|i| !i.is_empty())
            .unique()
            .sorted()
            .collect(),
        categories: ALL_SOURCES
            .iter()
            .map(|source| source.label().to_string())
            .sorted()
            .collect(),
    }
}

/// Aggregate counts over the merged collection. Every category appears in the
/// map, with zero when it contributed no items.
pub fn news_stats(items: &[NewsItem]) -> NewsStats {
    let mut by_category: BTreeMap<String, usize> = ALL_SOURCES
        .iter()
        .map(|source| (source.label().to_string(), 0))
        .collect();
    for item in items {
        if let Some(count) = by_category.get_mut(&item.category) {
            *count += 1;
        }
    }
    NewsStats {
        total: items.len(),
        by_category,
        last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Industry;
    use std::path::PathBuf;

    fn raw(id: &str, title: &str, publisher: &str, date: &str, industry: Industry) -> RawRecord {
        RawRecord {
            record_id: id.to_string(),
            title: title.to_string(),
            publisher: publisher.to_string(),
            publish_date: date.to_string(),
            summary: format!("{title} 的摘要"),
            original_link: "https://example.com/a".to_string(),
            industry_category: industry,
            relevance: "相关".to_string(),
            role: String::new(),
        }
    }

    fn sample_items() -> Vec<NewsItem> {
        let mut items = vec![
            normalize(
                &raw("c1", "商务部新规", "商务部", "2025-08-15", Industry::One("高科技".into())),
                DataSource::ChinaSanctions,
            ),
            normalize(
                &raw("f1", "OFAC 更新名单", "OFAC", "2025-08-17", Industry::One("金融".into())),
                DataSource::ForeignSanctions,
            ),
            normalize(
                &raw(
                    "m1",
                    "路透报道芯片限制",
                    "Reuters",
                    "2025-08-16",
                    Industry::Many(vec!["高科技".into(), "芯片".into()]),
                ),
                DataSource::ForeignMedia,
            ),
            normalize(
                &raw("d1", "AI法案生效", "欧盟委员会", "2025-08-14", Industry::Many(vec!["互联网".into(), "数据".into()])),
                DataSource::DataCompliance,
            ),
        ];
        sort_by_recency(&mut items);
        items
    }

    // Unique scratch dir per test; std::fs only, cleaned up by the OS.
    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "horus_engine_{tag}_{}_{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_snapshot(dir: &Path, source: DataSource, records: Vec<RawRecord>) {
        let snapshot = Snapshot {
            fetch_time: "2025-08-18T09:00:00.000Z".to_string(),
            total_records: records.len(),
            source: source.descriptor(),
            records,
        };
        fs::write(
            dir.join(source.snapshot_filename()),
            serde_json::to_string_pretty(&snapshot).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_field_inference_table() {
        let field = |industries: &[&str]| {
            infer_field(&industries.iter().map(|s| s.to_string()).collect::<Vec<_>>())
        };
        assert_eq!(field(&["金融"]), "制裁合规");
        assert_eq!(field(&["保险"]), "制裁合规");
        assert_eq!(field(&["高科技"]), "出口管制");
        assert_eq!(field(&["芯片"]), "出口管制");
        assert_eq!(field(&["互联网"]), "AI治理");
        assert_eq!(field(&["数据"]), "AI治理");
        assert_eq!(field(&["AI"]), "AI治理"); // matched case-insensitively
        assert_eq!(field(&["能源"]), "投资审查");
        assert_eq!(field(&["光伏"]), "投资审查");
        assert_eq!(field(&["农业"]), DEFAULT_FIELD);
        assert_eq!(field(&[]), DEFAULT_FIELD);
    }

    #[test]
    fn test_field_inference_first_row_wins() {
        // 金融 appears in the first row, 芯片 in the second.
        let industries = vec!["芯片".to_string(), "金融".to_string()];
        assert_eq!(infer_field(&industries), "制裁合规");
    }

    #[test]
    fn test_normalize_category_agrees_with_data_source() {
        for source in ALL_SOURCES {
            let item = normalize(
                &raw("r", "t", "p", "2025-08-01", Industry::default()),
                source,
            );
            assert_eq!(item.category, source.label());
            assert_eq!(item.data_source, source);
            assert_eq!(item.region, source.region());
            assert_eq!(item.importance, IMPORTANCE_HIGH);
        }
    }

    #[test]
    fn test_normalize_defaults() {
        let record = RawRecord {
            record_id: "r1".to_string(),
            title: "无摘要".to_string(),
            publisher: String::new(),
            publish_date: String::new(),
            summary: String::new(),
            original_link: String::new(),
            industry_category: Industry::default(),
            relevance: String::new(),
            role: String::new(),
        };
        let item = normalize(&record, DataSource::ChinaSanctions);
        assert_eq!(item.content, "");
        assert_eq!(item.link, "#");
        assert_eq!(item.industry, vec!["行业通用".to_string()]);
    }

    #[test]
    fn test_merge_preserves_every_record() {
        let dir = scratch_dir("merge");
        write_snapshot(
            &dir,
            DataSource::ChinaSanctions,
            vec![raw("c1", "一", "A", "2025-08-01", Industry::default())],
        );
        write_snapshot(
            &dir,
            DataSource::ForeignSanctions,
            vec![
                raw("f1", "二", "B", "2025-08-02", Industry::default()),
                raw("f2", "三", "B", "2025-08-03", Industry::default()),
            ],
        );
        write_snapshot(&dir, DataSource::ForeignMedia, vec![]);
        write_snapshot(
            &dir,
            DataSource::DataCompliance,
            vec![raw("d1", "四", "C", "2025-08-04", Industry::default())],
        );

        let items = load_all(&dir);
        assert_eq!(items.len(), 4);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_and_malformed_snapshots_contribute_zero() {
        let dir = scratch_dir("broken");
        // Only one valid snapshot; one file is not JSON, two are absent.
        write_snapshot(
            &dir,
            DataSource::DataCompliance,
            vec![raw("d1", "数据合规", "网信办", "2025-08-10", Industry::default())],
        );
        fs::write(
            dir.join(DataSource::ChinaSanctions.snapshot_filename()),
            "not json at all",
        )
        .unwrap();

        let items = load_all(&dir);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].data_source, DataSource::DataCompliance);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_merged_order_is_non_increasing() {
        let items = sample_items();
        for pair in items.windows(2) {
            assert!(
                parse_publish_time(&pair[0].publish_time)
                    >= parse_publish_time(&pair[1].publish_time)
            );
        }
        assert_eq!(items[0].id, "f1"); // 2025-08-17 first
    }

    #[test]
    fn test_unparseable_dates_sort_to_the_end() {
        let mut items = sample_items();
        items.push(normalize(
            &raw("x1", "日期缺失", "A", "", Industry::default()),
            DataSource::ChinaSanctions,
        ));
        items.push(normalize(
            &raw("x2", "日期错误", "A", "someday", Industry::default()),
            DataSource::ChinaSanctions,
        ));
        sort_by_recency(&mut items);
        let tail: Vec<&str> = items[4..].iter().map(|i| i.id.as_str()).collect();
        assert!(tail.contains(&"x1"));
        assert!(tail.contains(&"x2"));
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let items = sample_items();
        let filtered = filter_news(&items, &FilterRequest::default());
        assert_eq!(filtered, items);
    }

    #[test]
    fn test_all_categories_sentinel_is_identity() {
        let items = sample_items();
        let request = FilterRequest {
            category: Some(ALL_CATEGORIES.to_string()),
            ..FilterRequest::default()
        };
        assert_eq!(filter_news(&items, &request), items);
    }

    #[test]
    fn test_filter_by_category() {
        let items = sample_items();
        let request = FilterRequest {
            category: Some("外国管制/制裁".to_string()),
            ..FilterRequest::default()
        };
        let filtered = filter_news(&items, &request);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "f1");
    }

    #[test]
    fn test_filter_by_unknown_category_is_empty() {
        let items = sample_items();
        let request = FilterRequest {
            category: Some("不存在的分类".to_string()),
            ..FilterRequest::default()
        };
        assert!(filter_news(&items, &request).is_empty());
    }

    #[test]
    fn test_filter_by_industry_membership() {
        let items = sample_items();
        let request = FilterRequest {
            industry: Some("芯片".to_string()),
            ..FilterRequest::default()
        };
        let filtered = filter_news(&items, &request);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "m1"); // list membership, not joined match
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_and_content() {
        let mut items = sample_items();
        items.push(normalize(
            &raw("s1", "Entity List Update", "BIS", "2025-08-13", Industry::default()),
            DataSource::ForeignSanctions,
        ));
        let request = FilterRequest {
            search: Some("entity list".to_string()),
            ..FilterRequest::default()
        };
        let filtered = filter_news(&items, &request);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "s1");

        // Matches against content (the summary) as well.
        let request = FilterRequest {
            search: Some("路透报道芯片限制 的摘要".to_string()),
            ..FilterRequest::default()
        };
        assert_eq!(filter_news(&items, &request).len(), 1);
    }

    #[test]
    fn test_predicates_are_anded() {
        let items = sample_items();
        let request = FilterRequest {
            category: Some("外国媒体报道".to_string()),
            publisher: Some("OFAC".to_string()),
            ..FilterRequest::default()
        };
        assert!(filter_news(&items, &request).is_empty());
    }

    #[test]
    fn test_filter_options_sorted_and_deduped() {
        let mut items = sample_items();
        // A duplicate publisher and industry must not appear twice.
        items.push(normalize(
            &raw("f2", "再次更新", "OFAC", "2025-08-12", Industry::One("金融".into())),
            DataSource::ForeignSanctions,
        ));
        let options = filter_options(&items);

        for list in [
            &options.publishers,
            &options.fields,
            &options.industries,
            &options.categories,
        ] {
            let mut sorted = list.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(*list, sorted);
        }
        assert_eq!(options.categories.len(), 4);
        assert_eq!(
            options.publishers.iter().filter(|p| *p == "OFAC").count(),
            1
        );
        assert!(options.industries.contains(&"芯片".to_string()));
    }

    #[test]
    fn test_news_stats_counts_every_category() {
        let items = sample_items();
        let stats = news_stats(&items);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_category.len(), 4);
        assert_eq!(stats.by_category["中国管制/制裁"], 1);
        assert_eq!(stats.by_category["数据合规/AI资讯"], 1);
    }

    #[test]
    fn test_news_stats_zero_for_absent_category() {
        let stats = news_stats(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.by_category.values().all(|&count| count == 0));
        assert_eq!(stats.by_category.len(), 4);
    }
}
