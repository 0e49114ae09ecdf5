//! Feishu bitable API client.
//!
//! Two calls are consumed: the tenant-access-token exchange and the
//! record-search endpoint. Both report failures in-band via a `code` field;
//! any non-zero code is fatal for the current fetch run.
//!
//! The [`SearchRecords`] trait seats the pagination seam so the fetch loop in
//! [`crate::fetch`] can be driven by a scripted searcher in tests instead of
//! live HTTP.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use tracing::{debug, info, instrument};

use crate::sources::DataSource;

/// Base URL of the Feishu open API.
pub const FEISHU_BASE_URL: &str = "https://open.feishu.cn/open-apis";

/// Requested page size for record search.
pub const PAGE_SIZE: u32 = 100;

// Column names of the news tables.
pub const FIELD_TITLE: &str = "新闻标题-中文";
pub const FIELD_PUBLISHER: &str = "发布机构";
pub const FIELD_DATE: &str = "配置列-仅日期";
pub const FIELD_SUMMARY: &str = "AI 总结";
pub const FIELD_LINK: &str = "原文链接";
pub const FIELD_INDUSTRY: &str = "行业分类";
pub const FIELD_RELEVANCE: &str = "相关性判断";
pub const FIELD_ROLE: &str = "role";

/// Sort column: publish time in Beijing time, newest first.
pub const SORT_FIELD: &str = "发布时间-北京-database";

/// Columns requested from every news table.
pub const NEWS_FIELD_NAMES: [&str; 8] = [
    FIELD_TITLE,
    FIELD_PUBLISHER,
    FIELD_DATE,
    FIELD_SUMMARY,
    FIELD_LINK,
    FIELD_INDUSTRY,
    FIELD_RELEVANCE,
    FIELD_ROLE,
];

/// App credentials for the tenant-access-token exchange.
#[derive(Debug, Clone)]
pub struct FeishuCredentials {
    pub app_id: String,
    pub app_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Result<String, Box<dyn Error>> {
        match self.tenant_access_token {
            Some(token) if self.code == 0 => Ok(token),
            _ => Err(format!(
                "failed to obtain tenant_access_token (code {}): {}",
                self.code,
                if self.msg.is_empty() { "unknown error" } else { self.msg.as_str() }
            )
            .into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SortSpec {
    field_name: &'static str,
    desc: bool,
}

#[derive(Debug, Serialize)]
struct SearchCondition {
    field_name: &'static str,
    operator: &'static str,
    value: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct SearchFilter {
    conjunction: &'static str,
    conditions: Vec<SearchCondition>,
}

impl SearchFilter {
    /// Restrict results to rows the upstream pipeline marked relevant.
    fn relevant_only() -> Self {
        SearchFilter {
            conjunction: "and",
            conditions: vec![SearchCondition {
                field_name: FIELD_RELEVANCE,
                operator: "is",
                value: vec!["相关"],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    field_names: Vec<&'static str>,
    sort: Vec<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<SearchFilter>,
    automatic_fields: bool,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

impl SearchRequest {
    fn for_source(source: DataSource, page_token: Option<&str>) -> Self {
        SearchRequest {
            field_names: NEWS_FIELD_NAMES.to_vec(),
            sort: vec![SortSpec {
                field_name: SORT_FIELD,
                desc: true,
            }],
            filter: source.filters_relevance().then(SearchFilter::relevant_only),
            automatic_fields: false,
            page_size: PAGE_SIZE,
            page_token: page_token.map(str::to_string),
        }
    }
}

/// One raw record as returned by the search endpoint. The `fields` payload is
/// kept untyped; [`crate::fetch::format_record`] extracts what it needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRecord {
    pub record_id: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
}

/// One page of search results.
#[derive(Debug, Default, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub items: Vec<ApiRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub total: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<SearchData>,
}

impl SearchResponse {
    fn into_data(self) -> Result<SearchData, Box<dyn Error>> {
        if self.code != 0 {
            return Err(format!(
                "bitable search returned error code {}: {}",
                self.code,
                if self.msg.is_empty() { "unknown error" } else { self.msg.as_str() }
            )
            .into());
        }
        Ok(self.data.unwrap_or_default())
    }
}

/// An authenticated bitable client.
#[derive(Debug)]
pub struct BitableClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl BitableClient {
    /// Exchange app credentials for a short-lived tenant access token.
    ///
    /// Fails before any network call when a credential value is missing, and
    /// fails fatally on a non-zero response code.
    #[instrument(level = "info", skip_all)]
    pub async fn authenticate(
        base_url: &str,
        credentials: &FeishuCredentials,
    ) -> Result<Self, Box<dyn Error>> {
        if credentials.app_id.is_empty() || credentials.app_secret.is_empty() {
            return Err("FEISHU_APP_ID or FEISHU_APP_SECRET is not configured".into());
        }

        let http = reqwest::Client::new();
        let url = format!("{}/auth/v3/tenant_access_token/internal", base_url);
        let response: TokenResponse = http
            .post(&url)
            .json(&serde_json::json!({
                "app_id": credentials.app_id,
                "app_secret": credentials.app_secret,
            }))
            .send()
            .await?
            .json()
            .await?;

        let token = response.into_token()?;
        info!("Obtained tenant access token");
        Ok(BitableClient {
            http,
            base_url: base_url.to_string(),
            token,
        })
    }

    /// Fetch one page of records for a category's table.
    #[instrument(level = "info", skip_all, fields(source = source.slug()))]
    pub async fn search_page(
        &self,
        source: DataSource,
        page_token: Option<&str>,
    ) -> Result<SearchData, Box<dyn Error>> {
        let url = format!(
            "{}/bitable/v1/apps/{}/tables/{}/records/search",
            self.base_url,
            source.app_token(),
            source.table_id()
        );
        let request = SearchRequest::for_source(source, page_token);

        let response: SearchResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        let data = response.into_data()?;
        debug!(
            items = data.items.len(),
            has_more = data.has_more,
            total = data.total,
            "Fetched search page"
        );
        Ok(data)
    }
}

/// Pagination seam for the fetch loop.
///
/// The live implementation wraps [`BitableClient`] for one category; tests
/// drive the loop with scripted pages.
pub trait SearchRecords {
    async fn search_page(&self, page_token: Option<&str>) -> Result<SearchData, Box<dyn Error>>;
}

/// Live searcher binding a client to one category.
#[derive(Debug)]
pub struct CategorySearch<'a> {
    pub client: &'a BitableClient,
    pub source: DataSource,
}

impl SearchRecords for CategorySearch<'_> {
    async fn search_page(&self, page_token: Option<&str>) -> Result<SearchData, Box<dyn Error>> {
        self.client.search_page(self.source, page_token).await
    }
}
