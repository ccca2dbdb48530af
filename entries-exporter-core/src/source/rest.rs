//! Gravity Forms REST API v2 client.
//!
//! Endpoints used:
//! - `GET /wp-json/gf/v2/forms/{id}` for the form definition
//! - `GET /wp-json/gf/v2/forms/{id}/entries` for counts and pages
//!
//! Entries are requested sorted by id ascending so that offset paging is
//! stable while the run is in progress.

use super::{Entry, EntrySource, Form, Paging, SearchCriteria};
use crate::config::{Secret, SourceConfig};
use crate::error::ExporterError;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use url::Url;

/// User agent string for API requests.
const USER_AGENT_VALUE: &str = concat!("entries-exporter/", env!("CARGO_PKG_VERSION"));

const API_PREFIX: &str = "wp-json/gf/v2";

/// Body of an entries listing.
#[derive(Debug, Deserialize)]
struct EntriesPage {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    entries: Vec<Entry>,
}

/// Client for one WordPress site's Gravity Forms REST API.
#[derive(Debug, Clone)]
pub struct GravityFormsClient {
    client: reqwest::Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: Secret,
}

impl GravityFormsClient {
    /// Creates a client from the source settings.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            ExporterError::configuration(format!("source base_url is not a valid URL: {}", e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ExporterError::source_failed("failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
        })
    }

    /// URL of a form definition.
    pub fn form_url(&self, form_id: u32) -> Result<Url> {
        parse_url(&format!("{}/{}/forms/{}", self.base_url, API_PREFIX, form_id))
    }

    /// URL of one page of a form's entries.
    pub fn entries_url(
        &self,
        form_id: u32,
        search: &SearchCriteria,
        paging: Paging,
    ) -> Result<Url> {
        let mut url = parse_url(&format!(
            "{}/{}/forms/{}/entries",
            self.base_url, API_PREFIX, form_id
        ))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("paging[page_size]", &paging.page_size.to_string());
            query.append_pair("paging[offset]", &paging.offset.to_string());
            query.append_pair("sorting[key]", "id");
            query.append_pair("sorting[direction]", "ASC");
            if !search.is_unbounded() {
                query.append_pair("search", &search.to_search_json().to_string());
            }
        }

        Ok(url)
    }

    async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        tracing::trace!("GET {}", url);

        let mut request = self.client.get(url.clone());
        if !self.consumer_key.is_empty() {
            request = request.basic_auth(&self.consumer_key, Some(self.consumer_secret.expose()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExporterError::source_failed(format!("GET {}", url.path()), e))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ExporterError::source_rejected(format!(
                "{} not found",
                url.path()
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ExporterError::source_rejected(format!(
                "access to {} denied ({}); check the consumer key and secret",
                url.path(),
                status
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExporterError::source_rejected(format!(
                "{} returned {}: {}",
                url.path(),
                status,
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExporterError::source_failed(format!("decoding {}", url.path()), e))
    }

    async fn get_page(
        &self,
        form_id: u32,
        search: &SearchCriteria,
        paging: Paging,
    ) -> Result<EntriesPage> {
        let url = self.entries_url(form_id, search, paging)?;
        self.get_json(url).await
    }
}

#[async_trait]
impl EntrySource for GravityFormsClient {
    async fn get_form(&self, form_id: u32) -> Result<Form> {
        let url = self.form_url(form_id)?;
        self.get_json(url).await
    }

    async fn count_entries(&self, form_id: u32, search: &SearchCriteria) -> Result<u64> {
        let page = self
            .get_page(form_id, search, Paging::page(0, 1))
            .await?;
        Ok(page.total_count)
    }

    async fn get_entries(
        &self,
        form_id: u32,
        search: &SearchCriteria,
        paging: Paging,
    ) -> Result<Vec<Entry>> {
        let page = self.get_page(form_id, search, paging).await?;
        Ok(page.entries)
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| {
        ExporterError::configuration(format!("Invalid source URL '{}': {}", raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> GravityFormsClient {
        GravityFormsClient::new(&SourceConfig {
            base_url: base_url.to_string(),
            consumer_key: "ck_1".to_string(),
            consumer_secret: Secret::new("cs_1"),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_form_url_keeps_site_path() {
        let client = client("https://www.example.edu/admissions/");
        assert_eq!(
            client.form_url(7).unwrap().as_str(),
            "https://www.example.edu/admissions/wp-json/gf/v2/forms/7"
        );
    }

    #[test]
    fn test_entries_url_paging_and_sorting() {
        let client = client("https://www.example.edu");
        let url = client
            .entries_url(3, &SearchCriteria::default(), Paging::page(2, 20))
            .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.path(), "/wp-json/gf/v2/forms/3/entries");
        assert!(pairs.contains(&("paging[page_size]".to_string(), "20".to_string())));
        assert!(pairs.contains(&("paging[offset]".to_string(), "40".to_string())));
        assert!(pairs.contains(&("sorting[key]".to_string(), "id".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "search"));
    }

    #[test]
    fn test_entries_url_includes_search() {
        let client = client("https://www.example.edu");
        let search = SearchCriteria::parse(Some("2024-01-01"), None).unwrap();
        let url = client.entries_url(3, &search, Paging::page(0, 20)).unwrap();

        let search_param = url
            .query_pairs()
            .find(|(k, _)| k == "search")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&search_param).unwrap();

        assert_eq!(parsed, json!({ "start_date": "2024-01-01 00:00:00" }));
    }

    #[test]
    fn test_entries_page_deserializes() {
        let page: EntriesPage = serde_json::from_value(json!({
            "total_count": 45,
            "entries": [
                { "id": "1", "date_created": "2024-01-01 10:00:00", "1": "Ada" },
                { "id": "2", "date_created": "2024-01-02 10:00:00", "1": "Grace" }
            ]
        }))
        .unwrap();

        assert_eq!(page.total_count, 45);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[1].id(), Some(2));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = GravityFormsClient::new(&SourceConfig {
            base_url: "not a url".to_string(),
            consumer_key: String::new(),
            consumer_secret: Secret::default(),
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(ExporterError::Configuration { .. })));
    }
}
