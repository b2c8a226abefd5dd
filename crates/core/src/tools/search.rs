//! # Web Search
//!
//! Research lookup with a fallback chain:
//!
//! 1. Tavily, when an API key is configured
//! 2. SearXNG (configured instance, then local instances)
//! 3. Static placeholder notes
//!
//! Backends that are unreachable are skipped, so `search` only errors when
//! the HTTP client itself cannot be built.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::SearchConfig;

use super::Searcher;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// A single search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct WebSearcher {
    config: SearchConfig,
    client: reqwest::Client,
}

impl WebSearcher {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("draftloop-research/1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    /// Ordered SearXNG endpoints to try
    fn searxng_endpoints(&self) -> Vec<String> {
        let mut endpoints = Vec::new();
        if let Some(custom_url) = &self.config.searxng_url {
            endpoints.push(format!("{}/search", custom_url.trim_end_matches('/')));
        }
        endpoints.push("http://localhost:8888/search".to_string());
        endpoints.push("http://127.0.0.1:8888/search".to_string());
        endpoints
    }

    async fn try_tavily(&self, api_key: &str, query: &str) -> Result<Vec<SearchHit>> {
        let body = json!({
            "query": query,
            "max_results": self.config.max_results,
        });
        let response = self
            .client
            .post(TAVILY_ENDPOINT)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach Tavily")?
            .error_for_status()
            .context("Tavily rejected the request")?;
        let json: Value = response
            .json()
            .await
            .context("Failed to parse Tavily response")?;
        Ok(parse_tavily(&json, self.config.max_results as usize))
    }

    async fn try_searxng(&self, query: &str) -> Option<Vec<SearchHit>> {
        for endpoint in self.searxng_endpoints() {
            let url = format!("{}?q={}&format=json", endpoint, urlencoding::encode(query));

            if let Ok(response) = self.client.get(&url).send().await {
                if let Ok(json) = response.json::<Value>().await {
                    if let Some(hits) = parse_searxng(&json, self.config.max_results as usize) {
                        tracing::debug!(endpoint = %endpoint, hits = hits.len(), "SearXNG answered");
                        return Some(hits);
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl Searcher for WebSearcher {
    async fn search(&self, topic: &str) -> Result<String> {
        if let Some(api_key) = &self.config.tavily_api_key {
            match self.try_tavily(api_key, topic).await {
                Ok(hits) if !hits.is_empty() => return Ok(format_hits(&hits)),
                Ok(_) => tracing::warn!(topic = %topic, "Tavily returned no results"),
                Err(e) => tracing::warn!("Tavily search failed: {:#}", e),
            }
        }

        if let Some(hits) = self.try_searxng(topic).await {
            if !hits.is_empty() {
                return Ok(format_hits(&hits));
            }
        }

        tracing::warn!(topic = %topic, "No search backend available, using placeholder notes");
        Ok(placeholder_notes(topic))
    }
}

/// Extract hits from a Tavily `/search` response
pub fn parse_tavily(json: &Value, max_results: usize) -> Vec<SearchHit> {
    json.get("results")
        .and_then(|r| r.as_array())
        .map(|results| {
            results
                .iter()
                .take(max_results)
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "url"),
                    snippet: str_field(r, "content"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Extract hits from a SearXNG JSON response; `None` if it is not one
pub fn parse_searxng(json: &Value, max_results: usize) -> Option<Vec<SearchHit>> {
    let results = json.get("results")?.as_array()?;
    Some(
        results
            .iter()
            .take(max_results)
            .map(|r| SearchHit {
                title: str_field(r, "title"),
                url: str_field(r, "url"),
                snippet: str_field(r, "content"),
            })
            .collect(),
    )
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            let url = if hit.url.is_empty() { "N/A" } else { &hit.url };
            if hit.title.is_empty() {
                format!("Source: {}\n{}", url, hit.snippet)
            } else {
                format!("Source: {}\n{}\n{}", url, hit.title, hit.snippet)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Generic research scaffold used when every search backend is down
pub fn placeholder_notes(topic: &str) -> String {
    format!(
        "Placeholder research data for '{topic}':

Key Facts:
- {topic} is a significant topic with implications across several industries.
- It has drawn sustained attention from practitioners and commentators in recent years.
- Its history spans several decades, with notable acceleration recently.

Statistics:
- Market estimates commonly cited range from $50-100 billion, growing around 15% a year.
- Adoption is reported to be increasing year over year across major sectors.
- Investment in the area has reached record levels in the past two years.

Current Trends:
1. Digital transformation is accelerating the pace of change.
2. Sustainability and ethics are reshaping strategies.
3. AI and automation create new opportunities and challenges.
4. Regulation is evolving to keep pace with innovation.

Key Stakeholders:
- Businesses and startups driving innovation.
- Government bodies setting policy.
- Consumers whose behaviour is shifting.
- Researchers providing evidence-based insight.

Potential Angles:
- Historical evolution and where things stand today.
- Benefits and challenges for different stakeholders.
- Outlook for the next 5-10 years.
- Practical takeaways for everyday readers.

NOTE: placeholder data. Set TAVILY_API_KEY or SEARXNG_URL for real search results."
    )
}
