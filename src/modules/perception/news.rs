use reqwest::Client;
use anyhow::{Result, anyhow};
use serde_json::Value;
use tracing::warn;

use super::structs::Article;

const NEWS_ENDPOINT: &str = "https://www.alphavantage.co/query";

pub struct NewsClient {
    client: Client,
    api_key: String,
}

impl NewsClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    /// 严格版：缺凭证 / 网络错误 / 非 JSON / 缺 feed 字段都会向上抛
    /// 仅在 error_policy = propagate 时由 Controller 直接调用
    pub async fn try_fetch_news(&self, ticker: &str, limit: usize) -> Result<Vec<Article>> {
        if self.api_key.is_empty() {
            return Err(anyhow!("Alpha Vantage API key missing. Check secrets/.env"));
        }

        let resp = self.client.get(NEWS_ENDPOINT)
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("tickers", ticker),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("News API status: {}", resp.status()));
        }

        let body: Value = resp.json().await?;
        parse_feed(&body, limit).ok_or_else(|| anyhow!("News API response missing 'feed' array"))
    }

    /// Fail-soft 版：任何失败都返回空列表，保证面板总有东西可渲染
    pub async fn fetch_news(&self, ticker: &str, limit: usize) -> Vec<Article> {
        match self.try_fetch_news(ticker, limit).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!("⚠️ [{}] News fetch failed: {}. Serving empty feed.", ticker, e);
                Vec::new()
            }
        }
    }
}

/// feed 解析是纯函数，方便离线测试
/// 缺字段按固定默认值兜底，条数截断到 limit
pub fn parse_feed(body: &Value, limit: usize) -> Option<Vec<Article>> {
    let feed = body.get("feed")?.as_array()?;

    let articles = feed.iter().take(limit).map(|item| Article {
        title: item["title"].as_str().unwrap_or("No title").to_string(),
        url: item["url"].as_str().unwrap_or("#").to_string(),
        source: item["source"].as_str().unwrap_or("Unknown").to_string(),
        description: item["summary"].as_str().unwrap_or("").to_string(),
    }).collect();

    Some(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_feed_maps_fields() {
        let body = json!({
            "feed": [{
                "title": "Progressive launches new telematics product",
                "url": "https://example.com/a",
                "source": "Reuters",
                "summary": "Usage-based pricing expansion."
            }]
        });

        let articles = parse_feed(&body, 5).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Progressive launches new telematics product");
        assert_eq!(articles[0].url, "https://example.com/a");
        assert_eq!(articles[0].source, "Reuters");
        assert_eq!(articles[0].description, "Usage-based pricing expansion.");
    }

    #[test]
    fn parse_feed_substitutes_defaults_for_missing_fields() {
        let body = json!({ "feed": [{}] });

        let articles = parse_feed(&body, 5).unwrap();
        assert_eq!(articles[0].title, "No title");
        assert_eq!(articles[0].url, "#");
        assert_eq!(articles[0].source, "Unknown");
        assert_eq!(articles[0].description, "");
    }

    #[test]
    fn parse_feed_truncates_to_limit() {
        let items: Vec<_> = (0..12).map(|i| json!({"title": format!("t{}", i)})).collect();
        let body = json!({ "feed": items });

        assert_eq!(parse_feed(&body, 5).unwrap().len(), 5);
        assert_eq!(parse_feed(&body, 10).unwrap().len(), 10);
    }

    #[test]
    fn parse_feed_rejects_missing_or_malformed_feed() {
        assert!(parse_feed(&json!({"Information": "rate limited"}), 5).is_none());
        assert!(parse_feed(&json!({"feed": "not-an-array"}), 5).is_none());
    }

    #[tokio::test]
    async fn missing_api_key_errors_strict_and_soft_fails_empty() {
        // 没有 key 不发请求：严格版直接报错，fail-soft 版退成空列表
        let client = NewsClient::new(Client::new(), String::new());
        assert!(client.try_fetch_news("PGR", 5).await.is_err());
        assert!(client.fetch_news("PGR", 5).await.is_empty());
    }
}
