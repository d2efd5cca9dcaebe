use reqwest::Client;
use anyhow::{Result, anyhow};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::dashboard_profile::LlmConfig;
use crate::modules::perception::Article;

/// 空新闻时的固定文案，不调用模型直接返回
pub const NO_NEWS_FALLBACK: &str = "No recent news available.";
pub const BRIEF_FALLBACK: &str = "Analysis temporarily unavailable.";
pub const FULL_FALLBACK: &str = "Detailed analysis temporarily unavailable.";

const BRIEF_SYSTEM_PROMPT: &str = "Create a 2-sentence competitive intelligence summary focusing on key business developments with a focus on marketing.";
const FULL_SYSTEM_PROMPT: &str = "You are a marketing competitive intelligence analyst. Provide high level overview of business updates and their implications on marketing activity for a company.";

pub struct Summarizer {
    client: Client,
    api_key: String,
    endpoint: String,
    llm: LlmConfig,
    brief_prompt_articles: usize,
}

impl Summarizer {
    pub fn new(
        client: Client,
        api_key: String,
        endpoint: String,
        llm: LlmConfig,
        brief_prompt_articles: usize,
    ) -> Self {
        Self { client, api_key, endpoint, llm, brief_prompt_articles }
    }

    /// 首页卡片用的简版总结。新闻为空时短路，不打 API
    pub async fn try_brief_summary(&self, company: &str, articles: &[Article]) -> Result<String> {
        if articles.is_empty() {
            return Ok(NO_NEWS_FALLBACK.to_string());
        }

        let prompt = build_brief_prompt(company, articles, self.brief_prompt_articles);
        self.call_llm(BRIEF_SYSTEM_PROMPT, &prompt, self.llm.brief_max_tokens).await
    }

    pub async fn brief_summary(&self, company: &str, articles: &[Article]) -> String {
        match self.try_brief_summary(company, articles).await {
            Ok(s) => s,
            Err(e) => {
                warn!("⚠️ [{}] Brief summary failed: {}. Serving fallback.", company, e);
                BRIEF_FALLBACK.to_string()
            }
        }
    }

    /// Deep Dive 用的详版总结：全部标题 + 摘要一起喂给模型
    pub async fn try_full_summary(&self, company: &str, articles: &[Article]) -> Result<String> {
        let prompt = build_full_prompt(company, articles);
        self.call_llm(FULL_SYSTEM_PROMPT, &prompt, self.llm.full_max_tokens).await
    }

    pub async fn full_summary(&self, company: &str, articles: &[Article]) -> String {
        match self.try_full_summary(company, articles).await {
            Ok(s) => s,
            Err(e) => {
                warn!("⚠️ [{}] Full summary failed: {}. Serving fallback.", company, e);
                FULL_FALLBACK.to_string()
            }
        }
    }

    /// Azure OpenAI chat completions。单次调用，不重试（面板没有正确性要求）
    async fn call_llm(&self, sys_prompt: &str, user_prompt: &str, max_tokens: u32) -> Result<String> {
        if self.api_key.is_empty() || self.endpoint.is_empty() {
            return Err(anyhow!("Azure OpenAI credentials missing. Check secrets/.env"));
        }

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.llm.deployment,
            self.llm.api_version
        );
        let body = json!({
            "messages": [
                {"role": "system", "content": sys_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "max_tokens": max_tokens,
            "temperature": self.llm.temperature,
        });

        let resp = self.client.post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} API Error ({}): {}", self.llm.deployment, status, err));
        }

        let json_res: Value = resp.json().await?;
        json_res["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Completion response missing choices[0].message.content"))
    }
}

/// 简版 prompt：只取前 top_n 条标题
pub fn build_brief_prompt(company: &str, articles: &[Article], top_n: usize) -> String {
    let mut news_text = format!("Recent {} news:\n", company);
    for article in articles.iter().take(top_n) {
        news_text.push_str(&format!("- {}\n", article.title));
    }
    news_text
}

/// 详版 prompt：全部标题 + 摘要
pub fn build_full_prompt(company: &str, articles: &[Article]) -> String {
    let mut news_text = format!("Recent news about {}:\n\n", company);
    for article in articles {
        news_text.push_str(&format!("Title: {}\nSummary: {}\n\n", article.title, article.description));
    }
    news_text
}
