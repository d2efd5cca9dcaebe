use std::collections::HashSet;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::dashboard_profile::{CompetitorEntity, DashboardProfile, ErrorPolicy, LimitConfig};
use crate::modules::brain::Summarizer;
use crate::modules::perception::{Article, NewsClient};
use super::cache::{EntityCache, EntityPhase};

/// Deep Dive 区块。没有缓存时只给出提示，绝不自己发起抓取
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetailSection {
    RefreshFirst,
    Ready {
        full_summary: String,
        headlines: Vec<Article>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityCard {
    pub name: String,
    pub ticker: String,
    pub phase: EntityPhase,
    pub summary: Option<String>,
    pub article_count: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub cards: Vec<EntityCard>,
}

/// 持有固定 roster、实体缓存和 Deep Dive 标记，驱动一次次渲染
/// 所有会话状态都在这里，没有任何全局可变存储
pub struct DashboardController {
    roster: Vec<CompetitorEntity>,
    cache: EntityCache,
    detail_open: HashSet<String>,
    news: NewsClient,
    summarizer: Summarizer,
    limits: LimitConfig,
    error_policy: ErrorPolicy,
}

impl DashboardController {
    pub fn new(profile: &DashboardProfile, news: NewsClient, summarizer: Summarizer) -> Self {
        Self {
            roster: profile.competitors.clone(),
            cache: EntityCache::new(),
            detail_open: HashSet::new(),
            news,
            summarizer,
            limits: profile.limits.clone(),
            error_policy: profile.error_policy,
        }
    }

    pub fn roster(&self) -> &[CompetitorEntity] {
        &self.roster
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    fn require_tracked(&self, ticker: &str) -> Result<()> {
        if self.roster.iter().any(|c| c.ticker == ticker) {
            Ok(())
        } else {
            Err(anyhow!("Ticker {} is not in the tracked roster", ticker))
        }
    }

    pub fn trigger(&mut self, ticker: &str) -> Result<()> {
        self.require_tracked(ticker)?;
        self.cache.trigger(ticker);
        Ok(())
    }

    pub fn trigger_all(&mut self) {
        let ids: Vec<String> = self.roster.iter().map(|c| c.ticker.clone()).collect();
        self.cache.trigger_all(ids.iter().map(|s| s.as_str()));
        info!("🔄 Refresh-all queued for {} competitors", ids.len());
    }

    /// [决策] clear 同时强制关闭该实体的 Deep Dive，
    /// 避免 detail 视图悬在已被清掉的数据上
    pub fn clear(&mut self, ticker: &str) -> Result<()> {
        self.require_tracked(ticker)?;
        self.cache.clear(ticker);
        self.detail_open.remove(ticker);
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.cache.clear_all();
        self.detail_open.clear();
        info!("🧹 Cache cleared for the whole roster");
    }

    pub fn open_detail(&mut self, ticker: &str) -> Result<()> {
        self.require_tracked(ticker)?;
        self.detail_open.insert(ticker.to_string());
        Ok(())
    }

    pub fn close_detail(&mut self, ticker: &str) -> Result<()> {
        self.require_tracked(ticker)?;
        self.detail_open.remove(ticker);
        Ok(())
    }

    pub fn detail_is_open(&self, ticker: &str) -> bool {
        self.detail_open.contains(ticker)
    }

    /// 一次渲染：先按 roster 顺序串行跑完所有 pending 的刷新周期，
    /// 再产出完整视图。同一实体不会有并发周期
    pub async fn render_pass(&mut self) -> Result<DashboardView> {
        let pending: Vec<CompetitorEntity> = self.roster.iter()
            .filter(|c| self.cache.is_pending(&c.ticker))
            .cloned()
            .collect();

        for competitor in &pending {
            self.run_cycle(competitor).await?;
        }

        let roster = self.roster.clone();
        let mut cards = Vec::with_capacity(roster.len());
        for competitor in &roster {
            cards.push(self.render_card(competitor).await?);
        }

        Ok(DashboardView { generated_at: Utc::now(), cards })
    }

    /// fetch + summarize，结果无论成败都落成 CacheRecord
    async fn run_cycle(&mut self, competitor: &CompetitorEntity) -> Result<()> {
        info!("🔍 [{}] Refresh cycle: fetching {} articles...", competitor.ticker, self.limits.brief_articles);

        let (articles, summary) = match self.error_policy {
            ErrorPolicy::FailSoft => {
                let articles = self.news.fetch_news(&competitor.ticker, self.limits.brief_articles).await;
                let summary = self.summarizer.brief_summary(&competitor.name, &articles).await;
                (articles, summary)
            }
            ErrorPolicy::Propagate => {
                let articles = self.news.try_fetch_news(&competitor.ticker, self.limits.brief_articles).await?;
                let summary = self.summarizer.try_brief_summary(&competitor.name, &articles).await?;
                (articles, summary)
            }
        };

        info!("✅ [{}] Cycle complete ({} articles)", competitor.ticker, articles.len());
        self.cache.complete_cycle(&competitor.ticker, summary, articles, Utc::now());
        Ok(())
    }

    async fn render_card(&self, competitor: &CompetitorEntity) -> Result<EntityCard> {
        let record = self.cache.get(&competitor.ticker);

        let detail = if self.detail_open.contains(&competitor.ticker) {
            Some(self.render_detail(competitor).await?)
        } else {
            None
        };

        Ok(EntityCard {
            name: competitor.name.clone(),
            ticker: competitor.ticker.clone(),
            phase: self.cache.phase(&competitor.ticker),
            summary: record.map(|r| r.summary.clone()),
            article_count: record.map(|r| r.articles.len()).unwrap_or(0),
            fetched_at: record.map(|r| r.fetched_at),
            detail,
        })
    }

    /// Deep Dive 是超集抓取 (detail_articles 条) + 详版总结，
    /// 渲染期临时数据，不写回 CacheRecord。
    /// 没有 CacheRecord 时直接提示先刷新，不发起任何抓取
    async fn render_detail(&self, competitor: &CompetitorEntity) -> Result<DetailSection> {
        if self.cache.get(&competitor.ticker).is_none() {
            return Ok(DetailSection::RefreshFirst);
        }

        let (headlines, full_summary) = match self.error_policy {
            ErrorPolicy::FailSoft => {
                let articles = self.news.fetch_news(&competitor.ticker, self.limits.detail_articles).await;
                let summary = self.summarizer.full_summary(&competitor.name, &articles).await;
                (articles, summary)
            }
            ErrorPolicy::Propagate => {
                let articles = self.news.try_fetch_news(&competitor.ticker, self.limits.detail_articles).await?;
                let summary = self.summarizer.try_full_summary(&competitor.name, &articles).await?;
                (articles, summary)
            }
        };

        Ok(DetailSection::Ready { full_summary, headlines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use crate::config::dashboard_profile::{LlmConfig, ServerConfig};

    fn test_profile() -> DashboardProfile {
        DashboardProfile {
            competitors: vec![
                CompetitorEntity { name: "Progressive".to_string(), ticker: "PGR".to_string() },
                CompetitorEntity { name: "Allstate".to_string(), ticker: "ALL".to_string() },
                CompetitorEntity { name: "Travelers".to_string(), ticker: "TRV".to_string() },
                CompetitorEntity { name: "Root Insurance".to_string(), ticker: "ROOT".to_string() },
                CompetitorEntity { name: "Lemonade".to_string(), ticker: "LMND".to_string() },
            ],
            limits: LimitConfig { brief_articles: 5, detail_articles: 10, brief_prompt_articles: 3 },
            llm: LlmConfig {
                deployment: "gpt-4o-mini".to_string(),
                api_version: "2024-02-01".to_string(),
                temperature: 0.3,
                brief_max_tokens: 100,
                full_max_tokens: 300,
            },
            server: ServerConfig { port: 3000 },
            error_policy: ErrorPolicy::FailSoft,
        }
    }

    fn test_controller_with(policy: ErrorPolicy) -> DashboardController {
        let mut profile = test_profile();
        profile.error_policy = policy;
        let news = NewsClient::new(Client::new(), String::new());
        let summarizer = Summarizer::new(
            Client::new(),
            String::new(),
            String::new(),
            profile.llm.clone(),
            profile.limits.brief_prompt_articles,
        );
        DashboardController::new(&profile, news, summarizer)
    }

    fn test_controller() -> DashboardController {
        test_controller_with(ErrorPolicy::FailSoft)
    }

    #[test]
    fn unknown_ticker_is_rejected() {
        let mut ctrl = test_controller();
        assert!(ctrl.trigger("GEICO").is_err());
        assert!(ctrl.clear("GEICO").is_err());
        assert!(ctrl.open_detail("GEICO").is_err());
    }

    #[test]
    fn trigger_all_covers_exactly_the_roster() {
        let mut ctrl = test_controller();
        ctrl.trigger_all();
        for competitor in ctrl.roster().to_vec() {
            assert_eq!(ctrl.cache().phase(&competitor.ticker), EntityPhase::Pending);
        }
        assert_eq!(ctrl.cache().phase("GEICO"), EntityPhase::Empty);
    }

    /// 固定选择：clear 也要把打开的 Deep Dive 关掉，
    /// 否则 detail 视图会指向已不存在的数据
    #[test]
    fn clear_closes_open_detail_view() {
        let mut ctrl = test_controller();
        ctrl.open_detail("PGR").unwrap();
        assert!(ctrl.detail_is_open("PGR"));

        ctrl.clear("PGR").unwrap();
        assert!(!ctrl.detail_is_open("PGR"));

        ctrl.open_detail("ALL").unwrap();
        ctrl.clear_all();
        assert!(!ctrl.detail_is_open("ALL"));
    }

    #[tokio::test]
    async fn detail_without_record_renders_refresh_first_prompt() {
        // DetailFlag=true 但从未抓取过：必须渲染提示，且不尝试抓取
        // (NewsClient 没有可用凭证，真发请求会在 fail-soft 里留下空 feed 记录)
        let mut ctrl = test_controller();
        ctrl.open_detail("LMND").unwrap();

        let view = ctrl.render_pass().await.unwrap();
        let card = view.cards.iter().find(|c| c.ticker == "LMND").unwrap();
        assert!(matches!(card.detail, Some(DetailSection::RefreshFirst)));
        // 渲染 detail 提示不会顺带产生 CacheRecord
        assert!(ctrl.cache().get("LMND").is_none());
    }

    #[tokio::test]
    async fn close_detail_removes_section_from_next_render() {
        let mut ctrl = test_controller();
        ctrl.open_detail("TRV").unwrap();
        ctrl.close_detail("TRV").unwrap();

        let view = ctrl.render_pass().await.unwrap();
        let card = view.cards.iter().find(|c| c.ticker == "TRV").unwrap();
        assert!(card.detail.is_none());
    }

    #[tokio::test]
    async fn propagate_policy_fails_render_pass_on_cycle_error() {
        // propagate 策略下周期里的抓取错误直接让整次渲染失败，
        // 不写哨兵记录：实体留在 Pending，下次渲染还会重试
        let mut ctrl = test_controller_with(ErrorPolicy::Propagate);
        ctrl.trigger("PGR").unwrap();

        assert!(ctrl.render_pass().await.is_err());
        assert!(ctrl.cache().get("PGR").is_none());
        assert_eq!(ctrl.cache().phase("PGR"), EntityPhase::Pending);
    }

    #[tokio::test]
    async fn propagate_policy_fails_render_pass_on_detail_fetch_error() {
        // 有缓存 + Deep Dive 打开时 detail 会做超集抓取；
        // propagate 策略下这次抓取的错误也要冒泡
        let mut ctrl = test_controller_with(ErrorPolicy::Propagate);
        ctrl.cache.complete_cycle("ALL", "cached summary".to_string(), vec![], Utc::now());
        ctrl.open_detail("ALL").unwrap();

        assert!(ctrl.render_pass().await.is_err());
        // 旧的简版记录不受失败的 detail 渲染影响
        assert_eq!(ctrl.cache().get("ALL").unwrap().summary, "cached summary");
    }

    #[tokio::test]
    async fn render_pass_without_triggers_reads_cache_only() {
        let mut ctrl = test_controller();
        let view = ctrl.render_pass().await.unwrap();

        assert_eq!(view.cards.len(), 5);
        for card in &view.cards {
            assert_eq!(card.phase, EntityPhase::Empty);
            assert!(card.summary.is_none());
            assert_eq!(card.article_count, 0);
            assert!(card.fetched_at.is_none());
        }
    }
}
