use serde::Deserialize;
use config::{Config, File};
use anyhow::Result;

/// 一个被追踪的竞争对手：启动时从配置载入，运行期间不可变
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CompetitorEntity {
    pub name: String,
    pub ticker: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitConfig {
    pub brief_articles: usize,
    pub detail_articles: usize,
    pub brief_prompt_articles: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub deployment: String,
    pub api_version: String,
    pub temperature: f64,
    pub brief_max_tokens: u32,
    pub full_max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// 外部调用失败时的策略：fail_soft 返回哨兵值继续渲染，propagate 直接报错
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    #[default]
    FailSoft,
    Propagate,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardProfile {
    pub competitors: Vec<CompetitorEntity>,
    pub limits: LimitConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

impl DashboardProfile {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("dashboard_config"))
            .build()?;

        let profile: DashboardProfile = settings.try_deserialize()?;
        Ok(profile)
    }
}
