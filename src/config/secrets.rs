use config::{Config, File};
use anyhow::Result;
use std::env;
use tracing::{info, warn};

/// 外部服务凭证。优先读 secrets.toml（云端部署用），
/// 读不到就整体回退到环境变量（本地 .env 开发用）。
#[derive(Debug, Clone)]
pub struct Secrets {
    pub alpha_vantage_key: String,
    pub azure_api_key: String,
    pub azure_endpoint: String,
}

impl Secrets {
    pub fn resolve() -> Self {
        match Self::from_store() {
            Ok(s) => {
                info!("🔐 Secrets loaded from secrets store");
                s
            }
            Err(e) => {
                warn!("⚠️ Secrets store unavailable ({}). Falling back to environment variables...", e);
                Self::from_env()
            }
        }
    }

    fn from_store() -> Result<Self> {
        let store = Config::builder()
            .add_source(File::with_name("secrets"))
            .build()?;

        Ok(Self {
            alpha_vantage_key: store.get_string("ALPHA_VANTAGE_API_KEY")?,
            azure_api_key: store.get_string("AZURE_OPENAI_API_KEY")?,
            azure_endpoint: store.get_string("AZURE_OPENAI_ENDPOINT")?,
        })
    }

    fn from_env() -> Self {
        Self {
            alpha_vantage_key: env::var("ALPHA_VANTAGE_API_KEY").unwrap_or_default(),
            azure_api_key: env::var("AZURE_OPENAI_API_KEY").unwrap_or_default(),
            azure_endpoint: env::var("AZURE_OPENAI_ENDPOINT").unwrap_or_default(),
        }
    }

    /// 缺 key 不是致命错误（fail-soft 渲染照常），但启动时要提示
    pub fn warn_if_incomplete(&self) {
        if self.alpha_vantage_key.is_empty() {
            warn!("⚠️ ALPHA_VANTAGE_API_KEY missing. News fetches will come back empty.");
        }
        if self.azure_api_key.is_empty() || self.azure_endpoint.is_empty() {
            warn!("⚠️ Azure OpenAI credentials missing. Summaries will use fallback text.");
        }
    }
}
