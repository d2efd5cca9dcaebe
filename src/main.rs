mod config;
mod server;
mod utils;
mod modules;

use dotenvy::dotenv;
use tracing::info;

use crate::config::dashboard_profile::DashboardProfile;
use crate::config::secrets::Secrets;
use crate::utils::http_client::HttpClientFactory;
use crate::modules::perception::NewsClient;
use crate::modules::brain::Summarizer;
use crate::modules::dashboard::DashboardController;
use crate::server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();
    info!("Starting Competitor Intel Dashboard V1.0...");

    // 1. 基础设施初始化
    let profile = DashboardProfile::load().expect("Failed to load dashboard config");
    let secrets = Secrets::resolve();
    secrets.warn_if_incomplete();

    // 2. 模块初始化
    let std_client = HttpClientFactory::create()?;
    let llm_client = HttpClientFactory::create_llm()?;

    let news = NewsClient::new(std_client, secrets.alpha_vantage_key.clone());
    let summarizer = Summarizer::new(
        llm_client,
        secrets.azure_api_key.clone(),
        secrets.azure_endpoint.clone(),
        profile.llm.clone(),
        profile.limits.brief_prompt_articles,
    );

    let controller = DashboardController::new(&profile, news, summarizer);
    info!(
        "📋 Roster loaded: {} competitors ({:?} error policy)",
        controller.roster().len(),
        profile.error_policy
    );
    let state = AppState::new(controller);

    // 3. 启动面板服务
    let app = server::create_router(state);
    let addr = format!("0.0.0.0:{}", profile.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🚀 Dashboard running on http://localhost:{}", profile.server.port);
    axum::serve(listener, app).await?;

    Ok(())
}
