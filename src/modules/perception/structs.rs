use serde::{Serialize, Deserialize};

/// 新闻条目。description 允许为空（Alpha Vantage 的 summary 字段并不总在）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub source: String,
    pub description: String,
}
