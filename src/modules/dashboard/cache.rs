use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::modules::perception::Article;

/// 一个实体最近一次抓取的结果。新周期直接覆盖，永不追加
#[derive(Debug, Clone, Serialize)]
pub struct CacheRecord {
    pub summary: String,
    pub articles: Vec<Article>,
    pub fetched_at: DateTime<Utc>,
}

/// 单实体状态机：
/// Empty --(trigger)--> Pending --(complete_cycle)--> Populated --(trigger)--> Pending ...
/// 任意状态 --(clear)--> Empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityPhase {
    Empty,
    Pending,
    Populated,
}

#[derive(Debug, Default)]
struct EntitySlot {
    record: Option<CacheRecord>,
    refresh_pending: bool,
}

/// 按实体 id 索引的缓存。id 是不透明字符串（这里用 ticker），
/// 缓存本身对具体业务域一无所知
#[derive(Debug, Default)]
pub struct EntityCache {
    slots: HashMap<String, EntitySlot>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 纯读取，无副作用。从未抓取过的实体返回 None
    pub fn get(&self, id: &str) -> Option<&CacheRecord> {
        self.slots.get(id).and_then(|s| s.record.as_ref())
    }

    pub fn phase(&self, id: &str) -> EntityPhase {
        match self.slots.get(id) {
            None => EntityPhase::Empty,
            Some(slot) if slot.refresh_pending => EntityPhase::Pending,
            Some(slot) if slot.record.is_some() => EntityPhase::Populated,
            Some(_) => EntityPhase::Empty,
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.slots.get(id).map(|s| s.refresh_pending).unwrap_or(false)
    }

    /// 置位刷新标记。幂等：重复 trigger 不是计数器
    pub fn trigger(&mut self, id: &str) {
        self.slots.entry(id.to_string()).or_default().refresh_pending = true;
    }

    pub fn trigger_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.trigger(id);
        }
    }

    /// 写入一次 fetch+summarize 周期的结果并清掉刷新标记。
    /// soft-failure 也走这里：空文章 / 兜底文案照样生成 CacheRecord，
    /// 绝不把实体留在 Pending
    pub fn complete_cycle(
        &mut self,
        id: &str,
        summary: String,
        articles: Vec<Article>,
        now: DateTime<Utc>,
    ) {
        let slot = self.slots.entry(id.to_string()).or_default();
        slot.record = Some(CacheRecord { summary, articles, fetched_at: now });
        slot.refresh_pending = false;
    }

    /// 无条件清除：CacheRecord 和刷新标记一起删，任何状态都回到 Empty
    pub fn clear(&mut self, id: &str) {
        self.slots.remove(id);
    }

    pub fn clear_all(&mut self) {
        self.slots.clear();
    }
}
