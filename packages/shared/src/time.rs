//! 時刻の取得（テストで固定できるよう Clock trait で抽象化）

use chrono::{DateTime, Utc};

/// 現在時刻（Unix ミリ秒, UTC）の取得元
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// システム時刻
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// 常に同じ時刻を返す Clock（テスト用）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(i64);

impl FixedClock {
    pub fn new(now_millis: i64) -> Self {
        Self(now_millis)
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Unix ミリ秒を UTC の RFC 3339 文字列に変換する（範囲外の値は Unix エポック）
pub fn timestamp_to_rfc3339(timestamp_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .unwrap_or_default()
        .to_rfc3339()
}
