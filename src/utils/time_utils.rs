// time_utils.rs
//
// 提供時間轉換相關的工具函數：
// 1. 響應封套使用的毫秒時間戳
// 2. 配置層的時長字面量解析（整數按秒，字串支持 ms/s/m/h 後綴）

use chrono::{DateTime, TimeZone, Utc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 獲取當前系統時間的毫秒時間戳
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// 將 DateTime<Utc> 轉換為毫秒時間戳
pub fn datetime_to_timestamp_ms(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// 將毫秒時間戳轉換為 DateTime<Utc>
pub fn timestamp_ms_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .unwrap_or_else(Utc::now)
}

/// 解析配置時長字面量。
///
/// 無後綴的純數字按秒解釋；支持的後綴：ms、s、m、h。
/// 無法解析時返回None（配置層轉換為零值）。
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let (number, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit())?);
    let amount = number.parse::<u64>().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount * 60)),
        "h" => Some(Duration::from_secs(amount * 3600)),
        _ => None,
    }
}
