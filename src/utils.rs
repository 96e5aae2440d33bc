// utils.rs - 公共工具模組
//
// 提供各種通用的工具函數和輔助方法，用於簡化系統其他部分的代碼。

pub mod time_utils;

// 重新導出時間工具函數，使其可以通過 utils::function_name 直接訪問
pub use time_utils::{
    current_timestamp_ms, datetime_to_timestamp_ms, parse_duration, timestamp_ms_to_datetime,
};
