// view.rs - 命名空間配置視圖
//
// 每個邏輯子系統通過視圖訪問共享配置樹（如 "listeners.web"）。視圖負責：
// 1. 查詢Key的命名空間限定
// 2. 本地Key別名回退（僅在直查不命中時生效）
// 3. 動態表達式解析（見 dynamic.rs）
// 4. 盡力而為的類型轉換（轉換失敗返回類型零值，不拋錯）

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use config::{ConfigError, Map, Value, ValueKind};
use serde::de::DeserializeOwned;

use crate::config::dynamic::{DynamicKey, DynamicKind};
use crate::config::store::{self, ConfigStore};
use crate::config::validation::ValidationError;
use crate::utils::time_utils::parse_duration;

/// 根據Key片段列表構建點分隔的查詢Key。任意片段為空字串視為接線錯誤。
pub fn make_key(parts: &[&str]) -> Result<String, ValidationError> {
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ValidationError::EmptyKeySegment);
    }
    Ok(parts.join("."))
}

/// 命名空間配置視圖
#[derive(Clone)]
pub struct ConfigView {
    namespace: String,
    alias: HashMap<String, String>,
    store: Arc<ConfigStore>,
}

impl ConfigView {
    /// 基於全局配置樹創建視圖。namespace為空字串時代表根命名空間。
    pub fn of(namespace: &str) -> Self {
        Self::with_store(namespace, store::global())
    }

    /// 基於指定配置樹創建視圖（測試與多實例場景）
    pub fn with_store(namespace: &str, store: Arc<ConfigStore>) -> Self {
        Self {
            namespace: namespace.to_string(),
            alias: HashMap::new(),
            store,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 註冊本地Key別名。別名源Key在註冊時即做命名空間限定，
    /// 別名目標為全限定Key。
    pub fn set_key_alias(&mut self, aliases: HashMap<String, String>) {
        for (key, alias) in aliases {
            self.alias.insert(self.qualified(&key), alias);
        }
    }

    /// 讀取配置值，應用動態解析與別名回退；不命中返回None
    pub fn get(&self, key: &str) -> Option<Value> {
        self.do_get(&self.qualified(key), None)
    }

    /// 讀取配置值，不命中時返回調用方提供的預設值。
    /// 顯式預設值的優先級高於表達式內嵌預設值。
    pub fn get_or_default(&self, key: &str, default: impl Into<Value>) -> Value {
        let default = default.into();
        self.do_get(&self.qualified(key), Some(default.clone()))
            .unwrap_or(default)
    }

    /// 判定視圖下是否設置了指定的全部Key；空Key列表返回false
    pub fn is_set(&self, keys: &[&str]) -> bool {
        if keys.is_empty() {
            return false;
        }
        keys.iter().all(|key| self.store.is_set(&self.qualified(key)))
    }

    /// 以覆蓋的方式寫入Key-Value
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        let key = self.checked_key(key)?;
        self.store.set(&key, value.into());
        Ok(())
    }

    /// 寫入單個默認值，不覆蓋已有顯式配置
    pub fn set_default(&self, key: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        let key = self.checked_key(key)?;
        self.store.set_default(&key, value.into());
        Ok(())
    }

    /// 寫入一組默認值
    pub fn set_defaults(
        &self,
        defaults: HashMap<String, Value>,
    ) -> Result<(), ValidationError> {
        for (key, value) in defaults {
            self.set_default(&key, value)?;
        }
        Ok(())
    }

    /// 將命名空間下所有配置轉換為嵌套字典；根命名空間返回整棵樹
    pub fn to_map(&self) -> Map<String, Value> {
        self.store
            .subtree(&self.namespace)
            .and_then(|value| value.into_table().ok())
            .unwrap_or_default()
    }

    /// 命名空間下所有葉子Key（相對於命名空間）
    pub fn keys(&self) -> Vec<String> {
        self.store.keys_under(&self.namespace)
    }

    /// 將命名空間下的子樹反序列化為類型化結構
    pub fn get_section<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let full = self.qualified(key);
        let value = self
            .store
            .subtree(&full)
            .ok_or(ConfigError::NotFound(full))?;
        value.try_deserialize()
    }

    // ------ 類型化讀取，轉換失敗一律返回零值 ------

    pub fn get_string(&self, key: &str) -> String {
        self.get(key)
            .and_then(|v| v.into_string().ok())
            .unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .and_then(|v| v.into_bool().ok())
            .unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key)
            .and_then(|v| v.into_int().ok())
            .unwrap_or_default()
    }

    pub fn get_uint(&self, key: &str) -> u64 {
        self.get(key)
            .and_then(|v| v.into_int().ok())
            .map(|v| v.max(0) as u64)
            .unwrap_or_default()
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.get(key)
            .and_then(|v| v.into_float().ok())
            .unwrap_or_default()
    }

    /// 時長讀取：整數按秒解釋，字串支持 ms/s/m/h 後綴
    pub fn get_duration(&self, key: &str) -> Duration {
        parse_duration(&self.get_string(key)).unwrap_or_default()
    }

    pub fn get_string_vec(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(value) => match value.kind {
                ValueKind::Array(items) => items
                    .into_iter()
                    .filter_map(|v| v.into_string().ok())
                    .collect(),
                _ => value.into_string().map(|s| vec![s]).unwrap_or_default(),
            },
            None => Vec::new(),
        }
    }

    pub fn get_string_map(&self, key: &str) -> HashMap<String, String> {
        self.get(key)
            .and_then(|v| v.into_table().ok())
            .map(|table| {
                table
                    .into_iter()
                    .filter_map(|(k, v)| v.into_string().ok().map(|s| (k, s)))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------ 內部 ------

    fn qualified(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            return key.to_string();
        }
        if key.is_empty() {
            return self.namespace.clone();
        }
        format!("{}.{}", self.namespace, key)
    }

    fn checked_key(&self, key: &str) -> Result<String, ValidationError> {
        if key.is_empty() || key.split('.').any(|segment| segment.is_empty()) {
            return Err(ValidationError::EmptyKeySegment);
        }
        Ok(self.qualified(key))
    }

    /// 動態解析核心。key為全限定Key；indef為調用方顯式預設值。
    ///
    /// 環保護僅覆蓋直接自引用（`${self}` 存於Key self）：target與key相同時
    /// 立即返回預設值。更長的引用環（A→B→A）不做檢測，會無限遞歸——
    /// 這是單跳解析器的已知邊界，調用方不應在配置中構造多跳環。
    fn do_get(&self, key: &str, indef: Option<Value>) -> Option<Value> {
        let direct = self.store.get(key);

        if let Some(value) = &direct {
            if let ValueKind::String(expr) = &value.kind {
                let parsed = DynamicKey::parse(expr);
                match parsed.kind {
                    DynamicKind::ConfigLookup => {
                        let usedef =
                            indef.unwrap_or_else(|| Value::from(parsed.default_literal.clone()));
                        if parsed.target == key {
                            return Some(usedef);
                        }
                        if self.store.is_set(&parsed.target) {
                            return self.do_get(&parsed.target, Some(usedef));
                        }
                        return Some(usedef);
                    }
                    DynamicKind::EnvLookup => {
                        let usedef =
                            indef.unwrap_or_else(|| Value::from(parsed.default_literal.clone()));
                        // 環境變數值為單層字面量，不再做表達式解析
                        return match env::var(&parsed.target) {
                            Ok(found) => Some(Value::from(found)),
                            Err(_) => Some(usedef),
                        };
                    }
                    DynamicKind::StaticValue => return direct,
                }
            }
            return direct;
        }

        // 直查不命中時才嘗試別名回退
        if let Some(alias) = self.alias.get(key) {
            if let Some(found) = self.store.get(alias) {
                return Some(found);
            }
        }

        indef
    }
}
