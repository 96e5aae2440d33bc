// store.rs - 共享配置樹
//
// 配置樹由loader在啟動時合併構建（文件 + 環境變數），之後僅通過
// set / set_default 寫入。所有Key均為點分隔的全限定路徑，樹內部
// 以嵌套Table的形式存儲。

use std::path::Path;
use std::sync::Arc;

use config::{Map, Value, ValueKind};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::loader;

// 全局配置樹實例
static STORE: OnceCell<Arc<ConfigStore>> = OnceCell::new();

/// 初始化全局配置（在應用程序啟動時調用）
pub fn init_config(config_names: &[String], config_dir: &Path) -> Result<(), config::ConfigError> {
    let tree = loader::load_tree(config_names, config_dir)?;
    let store = Arc::new(ConfigStore::new(tree));

    if STORE.set(store).is_err() {
        warn!("配置已經被初始化，跳過重複初始化");
    } else {
        debug!(dir = %config_dir.display(), names = ?config_names, "配置初始化成功");
    }

    Ok(())
}

/// 獲取全局配置樹實例
pub fn global() -> Arc<ConfigStore> {
    STORE
        .get()
        .cloned()
        .expect("配置尚未初始化，請先調用 config::init_config")
}

/// 共享配置樹
pub struct ConfigStore {
    tree: RwLock<Map<String, Value>>,
}

impl ConfigStore {
    pub fn new(tree: Map<String, Value>) -> Self {
        Self {
            tree: RwLock::new(tree),
        }
    }

    /// 創建空配置樹（測試與嵌入式場景）
    pub fn empty() -> Self {
        Self::new(Map::new())
    }

    /// 按全限定Key讀取配置值。Nil節點視為不存在。
    pub fn get(&self, key: &str) -> Option<Value> {
        let tree = self.tree.read();
        let value = lookup(&tree, &split_path(key))?;
        if matches!(value.kind, ValueKind::Nil) {
            return None;
        }
        Some(value.clone())
    }

    /// 判定指定Key是否存在
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 以覆蓋的方式寫入Key-Value，路徑上的中間節點自動創建為Table
    pub fn set(&self, key: &str, value: Value) {
        let mut tree = self.tree.write();
        insert(&mut tree, &split_path(key), value);
    }

    /// 僅當Key不存在時寫入（默認值語義，不覆蓋顯式配置）
    pub fn set_default(&self, key: &str, value: Value) {
        let mut tree = self.tree.write();
        if lookup(&tree, &split_path(key))
            .map(|v| !matches!(v.kind, ValueKind::Nil))
            .unwrap_or(false)
        {
            return;
        }
        insert(&mut tree, &split_path(key), value);
    }

    /// 獲取指定前綴下的嵌套子樹；空前綴返回整棵樹
    pub fn subtree(&self, prefix: &str) -> Option<Value> {
        let tree = self.tree.read();
        if prefix.is_empty() {
            return Some(Value::from(tree.clone()));
        }
        lookup(&tree, &split_path(prefix)).cloned()
    }

    /// 獲取指定前綴下所有葉子Key（點分隔、相對於前綴）
    pub fn keys_under(&self, prefix: &str) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(value) = self.subtree(prefix) {
            if let ValueKind::Table(table) = value.kind {
                flatten_keys(&table, "", &mut keys);
            }
        }
        keys.sort();
        keys
    }
}

fn split_path(key: &str) -> Vec<&str> {
    key.split('.').collect()
}

fn lookup<'a>(table: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let value = table.get(*first)?;
    if rest.is_empty() {
        return Some(value);
    }
    match &value.kind {
        ValueKind::Table(inner) => lookup(inner, rest),
        _ => None,
    }
}

fn insert(table: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        table.insert((*first).to_string(), value);
        return;
    }

    let entry = table
        .entry((*first).to_string())
        .or_insert_with(|| Value::from(Map::<String, Value>::new()));
    // 中間節點若不是Table則整體替換
    if !matches!(entry.kind, ValueKind::Table(_)) {
        *entry = Value::from(Map::<String, Value>::new());
    }
    if let ValueKind::Table(inner) = &mut entry.kind {
        insert(inner, rest, value);
    }
}

fn flatten_keys(table: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match &value.kind {
            ValueKind::Table(inner) => flatten_keys(inner, &full, out),
            _ => out.push(full),
        }
    }
}
