// loader.rs - 配置發現與合併
//
// 啟動時遞歸遍歷配置目錄，將基礎名（去擴展名）命中邏輯配置名的文件
// 依次合併為一棵配置樹；環境變數（APP__ 前綴、__ 分隔）最後疊加，
// 對同名Key優先於文件配置。

use std::path::Path;

use config::{Config, ConfigError, Environment as ConfigEnvironment, File, Map, Value};
use glob::glob;
use tracing::debug;

/// 預設配置目錄
pub const DEFAULT_CONFIG_DIR: &str = "config";
/// 預設邏輯配置名
pub const DEFAULT_CONFIG_NAME: &str = "application";
/// 環境變數覆蓋前綴，如 APP__SERVER__PORT=8080
pub const ENV_PREFIX: &str = "APP";

/// 載入並合併指定邏輯名的配置文件，返回嵌套配置樹
pub fn load_tree(
    config_names: &[String],
    config_dir: &Path,
) -> Result<Map<String, Value>, ConfigError> {
    if !config_dir.is_dir() {
        return Err(ConfigError::Message(format!(
            "配置目錄不存在: {}",
            config_dir.display()
        )));
    }

    let pattern = format!("{}/**/*", config_dir.display());
    let entries =
        glob(&pattern).map_err(|e| ConfigError::Message(format!("配置目錄遍歷失敗: {}", e)))?;

    let mut builder = Config::builder();
    let mut matched = 0usize;
    for entry in entries {
        let path = entry.map_err(|e| ConfigError::Message(format!("配置文件讀取失敗: {}", e)))?;
        if !path.is_file() {
            continue;
        }
        if !matches_logical_name(&path, config_names) {
            continue;
        }
        debug!(file = %path.display(), "合併配置文件");
        builder = builder.add_source(File::from(path));
        matched += 1;
    }

    if matched == 0 {
        debug!(names = ?config_names, dir = %config_dir.display(), "未發現匹配的配置文件");
    }

    // 環境變數最後疊加，優先級高於文件配置
    builder = builder.add_source(
        ConfigEnvironment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 文件基礎名（去擴展名）或完整文件名命中任一邏輯配置名即參與合併
fn matches_logical_name(path: &Path, config_names: &[String]) -> bool {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    config_names
        .iter()
        .any(|name| *name == stem || *name == file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_tree_merges_matched_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("application.toml"),
            "[server]\nhost = \"127.0.0.1\"\nport = 8080\n",
        )
        .unwrap();
        fs::write(dir.path().join("ignored.toml"), "[server]\nport = 1\n").unwrap();

        let tree = load_tree(&names(&["application"]), dir.path()).unwrap();
        let server = tree.get("server").cloned().unwrap().into_table().unwrap();
        assert_eq!(
            server.get("port").cloned().unwrap().into_int().unwrap(),
            8080
        );
    }

    #[test]
    fn test_load_tree_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("extra")).unwrap();
        fs::write(dir.path().join("application.toml"), "base = true\n").unwrap();
        fs::write(
            dir.path().join("extra").join("listeners.toml"),
            "[listeners.web]\nport = 8000\n",
        )
        .unwrap();

        let tree = load_tree(&names(&["application", "listeners"]), dir.path()).unwrap();
        assert!(tree.contains_key("base"));
        assert!(tree.contains_key("listeners"));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");
        assert!(load_tree(&names(&["application"]), &missing).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_environment_overlays_file_values() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("application.toml"),
            "[server]\nport = 8080\n",
        )
        .unwrap();

        std::env::set_var("APP__SERVER__PORT", "9999");
        let tree = load_tree(&names(&["application"]), dir.path());
        std::env::remove_var("APP__SERVER__PORT");

        let server = tree
            .unwrap()
            .get("server")
            .cloned()
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(
            server.get("port").cloned().unwrap().into_int().unwrap(),
            9999
        );
    }
}
