// 配置解析端到端測試：命名空間、別名、動態表達式與預設值優先級

use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;

use app_server::config::{make_key, ConfigStore, ConfigView, ValidationError};

fn root_view() -> ConfigView {
    ConfigView::with_store("", Arc::new(ConfigStore::empty()))
}

#[test]
fn test_plain_set_get_roundtrip() {
    let view = root_view();
    view.set("service.name", "gateway").unwrap();

    assert_eq!(view.get_string("service.name"), "gateway");
    assert!(view.is_set(&["service.name"]));
}

#[test]
fn test_self_reference_returns_default_never_recurses() {
    let view = root_view();
    view.set("self", "${self}").unwrap();

    // 無預設值時回落為空字串
    assert_eq!(view.get_string("self"), "");
    // 顯式預設值生效
    assert_eq!(
        view.get_or_default("self", "guard").into_string().unwrap(),
        "guard"
    );

    let view = root_view();
    view.set("self", "${self:embedded}").unwrap();
    assert_eq!(view.get_string("self"), "embedded");
}

#[test]
fn test_explicit_default_beats_embedded_default() {
    let view = root_view();
    view.set("endpoint", "${missing:foo}").unwrap();

    assert_eq!(view.get_string("endpoint"), "foo");
    assert_eq!(
        view.get_or_default("endpoint", "bar").into_string().unwrap(),
        "bar"
    );
}

#[test]
#[serial_test::serial]
fn test_env_lookup_hit_and_miss() {
    let view = root_view();
    view.set("workdir", "#{APP_SERVER_TEST_HOME}").unwrap();

    std::env::set_var("APP_SERVER_TEST_HOME", "/root");
    assert_eq!(view.get_string("workdir"), "/root");

    std::env::remove_var("APP_SERVER_TEST_HOME");
    // 未設置且無預設值時為空
    assert_eq!(view.get_string("workdir"), "");
}

#[test]
#[serial_test::serial]
fn test_env_value_is_single_level_literal() {
    let view = root_view();
    view.set("raw", "#{APP_SERVER_TEST_RAW}").unwrap();
    view.set("other", "resolved").unwrap();

    // 環境變數的值不再做表達式解析
    std::env::set_var("APP_SERVER_TEST_RAW", "${other}");
    assert_eq!(view.get_string("raw"), "${other}");
    std::env::remove_var("APP_SERVER_TEST_RAW");
}

#[test]
fn test_config_lookup_chain_resolves() {
    let view = root_view();
    view.set("a", "${b}").unwrap();
    view.set("b", "${c}").unwrap();
    view.set("c", "leaf").unwrap();

    assert_eq!(view.get_string("a"), "leaf");
}

#[test]
fn test_is_set_zero_keys_is_false() {
    let view = root_view();
    view.set("a", 1_i64).unwrap();
    view.set("b", 2_i64).unwrap();

    assert!(!view.is_set(&[]));
    assert!(view.is_set(&["a", "b"]));
    assert!(!view.is_set(&["a", "c"]));
}

#[test]
fn test_namespaced_view_with_alias() {
    let store = Arc::new(ConfigStore::empty());
    let root = ConfigView::with_store("", store.clone());
    root.set("listeners.web.port", 8080_i64).unwrap();
    root.set("legacy.web.address", "0.0.0.0").unwrap();

    let mut web = ConfigView::with_store("listeners.web", store);
    web.set_key_alias(HashMap::from([(
        "address".to_string(),
        "legacy.web.address".to_string(),
    )]));

    assert_eq!(web.get_int("port"), 8080);
    // 直查不命中，走別名回退
    assert_eq!(web.get_string("address"), "0.0.0.0");
}

#[test]
fn test_make_key_empty_segment_fails_fast() {
    assert_eq!(make_key(&["a", "b", "c"]).unwrap(), "a.b.c");
    assert_matches!(
        make_key(&["a", "", "c"]),
        Err(ValidationError::EmptyKeySegment)
    );
}

#[test]
fn test_set_default_semantics() {
    let view = root_view();
    view.set("app.threads", 8_i64).unwrap();
    view.set_default("app.threads", 2_i64).unwrap();
    view.set_default("app.name", "svc").unwrap();

    assert_eq!(view.get_int("app.threads"), 8);
    assert_eq!(view.get_string("app.name"), "svc");
}

#[test]
fn test_keys_and_to_map_projection() {
    let store = Arc::new(ConfigStore::empty());
    let root = ConfigView::with_store("", store.clone());
    root.set("listeners.web.port", 8080_i64).unwrap();
    root.set("listeners.web.host", "::1").unwrap();
    root.set("listeners.metrics.enable", true).unwrap();

    let web = ConfigView::with_store("listeners.web", store);
    assert_eq!(web.keys(), vec!["host", "port"]);
    assert!(web.to_map().contains_key("port"));

    // 根命名空間返回整棵樹
    assert!(root.to_map().contains_key("listeners"));
}
