// routes.rs - 路由註冊緩衝
//
// 路由在接線階段註冊進緩衝表，啟動時一次性刷入axum Router，之後不可變。
// 以 "METHOD:path" 為唯一Key，重複註冊視為接線錯誤、啟動期致命。

use axum::http::Method;
use axum::routing::MethodRouter;
use axum::Router;
use dashmap::DashMap;

use crate::server::error::{ServerError, ServerResult};

/// 單條路由：方法 + 路徑 + 處理器。
/// 處理器為MethodRouter，按路由的中間件鏈由調用方通過 `.layer(...)` 預先組合。
#[derive(Clone)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
    pub service: MethodRouter,
}

/// 併發安全的路由緩衝表
#[derive(Default)]
pub struct RouteTable {
    entries: DashMap<String, RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 註冊路由；重複的 方法+路徑 組合返回接線錯誤
    pub fn insert(&self, method: Method, path: &str, service: MethodRouter) -> ServerResult<()> {
        let key = format!("{}:{}", method, path);
        match self.entries.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ServerError::DuplicateRoute(key)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(RouteEntry {
                    method,
                    path: path.to_string(),
                    service,
                });
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 將全部緩衝路由刷入Router。啟動時恰好調用一次；
    /// 同一路徑上不同方法的條目由axum合併。
    pub fn flush_into(&self, mut router: Router) -> Router {
        for entry in self.entries.iter() {
            router = router.route(&entry.path, entry.service.clone());
        }
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};

    async fn noop() {}

    #[test]
    fn test_duplicate_method_path_rejected() {
        let table = RouteTable::new();
        table.insert(Method::GET, "/user", get(noop)).unwrap();

        // 同路徑不同方法允許
        table.insert(Method::POST, "/user", post(noop)).unwrap();

        // 完全相同的 方法+路徑 拒絕
        let err = table.insert(Method::GET, "/user", get(noop)).unwrap_err();
        assert!(matches!(err, ServerError::DuplicateRoute(key) if key == "GET:/user"));
        assert_eq!(table.len(), 2);
    }
}
