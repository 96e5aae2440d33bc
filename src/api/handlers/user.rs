// 用戶資源處理器：演示封套、參數校驗與業務錯誤映射的完整鏈路

use std::collections::HashMap;

use axum::extract::{Json, Query};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::response::{ApiError, ApiResponse, Failure};
use crate::api::trace::TraceId;
use crate::config::{ValidationError, ValidationUtils};

// 進程內用戶表（演示資源，無持久化）
static USERS: Lazy<DashMap<String, User>> = Lazy::new(DashMap::new);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub age: u32,
}

fn validate_user(user: &User) -> Result<(), ValidationError> {
    ValidationUtils::not_empty(&user.name, "name")?;
    ValidationUtils::in_range(user.age, 1, 130, "age")?;
    Ok(())
}

/// POST /user - 創建用戶。參數校驗失敗映射為參數錯誤封套。
pub async fn create(tid: TraceId, Json(user): Json<User>) -> Result<ApiResponse<User>, Failure> {
    validate_user(&user).map_err(|err| ApiError::param(err.to_string()).with_tid(&tid))?;

    info!(tid = %tid.0, name = %user.name, "創建用戶");
    USERS.insert(user.name.clone(), user.clone());

    Ok(ApiResponse::success(user, tid.0))
}

/// GET /user?name=... - 查詢用戶。未知用戶映射為業務錯誤封套。
pub async fn query(
    tid: TraceId,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<User>, Failure> {
    let name = params.get("name").cloned().unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::param("name is required").with_tid(&tid));
    }

    match USERS.get(&name) {
        Some(user) => Ok(ApiResponse::success(user.value().clone(), tid.0)),
        None => Err(ApiError::inner(
            1,
            "user_not_found",
            format!("user {} not found", name),
        )
        .with_tid(&tid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_rules() {
        let valid = User {
            name: "kite".to_string(),
            age: 30,
        };
        assert!(validate_user(&valid).is_ok());

        let no_name = User {
            name: String::new(),
            age: 30,
        };
        assert!(validate_user(&no_name).is_err());

        let too_old = User {
            name: "kite".to_string(),
            age: 131,
        };
        assert!(validate_user(&too_old).is_err());

        let newborn = User {
            name: "kite".to_string(),
            age: 0,
        };
        assert!(validate_user(&newborn).is_err());
    }
}
