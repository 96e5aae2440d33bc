// dynamic.rs - 動態配置表達式解析
//
// 配置值支持兩種間接尋址語法：
//   ${key} / ${key:default}  -- 再查一次配置樹
//   #{key} / #{key:default}  -- 查進程環境變數
// 其他任何字串都是普通字面值。

/// 動態表達式的類別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicKind {
    /// 普通字面值，不做任何解析
    StaticValue,
    /// `${...}`：對配置樹的間接查詢
    ConfigLookup,
    /// `#{...}`：對進程環境變數的查詢
    EnvLookup,
}

/// 解析後的動態表達式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicKey {
    /// 原始表達式（trim後）
    pub raw: String,
    /// 查詢目標Key
    pub target: String,
    /// 表達式內嵌的預設值字面量，無則為空字串
    pub default_literal: String,
    pub kind: DynamicKind,
}

impl DynamicKey {
    /// 解析配置字串值。
    ///
    /// 規則：長度不超過 `${}` 三個字符的視為靜態值；前兩個字符為 `${` 或 `#{`
    /// 且最後一個字符為 `}` 時才是動態表達式；表達式體以第一個 `:` 分割為
    /// 目標Key與預設值（`:` 在首位時整個表達式體都是Key，與不含 `:` 等同）。
    pub fn parse(pattern: &str) -> DynamicKey {
        let pattern = pattern.trim();
        if pattern.len() <= 3 {
            return Self::static_value(pattern);
        }

        let dyn_lookup = pattern.starts_with("${");
        let env_lookup = pattern.starts_with("#{");
        if (dyn_lookup || env_lookup) && pattern.ends_with('}') {
            let body = pattern[2..pattern.len() - 1].trim();
            let (target, default_literal) = match body.find(':') {
                Some(idx) if idx > 0 => (&body[..idx], &body[idx + 1..]),
                _ => (body, ""),
            };
            let kind = if env_lookup {
                DynamicKind::EnvLookup
            } else {
                DynamicKind::ConfigLookup
            };
            return DynamicKey {
                raw: pattern.to_string(),
                target: target.to_string(),
                default_literal: default_literal.to_string(),
                kind,
            };
        }

        Self::static_value(pattern)
    }

    fn static_value(pattern: &str) -> DynamicKey {
        DynamicKey {
            raw: pattern.to_string(),
            target: pattern.to_string(),
            default_literal: String::new(),
            kind: DynamicKind::StaticValue,
        }
    }
}
