use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub pagination: PaginationConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginationConfig {
    /// 1ページあたりの件数（次ページのオフセット計算に使う）
    pub page_size: u64,
    /// スクロールイベントをまとめる静止時間
    pub scroll_debounce_ms: u64,
    /// 画面下端からこの割合以内に入ったら次ページを読む（offset_height / divisor）
    pub scroll_threshold_divisor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// 変更通知チャネルのバッファサイズ
    pub change_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            store: StoreConfig { change_buffer: 256 },
            logging: LoggingConfig {
                filter: "orca_cache=debug,info".to_string(),
                json: false,
            },
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            scroll_debounce_ms: 150,
            scroll_threshold_divisor: 3,
        }
    }
}

impl PaginationConfig {
    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(value) = lookup("ORCA_PAGE_SIZE").as_deref().and_then(parse_u64) {
            cfg.pagination.page_size = value.max(1);
        }
        if let Some(value) = lookup("ORCA_SCROLL_DEBOUNCE_MS")
            .as_deref()
            .and_then(parse_u64)
        {
            cfg.pagination.scroll_debounce_ms = value;
        }
        if let Some(value) = lookup("ORCA_SCROLL_THRESHOLD_DIVISOR")
            .as_deref()
            .and_then(parse_u32)
        {
            cfg.pagination.scroll_threshold_divisor = value.max(1);
        }
        if let Some(value) = lookup("ORCA_CHANGE_BUFFER")
            .as_deref()
            .and_then(parse_u64)
        {
            cfg.store.change_buffer = value.max(1) as usize;
        }
        if let Some(filter) = lookup("ORCA_LOG_FILTER") {
            let filter = filter.trim();
            if !filter.is_empty() {
                cfg.logging.filter = filter.to_string();
            }
        }
        if let Some(v) = lookup("ORCA_LOG_JSON") {
            cfg.logging.json = parse_bool(&v, cfg.logging.json);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pagination.page_size == 0 {
            return Err("Pagination page_size must be greater than 0".to_string());
        }
        if self.pagination.scroll_threshold_divisor == 0 {
            return Err("Pagination scroll_threshold_divisor must be greater than 0".to_string());
        }
        if self.store.change_buffer == 0 {
            return Err("Store change_buffer must be greater than 0".to_string());
        }
        if self.logging.filter.trim().is_empty() {
            return Err("Logging filter must not be empty".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.pagination.scroll_debounce(), Duration::from_millis(150));
        assert_eq!(cfg.pagination.scroll_threshold_divisor, 3);
    }

    #[test]
    fn test_lookup_overrides() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("ORCA_PAGE_SIZE", "20"),
            ("ORCA_SCROLL_DEBOUNCE_MS", " 300 "),
            ("ORCA_LOG_JSON", "yes"),
            ("ORCA_LOG_FILTER", "orca_cache=trace"),
        ]));

        assert_eq!(cfg.pagination.page_size, 20);
        assert_eq!(cfg.pagination.scroll_debounce_ms, 300);
        assert!(cfg.logging.json);
        assert_eq!(cfg.logging.filter, "orca_cache=trace");
    }

    #[test]
    fn test_invalid_values_fall_back_or_clamp() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("ORCA_PAGE_SIZE", "0"),
            ("ORCA_SCROLL_DEBOUNCE_MS", "soon"),
            ("ORCA_LOG_JSON", "maybe"),
            ("ORCA_LOG_FILTER", "   "),
        ]));

        assert_eq!(cfg.pagination.page_size, 1);
        assert_eq!(cfg.pagination.scroll_debounce_ms, 150);
        assert!(!cfg.logging.json);
        assert_eq!(cfg.logging.filter, "orca_cache=debug,info");
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut cfg = AppConfig::default();
        cfg.pagination.page_size = 0;
        assert!(cfg.validate().is_err());
    }
}
