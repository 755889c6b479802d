use serde::{Deserialize, Serialize};

use super::error::AppError;

pub const API_URL_VAR: &str = "ANALYZER_API_URL";
pub const TIMEOUT_VAR: &str = "ANALYZER_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// 解析クライアント設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// 解析 API のベース URL（末尾スラッシュなし）
    pub api_url: String,
    /// リクエストタイムアウト（秒）
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// 環境変数から読み込む（.env があれば先に読む）
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                AppError::config(format!("{TIMEOUT_VAR} は秒数の整数で指定してください: {raw:?}"))
            })?;
            // 0 秒では全リクエストが即タイムアウトする
            if secs == 0 {
                return Err(AppError::config(format!("{TIMEOUT_VAR} は 1 以上で指定してください")));
            }
            config.timeout_secs = secs;
        }

        Ok(config)
    }

    pub fn predict_fit_url(&self) -> String {
        format!("{}/predict_fit/", self.api_url)
    }
}
