use serde::{Deserialize, Serialize};

use super::resume::{JobQuery, ResumeFile};

// ─── AnalysisResult ──────────────────────────────────────────────

/// 解析サービスが返す適合度レポート。表示専用で、内容は加工しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 適合スコア (0〜100)。バックエンドは小数1桁で返すことがある。
    pub similarity_score: f64,
    pub fit_explanation: String,
    #[serde(default)]
    pub extracted_skills: Option<Vec<String>>,
    #[serde(default)]
    pub experience: Option<Experience>,
    pub analysis_method: String,
    /// 処理時間 (秒)
    pub processing_time: f64,
    /// 以下はコアでは読まない付帯情報。型は問わずそのまま保持する。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// 欠落・null は 0 年扱い
    #[serde(default)]
    pub total_years: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_mentions: Option<serde_json::Value>,
}

impl Experience {
    pub fn years(total_years: f64) -> Self {
        Self {
            total_years: Some(total_years),
            experience_mentions: None,
        }
    }
}

impl AnalysisResult {
    pub fn total_years(&self) -> f64 {
        self.experience
            .as_ref()
            .and_then(|e| e.total_years)
            .unwrap_or(0.0)
    }
}

// ─── AnalysisRequest ─────────────────────────────────────────────

/// 送信するレジュメ表現。リクエストには必ずどちらか一方だけが載る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumePayload {
    Text(String),
    File(ResumeFile),
}

/// submit 時点の入力スナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub request_id: String,
    pub resume: ResumePayload,
    pub job: JobQuery,
}

// ─── AnalysisError ───────────────────────────────────────────────

pub const BACKEND_FALLBACK_MESSAGE: &str = "Analysis failed";
pub const TRANSPORT_FALLBACK_MESSAGE: &str = "An error occurred during analysis";

/// 解析呼び出しの失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// サービスが非成功ステータスを返した
    #[error("Backend returned status {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Backend {
        status: u16,
        message: Option<String>,
    },
    /// 通信失敗、またはレスポンスを解釈できなかった
    #[error("Transport error: {0}")]
    Transport(String),
    /// 決着前に呼び出しが破棄された
    #[error("Request interrupted before it settled")]
    Interrupted,
}

impl AnalysisError {
    /// ユーザーに表示するメッセージ
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(BACKEND_FALLBACK_MESSAGE)
                .to_string(),
            Self::Transport(detail) if !detail.is_empty() => detail.clone(),
            Self::Transport(_) | Self::Interrupted => TRANSPORT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

// ─── Analyzer trait ──────────────────────────────────────────────

/// 外部解析サービスのトレイト。1 回の呼び出しは必ず 1 回だけ決着する。
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;

    fn name(&self) -> &str;
}
