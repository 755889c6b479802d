//! 状態から導出される表示モデル。独自の状態は持たない。

use serde::Serialize;

use super::analysis::AnalysisResult;
use super::submission::RequestState;

pub const EMPTY_PLACEHOLDER: &str = "Results will appear here after analysis";
pub const LOADING_MESSAGE: &str = "Analyzing your resume with AI...";

const SUBMIT_LABEL: &str = "Analyze Fit";
const SUBMITTING_LABEL: &str = "Analyzing...";

/// スコア帯（色分けはユーザーに意味を伝える）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Good,
    Fair,
    Weak,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Good
        } else if score >= 60.0 {
            Self::Fair
        } else if score >= 40.0 {
            Self::Weak
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Weak => "weak",
            Self::Poor => "poor",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Good => "#28a745",
            Self::Fair => "#ffc107",
            Self::Weak => "#fd7e14",
            Self::Poor => "#dc3545",
        }
    }
}

/// 結果パネル
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub score_text: String,
    pub band: ScoreBand,
    pub explanation: String,
    /// 空または欠落なら None（セクション自体を出さない）
    pub skills: Option<Vec<String>>,
    /// total_years > 0 の時だけ
    pub experience_text: Option<String>,
    pub footer: String,
}

impl ResultView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let skills = result
            .extracted_skills
            .as_ref()
            .filter(|s| !s.is_empty())
            .cloned();

        let years = result.total_years();
        let experience_text =
            (years > 0.0).then(|| format!("{years} years of experience detected"));

        Self {
            score_text: format!("{}%", result.similarity_score),
            band: ScoreBand::from_score(result.similarity_score),
            explanation: result.fit_explanation.clone(),
            skills,
            experience_text,
            footer: format!(
                "Analysis method: {} | Processing time: {}s",
                result.analysis_method, result.processing_time
            ),
        }
    }
}

/// 同時に表示されるパネルは常に 1 つ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "panel", rename_all = "snake_case")]
pub enum Panel {
    Empty,
    Loading,
    Error { message: String },
    Result(ResultView),
}

impl Panel {
    pub fn from_state(state: &RequestState) -> Self {
        match state {
            RequestState::Failed { message } => Self::Error {
                message: message.clone(),
            },
            RequestState::InFlight { .. } => Self::Loading,
            RequestState::Succeeded { result } => Self::Result(ResultView::from_result(result)),
            RequestState::Idle => Self::Empty,
        }
    }
}

/// 送信ボタン
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitButton {
    pub enabled: bool,
    pub label: &'static str,
}

impl SubmitButton {
    pub fn new(can_submit: bool, state: &RequestState) -> Self {
        let in_flight = state.is_in_flight();
        Self {
            enabled: can_submit && !in_flight,
            label: if in_flight { SUBMITTING_LABEL } else { SUBMIT_LABEL },
        }
    }
}
