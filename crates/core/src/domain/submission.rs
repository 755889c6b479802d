use serde::Serialize;

use super::analysis::{AnalysisError, AnalysisRequest, AnalysisResult, ResumePayload};
use super::error::AppError;
use super::resume::{JobQuery, ResumeFile, ResumeInput};

/// レジュメ未入力で submit された時のメッセージ
pub const NO_RESUME_MESSAGE: &str = "Please provide either resume text or upload a file";

/// リクエスト状態。常にいずれか 1 つだけを保持する。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    InFlight { request_id: String },
    Succeeded { result: AnalysisResult },
    Failed { message: String },
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InFlight { .. } => "in_flight",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Succeeded { result } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// 状態遷移イベントペイロード
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTransition {
    pub request_id: Option<String>,
    pub prev_state: String,
    pub new_state: RequestState,
    pub at: String,
}

/// begin_submit の結果
#[derive(Debug, Clone)]
pub enum SubmitStart {
    /// InFlight に遷移した。リクエストを 1 回だけ発行すること。
    Dispatch(AnalysisRequest, StateTransition),
    /// ローカル検証で失敗した（リクエストは発行しない）
    Rejected(StateTransition),
}

/// 送信コントローラー（セッション単位で 1 つ）
#[derive(Debug, Clone)]
pub struct SubmissionController {
    resume: ResumeInput,
    job: JobQuery,
    state: RequestState,
    updated_at: Option<String>,
}

impl SubmissionController {
    pub fn new() -> Self {
        Self {
            resume: ResumeInput::Empty,
            job: JobQuery::default(),
            state: RequestState::Idle,
            updated_at: None,
        }
    }

    pub fn resume(&self) -> &ResumeInput {
        &self.resume
    }

    pub fn job(&self) -> &JobQuery {
        &self.job
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    // ==================== Inputs ====================

    /// テキスト入力。空文字なら Empty。どちらの場合もファイルは破棄される。
    pub fn set_resume_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.resume = if text.is_empty() {
            ResumeInput::Empty
        } else {
            ResumeInput::Text(text)
        };
    }

    /// ファイル選択。None（選択キャンセル）の場合は何もしない。
    pub fn set_resume_file(&mut self, file: Option<ResumeFile>) {
        if let Some(file) = file {
            self.resume = ResumeInput::File(file);
        }
    }

    pub fn set_job_title(&mut self, title: impl Into<String>) {
        self.job.title = title.into();
    }

    pub fn set_job_description(&mut self, description: impl Into<String>) {
        self.job.description = description.into();
    }

    // ==================== Guards ====================

    pub fn can_submit(&self) -> bool {
        self.job.has_title() && !self.resume.is_empty()
    }

    /// 送信ボタンの活性条件
    pub fn submit_enabled(&self) -> bool {
        self.can_submit() && !self.state.is_in_flight()
    }

    // ==================== Request lifecycle ====================

    /// submit 開始: Idle/Succeeded/Failed → InFlight、またはレジュメ未入力なら → Failed
    pub fn begin_submit(&mut self, now: String) -> Result<SubmitStart, AppError> {
        if self.state.is_in_flight() {
            return Err(AppError::invalid_state("解析リクエストは既に送信中です"));
        }

        let resume = match &self.resume {
            ResumeInput::Text(text) => Some(ResumePayload::Text(text.clone())),
            ResumeInput::File(file) => Some(ResumePayload::File(file.clone())),
            ResumeInput::Empty => None,
        };
        let Some(resume) = resume else {
            let transition = self.transition(
                None,
                RequestState::Failed {
                    message: NO_RESUME_MESSAGE.to_string(),
                },
                now,
            );
            return Ok(SubmitStart::Rejected(transition));
        };

        if !self.job.has_title() {
            return Err(AppError::validation("求人タイトルは必須です"));
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let request = AnalysisRequest {
            request_id: request_id.clone(),
            resume,
            job: self.job.clone(),
        };
        let transition = self.transition(
            Some(request_id.clone()),
            RequestState::InFlight { request_id },
            now,
        );

        Ok(SubmitStart::Dispatch(request, transition))
    }

    /// リクエスト決着: InFlight → Succeeded / Failed
    pub fn complete(
        &mut self,
        request_id: &str,
        outcome: Result<AnalysisResult, AnalysisError>,
        now: String,
    ) -> Result<StateTransition, AppError> {
        match &self.state {
            RequestState::InFlight { request_id: current } if current == request_id => {}
            RequestState::InFlight { .. } => {
                return Err(AppError::invalid_state(format!(
                    "リクエスト {request_id} は既に置き換えられています"
                )))
            }
            other => {
                return Err(AppError::invalid_state(format!(
                    "complete は {} 状態では実行できません",
                    other.as_str()
                )))
            }
        }

        let next = match outcome {
            Ok(result) => RequestState::Succeeded { result },
            Err(e) => RequestState::Failed {
                message: e.user_message(),
            },
        };

        Ok(self.transition(Some(request_id.to_string()), next, now))
    }

    fn transition(
        &mut self,
        request_id: Option<String>,
        next: RequestState,
        now: String,
    ) -> StateTransition {
        let prev = self.state.as_str().to_string();
        self.state = next;
        self.updated_at = Some(now.clone());
        StateTransition {
            request_id,
            prev_state: prev,
            new_state: self.state.clone(),
            at: now,
        }
    }
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{Experience, BACKEND_FALLBACK_MESSAGE};
    use crate::domain::error::ErrorCode;

    fn now() -> String {
        "2025-01-15T10:30:00Z".to_string()
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            similarity_score: 85.0,
            fit_explanation: "Strong match".to_string(),
            extracted_skills: Some(vec!["Python".to_string(), "SQL".to_string()]),
            experience: Some(Experience::years(5.0)),
            analysis_method: "embedding".to_string(),
            processing_time: 1.2,
            id: None,
            contact_info: None,
            created_at: None,
        }
    }

    fn ready_controller() -> SubmissionController {
        let mut ctl = SubmissionController::new();
        ctl.set_job_title("Senior Python Developer");
        ctl.set_resume_text("10 years of Python");
        ctl
    }

    fn dispatch(ctl: &mut SubmissionController) -> AnalysisRequest {
        match ctl.begin_submit(now()).unwrap() {
            SubmitStart::Dispatch(req, _) => req,
            SubmitStart::Rejected(t) => panic!("unexpected rejection: {t:?}"),
        }
    }

    #[test]
    fn test_initial_state() {
        let ctl = SubmissionController::new();
        assert_eq!(ctl.state(), &RequestState::Idle);
        assert!(ctl.resume().is_empty());
        assert!(!ctl.can_submit());
        assert!(ctl.updated_at().is_none());
    }

    #[test]
    fn test_text_clears_file() {
        let mut ctl = SubmissionController::new();
        ctl.set_resume_file(Some(ResumeFile::new("cv.pdf", vec![1, 2, 3])));
        ctl.set_resume_text("pasted");
        assert_eq!(ctl.resume(), &ResumeInput::Text("pasted".to_string()));
    }

    #[test]
    fn test_empty_text_clears_file_too() {
        let mut ctl = SubmissionController::new();
        ctl.set_resume_file(Some(ResumeFile::new("cv.pdf", vec![1])));
        ctl.set_resume_text("");
        assert_eq!(ctl.resume(), &ResumeInput::Empty);
    }

    #[test]
    fn test_file_clears_text() {
        let mut ctl = SubmissionController::new();
        ctl.set_resume_text("pasted");
        ctl.set_resume_file(Some(ResumeFile::new("cv.pdf", vec![1])));
        assert_eq!(ctl.resume().kind(), "file");
        assert!(ctl.resume().text().is_none());
    }

    #[test]
    fn test_absent_file_keeps_state() {
        let mut ctl = SubmissionController::new();
        ctl.set_resume_text("pasted");
        ctl.set_resume_file(None);
        assert_eq!(ctl.resume().text(), Some("pasted"));
    }

    #[test]
    fn test_mutual_exclusion_over_edit_sequence() {
        let mut ctl = SubmissionController::new();
        let ops: Vec<Box<dyn Fn(&mut SubmissionController)>> = vec![
            Box::new(|c: &mut SubmissionController| c.set_resume_text("a")),
            Box::new(|c: &mut SubmissionController| c.set_resume_file(Some(ResumeFile::new("x.txt", vec![0])))),
            Box::new(|c: &mut SubmissionController| c.set_resume_file(None)),
            Box::new(|c: &mut SubmissionController| c.set_resume_text("")),
            Box::new(|c: &mut SubmissionController| c.set_resume_file(Some(ResumeFile::new("y.pdf", vec![1])))),
            Box::new(|c: &mut SubmissionController| c.set_resume_text("b")),
        ];
        for op in &ops {
            op(&mut ctl);
            let populated = [ctl.resume().text().is_some(), ctl.resume().file().is_some()]
                .iter()
                .filter(|b| **b)
                .count();
            assert!(populated <= 1);
        }
    }

    #[test]
    fn test_can_submit_truth_table() {
        for (title, resume, expected) in [
            ("", "", false),
            ("", "cv", false),
            ("Dev", "", false),
            ("Dev", "cv", true),
        ] {
            let mut ctl = SubmissionController::new();
            ctl.set_job_title(title);
            ctl.set_resume_text(resume);
            assert_eq!(ctl.can_submit(), expected, "title={title:?} resume={resume:?}");
        }

        let mut ctl = SubmissionController::new();
        ctl.set_job_title("Dev");
        ctl.set_resume_file(Some(ResumeFile::new("cv.pdf", vec![])));
        assert!(ctl.can_submit());
    }

    #[test]
    fn test_field_edits_are_independent() {
        let mut ctl = ready_controller();
        ctl.set_job_description("Django, PostgreSQL");
        assert_eq!(ctl.job().title, "Senior Python Developer");
        assert_eq!(ctl.resume().text(), Some("10 years of Python"));
    }

    #[test]
    fn test_submit_without_resume_fails_locally() {
        let mut ctl = SubmissionController::new();
        ctl.set_job_title("Dev");
        match ctl.begin_submit(now()).unwrap() {
            SubmitStart::Rejected(t) => {
                assert_eq!(t.prev_state, "idle");
                assert!(t.request_id.is_none());
            }
            SubmitStart::Dispatch(..) => panic!("must not dispatch"),
        }
        assert_eq!(ctl.state().error_message(), Some(NO_RESUME_MESSAGE));
    }

    #[test]
    fn test_no_resume_message_wins_over_missing_title() {
        let mut ctl = SubmissionController::new();
        assert!(matches!(
            ctl.begin_submit(now()).unwrap(),
            SubmitStart::Rejected(_)
        ));
        assert_eq!(ctl.state().error_message(), Some(NO_RESUME_MESSAGE));
    }

    #[test]
    fn test_missing_title_rejected_without_state_change() {
        let mut ctl = SubmissionController::new();
        ctl.set_resume_text("cv");
        let err = ctl.begin_submit(now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(ctl.state(), &RequestState::Idle);
    }

    #[test]
    fn test_dispatch_snapshots_inputs() {
        let mut ctl = ready_controller();
        ctl.set_job_description("desc");
        let req = dispatch(&mut ctl);
        assert_eq!(req.resume, ResumePayload::Text("10 years of Python".to_string()));
        assert_eq!(req.job.title, "Senior Python Developer");
        assert_eq!(req.job.description, "desc");
        assert_eq!(
            ctl.state(),
            &RequestState::InFlight {
                request_id: req.request_id.clone()
            }
        );

        // 送信中の編集はスナップショットに影響しない
        ctl.set_resume_text("changed");
        ctl.set_job_title("Other");
        assert_eq!(req.resume, ResumePayload::Text("10 years of Python".to_string()));
        assert_eq!(ctl.resume().text(), Some("changed"));
    }

    #[test]
    fn test_dispatch_carries_file_only() {
        let mut ctl = ready_controller();
        ctl.set_resume_file(Some(ResumeFile::new("cv.pdf", vec![9, 9])));
        let req = dispatch(&mut ctl);
        match req.resume {
            ResumePayload::File(f) => assert_eq!(f.file_name, "cv.pdf"),
            ResumePayload::Text(_) => panic!("text must not be sent"),
        }
    }

    #[test]
    fn test_second_submit_rejected_while_in_flight() {
        let mut ctl = ready_controller();
        dispatch(&mut ctl);
        assert!(!ctl.submit_enabled());
        let err = ctl.begin_submit(now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert!(ctl.state().is_in_flight());
    }

    #[test]
    fn test_complete_success() {
        let mut ctl = ready_controller();
        let req = dispatch(&mut ctl);
        let t = ctl
            .complete(&req.request_id, Ok(sample_result()), now())
            .unwrap();
        assert_eq!(t.prev_state, "in_flight");
        assert_eq!(ctl.state().result(), Some(&sample_result()));
        assert!(ctl.submit_enabled());
    }

    #[test]
    fn test_complete_backend_failure() {
        let mut ctl = ready_controller();
        let req = dispatch(&mut ctl);
        ctl.complete(
            &req.request_id,
            Err(AnalysisError::Backend {
                status: 400,
                message: Some("Invalid file format".to_string()),
            }),
            now(),
        )
        .unwrap();
        assert_eq!(ctl.state().error_message(), Some("Invalid file format"));
    }

    #[test]
    fn test_complete_backend_failure_without_body() {
        let mut ctl = ready_controller();
        let req = dispatch(&mut ctl);
        ctl.complete(
            &req.request_id,
            Err(AnalysisError::Backend {
                status: 500,
                message: None,
            }),
            now(),
        )
        .unwrap();
        assert_eq!(ctl.state().error_message(), Some(BACKEND_FALLBACK_MESSAGE));
    }

    #[test]
    fn test_stale_settlement_ignored() {
        let mut ctl = ready_controller();
        let req = dispatch(&mut ctl);
        let err = ctl
            .complete("other-request", Ok(sample_result()), now())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert!(ctl.state().is_in_flight());

        ctl.complete(&req.request_id, Ok(sample_result()), now())
            .unwrap();
        // 二重決着は拒否
        assert!(ctl
            .complete(&req.request_id, Ok(sample_result()), now())
            .is_err());
    }

    #[test]
    fn test_resubmit_clears_previous_result() {
        let mut ctl = ready_controller();
        let req = dispatch(&mut ctl);
        ctl.complete(&req.request_id, Err(AnalysisError::Transport("boom".into())), now())
            .unwrap();
        assert_eq!(ctl.state().error_message(), Some("boom"));

        let req2 = dispatch(&mut ctl);
        assert_ne!(req.request_id, req2.request_id);
        assert!(ctl.state().error_message().is_none());
        assert!(ctl.state().result().is_none());
        // 入力は submit 後も保持される
        assert_eq!(ctl.resume().text(), Some("10 years of Python"));
    }

    #[test]
    fn test_identical_submits_map_to_identical_state() {
        let mut ctl = ready_controller();
        let req = dispatch(&mut ctl);
        ctl.complete(&req.request_id, Ok(sample_result()), now())
            .unwrap();
        let first = ctl.state().clone();

        let req = dispatch(&mut ctl);
        ctl.complete(&req.request_id, Ok(sample_result()), now())
            .unwrap();
        assert_eq!(ctl.state(), &first);
    }
}
