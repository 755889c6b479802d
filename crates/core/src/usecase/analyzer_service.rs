use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::domain::analysis::{AnalysisError, AnalysisResult, Analyzer};
use crate::domain::error::AppError;
use crate::domain::presentation::{Panel, SubmitButton};
use crate::domain::resume::{JobQuery, ResumeFile, ResumeInput};
use crate::domain::settings::ClientConfig;
use crate::domain::submission::{
    RequestState, StateTransition, SubmissionController, SubmitStart,
};
use crate::infra::analyzer::HttpAnalyzer;

/// セッション単位の解析サービス（描画側へ参照で渡す）
pub struct AnalyzerService {
    controller: Mutex<SubmissionController>,
    analyzer: Arc<dyn Analyzer>,
    state_tx: watch::Sender<RequestState>,
}

impl AnalyzerService {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        let (state_tx, _) = watch::channel(RequestState::Idle);
        Self {
            controller: Mutex::new(SubmissionController::new()),
            analyzer,
            state_tx,
        }
    }

    /// 設定から HTTP 実装で構築する
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let analyzer = HttpAnalyzer::new(config)?;
        log::info!("Analysis endpoint: {}", analyzer.endpoint());
        Ok(Self::new(Arc::new(analyzer)))
    }

    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    // ==================== Inputs ====================

    pub fn set_resume_text(&self, text: impl Into<String>) {
        self.controller.lock().set_resume_text(text);
    }

    pub fn set_resume_file(&self, file: Option<ResumeFile>) {
        self.controller.lock().set_resume_file(file);
    }

    /// ファイルを読み込んでレジュメに設定する（アップロードはしない）
    pub async fn load_resume_file(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let file = ResumeFile::load(path).await?;
        log::debug!("Resume file selected: {} ({} bytes)", file.file_name, file.size);
        self.set_resume_file(Some(file));
        Ok(())
    }

    pub fn set_job_title(&self, title: impl Into<String>) {
        self.controller.lock().set_job_title(title);
    }

    pub fn set_job_description(&self, description: impl Into<String>) {
        self.controller.lock().set_job_description(description);
    }

    // ==================== Queries ====================

    pub fn can_submit(&self) -> bool {
        self.controller.lock().can_submit()
    }

    pub fn submit_enabled(&self) -> bool {
        self.controller.lock().submit_enabled()
    }

    pub fn request_state(&self) -> RequestState {
        self.controller.lock().state().clone()
    }

    pub fn resume(&self) -> ResumeInput {
        self.controller.lock().resume().clone()
    }

    pub fn job(&self) -> JobQuery {
        self.controller.lock().job().clone()
    }

    pub fn panel(&self) -> Panel {
        Panel::from_state(self.controller.lock().state())
    }

    pub fn submit_button(&self) -> SubmitButton {
        let ctl = self.controller.lock();
        SubmitButton::new(ctl.can_submit(), ctl.state())
    }

    /// 状態変化の購読（描画側が待機中の表示を切り替えるため）
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state_tx.subscribe()
    }

    // ==================== Submit ====================

    /// 解析を 1 回実行する。待機中もロックは保持しないので入力編集は即時反映される。
    /// 自動リトライはしない。
    pub async fn submit(&self) -> Result<StateTransition, AppError> {
        let start = self.controller.lock().begin_submit(now())?;

        let request = match start {
            SubmitStart::Rejected(transition) => {
                log::warn!("Submit rejected locally: {:?}", transition.new_state);
                self.publish(&transition);
                return Ok(transition);
            }
            SubmitStart::Dispatch(request, transition) => {
                self.publish(&transition);
                request
            }
        };

        let guard = SettleGuard {
            service: self,
            request_id: Some(request.request_id.clone()),
        };

        let started = std::time::Instant::now();
        let outcome = self.analyzer.analyze(request).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &outcome {
            Ok(result) => log::info!(
                "Analysis succeeded in {elapsed_ms}ms (score {}, method {})",
                result.similarity_score,
                result.analysis_method
            ),
            Err(e) => log::warn!("Analysis failed in {elapsed_ms}ms: {e}"),
        }

        guard.settle(outcome)
    }

    fn settle(
        &self,
        request_id: &str,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Result<StateTransition, AppError> {
        let transition = self.controller.lock().complete(request_id, outcome, now())?;
        self.publish(&transition);
        Ok(transition)
    }

    fn publish(&self, transition: &StateTransition) {
        log::debug!(
            "Request state: {} -> {}",
            transition.prev_state,
            transition.new_state.as_str()
        );
        self.state_tx.send_replace(transition.new_state.clone());
    }
}

/// submit の future が決着前に破棄された場合でも InFlight のまま残さない
struct SettleGuard<'a> {
    service: &'a AnalyzerService,
    request_id: Option<String>,
}

impl SettleGuard<'_> {
    fn settle(
        mut self,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Result<StateTransition, AppError> {
        let request_id = self
            .request_id
            .take()
            .ok_or_else(|| AppError::internal("リクエストは既に決着済みです"))?;
        self.service.settle(&request_id, outcome)
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if let Some(request_id) = self.request_id.take() {
            log::warn!("Analysis request [{request_id}] dropped before settling");
            if let Err(e) = self
                .service
                .settle(&request_id, Err(AnalysisError::Interrupted))
            {
                log::error!("Failed to settle interrupted request: {e}");
            }
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
