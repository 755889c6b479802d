use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::domain::analysis::{
    AnalysisError, AnalysisRequest, AnalysisResult, Analyzer, ResumePayload,
};
use crate::domain::error::AppError;
use crate::domain::settings::ClientConfig;

/// 解析 API (`POST {api_url}/predict_fit/`) を multipart で呼び出す
pub struct HttpAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

/// 失敗レスポンスの本文。`error` が無くても、文字列でなくても None 扱い。
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpAnalyzer {
    pub fn new(config: &ClientConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("HTTP クライアント作成失敗: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.predict_fit_url(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(request: AnalysisRequest) -> Result<Form, AnalysisError> {
        let form = match request.resume {
            ResumePayload::File(file) => {
                let content_type = file.content_type();
                let part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(content_type)
                    .map_err(|e| AnalysisError::Transport(format!("Failed to create multipart: {e}")))?;
                Form::new().part("resume_file", part)
            }
            ResumePayload::Text(text) => Form::new().text("resume_text", text),
        };

        Ok(form
            .text("job_title", request.job.title)
            .text("job_description", request.job.description))
    }
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let request_id = request.request_id.clone();
        let form = Self::build_form(request)?;

        log::info!("Calling analysis service [{request_id}]: {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                log::warn!("Analysis request [{request_id}] failed: {e}");
                AnalysisError::Transport(e.to_string())
            })?;

        let status = response.status();
        log::debug!("Analysis response [{request_id}] status: {status}");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(&body);
            log::warn!(
                "Analysis service returned {status} [{request_id}]: {}",
                message.as_deref().unwrap_or("<no error field>")
            );
            return Err(AnalysisError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<AnalysisResult>().await.map_err(|e| {
            log::warn!("Analysis response [{request_id}] could not be parsed: {e}");
            AnalysisError::Transport(format!("Response parse error: {e}"))
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
