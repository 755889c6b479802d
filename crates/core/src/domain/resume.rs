use std::path::Path;

use serde::Serialize;

use super::error::AppError;

/// アップロード対象のレジュメファイル（ローカル保持のみ、送信は submit 時）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// 申告サイズ（バイト）
    pub size: u64,
}

impl ResumeFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            file_name: file_name.into(),
            bytes,
            size,
        }
    }

    /// ディスクから読み込む。ファイル名はパスの末尾要素を使う。
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::io(format!("ファイルパスではありません: {}", path.display())))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::io(format!("{} の読み込みに失敗: {e}", path.display())))?;

        Ok(Self::new(file_name, bytes))
    }

    /// 拡張子から MIME タイプを推定する。中身は検査しない。
    pub fn content_type(&self) -> &'static str {
        let lower = self.file_name.to_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext {
            "pdf" => "application/pdf",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

/// レジュメ入力。テキストとファイルは排他。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResumeInput {
    #[default]
    Empty,
    Text(String),
    File(ResumeFile),
}

impl ResumeInput {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::File(_) => "file",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn file(&self) -> Option<&ResumeFile> {
        match self {
            Self::File(f) => Some(f),
            _ => None,
        }
    }
}

/// 求人情報（タイトル必須、説明は任意）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobQuery {
    pub title: String,
    pub description: String,
}

impl JobQuery {
    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}
