//! レジュメ適合度解析クライアントのコア。
//!
//! - `domain`: 入力・リクエスト状態・表示モデル（I/O なし）
//! - `infra`: 外部解析サービスへの HTTP 実装
//! - `usecase`: セッション単位のサービス（唯一の待機点を扱う）

pub mod domain;
pub mod infra;
pub mod usecase;
