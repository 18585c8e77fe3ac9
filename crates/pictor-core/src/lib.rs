//! pictor-core
//!
//! Core building blocks for styled image generation.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, style, rate_window, artifact, request, outcome, state, errors）
//! - **ports**: 抽象化レイヤー（StateStore, ArtifactStore, ImageProvider, Downloader, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（composer, rate_limiter, orchestrator, builder）
//! - **impls**: 実装（ファイル / インメモリのストア、OpenAI プロバイダ、HTTP ダウンローダ）
//! - **config**: 環境変数からの設定
//! - **observability**: クォータの参照用ビュー

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{GenerationOrchestrator, OrchestratorBuilder};
pub use config::{Config, ConfigError};
