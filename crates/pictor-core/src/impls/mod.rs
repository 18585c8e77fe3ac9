//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **JsonFileStateStore** / **InMemoryStateStore**: レート制限状態
//! - **LocalArtifactStore** / **InMemoryArtifactStore**: 画像とメタデータ
//! - **OpenAiImageProvider**: 画像生成 API
//! - **HttpDownloader**: 生成画像の取得
//!
//! InMemory 系はテスト・開発用です。

mod fs_util;
pub mod http_downloader;
pub mod inmem_store;
pub mod local_store;
pub mod openai;
pub mod state_store;

// 主要な型を再エクスポート
pub use self::http_downloader::HttpDownloader;
pub use self::inmem_store::InMemoryArtifactStore;
pub use self::local_store::{LocalArtifactStore, METADATA_FILE};
pub use self::openai::OpenAiImageProvider;
pub use self::state_store::{InMemoryStateStore, JsonFileStateStore, RATE_LIMIT_FILE};
