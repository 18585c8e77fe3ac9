//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ファイルシステム、画像生成 API、HTTP）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - プロセス全体の可変状態（レート制限カウンタ、メタデータインデックス）は
//!   trait 越しにだけ触る（テストではインメモリ実装に差し替える）
//! - 時刻と ID 生成も trait にして決定的にテストできるようにする

pub mod artifact_store;
pub mod clock;
pub mod downloader;
pub mod id_generator;
pub mod image_provider;
pub mod state_store;

// 主要な trait を再エクスポート
pub use self::artifact_store::ArtifactStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::downloader::Downloader;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::image_provider::ImageProvider;
pub use self::state_store::StateStore;
