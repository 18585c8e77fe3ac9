//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **PromptComposer**: スタイル指示とユーザー入力の合成（純粋関数）
//! - **RateLimiter**: 永続化されたウィンドウ単位のレート制限（予約 → 確定）
//! - **GenerationOrchestrator**: 1 リクエスト分の生成パイプライン
//! - **OrchestratorBuilder**: Config からの組み立て

pub mod builder;
pub mod composer;
pub mod orchestrator;
pub mod rate_limiter;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, OrchestratorBuilder};
pub use self::composer::PromptComposer;
pub use self::orchestrator::{GenerationOrchestrator, Timeouts};
pub use self::rate_limiter::{Admission, RateLimiter, RatePolicy, Reservation};
