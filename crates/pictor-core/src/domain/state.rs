//! State - 1 リクエスト内の生成パイプラインの段階

use std::fmt;

/// GenerationStage は 1 回の generate 呼び出しが到達した段階
///
/// # 状態遷移
/// `Idle → RateChecked → Composed → Requested → Downloaded → Saved → Committed → Done`
///
/// どの段階からも失敗（GenerationError）で終了しうる。
/// 失敗時は GenerationError::stage() が「どの段階で止まったか」を返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GenerationStage {
    Idle,
    RateChecked,
    Composed,
    Requested,
    Downloaded,
    Saved,
    Committed,
    Done,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Idle => "idle",
            GenerationStage::RateChecked => "rate_checked",
            GenerationStage::Composed => "composed",
            GenerationStage::Requested => "requested",
            GenerationStage::Downloaded => "downloaded",
            GenerationStage::Saved => "saved",
            GenerationStage::Committed => "committed",
            GenerationStage::Done => "done",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
