//! 检测结果类型 (Detection types)
//!
//! - Detection:      原图坐标系下的检测框
//! - DetectedObject: 掩码 + 深度采样后的三维物体
//! - FrameResult:    单帧完整输出
pub mod types;

pub use types::{DetectedObject, Detection, FrameResult, INF_SIZE};
