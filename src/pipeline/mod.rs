//! 单帧处理流水线 (Frame Pipeline)
//!
//! 原始输出 → 解码 (过滤 / NMS / 还原 / 掩码) → 深度网格采样:
//! - 输入:  模型原始输出 + 原图尺寸 + 深度查询
//! - 输出:  物体点云 + 检测框 + 实例掩码

use ndarray::{Array, IxDyn};
use tracing::debug;

use crate::config::EngineConfig;
use crate::depth::{DepthGridSampler, DepthLookup};
use crate::detection::FrameResult;
use crate::error::Result;
use crate::labels::ClassLabels;
use crate::postprocess::{self, Workspace};

/// 处理一帧模型输出
///
/// 配置先经过校验, 非法配置直接返回 `InvalidConfig`, 不会进入采样。
///
/// # 参数
/// - `outputs`: 模型原始输出 [检测输出, 原型掩码]
/// - `image_size`: 原图尺寸 (w, h)
/// - `depth`: 逐像素深度查询
/// - `ws`: 调用方持有的临时缓冲, 跨帧复用
pub fn process_frame<D>(
    config: &EngineConfig,
    labels: &ClassLabels,
    outputs: &[Array<f32, IxDyn>],
    image_size: (u32, u32),
    depth: &D,
    ws: &mut Workspace,
) -> Result<FrameResult>
where
    D: DepthLookup + ?Sized,
{
    config.validate()?;
    let (detections, masks) = postprocess::decode(outputs, image_size, config, ws)?;
    let objects = DepthGridSampler::new(config, labels).sample(&detections, &masks, image_size, depth);
    debug!(
        "检测 {} 个, 输出物体 {} 个 (掩码 {}x{})",
        detections.len(),
        objects.len(),
        masks.width(),
        masks.height()
    );

    Ok(FrameResult {
        objects,
        detections,
        masks,
    })
}
