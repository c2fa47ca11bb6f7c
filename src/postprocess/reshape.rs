// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 原始输出重排: [1, C, N] (通道优先) 或 [1, N, C] → 每行一个候选框的 [N, C]

use ndarray::{ArrayViewD, Axis, Ix3};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::models::ModelFlavor;

/// 重排后每行的布局
///
/// | cx cy w h | [obj] | 类别分数 × num_classes | 掩码系数 × num_masks |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    pub num_rows: usize,
    pub num_classes: usize,
    pub num_masks: usize,
    pub score_offset: usize,
    pub objectness: bool,
}

impl RowLayout {
    pub fn row_len(&self) -> usize {
        self.score_offset + self.num_classes + self.num_masks
    }

    pub fn mask_offset(&self) -> usize {
        self.score_offset + self.num_classes
    }
}

/// 将检测输出重排为行优先并拷贝到 `rows`
///
/// 通道数与 `4 + num_classes + num_masks` 不符时按实际通道数修正类别数并告警;
/// 通道数不足以容纳任何类别时返回错误。
pub fn reshape_rows(
    preds: ArrayViewD<f32>,
    flavor: ModelFlavor,
    num_classes: usize,
    num_masks: usize,
    rows: &mut Vec<f32>,
) -> Result<RowLayout> {
    let preds = preds.into_dimensionality::<Ix3>()?;
    let batch = preds.len_of(Axis(0));
    if batch != 1 {
        return Err(EngineError::shape(format!("仅支持 batch=1, 实际为 {}", batch)));
    }

    let anchor = preds.index_axis_move(Axis(0), 0);
    let table = if flavor.channel_major() {
        anchor.reversed_axes()
    } else {
        anchor
    };
    let (num_rows, channels) = table.dim();

    let score_offset = flavor.score_offset();
    let expected = score_offset + num_classes + num_masks;
    let num_classes = if channels == expected {
        num_classes
    } else {
        if channels <= score_offset + num_masks {
            return Err(EngineError::shape(format!(
                "输出通道数 {} 不足以容纳 {} 个框参数与 {} 个掩码系数",
                channels, score_offset, num_masks
            )));
        }
        let corrected = channels - score_offset - num_masks;
        warn!(
            "输出通道数 {} 与配置不符 (nc={}, nm={}), 类别数修正为 {}",
            channels, num_classes, num_masks, corrected
        );
        corrected
    };

    rows.clear();
    rows.extend(table.iter().copied());

    Ok(RowLayout {
        num_rows,
        num_classes,
        num_masks,
        score_offset,
        objectness: flavor.has_objectness(),
    })
}
