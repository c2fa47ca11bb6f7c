//! 输出后处理 (Postprocess)
//!
//! 检测输出 → 重排 → 置信度过滤 → NMS → 坐标还原,
//! 原型掩码 + NMS 保留的候选 → 实例掩码
//!
//! 所有临时缓冲放在调用方持有的 `Workspace` 中, 按需增长并跨帧复用。
pub mod filter;
pub mod nms;
pub mod reshape;
pub mod rescale;

use ndarray::{Array, ArrayView2, IxDyn};
use tracing::debug;

use crate::config::EngineConfig;
use crate::detection::Detection;
use crate::error::{EngineError, Result};
use crate::mask::{InstanceMasks, MaskProcessor};
use crate::utils::letterbox::Letterbox;
use crate::Bbox;

/// 通过置信度过滤的候选框 (模型输入坐标系, 左上角 + 宽高)
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub row: usize, // 原始输出中的行号
    pub bbox: Bbox,
}

/// 单帧临时缓冲, 只增不减
///
/// 同一个 Workspace 不能被两次调用同时使用 (`&mut` 借用保证);
/// 每次调用开始时清空, 失败的调用不会把残留数据带给下一帧。
#[derive(Debug, Default)]
pub struct Workspace {
    rows: Vec<f32>,
    candidates: Vec<Candidate>,
    coeffs: Vec<f32>,
    order: Vec<usize>,
    keep: Vec<usize>,
    num_masks: usize,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            candidates: Vec::with_capacity(filter::INITIAL_CAPACITY),
            ..Default::default()
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.candidates.clear();
        self.coeffs.clear();
        self.order.clear();
        self.keep.clear();
        self.num_masks = 0;
    }

    /// 本帧通过置信度过滤的候选
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// NMS 保留的候选下标 (按保留顺序)
    pub fn kept(&self) -> &[usize] {
        &self.keep
    }

    /// 第 index 个候选的掩码系数
    pub fn coeffs_of(&self, index: usize) -> &[f32] {
        let start = index * self.num_masks;
        &self.coeffs[start..start + self.num_masks]
    }

    /// 候选缓冲当前容量
    pub fn candidate_capacity(&self) -> usize {
        self.candidates.capacity()
    }
}

/// 解码一帧: 返回原图坐标的检测框与逐一对齐的实例掩码
///
/// # 参数
/// - `outputs`: 模型原始输出 [检测输出, 原型掩码]
/// - `image_size`: 原图尺寸 (w, h)
pub fn decode(
    outputs: &[Array<f32, IxDyn>],
    image_size: (u32, u32),
    config: &EngineConfig,
    ws: &mut Workspace,
) -> Result<(Vec<Detection>, InstanceMasks)> {
    ws.clear();

    let (preds, protos) = match outputs {
        [preds, protos, ..] => (preds, protos),
        _ => {
            return Err(EngineError::shape(format!(
                "需要 2 个输出 (检测 + 原型掩码), 实际为 {}",
                outputs.len()
            )))
        }
    };

    let layout = reshape::reshape_rows(
        preds.view(),
        config.flavor,
        config.num_classes,
        config.num_mask_channels,
        &mut ws.rows,
    )?;
    ws.num_masks = layout.num_masks;

    let rows = ArrayView2::from_shape((layout.num_rows, layout.row_len()), &ws.rows)?;
    filter::filter_candidates(
        rows,
        &layout,
        config.conf_threshold,
        &mut ws.candidates,
        &mut ws.coeffs,
    );

    nms::non_max_suppression(
        &ws.candidates,
        config.nms_threshold,
        config.top_k,
        config.class_agnostic_nms,
        &mut ws.order,
        &mut ws.keep,
    );
    debug!(
        "候选 {} 行, 过滤后 {}, NMS 保留 {}",
        layout.num_rows,
        ws.candidates.len(),
        ws.keep.len()
    );

    let (image_w, image_h) = image_size;
    let letterbox = Letterbox::new(image_w, image_h, config.input_width(), config.input_height());
    let kept_boxes: Vec<Bbox> = ws.keep.iter().map(|&i| ws.candidates[i].bbox.clone()).collect();
    let detections = kept_boxes
        .iter()
        .map(|bbox| rescale::rescale_box(bbox, &letterbox))
        .collect();

    let kept_coeffs = Array::from_shape_fn((ws.keep.len(), layout.num_masks), |(k, c)| {
        ws.coeffs_of(ws.keep[k])[c]
    });
    let masks = MaskProcessor::new(config.input_width(), config.input_height(), config.upsample_masks)
        .process(protos.view(), &kept_boxes, kept_coeffs.view())?;

    Ok((detections, masks))
}
