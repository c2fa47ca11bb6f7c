// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 实例掩码生成
// 掩码系数 × 原型掩码 → sigmoid → 按检测框裁剪 → 二值化 → (可选) 双线性上采样

use ndarray::{Array2, Array3, ArrayView2, ArrayViewD, Axis, Ix4};

use super::{InstanceMasks, MASK_INSIDE};
use crate::error::{EngineError, Result};
use crate::utils::affine_transform::{warp_affine_bilinear, AffineMatrix};
use crate::Bbox;

const MASK_THRESHOLD: f32 = 0.5;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub struct MaskProcessor {
    input_width: u32,
    input_height: u32,
    upsample: bool,
}

impl MaskProcessor {
    /// # 参数
    /// - `input_width`, `input_height`: 模型输入尺寸, 检测框所在坐标系
    /// - `upsample`: 是否上采样到模型输入分辨率
    pub fn new(input_width: u32, input_height: u32, upsample: bool) -> Self {
        Self {
            input_width,
            input_height,
            upsample,
        }
    }

    /// # 参数
    /// - `protos`: 原型掩码 [1, C, mh, mw]
    /// - `boxes`: NMS 保留的检测框 (模型输入坐标系)
    /// - `coeffs`: 对应的掩码系数 [n, C]
    ///
    /// # Returns
    /// * [n, mh, mw] 或 [n, input_h, input_w] 的 {0, 255} 掩码, 与 `boxes` 逐一对齐
    pub fn process(
        &self,
        protos: ArrayViewD<f32>,
        boxes: &[Bbox],
        coeffs: ArrayView2<f32>,
    ) -> Result<InstanceMasks> {
        let protos = protos.into_dimensionality::<Ix4>()?;
        let (batch, nm, mh, mw) = protos.dim();
        if batch != 1 {
            return Err(EngineError::shape(format!("原型掩码仅支持 batch=1, 实际为 {}", batch)));
        }
        if mh == 0 || mw == 0 {
            return Err(EngineError::shape(format!("原型掩码尺寸为空: {}x{}", mw, mh)));
        }

        let (out_h, out_w) = if self.upsample {
            (self.input_height as usize, self.input_width as usize)
        } else {
            (mh, mw)
        };
        if boxes.is_empty() {
            return Ok(InstanceMasks::empty(out_h, out_w));
        }
        if coeffs.dim() != (boxes.len(), nm) {
            return Err(EngineError::shape(format!(
                "掩码系数形状 {:?} 与检测数 {} / 原型通道数 {} 不符",
                coeffs.dim(),
                boxes.len(),
                nm
            )));
        }

        // [C, mh, mw] → [C, mh*mw]
        let proto = protos.index_axis_move(Axis(0), 0);
        let proto = proto.to_shape((nm, mh * mw))?;
        let logits = coeffs.dot(&proto);

        // 检测框缩放到掩码坐标系
        let sx = mw as f32 / self.input_width as f32;
        let sy = mh as f32 / self.input_height as f32;
        let resize = AffineMatrix::resize(mw, mh, out_w, out_h);

        let mut data = Array3::<u8>::zeros((boxes.len(), out_h, out_w));
        for (i, (bbox, logit)) in boxes.iter().zip(logits.outer_iter()).enumerate() {
            let logit = logit.into_shape_with_order((mh, mw))?;
            let (x1, y1) = (bbox.xmin() * sx, bbox.ymin() * sy);
            let (x2, y2) = (bbox.xmax() * sx, bbox.ymax() * sy);

            let binary = Array2::from_shape_fn((mh, mw), |(r, c)| {
                let (cf, rf) = (c as f32, r as f32);
                let inside = cf >= x1 && cf < x2 && rf >= y1 && rf < y2;
                if inside && sigmoid(logit[[r, c]]) > MASK_THRESHOLD {
                    1.0
                } else {
                    0.0
                }
            });

            let mut target = data.index_axis_mut(Axis(0), i);
            if self.upsample {
                let resized = warp_affine_bilinear(binary.view(), &resize, (out_w, out_h))
                    .ok_or_else(|| EngineError::shape(format!("无法上采样 {}x{} 掩码", mw, mh)))?;
                target.zip_mut_with(&resized, |d, &v| {
                    *d = if v > MASK_THRESHOLD { MASK_INSIDE } else { 0 }
                });
            } else {
                target.zip_mut_with(&binary, |d, &v| {
                    *d = if v > MASK_THRESHOLD { MASK_INSIDE } else { 0 }
                });
            }
        }

        Ok(InstanceMasks::new(data))
    }
}
