//! 推理后端与模型变体
//!
//! # 架构说明
//!
//! 网络前向推理本身不属于本 crate: 任何能把 [1, 3, H, W] 张量变成原始输出的
//! 东西 (ONNX Runtime 会话、远程服务、测试用闭包) 都可以实现 `InferenceBackend`。
//!
//! ## 模型变体 (ModelFlavor)
//! - **YOLOv8-seg / YOLOv11-seg**: 检测输出 [1, 4+nc+nm, N], 通道优先
//! - **YOLOv5-seg**: 检测输出 [1, N, 5+nc+nm], 行优先, 含 objectness
//!
//! 两者的第二个输出都是原型掩码 [1, nm, mh, mw]。
//!
//! ## 使用示例
//! ```no_run
//! use yolov8_seg_depth::{ClassLabels, EngineConfig, Predictor, Point3D};
//!
//! # fn run(backend: impl yolov8_seg_depth::InferenceBackend, image: image::DynamicImage) -> yolov8_seg_depth::Result<()> {
//! let mut predictor = Predictor::new(backend, EngineConfig::default(), ClassLabels::coco())?;
//! let depth = |x: u32, y: u32| Some(Point3D::new(x as f32, y as f32, 1.0));
//! let frame = predictor.detect(&image, &depth)?;
//! for object in frame.foreground() {
//!     println!("{} z={:.2}", object.label, object.nearest_z);
//! }
//! # Ok(())
//! # }
//! ```
use anyhow::Result;
use ndarray::{Array, IxDyn};
use serde::{Deserialize, Serialize};

pub mod predictor; // 推理 + 后处理 + 深度采样的完整流程

pub use predictor::{Predictor, SharedPredictor};

/// 推理后端: 预处理后的张量 → 模型原始输出
pub trait InferenceBackend {
    /// # Arguments
    /// * `xs` - NCHW 格式的输入张量
    ///
    /// # Returns
    /// * `Vec<Array<f32, IxDyn>>` - 模型原始输出 [检测输出, 原型掩码]
    fn run(&mut self, xs: Array<f32, IxDyn>) -> Result<Vec<Array<f32, IxDyn>>>;
}

impl<F> InferenceBackend for F
where
    F: FnMut(Array<f32, IxDyn>) -> Result<Vec<Array<f32, IxDyn>>>,
{
    fn run(&mut self, xs: Array<f32, IxDyn>) -> Result<Vec<Array<f32, IxDyn>>> {
        self(xs)
    }
}

/// 模型变体枚举（决定检测输出的布局）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFlavor {
    /// YOLOv8 / YOLOv11 分割模型
    #[default]
    YoloV8Seg,
    /// YOLOv5 分割模型
    YoloV5Seg,
}

impl ModelFlavor {
    /// 从模型路径推断模型变体
    pub fn from_path(path: &str) -> Self {
        let path = path.to_lowercase();
        if path.contains("yolov5") || path.contains("v5") {
            ModelFlavor::YoloV5Seg
        } else {
            ModelFlavor::YoloV8Seg
        }
    }

    /// 检测输出是否为 [1, C, N] 通道优先布局
    pub fn channel_major(&self) -> bool {
        matches!(self, ModelFlavor::YoloV8Seg)
    }

    /// 每行中类别分数的起始列
    pub fn score_offset(&self) -> usize {
        match self {
            ModelFlavor::YoloV8Seg => 4,
            ModelFlavor::YoloV5Seg => 5,
        }
    }

    /// 类别分数是否需要乘以 objectness (第 4 列)
    pub fn has_objectness(&self) -> bool {
        matches!(self, ModelFlavor::YoloV5Seg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_from_path() {
        assert_eq!(ModelFlavor::from_path("models/yolov8n-seg.onnx"), ModelFlavor::YoloV8Seg);
        assert_eq!(ModelFlavor::from_path("models/yolo11s-seg.onnx"), ModelFlavor::YoloV8Seg);
        assert_eq!(ModelFlavor::from_path("models/YOLOv5s-seg.onnx"), ModelFlavor::YoloV5Seg);
    }

    #[test]
    fn test_flavor_layout() {
        assert!(ModelFlavor::YoloV8Seg.channel_major());
        assert!(!ModelFlavor::YoloV8Seg.has_objectness());
        assert_eq!(ModelFlavor::YoloV8Seg.score_offset(), 4);
        assert!(!ModelFlavor::YoloV5Seg.channel_major());
        assert!(ModelFlavor::YoloV5Seg.has_objectness());
        assert_eq!(ModelFlavor::YoloV5Seg.score_offset(), 5);
    }

    #[test]
    fn test_closure_backend() {
        let mut calls = 0;
        let mut backend = |xs: Array<f32, IxDyn>| -> Result<Vec<Array<f32, IxDyn>>> {
            calls += 1;
            Ok(vec![xs])
        };
        let out = backend.run(Array::zeros(IxDyn(&[1, 3, 2, 2]))).unwrap();
        assert_eq!(out[0].shape(), &[1, 3, 2, 2]);
        assert_eq!(calls, 1);
    }
}
