// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 引擎配置参数
pub mod depth; // 深度网格采样
pub mod detection; // 检测结果类型
pub mod error; // 错误类型
pub mod labels; // 类别标签表
pub mod mask; // 实例掩码生成与成员判定
pub mod models; // 推理后端与模型变体
pub mod pipeline; // 单帧处理流水线
pub mod postprocess; // 输出解码 + NMS + 坐标还原
pub mod utils; // 仿射 / 字母框工具

pub use crate::config::EngineConfig;
pub use crate::depth::{DepthGridSampler, DepthLookup};
pub use crate::detection::{DetectedObject, Detection, FrameResult};
pub use crate::error::{EngineError, Result};
pub use crate::labels::ClassLabels;
pub use crate::mask::{InstanceMasks, MaskMembership, MaskProcessor};
pub use crate::models::{InferenceBackend, ModelFlavor, Predictor, SharedPredictor};
pub use crate::pipeline::process_frame;
pub use crate::postprocess::{Candidate, Workspace};
pub use crate::utils::letterbox::Letterbox;

/// 相机坐标系下的三维点
pub type Point3D = nalgebra::Point3<f32>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bbox {
    // a bounding box around an object
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
    id: usize,
    confidence: f32,
}

impl Bbox {
    pub fn new_from_xywh(xmin: f32, ymin: f32, width: f32, height: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32, id: usize, confidence: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
            id,
            confidence,
        }
    }

    /// 从中心点格式 (cx, cy, w, h) 创建
    pub fn from_cxcywh(cx: f32, cy: f32, width: f32, height: f32, id: usize, confidence: f32) -> Self {
        Self::new(cx - width / 2., cy - height / 2., width, height, id, confidence)
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.) * self.height.max(0.)
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = self.xmax().min(another.xmax());
        let t = self.ymin.max(another.ymin);
        let b = self.ymax().min(another.ymax());
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Bbox) -> f32 {
        let union = self.union(another);
        if union <= 0. {
            return 0.;
        }
        self.intersection_area(another) / union
    }
}
