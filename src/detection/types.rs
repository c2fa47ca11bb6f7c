/// 检测与深度采样结果数据结构定义
/// Data structures for detection and depth sampling results
use crate::mask::InstanceMasks;
use crate::Point3D;

// ========== 公共常量 ==========

/// YOLOv8推理输入尺寸
pub const INF_SIZE: u32 = 640;

// ========== 数据结构 ==========

/// 检测框 (原图像素坐标, 已取整)
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

/// 带三维点云的检测物体 (引擎输出)
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedObject {
    pub label: String,
    pub vertices: Vec<Point3D>,
    pub rect: [f32; 4], // [x_min, y_min, x_max, y_max]
    pub score: f32,
    pub nearest_z: f32,  // 所有顶点中最小的 z
    pub origin: Point3D, // 顶点包围盒中心
    pub is_background: bool,
}

/// 单帧结果: 物体点云 + 检测框/掩码旁路输出 (供调用方自行绘制)
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub objects: Vec<DetectedObject>,
    pub detections: Vec<Detection>,
    pub masks: InstanceMasks,
}

impl FrameResult {
    /// 非背景物体
    pub fn foreground(&self) -> impl Iterator<Item = &DetectedObject> {
        self.objects.iter().filter(|o| !o.is_background)
    }

    /// 背景 (自由空间) 物体, 最多一个
    pub fn background(&self) -> Option<&DetectedObject> {
        self.objects.iter().find(|o| o.is_background)
    }
}
