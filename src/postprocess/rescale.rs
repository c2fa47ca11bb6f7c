// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 检测框还原: 模型输入坐标 → 原图像素坐标 (字母框逆变换)

use crate::detection::Detection;
use crate::utils::letterbox::Letterbox;
use crate::Bbox;

/// 四个角点分别做 `round(coord * scale_ratio - shift)`
pub fn rescale_box(bbox: &Bbox, letterbox: &Letterbox) -> Detection {
    let (x1, y1) = letterbox.inverse(bbox.xmin(), bbox.ymin());
    let (x2, y2) = letterbox.inverse(bbox.xmax(), bbox.ymax());
    Detection {
        x1: x1.round(),
        y1: y1.round(),
        x2: x2.round(),
        y2: y2.round(),
        confidence: bbox.confidence(),
        class_id: bbox.id() as u32,
    }
}
