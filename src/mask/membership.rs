// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 掩码成员判定
// 原图像素按字母框映射到掩码张量坐标, 再查询对应实例的掩码值

use super::{InstanceMasks, MASK_INSIDE};
use crate::utils::letterbox::Letterbox;

/// 绑定一帧掩码与原图尺寸的成员判定器
///
/// 物体内部判定 (腐蚀) 与自由空间判定 (膨胀) 共用同一个映射。
#[derive(Clone, Copy, Debug)]
pub struct MaskMembership<'a> {
    masks: &'a InstanceMasks,
    letterbox: Letterbox,
}

impl<'a> MaskMembership<'a> {
    pub fn new(masks: &'a InstanceMasks, image_width: u32, image_height: u32) -> Self {
        let letterbox = Letterbox::new(
            image_width,
            image_height,
            masks.width() as u32,
            masks.height() as u32,
        );
        Self { masks, letterbox }
    }

    /// 原图像素 (x, y) 是否属于第 `instance` 个掩码
    ///
    /// 原图外或映射到掩码张量外的像素均不属于任何实例。
    pub fn contains(&self, x: i64, y: i64, instance: usize) -> bool {
        if instance >= self.masks.len() || self.masks.width() == 0 || self.masks.height() == 0 {
            return false;
        }
        let (image_w, image_h) = self.letterbox.src_size();
        if x < 0 || y < 0 || x >= image_w as i64 || y >= image_h as i64 {
            return false;
        }

        // mx = x / scale + (maskW - scaledW) / 2
        let (mx, my) = self.letterbox.forward(x as f32, y as f32);
        let (mx, my) = (mx.floor(), my.floor());
        if mx < 0. || my < 0. || mx >= self.masks.width() as f32 || my >= self.masks.height() as f32 {
            return false;
        }
        self.masks.view()[[instance, my as usize, mx as usize]] == MASK_INSIDE
    }

    /// 是否属于任意一个满足 `filter` 的实例
    pub fn contains_any(&self, x: i64, y: i64, filter: impl Fn(usize) -> bool) -> bool {
        (0..self.masks.len()).any(|i| filter(i) && self.contains(x, y, i))
    }
}
