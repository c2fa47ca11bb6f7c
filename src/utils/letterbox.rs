// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 字母框 (Letterbox) 变换
//
// 原图等比缩放后居中放入目标画布, 短边两侧填充。
// 预处理、检测框还原、掩码成员判定共用同一个 Letterbox 值,
// 保证三处坐标映射完全一致。

use image::{DynamicImage, GenericImageView};
use ndarray::{Array, IxDyn};

use super::affine_transform::AffineMatrix;

/// 预处理填充灰度值
pub const PAD_VALUE: f32 = 144.0 / 255.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    scale_ratio: f32,
    shift_x: f32,
    shift_y: f32,
}

impl Letterbox {
    /// # 参数
    /// - `src_width`, `src_height`: 原图尺寸
    /// - `dst_width`, `dst_height`: 画布尺寸 (模型输入或掩码张量)
    pub fn new(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> Self {
        let (sw, sh) = (src_width as f32, src_height as f32);
        let (dw, dh) = (dst_width as f32, dst_height as f32);
        let scale_ratio = (sw / dw).max(sh / dh);
        Self {
            src_width,
            src_height,
            dst_width,
            dst_height,
            scale_ratio,
            shift_x: (dw * scale_ratio - sw) / 2.0,
            shift_y: (dh * scale_ratio - sh) / 2.0,
        }
    }

    /// 原图像素 / 画布像素
    pub fn scale_ratio(&self) -> f32 {
        self.scale_ratio
    }

    /// 原图坐标系下的水平填充量
    pub fn shift_x(&self) -> f32 {
        self.shift_x
    }

    /// 原图坐标系下的垂直填充量
    pub fn shift_y(&self) -> f32 {
        self.shift_y
    }

    pub fn src_size(&self) -> (u32, u32) {
        (self.src_width, self.src_height)
    }

    /// 原图在画布中的有效尺寸 (scaledW, scaledH)
    pub fn fitted_size(&self) -> (f32, f32) {
        (
            self.src_width as f32 / self.scale_ratio,
            self.src_height as f32 / self.scale_ratio,
        )
    }

    /// 原图 → 画布 的仿射矩阵
    pub fn forward_matrix(&self) -> AffineMatrix {
        let inv = 1.0 / self.scale_ratio;
        AffineMatrix::scale(inv, inv).compose(&AffineMatrix::translation(self.shift_x, self.shift_y))
    }

    /// 画布 → 原图 的仿射矩阵: coord * scale_ratio - shift
    pub fn inverse_matrix(&self) -> AffineMatrix {
        AffineMatrix::translation(-self.shift_x, -self.shift_y)
            .compose(&AffineMatrix::scale(self.scale_ratio, self.scale_ratio))
    }

    /// 原图坐标 → 画布坐标
    pub fn forward(&self, x: f32, y: f32) -> (f32, f32) {
        self.forward_matrix().transform_point(x, y)
    }

    /// 画布坐标 → 原图坐标 (未取整)
    pub fn inverse(&self, x: f32, y: f32) -> (f32, f32) {
        self.inverse_matrix().transform_point(x, y)
    }

    /// 预处理: 原图 → [1, 3, H, W] 归一化张量, 居中填充
    pub fn preprocess(&self, image: &DynamicImage) -> Array<f32, IxDyn> {
        let (dst_w, dst_h) = (self.dst_width as usize, self.dst_height as usize);
        let mut ys = Array::from_elem((1, 3, dst_h, dst_w), PAD_VALUE).into_dyn();

        let (w_new, h_new) = self.fitted_size();
        let (w_new, h_new) = (
            (w_new.round() as u32).clamp(1, self.dst_width.max(1)),
            (h_new.round() as u32).clamp(1, self.dst_height.max(1)),
        );
        let pad_x = (self.dst_width - w_new) as usize / 2;
        let pad_y = (self.dst_height - h_new) as usize / 2;

        let img = image.resize_exact(w_new, h_new, image::imageops::FilterType::CatmullRom);
        for (x, y, rgb) in img.pixels() {
            let x = x as usize + pad_x;
            let y = y as usize + pad_y;
            let [r, g, b, _] = rgb.0;
            ys[[0, 0, y, x]] = (r as f32) / 255.0;
            ys[[0, 1, y, x]] = (g as f32) / 255.0;
            ys[[0, 2, y, x]] = (b as f32) / 255.0;
        }

        ys
    }
}
