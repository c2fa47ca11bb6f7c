/// 仿射变换工具模块
/// 字母框坐标映射与掩码双线性重采样共用
use ndarray::{Array2, ArrayView2};

/// 仿射变换矩阵 (2x3)
/// | a11 a12 b1 |
/// | a21 a22 b2 |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    pub a11: f32,
    pub a12: f32,
    pub b1: f32,
    pub a21: f32,
    pub a22: f32,
    pub b2: f32,
}

impl AffineMatrix {
    /// 创建平移矩阵
    pub fn translation(dx: f32, dy: f32) -> Self {
        Self {
            a11: 1.0,
            a12: 0.0,
            b1: dx,
            a21: 0.0,
            a22: 1.0,
            b2: dy,
        }
    }

    /// 创建缩放矩阵
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a11: sx,
            a12: 0.0,
            b1: 0.0,
            a21: 0.0,
            a22: sy,
            b2: 0.0,
        }
    }

    /// 尺寸缩放矩阵, 像素中心对齐 (align_corners = false)
    ///
    /// dst = s * src + (s - 1) / 2
    pub fn resize(src_width: usize, src_height: usize, dst_width: usize, dst_height: usize) -> Self {
        let sx = dst_width as f32 / src_width as f32;
        let sy = dst_height as f32 / src_height as f32;
        Self::translation((sx - 1.0) / 2.0, (sy - 1.0) / 2.0).compose(&Self::scale(sx, sy))
    }

    /// 应用仿射变换到点 (x, y)
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let new_x = self.a11 * x + self.a12 * y + self.b1;
        let new_y = self.a21 * x + self.a22 * y + self.b2;
        (new_x, new_y)
    }

    /// 计算逆矩阵 (用于反向映射)
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a11 * self.a22 - self.a12 * self.a21;
        if !det.is_finite() || det.abs() < 1e-10 {
            return None; // 矩阵不可逆
        }

        let inv_det = 1.0 / det;
        Some(Self {
            a11: self.a22 * inv_det,
            a12: -self.a12 * inv_det,
            b1: (self.a12 * self.b2 - self.a22 * self.b1) * inv_det,
            a21: -self.a21 * inv_det,
            a22: self.a11 * inv_det,
            b2: (self.a21 * self.b1 - self.a11 * self.b2) * inv_det,
        })
    }

    /// 矩阵组合 (self * other), 先应用 other 再应用 self
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            a11: self.a11 * other.a11 + self.a12 * other.a21,
            a12: self.a11 * other.a12 + self.a12 * other.a22,
            b1: self.a11 * other.b1 + self.a12 * other.b2 + self.b1,
            a21: self.a21 * other.a11 + self.a22 * other.a21,
            a22: self.a21 * other.a12 + self.a22 * other.a22,
            b2: self.a21 * other.b1 + self.a22 * other.b2 + self.b2,
        }
    }
}

/// 仿射变换 (单通道浮点图, 双线性插值, 边缘复制)
///
/// # 参数
/// - `src`: 源图像 (height x width)
/// - `matrix`: 源 → 目标 的仿射矩阵
/// - `dst_size`: 目标图像尺寸 (width, height)
///
/// 矩阵不可逆时返回 None
pub fn warp_affine_bilinear(
    src: ArrayView2<f32>,
    matrix: &AffineMatrix,
    dst_size: (usize, usize),
) -> Option<Array2<f32>> {
    let (dst_width, dst_height) = dst_size;
    let mut dst = Array2::<f32>::zeros((dst_height, dst_width));
    if src.is_empty() {
        return Some(dst);
    }

    // 使用逆变换进行反向映射
    let inv_matrix = matrix.inverse()?;

    for ((dst_y, dst_x), value) in dst.indexed_iter_mut() {
        let (src_x, src_y) = inv_matrix.transform_point(dst_x as f32, dst_y as f32);
        *value = get_pixel_bilinear(&src, src_x, src_y);
    }

    Some(dst)
}

/// 双线性插值
fn get_pixel_bilinear(src: &ArrayView2<f32>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_border_pixel(src, x0, y0);
    let p01 = get_border_pixel(src, x0, y1);
    let p10 = get_border_pixel(src, x1, y0);
    let p11 = get_border_pixel(src, x1, y1);

    let v0 = p00 * (1.0 - fx) + p10 * fx;
    let v1 = p01 * (1.0 - fx) + p11 * fx;
    v0 * (1.0 - fy) + v1 * fy
}

/// 边界处理: 边缘复制
fn get_border_pixel(src: &ArrayView2<f32>, x: i32, y: i32) -> f32 {
    let (height, width) = src.dim();
    let bx = x.clamp(0, width as i32 - 1) as usize;
    let by = y.clamp(0, height as i32 - 1) as usize;
    src[[by, bx]]
}
