// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod membership; // 图像像素 → 掩码成员判定
pub mod processor; // 原型掩码 → 实例掩码

pub use membership::MaskMembership;
pub use processor::MaskProcessor;

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};

/// 掩码内部像素值
pub const MASK_INSIDE: u8 = 255;

/// 堆叠的实例掩码 [n, h, w], 取值 {0, 255}, 与检测结果按下标一一对应
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceMasks {
    data: Array3<u8>,
}

impl InstanceMasks {
    pub fn new(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// 没有任何实例的 [0, h, w] 掩码
    pub fn empty(height: usize, width: usize) -> Self {
        Self::new(Array3::zeros((0, height, width)))
    }

    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 第 i 个实例的掩码, 越界时 panic
    pub fn mask(&self, index: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(0), index)
    }
}

impl Default for InstanceMasks {
    fn default() -> Self {
        Self::empty(0, 0)
    }
}
