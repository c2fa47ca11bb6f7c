// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 深度采样 (Depth sampling)
//!
//! 在规则像素网格上查询深度, 把二维掩码转换为相机坐标系下的点云。
pub mod sampler;

pub use sampler::DepthGridSampler;

use crate::Point3D;

/// 逐像素深度查询 (由相机 / 采集层提供)
///
/// 无有效深度时返回 None, 调用方跳过该像素。
pub trait DepthLookup {
    fn try_get_camera_relative_point(&self, x: u32, y: u32) -> Option<Point3D>;
}

impl<F> DepthLookup for F
where
    F: Fn(u32, u32) -> Option<Point3D>,
{
    fn try_get_camera_relative_point(&self, x: u32, y: u32) -> Option<Point3D> {
        self(x, y)
    }
}

/// 点云累加: 顶点、最近深度、轴对齐包围盒
#[derive(Debug, Default)]
pub(crate) struct PointCloud {
    vertices: Vec<Point3D>,
    bounds: Option<(Point3D, Point3D)>,
}

impl PointCloud {
    pub fn push(&mut self, point: Point3D) {
        self.bounds = Some(match self.bounds {
            Some((lo, hi)) => (lo.inf(&point), hi.sup(&point)),
            None => (point, point),
        });
        self.vertices.push(point);
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// 最小 z
    pub fn nearest_z(&self) -> Option<f32> {
        self.bounds.map(|(lo, _)| lo.z)
    }

    /// 包围盒中心
    pub fn origin(&self) -> Option<Point3D> {
        self.bounds.map(|(lo, hi)| nalgebra::center(&lo, &hi))
    }

    pub fn into_vertices(self) -> Vec<Point3D> {
        self.vertices
    }
}
