// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 网格深度采样
//
// 自由空间: 网格点及其四个对角 ±free_space_margin 处都不在任何遮挡掩码内,
//           才查询深度, 命中即为背景顶点。
// 物体内部: 检测框内的网格点本身在该实例掩码内, 且沿四条对角线
//           1..=object_boundary_margin 的所有探测点也在掩码内 (腐蚀),
//           才查询深度。

use tracing::debug;

use super::{DepthLookup, PointCloud};
use crate::config::EngineConfig;
use crate::detection::{DetectedObject, Detection};
use crate::labels::ClassLabels;
use crate::mask::{InstanceMasks, MaskMembership};

/// 四个对角方向
const DIAGONALS: [(i64, i64); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// 物体至少需要的顶点数
const MIN_OBJECT_VERTICES: usize = 2;
/// 背景至少需要的顶点数
const MIN_BACKGROUND_VERTICES: usize = 1;

pub struct DepthGridSampler<'a> {
    config: &'a EngineConfig,
    labels: &'a ClassLabels,
}

impl<'a> DepthGridSampler<'a> {
    pub fn new(config: &'a EngineConfig, labels: &'a ClassLabels) -> Self {
        Self { config, labels }
    }

    /// 检测结果 + 实例掩码 + 深度 → 物体点云 (按检测顺序), 背景点云 (若有) 在最后
    ///
    /// # 参数
    /// - `detections`: 原图坐标检测框, 与 `masks` 按下标对应
    /// - `image_size`: 原图尺寸 (w, h)
    pub fn sample<D>(
        &self,
        detections: &[Detection],
        masks: &InstanceMasks,
        image_size: (u32, u32),
        depth: &D,
    ) -> Vec<DetectedObject>
    where
        D: DepthLookup + ?Sized,
    {
        let (image_w, image_h) = image_size;
        let mut objects = Vec::new();
        if image_w == 0 || image_h == 0 {
            return objects;
        }

        let membership = MaskMembership::new(masks, image_w, image_h);
        let labels: Vec<_> = detections
            .iter()
            .map(|det| self.labels.label(det.class_id as usize))
            .collect();
        let allowed: Vec<bool> = labels.iter().map(|l| self.config.is_whitelisted(l)).collect();

        for (i, det) in detections.iter().enumerate() {
            if !allowed[i] {
                continue;
            }
            let cloud = self.sample_object(&membership, det, i, image_size, depth);
            debug!("{} #{}: {} 个顶点", labels[i], i, cloud.len());
            if cloud.len() < MIN_OBJECT_VERTICES {
                continue;
            }
            let (Some(nearest_z), Some(origin)) = (cloud.nearest_z(), cloud.origin()) else {
                continue;
            };
            objects.push(DetectedObject {
                label: labels[i].to_string(),
                vertices: cloud.into_vertices(),
                rect: [det.x1, det.y1, det.x2, det.y2],
                score: det.confidence,
                nearest_z,
                origin,
                is_background: false,
            });
        }

        if let Some(label) = &self.config.background_label {
            let blocks_free_space =
                |i: usize| allowed.get(i).copied().unwrap_or(true) || self.config.excluded_labels_block_free_space;
            if let Some(background) = self.sample_free_space(&membership, blocks_free_space, label, image_size, depth)
            {
                objects.push(background);
            }
        }

        objects
    }

    /// 物体内部: 检测框内 (裁剪到原图) 的网格点
    fn sample_object<D>(
        &self,
        membership: &MaskMembership,
        det: &Detection,
        instance: usize,
        (image_w, image_h): (u32, u32),
        depth: &D,
    ) -> PointCloud
    where
        D: DepthLookup + ?Sized,
    {
        let mut cloud = PointCloud::default();
        let xs = grid_range(det.x1, det.x2, image_w, self.config.pixel_margin);
        let ys = grid_range(det.y1, det.y2, image_h, self.config.pixel_margin);
        let erosion = self.config.object_boundary_margin as i64;
        let step = self.config.pixel_margin.max(1) as usize;

        for y in ys.clone().step_by(step) {
            for x in xs.clone().step_by(step) {
                if !membership.contains(x, y, instance) {
                    continue;
                }
                let interior = (1..=erosion).all(|d| {
                    DIAGONALS
                        .iter()
                        .all(|&(dx, dy)| membership.contains(x + dx * d, y + dy * d, instance))
                });
                if !interior {
                    continue;
                }
                if let Some(point) = depth.try_get_camera_relative_point(x as u32, y as u32) {
                    cloud.push(point);
                }
            }
        }
        cloud
    }

    /// 自由空间: 全图网格点, 膨胀后的遮挡掩码之外即为自由空间
    fn sample_free_space<D>(
        &self,
        membership: &MaskMembership,
        blocks: impl Fn(usize) -> bool,
        label: &str,
        (image_w, image_h): (u32, u32),
        depth: &D,
    ) -> Option<DetectedObject>
    where
        D: DepthLookup + ?Sized,
    {
        let step = self.config.pixel_margin.max(1) as usize;
        let dilation = self.config.free_space_margin() as i64;
        let mut cloud = PointCloud::default();
        let mut rect: Option<[f32; 4]> = None;

        for y in (0..image_h as i64).step_by(step) {
            for x in (0..image_w as i64).step_by(step) {
                if membership.contains_any(x, y, &blocks) {
                    continue;
                }
                let near_object = dilation > 0
                    && DIAGONALS.iter().any(|&(dx, dy)| {
                        membership.contains_any(x + dx * dilation, y + dy * dilation, &blocks)
                    });
                if near_object {
                    continue;
                }
                let Some(point) = depth.try_get_camera_relative_point(x as u32, y as u32) else {
                    continue;
                };
                cloud.push(point);
                let (fx, fy) = (x as f32, y as f32);
                rect = Some(match rect {
                    Some([x1, y1, x2, y2]) => [x1.min(fx), y1.min(fy), x2.max(fx), y2.max(fy)],
                    None => [fx, fy, fx, fy],
                });
            }
        }

        debug!("背景: {} 个顶点", cloud.len());
        if cloud.len() < MIN_BACKGROUND_VERTICES {
            return None;
        }
        Some(DetectedObject {
            label: label.to_string(),
            rect: rect?,
            score: 1.0,
            nearest_z: cloud.nearest_z()?,
            origin: cloud.origin()?,
            vertices: cloud.into_vertices(),
            is_background: true,
        })
    }
}

/// 区间 [lo, hi] 裁剪到 [0, size) 后, 从第一个步长整数倍开始的网格坐标
fn grid_range(lo: f32, hi: f32, size: u32, step: u32) -> std::ops::RangeInclusive<i64> {
    let step = step.max(1) as i64;
    let last = size as i64 - 1;
    let lo = (lo.max(0.).ceil() as i64).min(last + 1);
    let hi = (hi.floor() as i64).min(last);
    let first = (lo + step - 1) / step * step;
    first..=hi
}
