// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 非极大值抑制 (贪心)

use super::Candidate;

/// 贪心 NMS, 返回保留候选的下标 (按保留顺序写入 `keep`)
///
/// - 按置信度降序遍历, 与已保留框 IoU 超过 `iou_threshold` 的框被抑制
/// - `class_agnostic = false` 时只与同类别的已保留框比较,
///   等价于按类别分组各自 NMS 后再按置信度合并
/// - 保留 `top_k` 个后停止
///
/// `order` 为排序用的临时缓冲
pub fn non_max_suppression(
    candidates: &[Candidate],
    iou_threshold: f32,
    top_k: usize,
    class_agnostic: bool,
    order: &mut Vec<usize>,
    keep: &mut Vec<usize>,
) {
    order.clear();
    keep.clear();
    if candidates.is_empty() || top_k == 0 {
        return;
    }

    order.extend(0..candidates.len());
    // 稳定排序: 同分时保持原始行序
    order.sort_by(|&a, &b| {
        candidates[b]
            .bbox
            .confidence()
            .total_cmp(&candidates[a].bbox.confidence())
    });

    for &index in order.iter() {
        if keep.len() >= top_k {
            break;
        }
        let bbox = &candidates[index].bbox;
        let drop = keep.iter().any(|&prev| {
            let kept = &candidates[prev].bbox;
            (class_agnostic || kept.id() == bbox.id()) && kept.iou(bbox) > iou_threshold
        });
        if !drop {
            keep.push(index);
        }
    }
}
