// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 候选框置信度过滤

use ndarray::{s, ArrayView2};

use super::reshape::RowLayout;
use super::Candidate;
use crate::Bbox;

/// 候选缓冲初始容量 (行数)
pub const INITIAL_CAPACITY: usize = 300;

/// 容量不足时翻倍
fn grow<T>(buf: &mut Vec<T>, additional: usize, initial: usize) {
    if buf.len() + additional > buf.capacity() {
        let target = (buf.capacity() * 2).max(initial).max(buf.len() + additional);
        buf.reserve_exact(target - buf.len());
    }
}

/// 逐行取最大类别分数, 保留 `confidence > conf_threshold` 的候选框
///
/// 框由中心点格式转换为左上角 (x, y, w, h), 掩码系数按行追加到 `coeffs`,
/// 第 i 个候选的系数位于 `coeffs[i * num_masks..(i + 1) * num_masks]`。
pub fn filter_candidates(
    rows: ArrayView2<f32>,
    layout: &RowLayout,
    conf_threshold: f32,
    candidates: &mut Vec<Candidate>,
    coeffs: &mut Vec<f32>,
) {
    let score_end = layout.score_offset + layout.num_classes;
    for (row_index, pred) in rows.outer_iter().enumerate() {
        let clss = pred.slice(s![layout.score_offset..score_end]);
        let Some((id, &score)) = clss
            .into_iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };

        let confidence = if layout.objectness {
            pred[4] * score
        } else {
            score
        };
        // NaN 同样被丢弃
        if !(confidence > conf_threshold) {
            continue;
        }

        grow(candidates, 1, INITIAL_CAPACITY);
        grow(coeffs, layout.num_masks, INITIAL_CAPACITY * layout.num_masks);

        candidates.push(Candidate {
            row: row_index,
            bbox: Bbox::from_cxcywh(pred[0], pred[1], pred[2], pred[3], id, confidence.min(1.0)),
        });
        coeffs.extend(pred.slice(s![layout.mask_offset()..]).iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn layout(num_rows: usize) -> RowLayout {
        RowLayout {
            num_rows,
            num_classes: 3,
            num_masks: 2,
            score_offset: 4,
            objectness: false,
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let rows = Array2::from_shape_vec(
            (3, 9),
            vec![
                10., 20., 4., 6., 0.1, 0.7, 0.2, 1., 2., // 类别 1, 0.7
                0., 0., 1., 1., 0.25, 0.0, 0.0, 3., 4., // 恰好等于阈值
                0., 0., 1., 1., 0.0, 0.1, 0.3, 5., 6., // 类别 2, 0.3
            ],
        )
        .unwrap();
        let (mut candidates, mut coeffs) = (Vec::new(), Vec::new());
        filter_candidates(rows.view(), &layout(3), 0.25, &mut candidates, &mut coeffs);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].row, 0);
        assert_eq!(candidates[0].bbox.id(), 1);
        assert_eq!(candidates[0].bbox.confidence(), 0.7);
        assert_eq!(candidates[0].bbox.xmin(), 8.);
        assert_eq!(candidates[0].bbox.ymin(), 17.);
        assert_eq!(candidates[1].row, 2);
        assert_eq!(candidates[1].bbox.id(), 2);
        assert_eq!(coeffs, vec![1., 2., 5., 6.]);
    }

    #[test]
    fn test_objectness_scales_scores() {
        let layout = RowLayout {
            num_rows: 1,
            num_classes: 2,
            num_masks: 1,
            score_offset: 5,
            objectness: true,
        };
        let rows = Array2::from_shape_vec((1, 8), vec![0., 0., 2., 2., 0.5, 0.2, 0.8, 9.]).unwrap();
        let (mut candidates, mut coeffs) = (Vec::new(), Vec::new());
        filter_candidates(rows.view(), &layout, 0.25, &mut candidates, &mut coeffs);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bbox.id(), 1);
        assert!((candidates[0].bbox.confidence() - 0.4).abs() < 1e-6);
        assert_eq!(coeffs, vec![9.]);
    }

    #[test]
    fn test_buffer_grows_by_doubling() {
        let n = 700;
        let rows = Array2::from_shape_fn((n, 9), |(_, c)| if c == 4 { 0.9 } else { 1.0 });
        let (mut candidates, mut coeffs) = (Vec::new(), Vec::new());
        filter_candidates(rows.view(), &layout(n), 0.25, &mut candidates, &mut coeffs);
        assert_eq!(candidates.len(), n);
        assert_eq!(coeffs.len(), n * 2);
        assert_eq!(candidates.capacity(), 4 * INITIAL_CAPACITY);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let rows = Array2::from_shape_vec((1, 9), vec![0., 0., 1., 1., 1.5, 0., 0., 0., 0.]).unwrap();
        let (mut candidates, mut coeffs) = (Vec::new(), Vec::new());
        filter_candidates(rows.view(), &layout(1), 0.25, &mut candidates, &mut coeffs);
        assert_eq!(candidates[0].bbox.confidence(), 1.0);
    }
}
