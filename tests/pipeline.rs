// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 端到端场景: 原始输出 → 检测 / 掩码 → 点云

use ndarray::{Array, Array3, Array4, IxDyn};
use yolov8_seg_depth::{
    process_frame, ClassLabels, EngineConfig, EngineError, ModelFlavor, Point3D, Predictor, Workspace,
};

/// 一行: cx, cy, w, h, 两个类别分数, 一个掩码系数
type Row = [f32; 7];

fn v8_outputs(rows: &[Row], proto_value: f32, proto_size: usize) -> Vec<Array<f32, IxDyn>> {
    let preds = Array3::from_shape_fn((1, 7, rows.len()), |(_, c, n)| rows[n][c]);
    let protos = Array4::from_elem((1, 1, proto_size, proto_size), proto_value);
    vec![preds.into_dyn(), protos.into_dyn()]
}

fn small_config(input: u32) -> EngineConfig {
    EngineConfig {
        num_classes: 2,
        num_mask_channels: 1,
        input_size: (input, input),
        ..Default::default()
    }
}

fn flat(x: u32, y: u32) -> Option<Point3D> {
    Some(Point3D::new(x as f32, y as f32, 2.5))
}

#[test]
fn overlapping_people_keep_the_most_confident() {
    let config = small_config(128);
    let outputs = v8_outputs(
        &[
            [60., 60., 100., 100., 0.6, 0.0, 1.0],
            [60., 60., 100., 80., 0.9, 0.0, 1.0],
        ],
        5.0,
        32,
    );
    let mut ws = Workspace::new();
    let frame = process_frame(&config, &ClassLabels::coco(), &outputs, (128, 128), &flat, &mut ws).unwrap();

    assert_eq!(frame.detections.len(), 1);
    assert_eq!(frame.detections[0].confidence, 0.9);
    assert_eq!(frame.masks.len(), 1);
    let objects: Vec<_> = frame.foreground().collect();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].label, "person");
    assert_eq!(objects[0].score, 0.9);
    assert!(objects[0].vertices.len() >= 2);
}

#[test]
fn empty_masks_turn_every_grid_point_into_background() {
    let config = EngineConfig {
        pixel_margin: 8,
        background_label: Some("floor".to_string()),
        ..small_config(64)
    };
    // 检测框存在, 但原型全负 → 掩码全零
    let outputs = v8_outputs(&[[32., 32., 20., 20., 0.8, 0.0, 1.0]], -5.0, 16);
    let mut ws = Workspace::new();
    let frame = process_frame(&config, &ClassLabels::coco(), &outputs, (64, 48), &flat, &mut ws).unwrap();

    assert_eq!(frame.detections.len(), 1);
    assert!(frame.masks.view().iter().all(|&v| v == 0));
    assert_eq!(frame.objects.len(), 1);
    let background = frame.background().unwrap();
    assert_eq!(background.label, "floor");
    assert_eq!(background.vertices.len(), 8 * 6);
    assert_eq!(background.nearest_z, 2.5);
}

#[test]
fn yolov5_layout_with_objectness() {
    let config = EngineConfig {
        flavor: ModelFlavor::YoloV5Seg,
        ..small_config(64)
    };
    // [1, N, 5 + nc + nm]
    let rows = [
        [32f32, 32., 32., 32., 0.5, 0.2, 0.9, 1.0], // 0.5 × 0.9, 类别 1
        [16f32, 16., 8., 8., 0.2, 0.9, 0.1, 1.0],   // 0.18 < 0.25
    ];
    let preds = Array3::from_shape_fn((1, 2, 8), |(_, n, c)| rows[n][c]).into_dyn();
    let protos = Array4::from_elem((1, 1, 16, 16), 5.0f32).into_dyn();

    let mut ws = Workspace::new();
    let frame = process_frame(
        &config,
        &ClassLabels::coco(),
        &[preds, protos],
        (64, 64),
        &flat,
        &mut ws,
    )
    .unwrap();

    assert_eq!(frame.detections.len(), 1);
    let det = &frame.detections[0];
    assert_eq!(det.class_id, 1);
    assert!((det.confidence - 0.45).abs() < 1e-6);
    assert_eq!((det.x1, det.y1, det.x2, det.y2), (16., 16., 48., 48.));
    assert_eq!(frame.objects[0].label, "bicycle");
}

#[test]
fn class_count_is_recovered_from_tensor_shape() {
    // 配置写的是 80 类, 实际输出只有 2 类
    let config = EngineConfig {
        num_classes: 80,
        ..small_config(64)
    };
    let outputs = v8_outputs(&[[32., 32., 32., 32., 0.1, 0.7, 1.0]], 5.0, 16);
    let mut ws = Workspace::new();
    let frame = process_frame(&config, &ClassLabels::coco(), &outputs, (64, 64), &flat, &mut ws).unwrap();
    assert_eq!(frame.detections.len(), 1);
    assert_eq!(frame.detections[0].class_id, 1);
}

#[test]
fn too_few_channels_is_a_shape_error() {
    let config = EngineConfig {
        num_mask_channels: 3,
        ..small_config(64)
    };
    // 7 个通道 ≤ 4 + 3
    let outputs = v8_outputs(&[[32., 32., 32., 32., 0.1, 0.7, 1.0]], 5.0, 16);
    let mut ws = Workspace::new();
    let err = process_frame(&config, &ClassLabels::coco(), &outputs, (64, 64), &flat, &mut ws).unwrap_err();
    assert!(matches!(err, EngineError::ShapeMismatch(_)));

    // 失败后同一个 workspace 仍可继续使用
    let frame = process_frame(
        &small_config(64),
        &ClassLabels::coco(),
        &outputs,
        (64, 64),
        &flat,
        &mut ws,
    )
    .unwrap();
    assert_eq!(frame.detections.len(), 1);
}

#[test]
fn invalid_config_is_rejected_before_sampling() {
    let outputs = v8_outputs(&[[32., 32., 32., 32., 0.9, 0.0, 1.0]], 5.0, 16);
    let mut ws = Workspace::new();
    let invalid = [
        EngineConfig {
            pixel_margin: 0,
            ..small_config(64)
        },
        EngineConfig {
            top_k: 0,
            ..small_config(64)
        },
    ];
    for config in &invalid {
        let err = process_frame(config, &ClassLabels::coco(), &outputs, (64, 64), &flat, &mut ws).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)), "{:?}", err);
    }
}

#[test]
fn upsampled_masks_match_input_resolution() {
    let config = EngineConfig {
        upsample_masks: true,
        ..small_config(64)
    };
    let outputs = v8_outputs(&[[32., 32., 32., 32., 0.9, 0.0, 1.0]], 5.0, 16);
    let mut ws = Workspace::new();
    let frame = process_frame(&config, &ClassLabels::coco(), &outputs, (128, 96), &flat, &mut ws).unwrap();

    assert_eq!((frame.masks.height(), frame.masks.width()), (64, 64));
    let mask = frame.masks.mask(0);
    assert_eq!(mask[[32, 32]], 255);
    assert_eq!(mask[[4, 4]], 0);
    assert_eq!(frame.foreground().count(), 1);
}

#[test]
fn whitelist_filters_objects() {
    let config = EngineConfig {
        label_whitelist: vec!["bicycle".to_string()],
        ..small_config(64)
    };
    let outputs = v8_outputs(
        &[
            [16., 32., 24., 48., 0.9, 0.0, 1.0],
            [48., 32., 24., 48., 0.0, 0.8, 1.0],
        ],
        5.0,
        16,
    );
    let mut ws = Workspace::new();
    let frame = process_frame(&config, &ClassLabels::coco(), &outputs, (64, 64), &flat, &mut ws).unwrap();

    assert_eq!(frame.detections.len(), 2);
    let labels: Vec<_> = frame.objects.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["bicycle"]);
}

#[test]
fn predictor_from_json_config() {
    let config = EngineConfig::from_json_str(
        r#"{
            "num_classes": 2,
            "num_mask_channels": 1,
            "input_size": [64, 64],
            "pixel_margin": 4,
            "background_label": "floor"
        }"#,
    )
    .unwrap();
    let backend = |_xs: Array<f32, IxDyn>| -> anyhow::Result<Vec<Array<f32, IxDyn>>> {
        Ok(v8_outputs(&[[32., 32., 16., 16., 0.9, 0.0, 1.0]], 5.0, 16))
    };
    let labels: ClassLabels = ["box", "crate"].into_iter().collect();
    let mut predictor = Predictor::new(backend, config, labels).unwrap();

    let image = image::DynamicImage::new_rgb8(64, 64);
    let frame = predictor.detect(&image, &flat).unwrap();
    assert_eq!(frame.foreground().next().map(|o| o.label.as_str()), Some("box"));
    let background = frame.background().unwrap();
    assert_eq!(background.label, "floor");
    assert!(!background.vertices.is_empty());
}
