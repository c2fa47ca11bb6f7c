// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 合成帧演示
//
// 不加载真实模型: 推理后端直接返回构造好的分割输出,
// 深度由一个倾斜平面给出, 跑完整流程后打印每个物体的点云统计。

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use image::DynamicImage;
use ndarray::{Array, Array3, Array4, IxDyn};
use tracing::info;
use tracing_subscriber::EnvFilter;

use yolov8_seg_depth::{ClassLabels, EngineConfig, Point3D, Predictor};

/// 合成帧参数
#[derive(Parser, Debug)]
#[command(author, version, about = "YOLO 分割 + 深度采样 合成帧演示", long_about = None)]
struct Args {
    /// JSON 配置文件, 缺省使用默认配置
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 把最终使用的配置写入该文件
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// 原图宽度
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// 原图高度
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// 合成物体数量
    #[arg(short, long, default_value_t = 3)]
    objects: usize,

    /// 自由空间标签, 设置后输出背景点云
    #[arg(long)]
    background_label: Option<String>,

    /// 掩码上采样到模型输入分辨率
    #[arg(long, default_value_t = false)]
    upsample: bool,

    /// 相机焦距 (像素)
    #[arg(long, default_value_t = 600.0)]
    focal: f32,
}

/// 在模型输入上水平排开 `count` 个方框, 生成 [检测输出, 原型掩码]
fn synthetic_outputs(config: &EngineConfig, count: usize) -> Vec<Array<f32, IxDyn>> {
    let (iw, ih) = (config.input_width() as f32, config.input_height() as f32);
    let (nc, nm) = (config.num_classes, config.num_mask_channels);
    let offset = config.flavor.score_offset();
    let row_len = offset + nc + nm;

    let slot = iw / count.max(1) as f32;
    let rows: Vec<Vec<f32>> = (0..count)
        .map(|i| {
            let mut row = vec![0.0; row_len];
            row[0] = slot * (i as f32 + 0.5);
            row[1] = ih / 2.0;
            row[2] = slot * 0.6;
            row[3] = ih * 0.5;
            if config.flavor.has_objectness() {
                row[4] = 1.0;
            }
            row[offset + i % nc.max(1)] = 0.9 - 0.1 * (i % 5) as f32;
            row[offset + nc] = 1.0; // 只用第一个原型通道
            row
        })
        .collect();

    let preds = if config.flavor.channel_major() {
        Array3::from_shape_fn((1, row_len, count), |(_, c, n)| rows[n][c])
    } else {
        Array3::from_shape_fn((1, count, row_len), |(_, n, c)| rows[n][c])
    };
    let (mh, mw) = (config.input_height() as usize / 4, config.input_width() as usize / 4);
    let protos = Array4::from_shape_fn((1, nm, mh, mw), |(_, c, _, _)| if c == 0 { 4.0f32 } else { 0.0 });

    vec![preds.into_dyn(), protos.into_dyn()]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.background_label.is_some() {
        config.background_label = args.background_label.clone();
    }
    config.upsample_masks |= args.upsample;
    config.validate()?;
    if let Some(path) = &args.save_config {
        config.save(path)?;
    }

    info!("🚀 合成帧: {}x{}, 物体 {}", args.width, args.height, args.objects);
    info!("📦 模型变体: {:?}", config.flavor);

    let outputs = synthetic_outputs(&config, args.objects);
    let backend = move |_xs: Array<f32, IxDyn>| -> Result<Vec<Array<f32, IxDyn>>> { Ok(outputs.clone()) };
    let mut predictor = Predictor::new(backend, config, ClassLabels::coco())?;

    // 倾斜平面: 越靠下越近
    let (w, h, f) = (args.width as f32, args.height as f32, args.focal);
    let depth = move |x: u32, y: u32| {
        let z = 6.0 - 4.0 * y as f32 / h;
        Some(Point3D::new((x as f32 - w / 2.0) * z / f, (y as f32 - h / 2.0) * z / f, z))
    };

    let image = DynamicImage::new_rgb8(args.width, args.height);
    let frame = predictor.detect(&image, &depth)?;

    info!(
        "检测 {} 个, 掩码 {}x{}x{}",
        frame.detections.len(),
        frame.masks.len(),
        frame.masks.height(),
        frame.masks.width()
    );
    for object in &frame.objects {
        info!(
            "{}{}: {} 个顶点, score {:.2}, 最近 z {:.2}, 中心 ({:.2}, {:.2}, {:.2}), rect {:?}",
            if object.is_background { "[背景] " } else { "" },
            object.label,
            object.vertices.len(),
            object.score,
            object.nearest_z,
            object.origin.x,
            object.origin.y,
            object.origin.z,
            object.rect
        );
    }

    Ok(())
}
