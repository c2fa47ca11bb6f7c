// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 分割模型完整流程
// 包含: 预处理、推理、后处理、深度采样

use std::borrow::Cow;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use ndarray::{Array, IxDyn};
use tracing::{debug, error};

use super::InferenceBackend;
use crate::config::EngineConfig;
use crate::depth::DepthLookup;
use crate::detection::{Detection, FrameResult};
use crate::error::Result;
use crate::labels::ClassLabels;
use crate::pipeline::process_frame;
use crate::postprocess::{self, Workspace};
use crate::utils::letterbox::Letterbox;

/// 多线程共享同一个模型时由上层加锁
pub type SharedPredictor<B> = Arc<Mutex<Predictor<B>>>;

/// 分割模型 + 后处理 + 深度采样
pub struct Predictor<B> {
    backend: B,
    config: EngineConfig,
    labels: ClassLabels,
    workspace: Workspace,
}

impl<B: InferenceBackend> Predictor<B> {
    /// 创建前校验配置, 非法配置不会进入流水线
    pub fn new(backend: B, config: EngineConfig, labels: ClassLabels) -> Result<Self> {
        config.validate()?;
        debug!(
            "模型: {:?}, 输入 {}x{}, 类别 {}",
            config.flavor,
            config.input_width(),
            config.input_height(),
            labels.len()
        );
        Ok(Self {
            backend,
            config,
            labels,
            workspace: Workspace::new(),
        })
    }

    /// 包装为可跨线程共享的实例
    pub fn shared(self) -> SharedPredictor<B> {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// 类别下标 → 标签, 越界时为数字字符串
    pub fn class_label(&self, class_id: u32) -> Cow<'_, str> {
        self.labels.label(class_id as usize)
    }

    /// 字母框预处理: 原图 → [1, 3, H, W]
    pub fn preprocess(&self, image: &DynamicImage) -> Array<f32, IxDyn> {
        let (w, h) = image.dimensions();
        Letterbox::new(w, h, self.config.input_width(), self.config.input_height()).preprocess(image)
    }

    /// 预处理 + 推理, 返回模型原始输出
    pub fn infer(&mut self, image: &DynamicImage) -> Result<Vec<Array<f32, IxDyn>>> {
        let t = Instant::now();
        let xs = self.preprocess(image);
        let t_pre = t.elapsed();

        let t = Instant::now();
        let ys = self.backend.run(xs)?;
        debug!(
            "预处理 {:.2}ms, 推理 {:.2}ms",
            t_pre.as_secs_f64() * 1000.0,
            t.elapsed().as_secs_f64() * 1000.0
        );
        Ok(ys)
    }

    /// 只要检测框 (原图坐标), 不做深度采样
    pub fn object_rects(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let image_size = image.dimensions();
        let result = self.infer(image).and_then(|ys| {
            postprocess::decode(&ys, image_size, &self.config, &mut self.workspace)
                .map(|(detections, _)| detections)
        });
        result.inspect_err(|e| error!("检测失败: {}", e))
    }

    /// 完整流程: 预处理 → 推理 → 后处理 → 深度采样
    pub fn detect<D>(&mut self, image: &DynamicImage, depth: &D) -> Result<FrameResult>
    where
        D: DepthLookup + ?Sized,
    {
        let image_size = image.dimensions();
        let result = self
            .infer(image)
            .and_then(|ys| self.process_outputs(&ys, image_size, depth));
        result.inspect_err(|e| error!("单帧处理失败: {}", e))
    }

    /// 从文件读取图像后执行完整流程
    pub fn detect_file<D>(&mut self, path: impl AsRef<Path>, depth: &D) -> Result<FrameResult>
    where
        D: DepthLookup + ?Sized,
    {
        let path = path.as_ref();
        let image = image::open(path).inspect_err(|e| error!("读取 {} 失败: {}", path.display(), e))?;
        self.detect(&image, depth)
    }

    /// 推理由外部完成时, 直接处理模型原始输出
    pub fn process_outputs<D>(
        &mut self,
        outputs: &[Array<f32, IxDyn>],
        image_size: (u32, u32),
        depth: &D,
    ) -> Result<FrameResult>
    where
        D: DepthLookup + ?Sized,
    {
        let t = Instant::now();
        let result = process_frame(
            &self.config,
            &self.labels,
            outputs,
            image_size,
            depth,
            &mut self.workspace,
        );
        debug!("后处理 {:.2}ms", t.elapsed().as_secs_f64() * 1000.0);
        result.inspect_err(|e| error!("后处理失败: {}", e))
    }
}
