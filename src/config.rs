//! 引擎配置 - 通过JSON文件调整参数

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::detection::INF_SIZE;
use crate::error::{EngineError, Result};
use crate::models::ModelFlavor;

/// 后处理 + 深度采样参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === 检测参数 ===
    pub conf_threshold: f32,     // 置信度阈值 (严格大于)
    pub nms_threshold: f32,      // NMS IOU阈值
    pub top_k: usize,            // NMS 最多保留数量
    pub class_agnostic_nms: bool, // 跨类别抑制

    // === 模型输出 ===
    pub flavor: ModelFlavor,
    pub num_classes: usize,       // 与输出通道数不符时自动修正
    pub num_mask_channels: usize, // 原型掩码通道数
    pub input_size: (u32, u32),   // 模型输入 (w, h)

    // === 掩码 ===
    pub upsample_masks: bool, // 上采样到模型输入分辨率

    // === 深度采样 ===
    pub pixel_margin: u32,             // 网格步长(像素)
    pub object_boundary_margin: u32,   // 物体边缘腐蚀距离(像素)
    pub free_space_margin: Option<u32>, // 自由空间膨胀距离, 缺省为 pixel_margin + 2
    pub label_whitelist: Vec<String>,  // 为空时保留全部类别
    pub background_label: Option<String>, // 设置后输出自由空间点云
    pub excluded_labels_block_free_space: bool, // 白名单外的物体仍遮挡自由空间
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // 检测参数
            conf_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 300,
            class_agnostic_nms: false,

            // 模型输出
            flavor: ModelFlavor::default(),
            num_classes: 80,
            num_mask_channels: 32,
            input_size: (INF_SIZE, INF_SIZE),

            // 掩码
            upsample_masks: false,

            // 深度采样
            pixel_margin: 8,
            object_boundary_margin: 4,
            free_space_margin: None,
            label_whitelist: Vec::new(),
            background_label: None,
            excluded_labels_block_free_space: true,
        }
    }
}

impl EngineConfig {
    /// 从JSON字符串解析并校验
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从JSON文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!("配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("配置已保存到 {}", path.display());
        Ok(())
    }

    /// 参数校验; 非法配置在流水线开始前拒绝
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(EngineError::invalid_config(format!(
                "conf_threshold 必须位于 [0, 1], 实际为 {}",
                self.conf_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(EngineError::invalid_config(format!(
                "nms_threshold 必须位于 [0, 1], 实际为 {}",
                self.nms_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(EngineError::invalid_config("top_k 必须大于 0"));
        }
        if self.pixel_margin == 0 {
            return Err(EngineError::invalid_config("pixel_margin 必须大于 0"));
        }
        if self.input_size.0 == 0 || self.input_size.1 == 0 {
            return Err(EngineError::invalid_config(format!(
                "input_size 不能为 0, 实际为 {:?}",
                self.input_size
            )));
        }
        if self.num_mask_channels == 0 {
            return Err(EngineError::invalid_config("num_mask_channels 必须大于 0"));
        }
        Ok(())
    }

    pub fn input_width(&self) -> u32 {
        self.input_size.0
    }

    pub fn input_height(&self) -> u32 {
        self.input_size.1
    }

    /// 自由空间膨胀距离
    pub fn free_space_margin(&self) -> u32 {
        self.free_space_margin
            .unwrap_or_else(|| self.pixel_margin.saturating_add(2))
    }

    /// 标签是否通过白名单
    pub fn is_whitelisted(&self, label: &str) -> bool {
        self.label_whitelist.is_empty() || self.label_whitelist.iter().any(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_k, 300);
        assert_eq!(config.input_size, (640, 640));
        assert_eq!(config.free_space_margin(), 10);
    }

    #[test]
    fn test_reject_invalid() {
        let bad = [
            EngineConfig { top_k: 0, ..Default::default() },
            EngineConfig { conf_threshold: -0.1, ..Default::default() },
            EngineConfig { nms_threshold: 1.5, ..Default::default() },
            EngineConfig { nms_threshold: f32::NAN, ..Default::default() },
            EngineConfig { pixel_margin: 0, ..Default::default() },
            EngineConfig { input_size: (0, 640), ..Default::default() },
            EngineConfig { num_mask_channels: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "conf_threshold": 0.4, "background_label": "floor", "flavor": "yolo_v5_seg" }"#,
        )
        .unwrap();
        assert_eq!(config.conf_threshold, 0.4);
        assert_eq!(config.background_label.as_deref(), Some("floor"));
        assert_eq!(config.flavor, ModelFlavor::YoloV5Seg);
        assert_eq!(config.nms_threshold, 0.45);
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        assert!(EngineConfig::from_json_str(r#"{ "top_k": 0 }"#).is_err());
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(EngineError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("engine-config-{}.json", std::process::id()));
        let config = EngineConfig {
            label_whitelist: vec!["person".into(), "chair".into()],
            free_space_margin: Some(6),
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
        assert_eq!(loaded.free_space_margin(), 6);
    }

    #[test]
    fn test_whitelist() {
        let mut config = EngineConfig::default();
        assert!(config.is_whitelisted("anything"));
        config.label_whitelist = vec!["person".into()];
        assert!(config.is_whitelisted("person"));
        assert!(!config.is_whitelisted("car"));
    }
}
