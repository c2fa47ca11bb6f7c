// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 引擎错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("配置无效: {0}")]
    InvalidConfig(String),
    #[error("张量形状不匹配: {0}")]
    ShapeMismatch(String),
    #[error("张量重排失败: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("图像读取失败: {0}")]
    Image(#[from] image::ImageError),
    #[error("配置文件读写错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("配置解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Inference(#[from] anyhow::Error),
}

impl EngineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        EngineError::InvalidConfig(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        EngineError::ShapeMismatch(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
