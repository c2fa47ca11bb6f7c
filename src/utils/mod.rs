/// 工具模块
/// Utility modules
pub mod affine_transform;
pub mod letterbox;
