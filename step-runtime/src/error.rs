//! # Error 模块
//!
//! 定义 step-runtime 中使用的错误类型。

use thiserror::Error;

/// 效果错误
///
/// 需要 `Clone`：错误会被携带进 `PlayContext` 的完成回调。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    /// 叶子效果不接受子效果
    #[error("效果 '{effect}' 是叶子效果，不接受子效果")]
    LeafEffect { effect: &'static str },

    /// 无法计算几何边界（构造期错误，效果降级为空操作）
    #[error("效果 '{effect}' 无法计算几何边界")]
    MissingBounds { effect: &'static str },

    /// 图形构建失败
    #[error("无法构建图形 '{kind}': {message}")]
    Build { kind: String, message: String },

    /// 动画执行失败
    #[error("效果 '{effect}' 动画执行失败: {message}")]
    Animation {
        effect: &'static str,
        message: String,
    },
}

/// 步骤脚本错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// JSON 解析失败
    #[error("脚本解析失败: {0}")]
    Parse(String),

    /// 脚本读取失败
    #[error("脚本读取失败 '{path}': {message}")]
    Io { path: String, message: String },

    /// 脚本没有任何步骤
    #[error("脚本 '{title}' 没有任何步骤")]
    Empty { title: String },
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),

    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

/// step-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// 效果错误
    #[error("效果错误: {0}")]
    Effect(#[from] EffectError),

    /// 脚本错误
    #[error("脚本错误: {0}")]
    Script(#[from] ScriptError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// Result 类型别名
pub type StepResult<T> = Result<T, StepError>;
