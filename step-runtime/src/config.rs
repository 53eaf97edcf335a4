//! # Config 模块
//!
//! 引擎配置：时长默认值、聚焦参数、向量样式。
//!
//! ## 配置来源
//!
//! 1. 配置文件（`stepdraw --config stepdraw.json`），缺失字段使用默认值
//! 2. 文件不存在或解析失败时整体使用默认值

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::timer::MAX_DURATION_SECS;

/// 引擎配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 时长配置
    #[serde(default)]
    pub timing: TimingConfig,

    /// 聚焦配置
    #[serde(default)]
    pub focus: FocusConfig,

    /// 向量配置
    #[serde(default)]
    pub vector: VectorConfig,
}

/// 时长配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// 效果默认播放时长（秒）
    #[serde(default = "default_duration")]
    pub default_duration: f64,

    /// 图形显现结束后的稳定延迟（毫秒）
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// 补间帧间隔（毫秒）
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// 平移时长（秒）
    #[serde(default = "default_pan_duration")]
    pub pan_duration: f64,

    /// 缩放时长（秒）
    #[serde(default = "default_zoom_duration")]
    pub zoom_duration: f64,

    /// 直接放大（不经过效果）的时长（秒）
    #[serde(default = "default_direct_zoom_duration")]
    pub direct_zoom_duration: f64,

    /// 缩放到图形时四周的留白
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f64,

    /// 放大比例
    #[serde(default = "default_zoom_scale")]
    pub zoom_scale: f64,

    /// 文本移动时长（秒）
    #[serde(default = "default_text_move_duration")]
    pub text_move_duration: f64,
}

/// 聚焦配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusConfig {
    /// 未聚焦对象的不透明度 (0.0 - 1.0)
    #[serde(default = "default_dim_opacity")]
    pub dim_opacity: f64,

    /// 过渡时长（秒）
    #[serde(default = "default_focus_duration")]
    pub duration: f64,
}

/// 向量配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// 虚线样式
    #[serde(default = "default_dash_pattern")]
    pub dash_pattern: String,
}

// 默认值函数
fn default_duration() -> f64 {
    1.0
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_pan_duration() -> f64 {
    0.5
}

fn default_zoom_duration() -> f64 {
    1.0
}

fn default_direct_zoom_duration() -> f64 {
    0.5
}

fn default_fit_padding() -> f64 {
    20.0
}

fn default_zoom_scale() -> f64 {
    0.5
}

fn default_text_move_duration() -> f64 {
    0.8
}

fn default_dim_opacity() -> f64 {
    0.3
}

fn default_focus_duration() -> f64 {
    0.5
}

fn default_dash_pattern() -> String {
    "5,3".to_string()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_duration: default_duration(),
            settle_delay_ms: default_settle_delay_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            pan_duration: default_pan_duration(),
            zoom_duration: default_zoom_duration(),
            direct_zoom_duration: default_direct_zoom_duration(),
            fit_padding: default_fit_padding(),
            zoom_scale: default_zoom_scale(),
            text_move_duration: default_text_move_duration(),
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            dim_opacity: default_dim_opacity(),
            duration: default_focus_duration(),
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dash_pattern: default_dash_pattern(),
        }
    }
}

impl TimingConfig {
    /// 稳定延迟
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// 帧间隔
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl EngineConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = ?path, "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = ?path, "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        let durations = [
            ("timing.default_duration", timing.default_duration),
            ("timing.pan_duration", timing.pan_duration),
            ("timing.zoom_duration", timing.zoom_duration),
            ("timing.direct_zoom_duration", timing.direct_zoom_duration),
            ("timing.text_move_duration", timing.text_move_duration),
            ("focus.duration", self.focus.duration),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{name} 必须是非负数，当前值: {value}"
                )));
            }
            if value > MAX_DURATION_SECS {
                return Err(ConfigError::ValidationFailed(format!(
                    "{name} 不能超过 {MAX_DURATION_SECS} 秒，当前值: {value}"
                )));
            }
        }

        if timing.frame_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "timing.frame_interval_ms 必须大于 0".to_string(),
            ));
        }

        if !(timing.zoom_scale.is_finite() && timing.zoom_scale > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "timing.zoom_scale 必须大于 0".to_string(),
            ));
        }

        if !(timing.fit_padding.is_finite() && timing.fit_padding >= 0.0) {
            return Err(ConfigError::ValidationFailed(
                "timing.fit_padding 必须是非负数".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.focus.dim_opacity) {
            return Err(ConfigError::ValidationFailed(
                "focus.dim_opacity 必须在 0.0 - 1.0 之间".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.timing.default_duration, 1.0);
        assert_eq!(config.timing.settle_delay(), Duration::from_millis(300));
        assert_eq!(config.timing.frame_interval(), Duration::from_millis(16));
        assert_eq!(config.timing.direct_zoom_duration, 0.5);
        assert_eq!(config.focus.dim_opacity, 0.3);
        assert_eq!(config.vector.dash_pattern, "5,3");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"timing":{"pan_duration":2.0}}"#).unwrap();
        assert_eq!(config.timing.pan_duration, 2.0);
        assert_eq!(config.timing.zoom_scale, 0.5);
        assert_eq!(config.focus, FocusConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.focus.dim_opacity = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));

        let mut config = EngineConfig::default();
        config.timing.pan_duration = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timing.pan_duration"));

        let mut config = EngineConfig::default();
        config.focus.duration = 1e20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("focus.duration"));

        let mut config = EngineConfig::default();
        config.timing.frame_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepdraw.json");

        let mut config = EngineConfig::default();
        config.timing.zoom_scale = 0.25;
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::load(&path), config);
    }

    #[test]
    fn test_load_missing_or_broken_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            EngineConfig::load(dir.path().join("missing.json")),
            EngineConfig::default()
        );

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(EngineConfig::load(&broken), EngineConfig::default());
    }
}
