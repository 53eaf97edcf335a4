//! # Viewport 模块
//!
//! 视口控制器接口（缩放、平移）。

use kurbo::{Point, Rect};

/// 视口请求
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRequest {
    /// 目标点（`None` 表示以当前中心为准）
    pub point: Option<Point>,
    /// 缩放比例（仅缩放操作使用）
    pub scale: Option<f64>,
    /// 动画时长（秒）
    pub duration: f64,
    /// 是否动画过渡
    pub animate: bool,
}

impl ViewportRequest {
    /// 构造请求
    pub fn new(point: Option<Point>, scale: Option<f64>, duration: f64, animate: bool) -> Self {
        Self {
            point,
            scale,
            duration,
            animate,
        }
    }
}

/// 视口控制器
///
/// 宿主不提供完成回调，调用方按请求时长自行估计完成时间。
pub trait ViewportController {
    /// 放大
    fn zoom_in(&self, request: ViewportRequest);

    /// 缩小
    fn zoom_out(&self, request: ViewportRequest);

    /// 平移
    fn pan_to(&self, request: ViewportRequest);

    /// 缩放到刚好容纳 `bounds`
    ///
    /// 缺省实现以边界中心放大，不考虑宿主的视口尺寸。
    fn zoom_to_fit(&self, bounds: Rect, request: ViewportRequest) {
        self.zoom_in(ViewportRequest {
            point: Some(bounds.center()),
            ..request
        });
    }

    /// 恢复初始视口（清空图表时调用）
    fn reset(&self) {}
}
