//! # Shape 模块
//!
//! 外部协作者接口：图形、向量、数学文本、注释层与图形构建器。
//!
//! 引擎只决定**何时**以及**如何**（动画 / 瞬间）呈现图形；
//! 图形本身的渲染技术（SVG 路径、MathJax 布局等）由宿主实现这些 trait。
//!
//! ## 设计说明
//!
//! 与动画系统一致，所有方法都接收 `&self`，实现方使用
//! `Rc<RefCell<T>>` 获得内部可变性。

use std::rc::Rc;
use std::time::Duration;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::error::EffectError;
use crate::timer::TimerSet;

/// 逐步显现参数
///
/// 由效果传给图形，图形通过 `timers` 注册自己的帧定时器，
/// 因此效果 `stop()` 时这些定时器也会被取消。
pub struct Reveal {
    /// 起笔位置（来自书写光标）
    pub start: Option<Point>,
    /// 显现时长
    pub duration: Duration,
    /// 帧间隔
    pub frame_interval: Duration,
    /// 所属效果的定时器集合
    pub timers: TimerSet,
    /// 显现结束回调
    pub on_complete: Box<dyn FnOnce()>,
}

impl std::fmt::Debug for Reveal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reveal")
            .field("start", &self.start)
            .field("duration", &self.duration)
            .finish()
    }
}

/// 可动画图形
pub trait AnimatableShape {
    /// 显示容器（动画内容保持当前显现进度）
    fn show(&self);

    /// 隐藏
    fn hide(&self);

    /// 直接渲染最终状态，跳过动画
    fn render_end_state(&self);

    /// 从宿主移除
    ///
    /// # 返回
    /// - `true`: 已移除
    /// - `false`: 不支持移除，调用方应退化为 `hide()`
    fn remove(&self) -> bool {
        false
    }

    /// 当前不透明度
    fn opacity(&self) -> f64;

    /// 设置不透明度
    fn set_opacity(&self, opacity: f64);

    /// 图形自身的逐步显现逻辑，结束时调用 `reveal.on_complete`
    fn render_with_animation(&self, reveal: Reveal);

    /// 几何边界（无法计算时为 `None`）
    fn bounds(&self) -> Option<Rect> {
        None
    }
}

/// `Rc<具体类型>` 到 `Rc<dyn AnimatableShape>` 的转换
pub trait IntoShape {
    /// 转为通用图形引用
    fn into_shape(self: Rc<Self>) -> Rc<dyn AnimatableShape>;
}

impl<T: AnimatableShape + 'static> IntoShape for T {
    fn into_shape(self: Rc<Self>) -> Rc<dyn AnimatableShape> {
        self
    }
}

/// 向量图形：可以在每一帧重新生成渲染路径
pub trait VectorShape: AnimatableShape + IntoShape {
    /// 当前起点与终点
    fn endpoints(&self) -> (Point, Point);

    /// 更新端点并重新生成渲染路径
    fn set_endpoints(&self, start: Point, end: Point);
}

/// 可定位图形（文本克隆体）
pub trait MovableShape: AnimatableShape + IntoShape {
    /// 当前位置（容器左上角）
    fn position(&self) -> Point;

    /// 移动到指定位置
    fn set_position(&self, position: Point);
}

/// 数学文本组件
pub trait MathTextComponent: AnimatableShape + IntoShape {
    /// 显示容器，但每个字形的笔画保持隐藏，等待书写动画逐步显现
    fn show_container(&self);

    /// 组件自己的笔画显现动画
    fn write_animate(&self, reveal: Reveal);

    /// 书写结束时笔尖所在位置
    fn pen_end(&self) -> Option<Point>;

    /// 组件内的文本片段
    fn text_items(&self) -> Vec<Rc<dyn TextItem>>;
}

/// 文本片段（组件中的一段可定位文本）
pub trait TextItem {
    /// 片段相对所属容器左上角的边界（无法计算时为 `None`）
    fn bounds(&self) -> Option<Rect>;

    /// 所属容器的左上角
    fn container_origin(&self) -> Point;

    /// 在指定位置创建片段的克隆体
    fn clone_at(&self, position: Point) -> Option<Rc<dyn MovableShape>>;
}

/// 注释框样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectStyle {
    /// 描边颜色
    #[serde(default = "default_rect_stroke")]
    pub stroke: String,
    /// 描边宽度
    #[serde(default = "default_rect_stroke_width")]
    pub stroke_width: f64,
    /// 文本边界外扩的留白
    #[serde(default = "default_rect_padding")]
    pub padding: f64,
}

fn default_rect_stroke() -> String {
    "red".to_string()
}

fn default_rect_stroke_width() -> f64 {
    2.0
}

fn default_rect_padding() -> f64 {
    4.0
}

impl Default for RectStyle {
    fn default() -> Self {
        Self {
            stroke: default_rect_stroke(),
            stroke_width: default_rect_stroke_width(),
            padding: default_rect_padding(),
        }
    }
}

/// 注释层（注释框绘制的目标画布）
pub trait AnnotationLayer {
    /// 创建一个矩形注释框
    fn create_rect(
        &self,
        bounds: Rect,
        style: &RectStyle,
    ) -> Result<Rc<dyn AnimatableShape>, EffectError>;
}

/// 嵌套的图表容器（例如单元格内的坐标系）
pub trait GraphContainer {
    /// 销毁容器及其宿主资源
    fn destroy(&self);
}

/// 图形样式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// 颜色名或十六进制
    #[serde(default)]
    pub color: Option<String>,
    /// 描边宽度
    #[serde(default)]
    pub stroke_width: Option<f64>,
    /// 填充色
    #[serde(default)]
    pub fill: Option<String>,
    /// 虚线样式（如 `"5,3"`）
    #[serde(default)]
    pub dash_pattern: Option<String>,
}

impl Style {
    /// 指定颜色的样式
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Default::default()
        }
    }

    /// 设置虚线
    pub fn dashed(mut self, pattern: impl Into<String>) -> Self {
        self.dash_pattern = Some(pattern.into());
        self
    }
}

/// 图形描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeSpec {
    /// 点
    Point {
        at: Point,
        #[serde(default)]
        radius: Option<f64>,
    },
    /// 线段
    Line { start: Point, end: Point },
    /// 圆
    Circle { center: Point, radius: f64 },
    /// 椭圆
    Ellipse { center: Point, rx: f64, ry: f64 },
    /// 圆弧
    Arc {
        start: Point,
        end: Point,
        rx: f64,
        ry: f64,
    },
    /// 多边形
    Polygon { vertices: Vec<Point> },
    /// 曲线（经过控制点）
    Curve { points: Vec<Point> },
    /// 函数图像（预采样）
    Plot { samples: Vec<Point> },
    /// 角
    Angle { vertex: Point, from: Point, to: Point },
    /// 文字标签（总是瞬间呈现）
    Label { at: Point, text: String },
    /// 测量标注（总是瞬间呈现）
    Measurement { start: Point, end: Point },
}

impl ShapeSpec {
    /// 图形种类名
    pub fn kind(&self) -> &'static str {
        match self {
            ShapeSpec::Point { .. } => "point",
            ShapeSpec::Line { .. } => "line",
            ShapeSpec::Circle { .. } => "circle",
            ShapeSpec::Ellipse { .. } => "ellipse",
            ShapeSpec::Arc { .. } => "arc",
            ShapeSpec::Polygon { .. } => "polygon",
            ShapeSpec::Curve { .. } => "curve",
            ShapeSpec::Plot { .. } => "plot",
            ShapeSpec::Angle { .. } => "angle",
            ShapeSpec::Label { .. } => "label",
            ShapeSpec::Measurement { .. } => "measurement",
        }
    }

    /// 是否总是瞬间呈现（不受动画模式影响）
    pub fn renders_instantly(&self) -> bool {
        matches!(self, ShapeSpec::Label { .. } | ShapeSpec::Measurement { .. })
    }
}

/// 图形构建器
///
/// 共享的图形构造辅助接口，由宿主渲染层实现。
pub trait ShapeBuilder {
    /// 构建通用图形
    fn build(&self, spec: &ShapeSpec, style: &Style)
    -> Result<Rc<dyn AnimatableShape>, EffectError>;

    /// 构建向量
    fn build_vector(
        &self,
        start: Point,
        end: Point,
        style: &Style,
    ) -> Result<Rc<dyn VectorShape>, EffectError>;

    /// 构建数学文本组件
    fn build_math_text(
        &self,
        text: &str,
        at: Point,
        style: &Style,
    ) -> Result<Rc<dyn MathTextComponent>, EffectError>;

    /// 注释层
    fn annotation_layer(&self) -> Rc<dyn AnnotationLayer>;
}

/// 判断两个引用是否指向同一个图形对象
pub fn same_shape(a: &Rc<dyn AnimatableShape>, b: &Rc<dyn AnimatableShape>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
