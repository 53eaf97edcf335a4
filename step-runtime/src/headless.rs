//! # Headless 模块
//!
//! 外部协作者接口的无头参考实现。
//!
//! 这些实现不渲染任何东西，只在 `Rc<RefCell<ShapeState>>` 中记录
//! 可见性、不透明度、显现进度等状态，并把关键事件写入共享的 [`Journal`]。
//! 显现动画由效果传入的 `TimerSet` 驱动，所以在虚拟时钟下完全确定。
//!
//! 测试与 `stepdraw` 命令行都使用这一套实现。

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use kurbo::{Point, Rect, Vec2};

use crate::error::EffectError;
use crate::shape::{
    AnimatableShape, AnnotationLayer, GraphContainer, MathTextComponent, MovableShape, RectStyle,
    Reveal, ShapeBuilder, ShapeSpec, Style, TextItem, VectorShape,
};
use crate::tween::Tween;
use crate::viewport::{ViewportController, ViewportRequest};

/// 单个字形的宽度
const GLYPH_WIDTH: f64 = 10.0;
/// 字形高度
const GLYPH_HEIGHT: f64 = 16.0;

/// 共享事件日志
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Journal {
    /// 追加一条记录
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// 全部记录
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// 是否包含某条记录
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.borrow().iter().any(|e| e == entry)
    }

    /// 取出并清空全部记录
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    /// 记录数量
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// 无头图形的状态记录
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeState {
    /// 容器是否可见
    pub visible: bool,
    /// 不透明度
    pub opacity: f64,
    /// 显现进度 (0.0 - 1.0)
    pub reveal: f64,
    /// 最近一次是否直接渲染最终状态
    pub end_state: bool,
    /// 最近一次是否以动画显现
    pub animated: bool,
    /// 是否已从宿主移除
    pub removed: bool,
    /// 位置（可定位图形使用）
    pub position: Point,
}

impl Default for ShapeState {
    fn default() -> Self {
        Self {
            visible: false,
            opacity: 1.0,
            reveal: 0.0,
            end_state: false,
            animated: false,
            removed: false,
            position: Point::ORIGIN,
        }
    }
}

/// 所有无头图形共享的部分
struct ShapeCore {
    name: String,
    state: Rc<RefCell<ShapeState>>,
    journal: Journal,
    last_reveal_start: Cell<Option<Point>>,
    tween: RefCell<Option<Tween>>,
}

impl ShapeCore {
    fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            state: Rc::new(RefCell::new(ShapeState::default())),
            journal,
            last_reveal_start: Cell::new(None),
            tween: RefCell::new(None),
        }
    }

    fn log(&self, event: &str) {
        self.journal.push(format!("{}:{}", self.name, event));
    }

    fn cancel_tween(&self) {
        let tween = self.tween.borrow_mut().take();
        if let Some(tween) = tween {
            tween.cancel();
        }
    }

    fn show(&self) {
        self.state.borrow_mut().visible = true;
    }

    fn hide(&self) {
        self.state.borrow_mut().visible = false;
    }

    fn render_end_state(&self) {
        self.cancel_tween();
        {
            let mut state = self.state.borrow_mut();
            state.reveal = 1.0;
            state.end_state = true;
            state.animated = false;
        }
        self.log("end_state");
    }

    fn remove(&self) -> bool {
        self.cancel_tween();
        {
            let mut state = self.state.borrow_mut();
            state.removed = true;
            state.visible = false;
        }
        self.log("remove");
        true
    }

    fn animate(&self, event: &str, reveal: Reveal) {
        self.cancel_tween();
        {
            let mut state = self.state.borrow_mut();
            state.visible = true;
            state.animated = true;
            state.end_state = false;
            state.reveal = 0.0;
        }
        self.last_reveal_start.set(reveal.start);
        self.log(event);

        let Reveal {
            duration,
            frame_interval,
            timers,
            on_complete,
            ..
        } = reveal;
        let state = self.state.clone();
        let tween = Tween::new(&timers, duration)
            .with_frame_interval(frame_interval)
            .on_update(move |p| state.borrow_mut().reveal = p)
            .on_complete(on_complete)
            .start();
        *self.tween.borrow_mut() = Some(tween);
    }
}

macro_rules! delegate_animatable {
    ($ty:ty, $event:literal) => {
        impl AnimatableShape for $ty {
            fn show(&self) {
                self.core.show();
            }

            fn hide(&self) {
                self.core.hide();
            }

            fn render_end_state(&self) {
                self.core.render_end_state();
            }

            fn remove(&self) -> bool {
                self.core.remove()
            }

            fn opacity(&self) -> f64 {
                self.core.state.borrow().opacity
            }

            fn set_opacity(&self, opacity: f64) {
                self.core.state.borrow_mut().opacity = opacity;
            }

            fn render_with_animation(&self, reveal: Reveal) {
                self.core.animate($event, reveal);
            }

            fn bounds(&self) -> Option<Rect> {
                self.bounds.get()
            }
        }

        impl $ty {
            /// 名称
            pub fn name(&self) -> &str {
                &self.core.name
            }

            /// 状态快照
            pub fn state(&self) -> ShapeState {
                self.core.state.borrow().clone()
            }

            /// 最近一次显现的起笔位置
            pub fn last_reveal_start(&self) -> Option<Point> {
                self.core.last_reveal_start.get()
            }

            /// 设置几何边界
            pub fn set_bounds(&self, bounds: Option<Rect>) {
                self.bounds.set(bounds);
            }
        }
    };
}

/// 通用无头图形
pub struct HeadlessShape {
    core: ShapeCore,
    bounds: Cell<Option<Rect>>,
}

delegate_animatable!(HeadlessShape, "animate");

impl HeadlessShape {
    /// 创建图形（初始隐藏）
    pub fn new(name: impl Into<String>, journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            core: ShapeCore::new(name, journal),
            bounds: Cell::new(None),
        })
    }

    /// 在指定位置创建图形
    pub fn at(name: impl Into<String>, position: Point, journal: Journal) -> Rc<Self> {
        let shape = Self::new(name, journal);
        shape.core.state.borrow_mut().position = position;
        shape
    }
}

impl MovableShape for HeadlessShape {
    fn position(&self) -> Point {
        self.core.state.borrow().position
    }

    fn set_position(&self, position: Point) {
        self.core.state.borrow_mut().position = position;
    }
}

/// 无头向量
pub struct HeadlessVector {
    core: ShapeCore,
    bounds: Cell<Option<Rect>>,
    endpoints: Cell<(Point, Point)>,
    /// 端点更新（路径重建）次数
    rebuilds: Cell<usize>,
}

delegate_animatable!(HeadlessVector, "animate");

impl HeadlessVector {
    /// 创建向量
    pub fn new(name: impl Into<String>, start: Point, end: Point, journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            core: ShapeCore::new(name, journal),
            bounds: Cell::new(Some(Rect::from_points(start, end))),
            endpoints: Cell::new((start, end)),
            rebuilds: Cell::new(0),
        })
    }

    /// 路径重建次数
    pub fn rebuilds(&self) -> usize {
        self.rebuilds.get()
    }
}

impl VectorShape for HeadlessVector {
    fn endpoints(&self) -> (Point, Point) {
        self.endpoints.get()
    }

    fn set_endpoints(&self, start: Point, end: Point) {
        self.endpoints.set((start, end));
        self.bounds.set(Some(Rect::from_points(start, end)));
        self.rebuilds.set(self.rebuilds.get() + 1);
    }
}

/// 无头文本片段
pub struct HeadlessTextItem {
    name: String,
    origin: Point,
    bounds: Option<Rect>,
    journal: Journal,
    clones: RefCell<Vec<Rc<HeadlessShape>>>,
}

impl HeadlessTextItem {
    /// 创建片段
    ///
    /// `bounds` 相对容器左上角 `origin`。
    pub fn new(
        name: impl Into<String>,
        origin: Point,
        bounds: Option<Rect>,
        journal: Journal,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            origin,
            bounds,
            journal,
            clones: RefCell::new(Vec::new()),
        })
    }

    /// 已创建的克隆体
    pub fn clones(&self) -> Vec<Rc<HeadlessShape>> {
        self.clones.borrow().clone()
    }
}

impl TextItem for HeadlessTextItem {
    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn container_origin(&self) -> Point {
        self.origin
    }

    fn clone_at(&self, position: Point) -> Option<Rc<dyn MovableShape>> {
        let index = self.clones.borrow().len();
        let clone = HeadlessShape::at(
            format!("{}~{}", self.name, index),
            position,
            self.journal.clone(),
        );
        self.clones.borrow_mut().push(clone.clone());
        Some(clone)
    }
}

/// 无头数学文本组件
///
/// 每个字符对应一个文本片段，字形宽度固定。
pub struct HeadlessMathText {
    core: ShapeCore,
    bounds: Cell<Option<Rect>>,
    text: String,
    origin: Point,
    items: Vec<Rc<HeadlessTextItem>>,
}

delegate_animatable!(HeadlessMathText, "write");

impl HeadlessMathText {
    /// 创建组件
    pub fn new(
        name: impl Into<String>,
        text: &str,
        origin: Point,
        journal: Journal,
    ) -> Rc<Self> {
        let name = name.into();
        let items = text
            .chars()
            .enumerate()
            .map(|(i, _)| {
                let x = i as f64 * GLYPH_WIDTH;
                HeadlessTextItem::new(
                    format!("{name}[{i}]"),
                    origin,
                    Some(Rect::new(x, 0.0, x + GLYPH_WIDTH, GLYPH_HEIGHT)),
                    journal.clone(),
                )
            })
            .collect();
        let width = text.chars().count() as f64 * GLYPH_WIDTH;
        Rc::new(Self {
            core: ShapeCore::new(name, journal),
            bounds: Cell::new(Some(Rect::from_origin_size(origin, (width, GLYPH_HEIGHT)))),
            text: text.to_string(),
            origin,
            items,
        })
    }

    /// 文本内容
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl MathTextComponent for HeadlessMathText {
    fn show_container(&self) {
        self.core.show();
    }

    fn write_animate(&self, reveal: Reveal) {
        self.core.animate("write", reveal);
    }

    fn pen_end(&self) -> Option<Point> {
        let width = self.text.chars().count() as f64 * GLYPH_WIDTH;
        Some(self.origin + Vec2::new(width, GLYPH_HEIGHT))
    }

    fn text_items(&self) -> Vec<Rc<dyn TextItem>> {
        self.items
            .iter()
            .map(|item| item.clone() as Rc<dyn TextItem>)
            .collect()
    }
}

/// 无头注释层
pub struct HeadlessAnnotationLayer {
    journal: Journal,
    created: RefCell<Vec<Rc<HeadlessShape>>>,
}

impl HeadlessAnnotationLayer {
    /// 创建注释层
    pub fn new(journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            journal,
            created: RefCell::new(Vec::new()),
        })
    }

    /// 已创建的注释框
    pub fn created(&self) -> Vec<Rc<HeadlessShape>> {
        self.created.borrow().clone()
    }
}

impl AnnotationLayer for HeadlessAnnotationLayer {
    fn create_rect(
        &self,
        bounds: Rect,
        _style: &RectStyle,
    ) -> Result<Rc<dyn AnimatableShape>, EffectError> {
        let rect = HeadlessShape::at(
            format!("rect({:.0},{:.0})", bounds.x0, bounds.y0),
            bounds.origin(),
            self.journal.clone(),
        );
        rect.set_bounds(Some(bounds));
        self.created.borrow_mut().push(rect.clone());
        Ok(rect)
    }
}

/// 图形锚点（第一个关键点），用于生成稳定的名称
fn anchor(spec: &ShapeSpec) -> Point {
    match spec {
        ShapeSpec::Point { at, .. } | ShapeSpec::Label { at, .. } => *at,
        ShapeSpec::Line { start, .. }
        | ShapeSpec::Arc { start, .. }
        | ShapeSpec::Measurement { start, .. } => *start,
        ShapeSpec::Circle { center, .. } | ShapeSpec::Ellipse { center, .. } => *center,
        ShapeSpec::Angle { vertex, .. } => *vertex,
        ShapeSpec::Polygon { vertices: points }
        | ShapeSpec::Curve { points }
        | ShapeSpec::Plot { samples: points } => points.first().copied().unwrap_or(Point::ORIGIN),
    }
}

/// 无头图形构建器
///
/// 图形名称由种类与锚点决定（如 `circle(0,0)`），
/// 重放时重新构建的图形名称保持不变。
pub struct HeadlessBuilder {
    journal: Journal,
    layer: Rc<HeadlessAnnotationLayer>,
    built: RefCell<Vec<Rc<HeadlessShape>>>,
    failing: RefCell<HashSet<String>>,
}

impl HeadlessBuilder {
    /// 创建构建器
    pub fn new(journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            layer: HeadlessAnnotationLayer::new(journal.clone()),
            journal,
            built: RefCell::new(Vec::new()),
            failing: RefCell::new(HashSet::new()),
        })
    }

    /// 共享事件日志
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// 注释层
    pub fn layer(&self) -> &Rc<HeadlessAnnotationLayer> {
        &self.layer
    }

    /// 让某一类图形的构建失败
    pub fn fail_on(&self, kind: impl Into<String>) {
        self.failing.borrow_mut().insert(kind.into());
    }

    /// 已构建的通用图形（按构建顺序）
    pub fn built(&self) -> Vec<Rc<HeadlessShape>> {
        self.built.borrow().clone()
    }

    /// 按名称查找最近构建的图形
    pub fn find(&self, name: &str) -> Option<Rc<HeadlessShape>> {
        self.built
            .borrow()
            .iter()
            .rev()
            .find(|shape| shape.name() == name)
            .cloned()
    }

    fn check(&self, kind: &str) -> Result<(), EffectError> {
        if self.failing.borrow().contains(kind) {
            return Err(EffectError::Build {
                kind: kind.to_string(),
                message: "构建器拒绝该图形".to_string(),
            });
        }
        Ok(())
    }
}

impl ShapeBuilder for HeadlessBuilder {
    fn build(
        &self,
        spec: &ShapeSpec,
        _style: &Style,
    ) -> Result<Rc<dyn AnimatableShape>, EffectError> {
        self.check(spec.kind())?;
        let name = match spec {
            ShapeSpec::Label { text, .. } => format!("label({text})"),
            other => {
                let at = anchor(other);
                format!("{}({:.0},{:.0})", other.kind(), at.x, at.y)
            }
        };
        let shape = HeadlessShape::at(name, anchor(spec), self.journal.clone());
        self.built.borrow_mut().push(shape.clone());
        Ok(shape)
    }

    fn build_vector(
        &self,
        start: Point,
        end: Point,
        _style: &Style,
    ) -> Result<Rc<dyn VectorShape>, EffectError> {
        self.check("vector")?;
        let name = format!("vector({:.0},{:.0})", start.x, start.y);
        Ok(HeadlessVector::new(name, start, end, self.journal.clone()))
    }

    fn build_math_text(
        &self,
        text: &str,
        at: Point,
        _style: &Style,
    ) -> Result<Rc<dyn MathTextComponent>, EffectError> {
        self.check("math_text")?;
        Ok(HeadlessMathText::new(
            format!("text({text})"),
            text,
            at,
            self.journal.clone(),
        ))
    }

    fn annotation_layer(&self) -> Rc<dyn AnnotationLayer> {
        self.layer.clone()
    }
}

/// 记录所有请求的视口控制器
pub struct RecordingViewport {
    journal: Journal,
    requests: RefCell<Vec<(&'static str, ViewportRequest)>>,
    fitted: RefCell<Vec<Rect>>,
    resets: Cell<usize>,
}

impl RecordingViewport {
    /// 创建控制器
    pub fn new(journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            journal,
            requests: RefCell::new(Vec::new()),
            fitted: RefCell::new(Vec::new()),
            resets: Cell::new(0),
        })
    }

    /// 收到的请求（操作名, 请求）
    pub fn requests(&self) -> Vec<(&'static str, ViewportRequest)> {
        self.requests.borrow().clone()
    }

    /// `zoom_to_fit` 收到的边界
    pub fn fitted(&self) -> Vec<Rect> {
        self.fitted.borrow().clone()
    }

    /// 视口被重置的次数
    pub fn resets(&self) -> usize {
        self.resets.get()
    }

    fn record(&self, op: &'static str, request: ViewportRequest) {
        let mode = if request.animate { "animate" } else { "instant" };
        self.journal.push(format!("viewport:{op}:{mode}"));
        self.requests.borrow_mut().push((op, request));
    }
}

impl ViewportController for RecordingViewport {
    fn zoom_in(&self, request: ViewportRequest) {
        self.record("zoom_in", request);
    }

    fn zoom_out(&self, request: ViewportRequest) {
        self.record("zoom_out", request);
    }

    fn pan_to(&self, request: ViewportRequest) {
        self.record("pan_to", request);
    }

    fn zoom_to_fit(&self, bounds: Rect, request: ViewportRequest) {
        self.fitted.borrow_mut().push(bounds);
        self.record("zoom_to_fit", request);
    }

    fn reset(&self) {
        self.resets.set(self.resets.get() + 1);
    }
}

/// 无头图表容器
pub struct HeadlessGraph {
    name: String,
    journal: Journal,
    destroyed: Cell<bool>,
}

impl HeadlessGraph {
    /// 创建容器
    pub fn new(name: impl Into<String>, journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            journal,
            destroyed: Cell::new(false),
        })
    }

    /// 是否已销毁
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl GraphContainer for HeadlessGraph {
    fn destroy(&self) {
        if !self.destroyed.replace(true) {
            self.journal.push(format!("{}:destroy", self.name));
        }
    }
}
