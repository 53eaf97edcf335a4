//! # Canvas 模块
//!
//! 图表绘制面：步骤体通过它创建图形与效果。
//!
//! ## 模式逻辑
//!
//! 每个绘制方法都先构建图形与对应效果，再按 `animate_mode` 决定：
//! - 动画模式：隐藏图形，`effect.play()`
//! - 瞬间模式：`effect.to_end_state()`
//!
//! 文字标签与测量标注不受模式影响，总是瞬间呈现。
//! 构建失败只记录警告并返回 `None`，步骤的其余部分照常执行。

use std::rc::Rc;

use kurbo::Point;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::effect::{
    Effect, FocusEffect, MathTextRectEffect, MoveVectorEffect, PanEffect, PlayOptions,
    ReverseVectorEffect, ShapeDrawEffect, TextMoveEffect, WriteEffect, ZoomEffect,
};
use crate::error::EffectError;
use crate::pen::PenCursor;
use crate::registry::DiagramObjectRegistry;
use crate::shape::{
    AnimatableShape, GraphContainer, IntoShape, MathTextComponent, RectStyle, ShapeBuilder,
    ShapeSpec, Style, TextItem, VectorShape,
};
use crate::timer::SharedScheduler;
use crate::viewport::{ViewportController, ViewportRequest};

/// 图表绘制面
pub struct Canvas {
    builder: Rc<dyn ShapeBuilder>,
    viewport: Rc<dyn ViewportController>,
    scheduler: SharedScheduler,
    config: EngineConfig,
    registry: DiagramObjectRegistry,
    focus: Rc<FocusEffect>,
    pen: PenCursor,
    animate_mode: bool,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("registry", &self.registry)
            .field("animate_mode", &self.animate_mode)
            .field("focused", &self.focus.is_active())
            .finish()
    }
}

impl Canvas {
    /// 创建绘制面
    pub fn new(
        builder: Rc<dyn ShapeBuilder>,
        viewport: Rc<dyn ViewportController>,
        scheduler: SharedScheduler,
        config: EngineConfig,
    ) -> Self {
        let focus = FocusEffect::new(scheduler.clone())
            .with_frame_interval(config.timing.frame_interval());
        Self {
            builder,
            viewport,
            scheduler,
            config,
            registry: DiagramObjectRegistry::new(),
            focus: Rc::new(focus),
            pen: PenCursor::new(),
            animate_mode: true,
        }
    }

    // ============ 状态访问 ============

    /// 当前是否为动画模式
    pub fn animate_mode(&self) -> bool {
        self.animate_mode
    }

    /// 设置动画模式
    pub fn set_animate_mode(&mut self, enabled: bool) {
        self.animate_mode = enabled;
    }

    /// 引擎配置
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 对象注册表
    pub fn registry(&self) -> &DiagramObjectRegistry {
        &self.registry
    }

    /// 被跟踪的全部图形
    pub fn objects(&self) -> &[Rc<dyn AnimatableShape>] {
        self.registry.objects()
    }

    /// 书写光标
    pub fn pen(&self) -> &PenCursor {
        &self.pen
    }

    /// 视口控制器
    pub fn viewport(&self) -> &Rc<dyn ViewportController> {
        &self.viewport
    }

    /// 调度器
    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    // ============ 模式逻辑 ============

    fn default_play(&self) -> PlayOptions {
        PlayOptions::seconds(self.config.timing.default_duration)
    }

    /// 按动画模式呈现图形，并跟踪图形与效果
    pub fn apply_mode_logic(&mut self, shape: Rc<dyn AnimatableShape>, effect: Rc<dyn Effect>) {
        if self.animate_mode {
            shape.hide();
            effect.play(self.default_play());
        } else {
            effect.to_end_state();
        }
        self.registry.track_object(shape);
        self.registry.track_effect(effect);
    }

    /// 按动画模式播放不附属于单个图形的效果
    pub fn play_effect(&mut self, effect: Rc<dyn Effect>) {
        if self.animate_mode {
            effect.play(self.default_play());
        } else {
            effect.to_end_state();
        }
        self.registry.track_effect(effect);
    }

    fn build_failed(kind: &str, error: &EffectError) {
        warn!(kind, error = %error, "图形构建失败，跳过");
    }

    fn draw_effect(&self, shape: Rc<dyn AnimatableShape>) -> Rc<dyn Effect> {
        Rc::new(
            ShapeDrawEffect::new(shape, self.scheduler.clone())
                .with_settle_delay(self.config.timing.settle_delay())
                .with_frame_interval(self.config.timing.frame_interval()),
        )
    }

    // ============ 图形 ============

    /// 按描述构建图形
    pub fn shape(&mut self, spec: ShapeSpec, style: Style) -> Option<Rc<dyn AnimatableShape>> {
        let shape = match self.builder.build(&spec, &style) {
            Ok(shape) => shape,
            Err(e) => {
                Self::build_failed(spec.kind(), &e);
                return None;
            }
        };

        if spec.renders_instantly() {
            shape.render_end_state();
            shape.show();
            self.registry.track_object(shape.clone());
        } else {
            let effect = self.draw_effect(shape.clone());
            self.apply_mode_logic(shape.clone(), effect);
        }
        Some(shape)
    }

    /// 点
    pub fn point(&mut self, at: Point, color: &str) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Point { at, radius: None }, Style::color(color))
    }

    /// 线段
    pub fn line(&mut self, start: Point, end: Point, color: &str) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Line { start, end }, Style::color(color))
    }

    /// 圆
    pub fn circle(
        &mut self,
        center: Point,
        radius: f64,
        color: &str,
    ) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Circle { center, radius }, Style::color(color))
    }

    /// 多边形
    pub fn polygon(&mut self, vertices: Vec<Point>, color: &str) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Polygon { vertices }, Style::color(color))
    }

    /// 圆弧
    pub fn arc(
        &mut self,
        start: Point,
        end: Point,
        rx: f64,
        ry: f64,
        color: &str,
    ) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Arc { start, end, rx, ry }, Style::color(color))
    }

    /// 曲线
    pub fn curve(&mut self, points: Vec<Point>, color: &str) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Curve { points }, Style::color(color))
    }

    /// 函数图像
    pub fn plot(&mut self, samples: Vec<Point>, color: &str) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Plot { samples }, Style::color(color))
    }

    /// 文字标签（总是瞬间呈现）
    pub fn label(&mut self, at: Point, text: &str, color: &str) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(
            ShapeSpec::Label {
                at,
                text: text.to_string(),
            },
            Style::color(color),
        )
    }

    /// 测量标注（总是瞬间呈现）
    pub fn measurement(
        &mut self,
        start: Point,
        end: Point,
        color: &str,
    ) -> Option<Rc<dyn AnimatableShape>> {
        self.shape(ShapeSpec::Measurement { start, end }, Style::color(color))
    }

    // ============ 向量 ============

    fn build_vector(&self, start: Point, end: Point, style: &Style) -> Option<Rc<dyn VectorShape>> {
        match self.builder.build_vector(start, end, style) {
            Ok(vector) => Some(vector),
            Err(e) => {
                Self::build_failed("vector", &e);
                None
            }
        }
    }

    /// 向量
    pub fn vector(&mut self, start: Point, end: Point, style: Style) -> Option<Rc<dyn VectorShape>> {
        let vector = self.build_vector(start, end, &style)?;
        let shape = vector.clone().into_shape();
        let effect = self.draw_effect(shape.clone());
        self.apply_mode_logic(shape, effect);
        Some(vector)
    }

    /// 虚线向量
    pub fn dashed_vector(&mut self, start: Point, end: Point, color: &str) -> Option<Rc<dyn VectorShape>> {
        let style = Style::color(color).dashed(self.config.vector.dash_pattern.clone());
        self.vector(start, end, style)
    }

    /// 反向向量
    ///
    /// 新建一个从原向量起点出发的虚线向量，头部翻转到 `start - (end - start)`。
    pub fn reverse_vector(
        &mut self,
        original: &Rc<dyn VectorShape>,
        color: &str,
    ) -> Option<Rc<dyn VectorShape>> {
        let (start, end) = original.endpoints();
        let style = Style::color(color).dashed(self.config.vector.dash_pattern.clone());
        let vector = self.build_vector(start, end, &style)?;
        let effect = ReverseVectorEffect::new(
            vector.clone(),
            start,
            end,
            end - start,
            self.scheduler.clone(),
        );
        self.apply_mode_logic(vector.clone().into_shape(), Rc::new(effect));
        Some(vector)
    }

    /// 平移向量：在原位置创建向量，再移动到 `target_start`
    pub fn move_vector(
        &mut self,
        start: Point,
        end: Point,
        target_start: Point,
        style: Style,
    ) -> Option<Rc<dyn VectorShape>> {
        let vector = self.build_vector(start, end, &style)?;
        let effect = MoveVectorEffect::new(vector.clone(), start, target_start, self.scheduler.clone());
        self.apply_mode_logic(vector.clone().into_shape(), Rc::new(effect));
        Some(vector)
    }

    // ============ 文本 ============

    /// 创建数学文本组件（初始隐藏，等待 `write`）
    pub fn math_text(
        &mut self,
        text: &str,
        at: Point,
        color: &str,
    ) -> Option<Rc<dyn MathTextComponent>> {
        match self.builder.build_math_text(text, at, &Style::color(color)) {
            Ok(component) => {
                component.hide();
                self.registry.track_object(component.clone().into_shape());
                Some(component)
            }
            Err(e) => {
                Self::build_failed("math_text", &e);
                None
            }
        }
    }

    /// 书写数学文本组件
    pub fn write(&mut self, component: &Rc<dyn MathTextComponent>) {
        let effect = WriteEffect::new(component.clone(), self.pen.clone(), self.scheduler.clone())
            .with_frame_interval(self.config.timing.frame_interval());
        self.play_effect(Rc::new(effect));
    }

    /// 创建并书写数学文本
    pub fn write_math_text(
        &mut self,
        text: &str,
        at: Point,
        color: &str,
    ) -> Option<Rc<dyn MathTextComponent>> {
        let component = self.math_text(text, at, color)?;
        self.write(&component);
        Some(component)
    }

    /// 为文本片段绘制注释框
    pub fn text_rect(&mut self, item: Rc<dyn TextItem>, style: RectStyle) -> Rc<MathTextRectEffect> {
        let effect = Rc::new(
            MathTextRectEffect::new(
                item,
                self.builder.annotation_layer(),
                style,
                self.pen.clone(),
                self.scheduler.clone(),
            )
            .with_frame_interval(self.config.timing.frame_interval()),
        );
        self.play_effect(effect.clone());
        // 播放或瞬间呈现时矩形已构建；降级时没有可跟踪的图形
        if let Some(shape) = effect.rect_shape() {
            self.registry.track_object(shape);
        }
        effect
    }

    /// 把文本片段移动到目标点
    pub fn move_text(&mut self, item: Rc<dyn TextItem>, target: Point) -> Rc<TextMoveEffect> {
        let effect = Rc::new(
            TextMoveEffect::new(item, target, self.pen.clone(), self.scheduler.clone())
                .with_duration(self.config.timing.text_move_duration)
                .with_frame_interval(self.config.timing.frame_interval()),
        );
        self.play_effect(effect.clone());
        effect
    }

    // ============ 视口 ============

    /// 放大到指定点
    pub fn zoom_in(&mut self, point: Point, scale: Option<f64>, duration: Option<f64>) {
        let timing = &self.config.timing;
        let effect = ZoomEffect::new(
            self.viewport.clone(),
            Some(point),
            scale.unwrap_or(timing.zoom_scale),
            duration.unwrap_or(timing.zoom_duration),
            self.scheduler.clone(),
        );
        debug!(x = point.x, y = point.y, "放大");
        self.play_effect(Rc::new(effect));
    }

    /// 缩小回全景
    pub fn zoom_out(&mut self, duration: Option<f64>) {
        let timing = &self.config.timing;
        let effect = ZoomEffect::new(
            self.viewport.clone(),
            None,
            timing.zoom_scale,
            duration.unwrap_or(timing.zoom_duration),
            self.scheduler.clone(),
        );
        debug!("缩小");
        self.play_effect(Rc::new(effect));
    }

    /// 平移到指定点
    pub fn pan_to(&mut self, point: Point, duration: Option<f64>) {
        let effect = PanEffect::new(
            self.viewport.clone(),
            point,
            duration.unwrap_or(self.config.timing.pan_duration),
            self.scheduler.clone(),
        );
        debug!(x = point.x, y = point.y, "平移");
        self.play_effect(Rc::new(effect));
    }

    /// 直接放大（不创建效果），`animate` 缺省时跟随动画模式
    pub fn zoom_direct(&self, point: Point, scale: Option<f64>, animate: Option<bool>) {
        self.viewport.zoom_in(ViewportRequest::new(
            Some(point),
            Some(scale.unwrap_or(self.config.timing.zoom_scale)),
            self.config.timing.direct_zoom_duration,
            animate.unwrap_or(self.animate_mode),
        ));
    }

    /// 直接缩小（不创建效果）
    pub fn zoom_out_direct(&self, animate: Option<bool>) {
        self.viewport.zoom_out(ViewportRequest::new(
            None,
            None,
            self.config.timing.zoom_duration,
            animate.unwrap_or(self.animate_mode),
        ));
    }

    /// 缩放到刚好容纳给定图形，四周留出 `padding`
    ///
    /// # 返回
    /// 没有任何图形能给出边界时返回 `false`，视口保持不变
    pub fn zoom_to_shapes(
        &self,
        shapes: &[Rc<dyn AnimatableShape>],
        padding: Option<f64>,
        animate: Option<bool>,
    ) -> bool {
        let Some(bounds) = shapes
            .iter()
            .filter_map(|shape| shape.bounds())
            .reduce(|acc, bounds| acc.union(bounds))
        else {
            warn!(shapes = shapes.len(), "图形没有可用边界，忽略缩放");
            return false;
        };
        let padding = padding.unwrap_or(self.config.timing.fit_padding).max(0.0);
        self.viewport.zoom_to_fit(
            bounds.inflate(padding, padding),
            ViewportRequest::new(
                None,
                None,
                self.config.timing.direct_zoom_duration,
                animate.unwrap_or(self.animate_mode),
            ),
        );
        true
    }

    /// 缩放到刚好容纳单个图形
    pub fn zoom_to_shape(
        &self,
        shape: &Rc<dyn AnimatableShape>,
        padding: Option<f64>,
        animate: Option<bool>,
    ) -> bool {
        self.zoom_to_shapes(std::slice::from_ref(shape), padding, animate)
    }

    /// 直接平移（不创建效果）
    pub fn pan_direct(&self, point: Point, animate: Option<bool>) {
        self.viewport.pan_to(ViewportRequest::new(
            Some(point),
            None,
            self.config.timing.pan_duration,
            animate.unwrap_or(self.animate_mode),
        ));
    }

    // ============ 聚焦 ============

    /// 聚焦到指定对象，其余对象变暗
    pub fn focus(&mut self, keep: &[Rc<dyn AnimatableShape>]) {
        let dim = self.config.focus.dim_opacity;
        self.focus_with(keep, dim);
    }

    /// 以指定不透明度聚焦
    pub fn focus_with(&mut self, keep: &[Rc<dyn AnimatableShape>], dim_opacity: f64) {
        let duration = self.focus_duration();
        self.focus
            .focus(keep, self.registry.objects(), dim_opacity, duration);
    }

    /// 取消聚焦
    pub fn restore(&mut self) {
        let duration = self.focus_duration();
        self.focus.restore(duration);
    }

    /// 是否处于聚焦状态
    pub fn is_focused(&self) -> bool {
        self.focus.is_active()
    }

    fn focus_duration(&self) -> f64 {
        if self.animate_mode {
            self.config.focus.duration
        } else {
            0.0
        }
    }

    // ============ 批量操作 ============

    /// 跟踪嵌套容器
    pub fn track_container(&mut self, container: Rc<dyn GraphContainer>) {
        self.registry.track_container(container);
    }

    /// 隐藏全部图形
    pub fn hide_all(&self) {
        self.registry.hide_all();
    }

    /// 显示全部图形
    pub fn show_all(&self) {
        self.registry.show_all();
    }

    /// 跳过动画直接显示全部图形
    pub fn show_all_instantly(&self) {
        self.focus.stop();
        self.registry.show_all_instantly();
    }

    /// 取消全部进行中的动画
    pub fn stop_animation(&self) {
        self.focus.stop();
        self.registry.stop_animation();
    }

    /// 清空全部图形、效果、聚焦记录与书写光标
    pub fn clear_all(&mut self) {
        self.focus.stop();
        self.focus.restore(0.0);
        self.registry.clear_all();
        self.pen.clear();
    }
}
