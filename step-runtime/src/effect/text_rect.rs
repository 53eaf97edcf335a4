//! 文本注释框效果

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use kurbo::{Point, Rect};
use tracing::warn;

use super::{Effect, EffectCore, PlayContext};
use crate::error::EffectError;
use crate::pen::PenCursor;
use crate::shape::{AnimatableShape, AnnotationLayer, RectStyle, Reveal, TextItem};
use crate::timer::SharedScheduler;
use crate::tween::DEFAULT_FRAME_INTERVAL;

/// 文本注释框
///
/// 第一次 `show()` / `to_end_state()` / `do_play()` 时才按文本片段的
/// 边界构建矩形。边界无法计算时效果降级为空操作。
pub struct MathTextRectEffect {
    core: EffectCore,
    text_item: Rc<dyn TextItem>,
    layer: Rc<dyn AnnotationLayer>,
    style: RectStyle,
    pen: PenCursor,
    frame_interval: Duration,
    rect: RefCell<Option<(Rc<dyn AnimatableShape>, Rect)>>,
    degraded: Cell<bool>,
}

impl MathTextRectEffect {
    /// 创建效果
    pub fn new(
        text_item: Rc<dyn TextItem>,
        layer: Rc<dyn AnnotationLayer>,
        style: RectStyle,
        pen: PenCursor,
        scheduler: SharedScheduler,
    ) -> Self {
        Self {
            core: EffectCore::new("text_rect", scheduler),
            text_item,
            layer,
            style,
            pen,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            rect: RefCell::new(None),
            degraded: Cell::new(false),
        }
    }

    /// 设置帧间隔
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// 是否已降级为空操作
    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    /// 注释框在注释层中的边界（尚未构建时为 `None`）
    pub fn rect_bounds(&self) -> Option<Rect> {
        self.rect.borrow().as_ref().map(|(_, bounds)| *bounds)
    }

    /// 已构建的注释框图形
    pub fn rect_shape(&self) -> Option<Rc<dyn AnimatableShape>> {
        self.rect.borrow().as_ref().map(|(shape, _)| shape.clone())
    }

    fn build_rect(&self) -> Result<(Rc<dyn AnimatableShape>, Rect), EffectError> {
        let bounds = self
            .text_item
            .bounds()
            .ok_or(EffectError::MissingBounds { effect: "text_rect" })?;
        let padding = self.style.padding;
        let bounds = (bounds + self.text_item.container_origin().to_vec2()).inflate(padding, padding);
        let shape = self.layer.create_rect(bounds, &self.style)?;
        Ok((shape, bounds))
    }

    fn ensure_rect(&self) -> Option<(Rc<dyn AnimatableShape>, Rect)> {
        if self.degraded.get() {
            return None;
        }
        if let Some(rect) = self.rect.borrow().as_ref() {
            return Some(rect.clone());
        }
        match self.build_rect() {
            Ok(rect) => {
                *self.rect.borrow_mut() = Some(rect.clone());
                Some(rect)
            }
            Err(error) => {
                warn!(error = %error, "注释框构建失败，效果降级为空操作");
                self.degraded.set(true);
                None
            }
        }
    }

    /// 矩形描边的起止角
    fn corner(bounds: Rect) -> Point {
        Point::new(bounds.x0, bounds.y0)
    }
}

impl Effect for MathTextRectEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn show(&self) {
        if let Some((shape, _)) = self.ensure_rect() {
            shape.show();
        }
    }

    fn hide(&self) {
        if let Some((shape, _)) = self.rect.borrow().as_ref() {
            shape.hide();
        }
    }

    fn to_end_state(&self) {
        if let Some((shape, bounds)) = self.ensure_rect() {
            shape.render_end_state();
            shape.show();
            self.pen.set(Self::corner(bounds));
        }
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        let Some((shape, bounds)) = self.ensure_rect() else {
            self.core.finish_play(ctx);
            return Ok(());
        };

        let pen = self.pen.clone();
        let core = self.core.clone();
        let done_ctx = ctx.clone();
        shape.render_with_animation(Reveal {
            start: self.pen.get(),
            duration: ctx.duration(),
            frame_interval: self.frame_interval,
            timers: self.core.timers().clone(),
            on_complete: Box::new(move || {
                pen.set(Self::corner(bounds));
                core.finish_play(&done_ctx);
            }),
        });
        Ok(())
    }

    fn dispose(&self) {
        self.stop();
        let rect = self.rect.borrow_mut().take();
        if let Some((shape, _)) = rect {
            if !shape.remove() {
                shape.hide();
            }
        }
    }
}
