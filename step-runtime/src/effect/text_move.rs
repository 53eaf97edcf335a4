//! 文本片段移动效果

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use kurbo::{Point, Vec2};
use tracing::warn;

use super::{Effect, EffectCore, PlayContext};
use crate::easing::Easing;
use crate::error::EffectError;
use crate::pen::PenCursor;
use crate::shape::{MovableShape, TextItem};
use crate::timer::{SharedScheduler, seconds};
use crate::tween::{DEFAULT_FRAME_INTERVAL, Tween};

/// 默认移动时长（秒）
pub const DEFAULT_TEXT_MOVE_DURATION: f64 = 0.8;

/// 起止位置，边界无法计算时不存在
#[derive(Debug, Clone, Copy)]
struct Path {
    start: Point,
    end: Point,
    /// 片段内容在容器内的偏移
    offset: Vec2,
}

/// 文本片段移动
///
/// 克隆文本片段，把克隆体从原容器位置移动到目标点，
/// 使片段内容（而不是容器左上角）落在目标点上。
pub struct TextMoveEffect {
    core: EffectCore,
    text_item: Rc<dyn TextItem>,
    target: Point,
    duration: f64,
    easing: Easing,
    pen: PenCursor,
    frame_interval: Duration,
    path: Option<Path>,
    cloned: RefCell<Option<Rc<dyn MovableShape>>>,
    tween: RefCell<Option<Tween>>,
}

impl TextMoveEffect {
    /// 创建效果
    pub fn new(
        text_item: Rc<dyn TextItem>,
        target: Point,
        pen: PenCursor,
        scheduler: SharedScheduler,
    ) -> Self {
        let path = match text_item.bounds() {
            Some(bounds) => {
                let offset = bounds.origin().to_vec2();
                Some(Path {
                    start: text_item.container_origin(),
                    end: target - offset,
                    offset,
                })
            }
            None => {
                warn!("文本片段边界无法计算，移动效果降级为空操作");
                None
            }
        };

        Self {
            core: EffectCore::new("text_move", scheduler),
            text_item,
            target,
            duration: DEFAULT_TEXT_MOVE_DURATION,
            easing: Easing::EaseOutCubic,
            pen,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            path,
            cloned: RefCell::new(None),
            tween: RefCell::new(None),
        }
    }

    /// 设置移动时长（秒）
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// 设置缓动
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// 设置帧间隔
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// 目标点
    pub fn target(&self) -> Point {
        self.target
    }

    /// 克隆体（尚未创建时为 `None`）
    pub fn clone_shape(&self) -> Option<Rc<dyn MovableShape>> {
        self.cloned.borrow().clone()
    }

    fn ensure_clone(&self) -> Option<(Rc<dyn MovableShape>, Path)> {
        let path = self.path?;
        if let Some(clone) = self.cloned.borrow().as_ref() {
            return Some((clone.clone(), path));
        }
        let Some(clone) = self.text_item.clone_at(path.start) else {
            warn!("文本片段无法克隆");
            return None;
        };
        *self.cloned.borrow_mut() = Some(clone.clone());
        Some((clone, path))
    }

    /// 克隆体回到起点
    pub fn reset(&self) {
        if let (Some(clone), Some(path)) = (self.cloned.borrow().as_ref(), self.path) {
            clone.set_position(path.start);
        }
    }

    fn cancel_tween(&self) {
        if let Some(tween) = self.tween.borrow_mut().take() {
            tween.cancel();
        }
    }
}

impl Effect for TextMoveEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn show(&self) {
        if let Some((clone, _)) = self.ensure_clone() {
            clone.show();
        }
    }

    fn hide(&self) {
        if let Some(clone) = self.cloned.borrow().as_ref() {
            clone.hide();
        }
    }

    fn to_end_state(&self) {
        self.cancel_tween();
        if let Some((clone, path)) = self.ensure_clone() {
            clone.set_position(path.end);
            clone.show();
        }
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        let Some((clone, path)) = self.ensure_clone() else {
            self.core.finish_play(ctx);
            return Ok(());
        };

        clone.set_position(path.start);
        clone.show();

        let pen = self.pen.clone();
        let core = self.core.clone();
        let done_ctx = ctx.clone();
        let tween = Tween::new(self.core.timers(), seconds(self.duration))
            .with_easing(self.easing)
            .with_frame_interval(self.frame_interval)
            .with_pause_flag(self.core.paused_flag())
            .on_update(move |p| {
                let current = path.start.lerp(path.end, p);
                clone.set_position(current);
                pen.set(current + path.offset);
            })
            .on_complete(move || core.finish_play(&done_ctx))
            .start();
        *self.tween.borrow_mut() = Some(tween);
        Ok(())
    }

    fn stop(&self) {
        self.core.stop();
        self.cancel_tween();
    }

    fn dispose(&self) {
        self.stop();
        let clone = self.cloned.borrow_mut().take();
        if let Some(clone) = clone {
            if !clone.remove() {
                clone.hide();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use kurbo::Rect;

    use super::*;
    use crate::effect::PlayOptions;
    use crate::headless::{HeadlessTextItem, Journal};
    use crate::timer::VirtualScheduler;

    fn item(bounds: Option<Rect>) -> Rc<HeadlessTextItem> {
        HeadlessTextItem::new("t", Point::new(100.0, 40.0), bounds, Journal::default())
    }

    #[test]
    fn test_end_places_content_on_target() {
        let scheduler = VirtualScheduler::shared();
        let effect = TextMoveEffect::new(
            item(Some(Rect::new(20.0, 5.0, 30.0, 15.0))),
            Point::new(300.0, 200.0),
            PenCursor::new(),
            scheduler,
        );

        assert!(effect.clone_shape().is_none());
        effect.to_end_state();
        let clone = effect.clone_shape().unwrap();
        assert_eq!(clone.position(), Point::new(280.0, 195.0));
    }

    #[test]
    fn test_play_moves_clone_and_pen() {
        let scheduler = VirtualScheduler::shared();
        let pen = PenCursor::new();
        let effect = TextMoveEffect::new(
            item(Some(Rect::new(0.0, 0.0, 10.0, 10.0))),
            Point::new(200.0, 40.0),
            pen.clone(),
            scheduler.clone(),
        );
        let done = Rc::new(Cell::new(0));
        let d = done.clone();

        effect.play(PlayOptions::default().on_complete(move |_| d.set(d.get() + 1)));
        let clone = effect.clone_shape().unwrap();
        assert_eq!(clone.position(), Point::new(100.0, 40.0));

        scheduler.advance(Duration::from_millis(400));
        let mid = clone.position();
        assert!(mid.x > 150.0 && mid.x < 200.0);

        scheduler.advance(Duration::from_millis(400));
        assert_eq!(done.get(), 1);
        assert_eq!(clone.position(), Point::new(200.0, 40.0));
        assert_eq!(pen.get(), Some(Point::new(200.0, 40.0)));
    }

    #[test]
    fn test_missing_bounds_completes_immediately() {
        let scheduler = VirtualScheduler::shared();
        let effect = TextMoveEffect::new(
            item(None),
            Point::new(1.0, 1.0),
            PenCursor::new(),
            scheduler.clone(),
        );
        let done = Rc::new(Cell::new(false));
        let d = done.clone();

        effect.show();
        effect.play(PlayOptions::default().on_complete(move |_| d.set(true)));
        assert!(done.get());
        assert!(effect.clone_shape().is_none());
    }

    #[test]
    fn test_dispose_removes_clone() {
        let scheduler = VirtualScheduler::shared();
        let text = item(Some(Rect::new(0.0, 0.0, 1.0, 1.0)));
        let effect = TextMoveEffect::new(text.clone(), Point::ORIGIN, PenCursor::new(), scheduler);

        effect.to_end_state();
        effect.dispose();
        assert!(effect.clone_shape().is_none());
        assert_eq!(text.clones().len(), 1);
        assert!(text.clones()[0].state().removed);
    }
}
