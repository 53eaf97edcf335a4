//! 向量反向与平移效果

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use kurbo::{Point, Vec2};

use super::{Effect, EffectCore, PlayContext};
use crate::easing::Easing;
use crate::error::EffectError;
use crate::shape::VectorShape;
use crate::timer::SharedScheduler;
use crate::tween::{DEFAULT_FRAME_INTERVAL, Tween};

/// 向量端点补间的公共部分
struct EndpointTween {
    core: EffectCore,
    shape: Rc<dyn VectorShape>,
    from: (Point, Point),
    to: (Point, Point),
    frame_interval: Duration,
    active: RefCell<Option<Tween>>,
}

impl EndpointTween {
    fn new(
        name: &'static str,
        shape: Rc<dyn VectorShape>,
        from: (Point, Point),
        to: (Point, Point),
        scheduler: SharedScheduler,
    ) -> Self {
        Self {
            core: EffectCore::new(name, scheduler),
            shape,
            from,
            to,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            active: RefCell::new(None),
        }
    }

    fn stop(&self) {
        self.core.stop();
        if let Some(tween) = self.active.borrow_mut().take() {
            tween.cancel();
        }
    }

    fn to_end_state(&self) {
        self.stop();
        self.shape.set_endpoints(self.to.0, self.to.1);
        self.shape.render_end_state();
        self.shape.show();
    }

    fn play(&self, ctx: &PlayContext) {
        let (from, to) = (self.from, self.to);
        self.shape.set_endpoints(from.0, from.1);
        self.shape.render_end_state();
        self.shape.show();

        let shape = self.shape.clone();
        let core = self.core.clone();
        let done_ctx = ctx.clone();
        let tween = Tween::new(self.core.timers(), ctx.duration())
            .with_easing(Easing::Linear)
            .with_frame_interval(self.frame_interval)
            .with_pause_flag(self.core.paused_flag())
            .on_update(move |p| {
                shape.set_endpoints(from.0.lerp(to.0, p), from.1.lerp(to.1, p));
            })
            .on_complete(move || core.finish_play(&done_ctx))
            .start();
        *self.active.borrow_mut() = Some(tween);
    }
}

/// 向量反向
///
/// 尾部固定在 `start`，头部从 `end` 移动到 `start - displacement`，
/// 每帧重新生成渲染路径。
pub struct ReverseVectorEffect {
    inner: EndpointTween,
}

impl ReverseVectorEffect {
    /// 创建效果
    pub fn new(
        shape: Rc<dyn VectorShape>,
        start: Point,
        end: Point,
        displacement: Vec2,
        scheduler: SharedScheduler,
    ) -> Self {
        let target = start - displacement;
        Self {
            inner: EndpointTween::new(
                "reverse_vector",
                shape,
                (start, end),
                (start, target),
                scheduler,
            ),
        }
    }

    /// 反向后的头部位置
    pub fn target(&self) -> Point {
        self.inner.to.1
    }
}

impl Effect for ReverseVectorEffect {
    fn core(&self) -> &EffectCore {
        &self.inner.core
    }

    fn show(&self) {
        self.inner.shape.show();
    }

    fn hide(&self) {
        self.inner.shape.hide();
    }

    fn to_end_state(&self) {
        self.inner.to_end_state();
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        self.inner.play(ctx);
        Ok(())
    }

    fn stop(&self) {
        self.inner.stop();
    }
}

/// 向量平移
///
/// 起点从 `original_start` 移动到 `target_start`，方向与长度保持不变。
pub struct MoveVectorEffect {
    inner: EndpointTween,
}

impl MoveVectorEffect {
    /// 创建效果，位移量取自向量当前端点
    pub fn new(
        shape: Rc<dyn VectorShape>,
        original_start: Point,
        target_start: Point,
        scheduler: SharedScheduler,
    ) -> Self {
        let (start, end) = shape.endpoints();
        let delta = end - start;
        Self {
            inner: EndpointTween::new(
                "move_vector",
                shape,
                (original_start, original_start + delta),
                (target_start, target_start + delta),
                scheduler,
            ),
        }
    }

    /// 移动后的端点
    pub fn target(&self) -> (Point, Point) {
        self.inner.to
    }
}

impl Effect for MoveVectorEffect {
    fn core(&self) -> &EffectCore {
        &self.inner.core
    }

    fn show(&self) {
        self.inner.shape.show();
    }

    fn hide(&self) {
        self.inner.shape.hide();
    }

    fn to_end_state(&self) {
        self.inner.to_end_state();
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        self.inner.play(ctx);
        Ok(())
    }

    fn stop(&self) {
        self.inner.stop();
    }
}
