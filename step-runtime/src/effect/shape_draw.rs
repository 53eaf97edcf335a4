//! 通用图形显现效果

use std::rc::Rc;
use std::time::Duration;

use super::{Effect, EffectCore, PlayContext};
use crate::error::EffectError;
use crate::pen::PenCursor;
use crate::shape::{AnimatableShape, Reveal};
use crate::timer::SharedScheduler;
use crate::tween::DEFAULT_FRAME_INTERVAL;

/// 图形报告显现结束后，再等待这段时间才完成
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// 通用图形显现
///
/// 先隐藏图形，由图形自己的显现逻辑在 `duration` 内逐步呈现，
/// 图形报告完成后再等待一个稳定延迟。
pub struct ShapeDrawEffect {
    core: EffectCore,
    shape: Rc<dyn AnimatableShape>,
    pen: Option<PenCursor>,
    settle_delay: Duration,
    frame_interval: Duration,
}

impl ShapeDrawEffect {
    /// 创建效果
    pub fn new(shape: Rc<dyn AnimatableShape>, scheduler: SharedScheduler) -> Self {
        Self {
            core: EffectCore::new("shape_draw", scheduler),
            shape,
            pen: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    /// 从书写光标位置起笔
    pub fn with_pen(mut self, pen: PenCursor) -> Self {
        self.pen = Some(pen);
        self
    }

    /// 设置稳定延迟
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// 设置帧间隔
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// 目标图形
    pub fn shape(&self) -> &Rc<dyn AnimatableShape> {
        &self.shape
    }
}

impl Effect for ShapeDrawEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn show(&self) {
        self.shape.show();
    }

    fn hide(&self) {
        self.shape.hide();
    }

    fn to_end_state(&self) {
        self.shape.render_end_state();
        self.shape.show();
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        self.shape.hide();

        let core = self.core.clone();
        let done_ctx = ctx.clone();
        let settle = self.settle_delay;
        self.shape.render_with_animation(Reveal {
            start: self.pen.as_ref().and_then(PenCursor::get),
            duration: ctx.duration(),
            frame_interval: self.frame_interval,
            timers: self.core.timers().clone(),
            on_complete: Box::new(move || {
                core.complete_after(settle, &done_ctx);
            }),
        });
        Ok(())
    }
}
