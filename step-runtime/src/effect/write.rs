//! 数学文本书写效果

use std::rc::Rc;
use std::time::Duration;

use super::{Effect, EffectCore, PlayContext};
use crate::error::EffectError;
use crate::pen::PenCursor;
use crate::shape::{MathTextComponent, Reveal};
use crate::timer::SharedScheduler;
use crate::tween::DEFAULT_FRAME_INTERVAL;

/// 书写效果
///
/// 两阶段显现：`show()` 只显示容器，每个字形的笔画仍然隐藏；
/// `do_play` 交给组件自己的笔画动画，结束后更新书写光标。
pub struct WriteEffect {
    core: EffectCore,
    component: Rc<dyn MathTextComponent>,
    pen: PenCursor,
    frame_interval: Duration,
}

impl WriteEffect {
    /// 创建效果
    pub fn new(
        component: Rc<dyn MathTextComponent>,
        pen: PenCursor,
        scheduler: SharedScheduler,
    ) -> Self {
        Self {
            core: EffectCore::new("write", scheduler),
            component,
            pen,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    /// 设置帧间隔
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    fn update_pen(&self) {
        if let Some(end) = self.component.pen_end() {
            self.pen.set(end);
        }
    }
}

impl Effect for WriteEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn show(&self) {
        self.component.show_container();
    }

    fn hide(&self) {
        self.component.hide();
    }

    fn to_end_state(&self) {
        self.component.render_end_state();
        self.component.show();
        self.update_pen();
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        let component = self.component.clone();
        let pen = self.pen.clone();
        let core = self.core.clone();
        let done_ctx = ctx.clone();

        self.component.write_animate(Reveal {
            start: self.pen.get(),
            duration: ctx.duration(),
            frame_interval: self.frame_interval,
            timers: self.core.timers().clone(),
            on_complete: Box::new(move || {
                if let Some(end) = component.pen_end() {
                    pen.set(end);
                }
                core.finish_play(&done_ctx);
            }),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use kurbo::Point;

    use super::*;
    use crate::effect::PlayOptions;
    use crate::headless::{HeadlessMathText, Journal};
    use crate::timer::VirtualScheduler;

    #[test]
    fn test_show_keeps_strokes_hidden() {
        let scheduler = VirtualScheduler::shared();
        let text = HeadlessMathText::new("T", "x+y", Point::new(10.0, 10.0), Journal::default());
        let effect = WriteEffect::new(text.clone(), PenCursor::new(), scheduler);

        effect.show();
        let state = text.state();
        assert!(state.visible);
        assert_eq!(state.reveal, 0.0);
    }

    #[test]
    fn test_write_moves_pen_to_end() {
        let scheduler = VirtualScheduler::shared();
        let pen = PenCursor::new();
        pen.set(Point::new(1.0, 1.0));
        let text = HeadlessMathText::new("T", "x+y", Point::new(10.0, 10.0), Journal::default());
        let effect = WriteEffect::new(text.clone(), pen.clone(), scheduler.clone());
        let done = Rc::new(Cell::new(0));
        let d = done.clone();

        effect.play(PlayOptions::seconds(0.5).on_complete(move |_| d.set(d.get() + 1)));
        assert_eq!(text.last_reveal_start(), Some(Point::new(1.0, 1.0)));

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(done.get(), 1);
        assert_eq!(pen.get(), text.pen_end());
        assert_eq!(text.state().reveal, 1.0);
    }

    #[test]
    fn test_to_end_state_updates_pen() {
        let scheduler = VirtualScheduler::shared();
        let pen = PenCursor::new();
        let text = HeadlessMathText::new("T", "ab", Point::new(0.0, 0.0), Journal::default());
        let effect = WriteEffect::new(text.clone(), pen.clone(), scheduler);

        effect.to_end_state();
        assert!(text.state().end_state);
        assert!(pen.get().is_some());
    }
}
