//! 视口缩放与平移效果
//!
//! 视口控制器不提供完成回调，这里按请求时长注册一个定时器
//! 作为完成信号。若控制器的实际动画时长与请求不一致，
//! 完成信号会提前或滞后。

use std::rc::Rc;

use kurbo::Point;

use super::{Effect, EffectCore, PlayContext};
use crate::error::EffectError;
use crate::timer::{SharedScheduler, seconds};
use crate::viewport::{ViewportController, ViewportRequest};

/// 默认缩放比例
pub const DEFAULT_ZOOM_SCALE: f64 = 0.5;
/// 默认缩放时长（秒）
pub const DEFAULT_ZOOM_DURATION: f64 = 1.0;
/// 默认平移时长（秒）
pub const DEFAULT_PAN_DURATION: f64 = 0.5;

/// 缩放效果
///
/// `point` 为 `Some` 时放大到该点，为 `None` 时缩小回全景。
pub struct ZoomEffect {
    core: EffectCore,
    viewport: Rc<dyn ViewportController>,
    point: Option<Point>,
    scale: f64,
    duration: f64,
}

impl ZoomEffect {
    /// 创建效果
    pub fn new(
        viewport: Rc<dyn ViewportController>,
        point: Option<Point>,
        scale: f64,
        duration: f64,
        scheduler: SharedScheduler,
    ) -> Self {
        Self {
            core: EffectCore::new("zoom", scheduler),
            viewport,
            point,
            scale,
            duration,
        }
    }

    fn apply(&self, animate: bool) {
        match self.point {
            Some(point) => self.viewport.zoom_in(ViewportRequest::new(
                Some(point),
                Some(self.scale),
                self.duration,
                animate,
            )),
            None => self.viewport.zoom_out(ViewportRequest::new(
                None,
                None,
                self.duration,
                animate,
            )),
        }
    }
}

impl Effect for ZoomEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn show(&self) {}

    fn hide(&self) {}

    fn to_end_state(&self) {
        self.apply(false);
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        self.apply(true);
        self.core.complete_after(seconds(self.duration), ctx);
        Ok(())
    }
}

/// 平移效果
pub struct PanEffect {
    core: EffectCore,
    viewport: Rc<dyn ViewportController>,
    point: Point,
    duration: f64,
}

impl PanEffect {
    /// 创建效果
    pub fn new(
        viewport: Rc<dyn ViewportController>,
        point: Point,
        duration: f64,
        scheduler: SharedScheduler,
    ) -> Self {
        Self {
            core: EffectCore::new("pan", scheduler),
            viewport,
            point,
            duration,
        }
    }

    fn apply(&self, animate: bool) {
        self.viewport.pan_to(ViewportRequest::new(
            Some(self.point),
            None,
            self.duration,
            animate,
        ));
    }
}

impl Effect for PanEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn show(&self) {}

    fn hide(&self) {}

    fn to_end_state(&self) {
        self.apply(false);
    }

    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        self.apply(true);
        self.core.complete_after(seconds(self.duration), ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;
    use crate::effect::PlayOptions;
    use crate::headless::{Journal, RecordingViewport};
    use crate::timer::VirtualScheduler;

    #[test]
    fn test_zoom_in_completes_after_requested_duration() {
        let scheduler = VirtualScheduler::shared();
        let viewport = RecordingViewport::new(Journal::default());
        let effect = ZoomEffect::new(
            viewport.clone(),
            Some(Point::new(3.0, 4.0)),
            DEFAULT_ZOOM_SCALE,
            DEFAULT_ZOOM_DURATION,
            scheduler.clone(),
        );
        let done = Rc::new(Cell::new(false));
        let d = done.clone();

        effect.play(PlayOptions::default().on_complete(move |_| d.set(true)));
        let requests = viewport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "zoom_in");
        assert!(requests[0].1.animate);
        assert_eq!(requests[0].1.scale, Some(0.5));

        scheduler.advance(Duration::from_millis(999));
        assert!(!done.get());
        scheduler.advance(Duration::from_millis(1));
        assert!(done.get());
    }

    #[test]
    fn test_zoom_out_without_point() {
        let scheduler = VirtualScheduler::shared();
        let viewport = RecordingViewport::new(Journal::default());
        let effect = ZoomEffect::new(viewport.clone(), None, 0.5, 1.0, scheduler);

        effect.to_end_state();
        let requests = viewport.requests();
        assert_eq!(requests[0].0, "zoom_out");
        assert!(!requests[0].1.animate);
        assert_eq!(requests[0].1.point, None);
    }

    #[test]
    fn test_pan_end_state_is_instant() {
        let scheduler = VirtualScheduler::shared();
        let viewport = RecordingViewport::new(Journal::default());
        let effect = PanEffect::new(
            viewport.clone(),
            Point::new(1.0, 2.0),
            DEFAULT_PAN_DURATION,
            scheduler.clone(),
        );

        effect.to_end_state();
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(viewport.requests()[0].0, "pan_to");
        assert_eq!(viewport.requests()[0].1.duration, 0.5);
    }
}
