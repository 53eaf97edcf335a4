//! 聚焦 / 变暗效果

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use super::{Effect, EffectCore, PlayContext};
use crate::easing::Easing;
use crate::error::EffectError;
use crate::shape::{AnimatableShape, same_shape};
use crate::timer::{SharedScheduler, seconds};
use crate::tween::{DEFAULT_FRAME_INTERVAL, Tween};

/// 默认变暗不透明度
pub const DEFAULT_DIM_OPACITY: f64 = 0.3;
/// 默认聚焦过渡时长（秒）
pub const DEFAULT_FOCUS_DURATION: f64 = 0.5;

/// 一次不透明度过渡中的单个对象
struct Fade {
    shape: Rc<dyn AnimatableShape>,
    from: f64,
    to: f64,
}

/// 聚焦协调器
///
/// 保持 `keep` 中的对象不变，其余被跟踪对象降到 `dim_opacity`。
/// 被变暗的对象记录在案，`restore()` 把它们恢复到 1 并清空记录。
pub struct FocusEffect {
    core: EffectCore,
    /// 当前被变暗的对象
    dimmed: RefCell<Vec<Rc<dyn AnimatableShape>>>,
    dim_opacity: Cell<f64>,
    active: Cell<bool>,
    tween: RefCell<Option<Tween>>,
    frame_interval: Duration,
}

impl FocusEffect {
    /// 创建协调器
    pub fn new(scheduler: SharedScheduler) -> Self {
        Self {
            core: EffectCore::new("focus", scheduler),
            dimmed: RefCell::new(Vec::new()),
            dim_opacity: Cell::new(DEFAULT_DIM_OPACITY),
            active: Cell::new(false),
            tween: RefCell::new(None),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    /// 设置帧间隔
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// 聚焦
    ///
    /// 已处于聚焦状态时先瞬间恢复，再重新应用。
    pub fn focus(
        &self,
        keep: &[Rc<dyn AnimatableShape>],
        all: &[Rc<dyn AnimatableShape>],
        dim_opacity: f64,
        duration: f64,
    ) {
        if self.active.get() {
            self.restore(0.0);
        }

        let dimmed: Vec<Rc<dyn AnimatableShape>> = all
            .iter()
            .filter(|shape| !keep.iter().any(|k| same_shape(k, shape)))
            .cloned()
            .collect();
        debug!(
            keep = keep.len(),
            dimmed = dimmed.len(),
            dim_opacity,
            "聚焦"
        );

        let fades = dimmed
            .iter()
            .map(|shape| Fade {
                shape: shape.clone(),
                from: shape.opacity(),
                to: dim_opacity,
            })
            .collect();
        *self.dimmed.borrow_mut() = dimmed;
        self.dim_opacity.set(dim_opacity);
        self.active.set(true);
        self.transition(fades, duration, None);
    }

    /// 恢复所有被变暗的对象并清空记录
    pub fn restore(&self, duration: f64) {
        let dimmed = std::mem::take(&mut *self.dimmed.borrow_mut());
        if !self.active.replace(false) && dimmed.is_empty() {
            return;
        }
        debug!(restored = dimmed.len(), "取消聚焦");

        let fades = dimmed
            .into_iter()
            .map(|shape| Fade {
                from: shape.opacity(),
                shape,
                to: 1.0,
            })
            .collect();
        self.transition(fades, duration, None);
    }

    /// 是否处于聚焦状态
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// 当前被变暗的对象数量
    pub fn dimmed_count(&self) -> usize {
        self.dimmed.borrow().len()
    }

    fn cancel_tween(&self) {
        if let Some(tween) = self.tween.borrow_mut().take() {
            tween.cancel();
        }
    }

    /// 不透明度过渡，`duration <= 0` 时立即生效
    fn transition(&self, fades: Vec<Fade>, duration: f64, on_done: Option<Box<dyn FnOnce()>>) {
        self.cancel_tween();

        let duration = seconds(duration);
        if duration.is_zero() {
            for fade in &fades {
                fade.shape.set_opacity(fade.to);
            }
            if let Some(on_done) = on_done {
                on_done();
            }
            return;
        }

        let mut tween = Tween::new(self.core.timers(), duration)
            .with_easing(Easing::EaseInOutQuad)
            .with_frame_interval(self.frame_interval)
            .with_pause_flag(self.core.paused_flag())
            .on_update(move |p| {
                for fade in &fades {
                    let value = if p >= 1.0 {
                        fade.to
                    } else {
                        fade.from + (fade.to - fade.from) * p
                    };
                    fade.shape.set_opacity(value);
                }
            });
        if let Some(on_done) = on_done {
            tween = tween.on_complete(on_done);
        }
        *self.tween.borrow_mut() = Some(tween.start());
    }
}

impl Effect for FocusEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn show(&self) {}

    fn hide(&self) {}

    /// 正在进行的过渡直接跳到终点
    fn to_end_state(&self) {
        let tween = self.tween.borrow_mut().take();
        if let Some(tween) = tween {
            tween.finish();
        }
    }

    /// 以本次时长重新应用当前的变暗记录
    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError> {
        if !self.active.get() {
            self.core.finish_play(ctx);
            return Ok(());
        }

        let target = self.dim_opacity.get();
        let fades = self
            .dimmed
            .borrow()
            .iter()
            .map(|shape| Fade {
                shape: shape.clone(),
                from: 1.0,
                to: target,
            })
            .collect();
        let core = self.core.clone();
        let done_ctx = ctx.clone();
        self.transition(
            fades,
            ctx.duration_in_seconds(),
            Some(Box::new(move || core.finish_play(&done_ctx))),
        );
        Ok(())
    }

    fn stop(&self) {
        self.core.stop();
        self.cancel_tween();
    }
}
