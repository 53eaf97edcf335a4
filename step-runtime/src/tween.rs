//! # Tween 模块
//!
//! 进度补间：在 `duration` 内把进度从 0 推进到 1。
//!
//! 补间不持有时钟，每一帧都是注册在所属 [`TimerSet`] 里的定时器，
//! 所以效果调用 `stop()` 时补间会随之停止。

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::easing::Easing;
use crate::timer::{TimerHandle, TimerSet};

/// 默认帧间隔（约 60 FPS）
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// 补间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TweenState {
    /// 尚未启动
    #[default]
    Pending,
    /// 正在播放
    Playing,
    /// 已完成（自然结束或被 `finish()`）
    Completed,
    /// 已取消
    Cancelled,
}

impl TweenState {
    /// 是否为活跃状态
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Playing)
    }

    /// 是否已结束
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

struct TweenInner {
    duration: Duration,
    easing: Easing,
    frame_interval: Duration,
    elapsed: Duration,
    last_tick: Duration,
    state: TweenState,
    /// 当前进度（已应用缓动）
    progress: f64,
    /// 暂停标志，由所属效果共享
    paused: Option<Rc<Cell<bool>>>,
    /// 下一帧的定时器
    frame: Option<TimerHandle>,
    on_update: Option<Box<dyn FnMut(f64)>>,
    on_complete: Option<Box<dyn FnOnce()>>,
}

/// 进度补间
///
/// 克隆得到同一补间的共享句柄。
#[derive(Clone)]
pub struct Tween {
    inner: Rc<RefCell<TweenInner>>,
    timers: TimerSet,
}

impl std::fmt::Debug for Tween {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Tween")
            .field("duration", &inner.duration)
            .field("state", &inner.state)
            .field("progress", &inner.progress)
            .finish()
    }
}

impl Tween {
    /// 创建补间（尚未启动）
    pub fn new(timers: &TimerSet, duration: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TweenInner {
                duration,
                easing: Easing::default(),
                frame_interval: DEFAULT_FRAME_INTERVAL,
                elapsed: Duration::ZERO,
                last_tick: Duration::ZERO,
                state: TweenState::Pending,
                progress: 0.0,
                paused: None,
                frame: None,
                on_update: None,
                on_complete: None,
            })),
            timers: timers.clone(),
        }
    }

    /// 设置缓动函数
    pub fn with_easing(self, easing: Easing) -> Self {
        self.inner.borrow_mut().easing = easing;
        self
    }

    /// 设置帧间隔
    pub fn with_frame_interval(self, interval: Duration) -> Self {
        self.inner.borrow_mut().frame_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// 共享暂停标志：为 `true` 时进度不前进
    pub fn with_pause_flag(self, paused: Rc<Cell<bool>>) -> Self {
        self.inner.borrow_mut().paused = Some(paused);
        self
    }

    /// 每帧回调，参数为缓动后的进度
    pub fn on_update(self, f: impl FnMut(f64) + 'static) -> Self {
        self.inner.borrow_mut().on_update = Some(Box::new(f));
        self
    }

    /// 完成回调（最多触发一次，取消时不触发）
    pub fn on_complete(self, f: impl FnOnce() + 'static) -> Self {
        self.inner.borrow_mut().on_complete = Some(Box::new(f));
        self
    }

    /// 启动补间，第一帧在 0 延迟后触发
    pub fn start(self) -> Self {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != TweenState::Pending {
                drop(inner);
                return self;
            }
            inner.state = TweenState::Playing;
            inner.last_tick = self.timers.now();
        }
        self.schedule_frame(Duration::ZERO);
        self
    }

    fn schedule_frame(&self, delay: Duration) {
        let this = self.clone();
        let handle = self.timers.schedule(delay, move || this.tick());
        self.inner.borrow_mut().frame = Some(handle);
    }

    fn tick(&self) {
        let now = self.timers.now();
        let (progress, next_delay) = {
            let mut inner = self.inner.borrow_mut();
            inner.frame = None;
            if inner.state != TweenState::Playing {
                return;
            }

            let dt = now.saturating_sub(inner.last_tick);
            inner.last_tick = now;
            let paused = inner.paused.as_ref().is_some_and(|p| p.get());
            if !paused {
                inner.elapsed += dt;
            }

            let raw = if inner.duration.is_zero() {
                1.0
            } else {
                inner.elapsed.as_secs_f64() / inner.duration.as_secs_f64()
            };
            inner.progress = inner.easing.apply(raw);

            let next_delay = if raw >= 1.0 {
                None
            } else if paused {
                Some(inner.frame_interval)
            } else {
                let remaining = inner.duration.saturating_sub(inner.elapsed);
                Some(inner.frame_interval.min(remaining))
            };
            (inner.progress, next_delay)
        };

        self.emit_update(progress);
        match next_delay {
            Some(delay) => self.schedule_frame(delay),
            None => self.complete(),
        }
    }

    fn emit_update(&self, progress: f64) {
        // 回调执行期间不持有借用，回调可以调用 finish()/cancel()
        let update = self.inner.borrow_mut().on_update.take();
        if let Some(mut update) = update {
            update(progress);
            let mut inner = self.inner.borrow_mut();
            if inner.on_update.is_none() {
                inner.on_update = Some(update);
            }
        }
    }

    fn complete(&self) {
        let on_complete = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_finished() {
                return;
            }
            inner.state = TweenState::Completed;
            inner.progress = 1.0;
            inner.on_complete.take()
        };
        if let Some(on_complete) = on_complete {
            on_complete();
        }
    }

    /// 立即跳到终点（触发最后一次更新和完成回调）
    ///
    /// # 返回
    /// - `true`: 补间原本处于活跃状态
    /// - `false`: 补间已结束
    pub fn finish(&self) -> bool {
        let frame = {
            let mut inner = self.inner.borrow_mut();
            if !inner.state.is_active() {
                return false;
            }
            inner.frame.take()
        };
        if let Some(frame) = frame {
            self.timers.cancel(frame);
        }
        self.emit_update(1.0);
        self.complete();
        true
    }

    /// 取消补间，不触发完成回调
    pub fn cancel(&self) -> bool {
        let frame = {
            let mut inner = self.inner.borrow_mut();
            if !inner.state.is_active() {
                return false;
            }
            inner.state = TweenState::Cancelled;
            inner.frame.take()
        };
        if let Some(frame) = frame {
            self.timers.cancel(frame);
        }
        true
    }

    /// 当前进度（已应用缓动）
    pub fn progress(&self) -> f64 {
        self.inner.borrow().progress
    }

    /// 当前状态
    pub fn state(&self) -> TweenState {
        self.inner.borrow().state
    }

    /// 是否已结束
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }
}
