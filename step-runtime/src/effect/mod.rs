//! # Effect 模块
//!
//! 效果生命周期契约与各个具体效果。
//!
//! ## 生命周期
//!
//! - `show()` / `hide()`：幂等，切换容器可见性，动画内容保持隐藏以便逐步显现
//! - `to_end_state()`：幂等，跳过动画直接呈现最终结果（快速重放使用）
//! - `play(options)`：`stop()` → `show()` → 构建 [`PlayContext`] → `do_play()`
//! - `stop()`：取消效果持有的全部定时器，覆盖实现必须调用基础实现
//!
//! `do_play` 必须最终调用一次 `ctx.complete()`；返回 `Err` 时由 `play`
//! 代为调用 `ctx.fail(err)`，因此失败的效果不会阻塞步骤推进。
//!
//! ## 具体效果
//!
//! - [`ShapeDrawEffect`]：通用图形显现
//! - [`ReverseVectorEffect`] / [`MoveVectorEffect`]：向量反向与平移
//! - [`WriteEffect`]：数学文本书写
//! - [`ZoomEffect`] / [`PanEffect`]：视口缩放与平移
//! - [`FocusEffect`]：聚焦 / 变暗
//! - [`MathTextRectEffect`]：文本注释框
//! - [`TextMoveEffect`]：文本片段移动

mod context;
mod focus;
mod shape_draw;
mod text_move;
mod text_rect;
mod vector;
mod viewport;
mod write;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::error::EffectError;
use crate::timer::{SharedScheduler, TimerHandle, TimerSet};

pub use context::{CompletionCallback, PlayContext};
pub use focus::FocusEffect;
pub use shape_draw::ShapeDrawEffect;
pub use text_move::TextMoveEffect;
pub use text_rect::MathTextRectEffect;
pub use vector::{MoveVectorEffect, ReverseVectorEffect};
pub use viewport::{PanEffect, ZoomEffect};
pub use write::WriteEffect;

/// 效果 ID
pub type EffectId = u64;

static NEXT_EFFECT_ID: AtomicU64 = AtomicU64::new(1);

/// 效果的父容器（组合效果预留接口）
pub trait EffectParent {
    /// 子效果完成通知
    fn on_child_complete(&self, child: EffectId);
}

/// 播放参数
///
/// 只需要时长时使用 `PlayOptions::from(0.5)` 或 [`PlayOptions::seconds`]。
pub struct PlayOptions {
    /// 播放时长（秒），默认 1 秒
    pub duration_in_seconds: f64,
    /// 完成回调
    pub on_complete: Option<CompletionCallback>,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            duration_in_seconds: 1.0,
            on_complete: None,
        }
    }
}

impl From<f64> for PlayOptions {
    fn from(duration_in_seconds: f64) -> Self {
        Self::seconds(duration_in_seconds)
    }
}

impl std::fmt::Debug for PlayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayOptions")
            .field("duration_in_seconds", &self.duration_in_seconds)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl PlayOptions {
    /// 指定时长
    pub fn seconds(duration_in_seconds: f64) -> Self {
        Self {
            duration_in_seconds,
            on_complete: None,
        }
    }

    /// 设置完成回调
    pub fn on_complete(mut self, f: impl FnOnce(Option<EffectError>) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

struct CoreInner {
    id: EffectId,
    name: &'static str,
    timers: TimerSet,
    parent: RefCell<Option<Weak<dyn EffectParent>>>,
    paused: Rc<Cell<bool>>,
    /// 本次播放是否已通知父容器
    notified: Cell<bool>,
}

/// 所有效果共享的基础状态：父容器、暂停标志、活跃定时器集合
///
/// 克隆得到同一状态的共享句柄，可以放进定时器回调。
#[derive(Clone)]
pub struct EffectCore {
    inner: Rc<CoreInner>,
}

impl std::fmt::Debug for EffectCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectCore")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("timers", &self.inner.timers)
            .field("paused", &self.inner.paused.get())
            .finish()
    }
}

impl EffectCore {
    /// 创建基础状态
    pub fn new(name: &'static str, scheduler: SharedScheduler) -> Self {
        Self {
            inner: Rc::new(CoreInner {
                id: NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed),
                name,
                timers: TimerSet::new(scheduler),
                parent: RefCell::new(None),
                paused: Rc::new(Cell::new(false)),
                notified: Cell::new(false),
            }),
        }
    }

    /// 效果 ID
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// 效果名
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// 活跃定时器集合
    pub fn timers(&self) -> &TimerSet {
        &self.inner.timers
    }

    /// 共享暂停标志（传给补间）
    pub fn paused_flag(&self) -> Rc<Cell<bool>> {
        self.inner.paused.clone()
    }

    /// 是否暂停
    pub fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    /// 暂停
    pub fn pause(&self) {
        self.inner.paused.set(true);
    }

    /// 恢复
    pub fn resume(&self) {
        self.inner.paused.set(false);
    }

    /// 设置父容器
    pub fn set_parent(&self, parent: Weak<dyn EffectParent>) {
        *self.inner.parent.borrow_mut() = Some(parent);
    }

    /// 新一轮播放开始，重置父容器通知标志
    pub fn begin_play(&self) {
        self.inner.notified.set(false);
    }

    /// 通知父容器（每轮播放最多一次）
    pub fn on_complete(&self) {
        if self.inner.notified.replace(true) {
            return;
        }
        let parent = self.inner.parent.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(parent) = parent {
            parent.on_child_complete(self.inner.id);
        }
    }

    /// 在下一个事件循环周期通知父容器
    pub fn schedule_complete(&self) -> TimerHandle {
        let core = self.clone();
        self.inner
            .timers
            .schedule(Duration::ZERO, move || core.on_complete())
    }

    /// 延迟 `delay` 后完成本次播放
    pub fn complete_after(&self, delay: Duration, ctx: &PlayContext) -> TimerHandle {
        let core = self.clone();
        let ctx = ctx.clone();
        self.inner.timers.schedule(delay, move || {
            core.on_complete();
            ctx.complete();
        })
    }

    /// 动画结束：完成本次播放，并在下一周期通知父容器
    pub fn finish_play(&self, ctx: &PlayContext) {
        self.schedule_complete();
        ctx.complete();
    }

    /// 取消全部定时器
    ///
    /// # 返回
    /// 被取消的定时器数量
    pub fn stop(&self) -> usize {
        self.inner.timers.cancel_all()
    }
}

/// 效果契约
pub trait Effect {
    /// 基础状态
    fn core(&self) -> &EffectCore;

    /// 效果名
    fn name(&self) -> &'static str {
        self.core().name()
    }

    /// 显示容器，动画内容保持隐藏
    fn show(&self);

    /// 隐藏
    fn hide(&self);

    /// 直接呈现最终状态
    fn to_end_state(&self);

    /// 动画主体，必须最终调用一次 `ctx.complete()`
    fn do_play(&self, ctx: &PlayContext) -> Result<(), EffectError>;

    /// 播放
    fn play(&self, options: PlayOptions) {
        self.stop();
        let core = self.core();
        core.begin_play();
        self.show();

        let ctx = PlayContext::new(options.duration_in_seconds, options.on_complete);
        if let Err(error) = self.do_play(&ctx) {
            warn!(effect = self.name(), error = %error, "效果播放失败，直接完成");
            core.schedule_complete();
            ctx.fail(error);
        }
    }

    /// 取消全部活跃定时器
    fn stop(&self) {
        self.core().stop();
    }

    /// 释放效果持有的宿主资源（清空图表时调用）
    fn dispose(&self) {
        self.stop();
    }

    /// 添加子效果（叶子效果一律拒绝）
    fn add(&self, _child: Rc<dyn Effect>) -> Result<(), EffectError> {
        Err(EffectError::LeafEffect {
            effect: self.name(),
        })
    }

    /// 设置父容器
    fn set_parent(&self, parent: Weak<dyn EffectParent>) {
        self.core().set_parent(parent);
    }

    /// 通知父容器完成
    fn on_complete(&self) {
        self.core().on_complete();
    }

    /// 暂停
    fn pause(&self) {
        self.core().pause();
    }

    /// 恢复
    fn resume(&self) {
        self.core().resume();
    }
}
