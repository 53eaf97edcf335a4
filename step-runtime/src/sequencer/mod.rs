//! # Sequencer 模块
//!
//! 步骤导航：驱动调用方提供的步骤生成器，在 `animate_mode`
//! 与效果契约之上实现 next / previous / go_to / reset_navigation。
//!
//! ## 状态机
//!
//! ```text
//! 未开始 (-1, 无生成器) → 进行中 (已创建生成器) → 已耗尽 (生成器返回 Done)
//! ```
//!
//! ## 随机跳转
//!
//! 生成器不支持廉价的定位，`go_to(k)` 总是清空画面、重新创建生成器，
//! 以瞬间模式重放前 k 个步骤，再以动画模式执行第 k 个步骤。
//! 每次调用结束后 `animate_mode` 都恢复为调用前的值。

mod generator;

pub use generator::{GeneratorFactory, StepBody, StepGenerator, StepList, StepPoll};

use tracing::debug;

use crate::canvas::Canvas;

/// 初始化回调
pub type InitCallback = Box<dyn FnMut(&mut Canvas)>;

/// 步骤导航器
pub struct StepSequencer {
    canvas: Canvas,
    factory: GeneratorFactory,
    generator: Option<Box<dyn StepGenerator>>,
    /// 当前步骤索引，未开始时为 -1
    current_step: isize,
    exhausted: bool,
    init_callback: Option<InitCallback>,
    initialized: bool,
}

impl std::fmt::Debug for StepSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSequencer")
            .field("current_step", &self.current_step)
            .field("has_generator", &self.generator.is_some())
            .field("exhausted", &self.exhausted)
            .field("initialized", &self.initialized)
            .field("canvas", &self.canvas)
            .finish()
    }
}

impl StepSequencer {
    /// 创建导航器
    ///
    /// # 参数
    ///
    /// - `canvas`: 步骤体使用的绘制面
    /// - `factory`: 生成器工厂，每次重放都会调用
    pub fn new(canvas: Canvas, factory: GeneratorFactory) -> Self {
        Self {
            canvas,
            factory,
            generator: None,
            current_step: -1,
            exhausted: false,
            init_callback: None,
            initialized: false,
        }
    }

    /// 绘制面
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// 可变绘制面
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// 当前步骤索引（未开始时为 -1）
    pub fn current_step(&self) -> isize {
        self.current_step
    }

    /// 生成器是否已耗尽
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// 当前动画模式
    pub fn animate_mode(&self) -> bool {
        self.canvas.animate_mode()
    }

    /// 设置动画模式（导航调用之间保持）
    pub fn set_animate_mode(&mut self, enabled: bool) {
        self.canvas.set_animate_mode(enabled);
    }

    /// 以指定模式执行一个步骤
    ///
    /// # 返回
    /// 生成器是否执行了步骤
    fn poll_step(&mut self, animate: bool) -> bool {
        if self.generator.is_none() {
            self.generator = Some((self.factory)());
            self.exhausted = false;
        }
        // 步骤体运行期间生成器暂时移出，避免与绘制面的借用冲突
        let Some(mut generator) = self.generator.take() else {
            return false;
        };

        let previous = self.canvas.animate_mode();
        self.canvas.set_animate_mode(animate);
        let poll = generator.next_step(&mut self.canvas);
        self.canvas.set_animate_mode(previous);

        self.generator = Some(generator);
        if poll.is_done() {
            self.exhausted = true;
        }
        !poll.is_done()
    }

    /// 前进一步（动画模式）
    pub fn next(&mut self) {
        self.ensure_initialized();
        if self.exhausted {
            debug!(step = self.current_step, "步骤已全部执行");
            return;
        }
        if self.poll_step(true) {
            self.current_step += 1;
        }
        debug!(step = self.current_step, exhausted = self.exhausted, "下一步");
    }

    /// 后退一步
    ///
    /// 当前索引 ≤ 0 时不做任何事。
    pub fn previous(&mut self) {
        if self.current_step > 0 {
            self.go_to(self.current_step - 1);
        }
    }

    /// 跳转到指定步骤
    ///
    /// 负数目标按 -1 处理（仅清空）。目标超出步骤总数时停在最后一个已执行的步骤。
    pub fn go_to(&mut self, target: isize) {
        self.ensure_initialized();
        let target = target.max(-1);
        debug!(from = self.current_step, target, "跳转");

        self.canvas.clear_all();
        self.generator = Some((self.factory)());
        self.exhausted = false;
        self.current_step = -1;

        if target < 0 {
            return;
        }

        for _ in 0..target {
            if !self.poll_step(false) {
                break;
            }
            self.current_step += 1;
        }

        if self.poll_step(true) {
            self.current_step += 1;
        }
        debug!(step = self.current_step, "跳转完成");
    }

    /// 重置导航：清空画面并丢弃生成器
    pub fn reset_navigation(&mut self) {
        self.canvas.clear_all();
        self.current_step = -1;
        self.generator = None;
        self.exhausted = false;
        debug!("重置导航");
    }

    /// 设置初始化回调
    ///
    /// 尚未初始化时立即执行一次：重置视口，再调用回调。
    pub fn on_ready(&mut self, callback: impl FnMut(&mut Canvas) + 'static) -> &mut Self {
        self.init_callback = Some(Box::new(callback));
        if !self.initialized {
            self.initialize();
        }
        self
    }

    /// 首次使用时执行尚未执行的初始化
    fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.initialize();
        }
    }

    fn initialize(&mut self) {
        let Some(callback) = self.init_callback.as_mut() else {
            return;
        };
        self.canvas.viewport().reset();
        callback(&mut self.canvas);
        self.initialized = true;
        debug!("图表初始化完成");
    }

    /// 是否已初始化
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// 取消全部进行中的动画
    pub fn stop_animation(&self) {
        self.canvas.stop_animation();
    }

    /// 跳过动画直接显示全部图形
    pub fn show_all_instantly(&self) {
        self.canvas.show_all_instantly();
    }

    /// 清空画面，导航状态一并复位
    pub fn clear_all(&mut self) {
        self.reset_navigation();
    }

    /// 销毁
    ///
    /// 停止动画、重置视口、清空全部对象，释放初始化回调并丢弃生成器。
    /// 可以重复调用，也可以在初始化之前调用。
    pub fn destroy(&mut self) {
        self.canvas.stop_animation();
        self.canvas.viewport().reset();
        self.canvas.clear_all();
        self.init_callback = None;
        self.initialized = false;
        self.generator = None;
        self.exhausted = false;
        self.current_step = -1;
        debug!("图表已销毁");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use kurbo::Point;

    use super::*;
    use crate::config::EngineConfig;
    use crate::headless::{HeadlessBuilder, Journal, RecordingViewport};
    use crate::timer::VirtualScheduler;

    fn sequencer(steps: StepList) -> (StepSequencer, Rc<RecordingViewport>) {
        let journal = Journal::default();
        let viewport = RecordingViewport::new(journal.clone());
        let canvas = Canvas::new(
            HeadlessBuilder::new(journal),
            viewport.clone(),
            VirtualScheduler::shared(),
            EngineConfig::default(),
        );
        (StepSequencer::new(canvas, steps.into_factory()), viewport)
    }

    /// 记录每个步骤执行时的动画模式
    fn recording_steps(count: usize) -> (StepList, Rc<RefCell<Vec<(usize, bool)>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut steps = StepList::new();
        for i in 0..count {
            let log = log.clone();
            steps = steps.step(move |canvas: &mut Canvas| {
                log.borrow_mut().push((i, canvas.animate_mode()));
                canvas.point(Point::new(i as f64, 0.0), "black");
            });
        }
        (steps, log)
    }

    #[test]
    fn test_next_counts_steps() {
        let (steps, log) = recording_steps(3);
        let (mut seq, _) = sequencer(steps);
        assert_eq!(seq.current_step(), -1);

        seq.next();
        seq.next();
        assert_eq!(seq.current_step(), 1);
        assert!(!seq.is_exhausted());

        seq.next();
        seq.next();
        seq.next();
        assert_eq!(seq.current_step(), 2);
        assert!(seq.is_exhausted());
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(seq.canvas().objects().len(), 3);
    }

    #[test]
    fn test_next_forces_animation_and_restores_mode() {
        let (steps, log) = recording_steps(1);
        let (mut seq, _) = sequencer(steps);
        seq.set_animate_mode(false);

        seq.next();
        assert_eq!(*log.borrow(), vec![(0, true)]);
        assert!(!seq.animate_mode());
    }

    #[test]
    fn test_go_to_replays_instantly_then_animates_target() {
        let (steps, log) = recording_steps(4);
        let (mut seq, _) = sequencer(steps);

        seq.go_to(2);
        assert_eq!(seq.current_step(), 2);
        assert_eq!(*log.borrow(), vec![(0, false), (1, false), (2, true)]);
        assert!(seq.animate_mode());
        assert_eq!(seq.canvas().objects().len(), 3);
    }

    #[test]
    fn test_go_to_zero_and_negative() {
        let (steps, log) = recording_steps(3);
        let (mut seq, _) = sequencer(steps);

        seq.go_to(0);
        assert_eq!(seq.current_step(), 0);
        assert_eq!(*log.borrow(), vec![(0, true)]);

        seq.go_to(-5);
        assert_eq!(seq.current_step(), -1);
        assert!(seq.canvas().objects().is_empty());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_go_to_beyond_end_stops_at_last_step() {
        let (steps, _) = recording_steps(2);
        let (mut seq, _) = sequencer(steps);

        seq.go_to(10);
        assert_eq!(seq.current_step(), 1);
        assert!(seq.is_exhausted());

        seq.next();
        assert_eq!(seq.current_step(), 1);
    }

    #[test]
    fn test_previous() {
        let (steps, log) = recording_steps(3);
        let (mut seq, _) = sequencer(steps);

        seq.previous();
        assert_eq!(seq.current_step(), -1);
        seq.next();
        seq.previous();
        assert_eq!(seq.current_step(), 0);
        assert_eq!(log.borrow().len(), 1);

        seq.next();
        seq.next();
        seq.previous();
        assert_eq!(seq.current_step(), 1);
    }

    #[test]
    fn test_reset_navigation_restarts_generator() {
        let (steps, log) = recording_steps(2);
        let (mut seq, _) = sequencer(steps);
        seq.next();
        seq.next();

        seq.reset_navigation();
        assert_eq!(seq.current_step(), -1);
        assert!(seq.canvas().registry().is_empty());

        seq.next();
        assert_eq!(seq.current_step(), 0);
        assert_eq!(log.borrow().last(), Some(&(0, true)));
    }

    #[test]
    fn test_on_ready_runs_once() {
        let (steps, _) = recording_steps(1);
        let (mut seq, viewport) = sequencer(steps);
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        seq.on_ready(move |_| c.set(c.get() + 1));
        let c = calls.clone();
        seq.on_ready(move |_| c.set(c.get() + 10));
        seq.next();

        assert_eq!(calls.get(), 1);
        assert_eq!(viewport.resets(), 1);
        assert!(seq.is_initialized());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (steps, _) = recording_steps(2);
        let (mut seq, viewport) = sequencer(steps);
        seq.destroy();

        seq.on_ready(|_| {});
        seq.next();
        seq.destroy();
        seq.destroy();

        assert_eq!(seq.current_step(), -1);
        assert!(!seq.is_initialized());
        assert!(seq.canvas().registry().is_empty());
        assert_eq!(viewport.resets(), 4);
    }
}
