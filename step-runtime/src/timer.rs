//! # Timer 模块
//!
//! 单线程宿主事件循环的定时器抽象。
//!
//! ## 核心概念
//!
//! - [`Scheduler`]：宿主提供的定时器接口（`set_timeout` / `clear_timeout`）
//! - [`VirtualScheduler`]：确定性的虚拟时钟实现，测试与无头模式使用
//! - [`TimerSet`]：单个效果持有的活跃定时器集合
//!
//! ## 取消语义
//!
//! 定时器回调执行**之前**，句柄就已从 `TimerSet` 中移除。
//! 因此回调内部重入调用 `cancel_all()` 不会重复取消自身。

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

/// 定时器句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// 获取内部 ID 值
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 定时器回调
pub type TimerCallback = Box<dyn FnOnce()>;

/// 宿主定时器接口
///
/// 所有调用都发生在同一线程，回调由宿主事件循环在稍后触发。
pub trait Scheduler {
    /// 注册一个延迟回调
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// 取消定时器
    ///
    /// # 返回
    /// - `true`: 定时器尚未触发，已取消
    /// - `false`: 定时器不存在或已触发
    fn clear_timeout(&self, handle: TimerHandle) -> bool;

    /// 当前时间（自时钟创建起）
    fn now(&self) -> Duration;
}

/// 共享的调度器引用
pub type SharedScheduler = Rc<dyn Scheduler>;

/// 虚拟调度器
///
/// 时间只在调用 [`advance`](Self::advance) 时前进。到期的定时器按
/// `(到期时间, 注册顺序)` 依次触发，回调内可以继续注册或取消定时器。
pub struct VirtualScheduler {
    /// 当前虚拟时间
    now: Cell<Duration>,
    /// 下一个句柄 ID
    next_id: Cell<u64>,
    /// 待触发队列：(到期时间, 句柄) -> 回调
    queue: RefCell<BTreeMap<(Duration, u64), TimerCallback>>,
    /// 句柄 -> 到期时间，用于取消
    due_times: RefCell<HashMap<u64, Duration>>,
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

impl VirtualScheduler {
    /// 创建新的虚拟调度器
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            next_id: Cell::new(1),
            queue: RefCell::new(BTreeMap::new()),
            due_times: RefCell::new(HashMap::new()),
        }
    }

    /// 创建共享实例
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// 待触发的定时器数量
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// 取出下一个到期不晚于 `deadline` 的定时器
    fn pop_due(&self, deadline: Duration) -> Option<(Duration, TimerCallback)> {
        let mut queue = self.queue.borrow_mut();
        let (&(due, _), _) = queue.first_key_value()?;
        if due > deadline {
            return None;
        }
        let ((due, id), callback) = queue.pop_first()?;
        self.due_times.borrow_mut().remove(&id);
        Some((due, callback))
    }

    /// 推进虚拟时间，触发期间到期的所有定时器
    ///
    /// # 返回
    /// 本次触发的回调数量
    pub fn advance(&self, dt: Duration) -> usize {
        let deadline = self.now.get().saturating_add(dt);
        let mut fired = 0;
        // 借用在回调执行前释放，回调可以重入注册/取消
        while let Some((due, callback)) = self.pop_due(deadline) {
            self.now.set(due.max(self.now.get()));
            callback();
            fired += 1;
        }
        self.now.set(deadline);
        fired
    }

    /// 持续触发直到队列为空
    ///
    /// `max_fires` 限制触发次数，防止自我重排的定时器无限运行。
    ///
    /// # 返回
    /// 本次触发的回调数量
    pub fn run_until_idle(&self, max_fires: usize) -> usize {
        let mut fired = 0;
        while fired < max_fires {
            let next_due = match self.queue.borrow().first_key_value() {
                Some((&(due, _), _)) => due,
                None => break,
            };
            let Some((due, callback)) = self.pop_due(next_due) else {
                break;
            };
            self.now.set(due.max(self.now.get()));
            callback();
            fired += 1;
        }
        fired
    }
}

impl Scheduler for VirtualScheduler {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let due = self.now.get().saturating_add(delay);
        self.queue.borrow_mut().insert((due, id), callback);
        self.due_times.borrow_mut().insert(id, due);
        TimerHandle(id)
    }

    fn clear_timeout(&self, handle: TimerHandle) -> bool {
        let Some(due) = self.due_times.borrow_mut().remove(&handle.0) else {
            return false;
        };
        self.queue.borrow_mut().remove(&(due, handle.0)).is_some()
    }

    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// 效果持有的活跃定时器集合
///
/// 克隆得到的是同一集合的共享视图。
#[derive(Clone)]
pub struct TimerSet {
    scheduler: SharedScheduler,
    active: Rc<RefCell<HashSet<TimerHandle>>>,
}

impl std::fmt::Debug for TimerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerSet")
            .field("active", &self.active.borrow().len())
            .finish()
    }
}

impl TimerSet {
    /// 创建空集合
    pub fn new(scheduler: SharedScheduler) -> Self {
        Self {
            scheduler,
            active: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    /// 关联的调度器
    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    /// 当前时间
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// 注册一个受跟踪的定时器
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
        let slot: Rc<Cell<Option<TimerHandle>>> = Rc::new(Cell::new(None));
        let active = self.active.clone();
        let own_handle = slot.clone();

        let handle = self.scheduler.set_timeout(
            delay,
            Box::new(move || {
                let Some(handle) = own_handle.get() else {
                    return;
                };
                // 先移出活跃集合，再执行回调主体
                let was_active = active.borrow_mut().remove(&handle);
                if was_active {
                    callback();
                }
            }),
        );

        slot.set(Some(handle));
        self.active.borrow_mut().insert(handle);
        handle
    }

    /// 取消单个定时器
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let removed = self.active.borrow_mut().remove(&handle);
        if removed {
            self.scheduler.clear_timeout(handle);
        }
        removed
    }

    /// 取消所有未触发的定时器
    ///
    /// # 返回
    /// 被取消的定时器数量
    pub fn cancel_all(&self) -> usize {
        let handles: Vec<TimerHandle> = self.active.borrow_mut().drain().collect();
        for handle in &handles {
            self.scheduler.clear_timeout(*handle);
        }
        handles.len()
    }

    /// 活跃定时器数量
    pub fn len(&self) -> usize {
        self.active.borrow().len()
    }

    /// 是否没有活跃定时器
    pub fn is_empty(&self) -> bool {
        self.active.borrow().is_empty()
    }
}

/// 脚本与配置允许的最大时长（秒）
pub const MAX_DURATION_SECS: f64 = 86_400.0;

/// 秒数转 `Duration`，负数与 NaN 视为 0，超出表示范围时取 `Duration::MAX`
pub fn seconds(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Box<dyn FnOnce()>) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let make = move || -> Box<dyn FnOnce()> {
            let c = c.clone();
            Box::new(move || c.set(c.get() + 1))
        };
        (count, make)
    }

    #[test]
    fn test_virtual_scheduler_fires_in_due_order() {
        let scheduler = VirtualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, tag) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let order = order.clone();
            scheduler.set_timeout(
                Duration::from_millis(delay),
                Box::new(move || order.borrow_mut().push(tag)),
            );
        }

        assert_eq!(scheduler.advance(Duration::from_millis(15)), 2);
        assert_eq!(*order.borrow(), vec!["a", "a2"]);

        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*order.borrow(), vec!["a", "a2", "b", "c"]);
        assert_eq!(scheduler.now(), Duration::from_millis(115));
    }

    #[test]
    fn test_clear_timeout() {
        let scheduler = VirtualScheduler::new();
        let (count, make) = counter();

        let handle = scheduler.set_timeout(Duration::from_millis(5), make());
        assert!(scheduler.clear_timeout(handle));
        assert!(!scheduler.clear_timeout(handle));

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_callback_can_schedule_reentrantly() {
        let scheduler = VirtualScheduler::shared();
        let hits = Rc::new(Cell::new(0));

        let inner_scheduler = scheduler.clone();
        let inner_hits = hits.clone();
        scheduler.set_timeout(
            Duration::from_millis(10),
            Box::new(move || {
                inner_hits.set(inner_hits.get() + 1);
                let hits = inner_hits.clone();
                inner_scheduler.set_timeout(
                    Duration::from_millis(10),
                    Box::new(move || hits.set(hits.get() + 1)),
                );
            }),
        );

        scheduler.advance(Duration::from_millis(25));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_timer_set_cancel_all() {
        let scheduler = VirtualScheduler::shared();
        let timers = TimerSet::new(scheduler.clone());
        let (count, make) = counter();

        for ms in [10, 20, 30] {
            let cb = make();
            timers.schedule(Duration::from_millis(ms), cb);
        }
        assert_eq!(timers.len(), 3);

        assert_eq!(timers.cancel_all(), 3);
        assert!(timers.is_empty());
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_handle_removed_before_callback_runs() {
        let scheduler = VirtualScheduler::shared();
        let timers = TimerSet::new(scheduler.clone());
        let seen_len = Rc::new(Cell::new(usize::MAX));
        let cancelled = Rc::new(Cell::new(usize::MAX));

        let inner = timers.clone();
        let seen = seen_len.clone();
        let cancelled_in = cancelled.clone();
        timers.schedule(Duration::from_millis(5), move || {
            seen.set(inner.len());
            // 回调内重入 cancel_all 不会触碰已触发的自身句柄
            cancelled_in.set(inner.cancel_all());
        });
        timers.schedule(Duration::from_millis(50), || {});

        scheduler.advance(Duration::from_millis(10));
        assert_eq!(seen_len.get(), 1);
        assert_eq!(cancelled.get(), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_run_until_idle_respects_limit() {
        let scheduler = VirtualScheduler::new();
        let (count, make) = counter();
        for ms in [1, 2, 3] {
            scheduler.set_timeout(Duration::from_millis(ms), make());
        }

        assert_eq!(scheduler.run_until_idle(2), 2);
        assert_eq!(count.get(), 2);
        assert_eq!(scheduler.run_until_idle(10), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(3));
    }

    #[test]
    fn test_seconds_clamps_invalid() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f64::NAN), Duration::ZERO);
        assert_eq!(seconds(0.25), Duration::from_millis(250));
        assert_eq!(seconds(1e20), Duration::MAX);
    }

    #[test]
    fn test_huge_delay_saturates() {
        let scheduler = VirtualScheduler::new();
        let (count, make) = counter();
        scheduler.advance(Duration::from_secs(1));
        let handle = scheduler.set_timeout(seconds(1e20), make());
        scheduler.set_timeout(Duration::from_millis(5), make());

        assert_eq!(scheduler.pending(), 2);
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(count.get(), 1);
        assert!(scheduler.clear_timeout(handle));
        assert_eq!(scheduler.pending(), 0);
    }
}
