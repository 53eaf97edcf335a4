//! 播放上下文

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::error::EffectError;
use crate::timer::seconds;

/// 完成回调，失败时携带错误
pub type CompletionCallback = Box<dyn FnOnce(Option<EffectError>)>;

/// 单次 `play()` 调用的参数包
///
/// 每次播放都新建一个，不会复用。克隆共享同一个完成守卫，
/// 无论调用多少次 [`complete`](Self::complete) / [`fail`](Self::fail)，
/// 回调最多触发一次。
#[derive(Clone)]
pub struct PlayContext {
    duration_in_seconds: f64,
    completed: Rc<Cell<bool>>,
    on_complete: Rc<RefCell<Option<CompletionCallback>>>,
}

impl std::fmt::Debug for PlayContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayContext")
            .field("duration_in_seconds", &self.duration_in_seconds)
            .field("completed", &self.completed.get())
            .finish()
    }
}

impl PlayContext {
    /// 创建上下文
    pub fn new(duration_in_seconds: f64, on_complete: Option<CompletionCallback>) -> Self {
        Self {
            duration_in_seconds,
            completed: Rc::new(Cell::new(false)),
            on_complete: Rc::new(RefCell::new(on_complete)),
        }
    }

    /// 播放时长（秒）
    pub fn duration_in_seconds(&self) -> f64 {
        self.duration_in_seconds
    }

    /// 播放时长
    pub fn duration(&self) -> Duration {
        seconds(self.duration_in_seconds)
    }

    /// 正常完成
    pub fn complete(&self) {
        self.finish(None);
    }

    /// 失败完成
    pub fn fail(&self, error: EffectError) {
        self.finish(Some(error));
    }

    /// 是否已经完成
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    fn finish(&self, error: Option<EffectError>) {
        if self.completed.replace(true) {
            return;
        }
        let callback = self.on_complete.borrow_mut().take();
        if let Some(callback) = callback {
            callback(error);
        }
    }
}
