//! 步骤生成器
//!
//! 一个图表的全部步骤由可重新创建的生成器描述：每次 `next_step`
//! 在绘制面上执行一个步骤体，耗尽后返回 [`StepPoll::Done`]。
//! 导航时丢弃旧生成器、由工厂重新创建，从头快速重放。

use std::rc::Rc;

use crate::canvas::Canvas;

/// 单次推进结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPoll {
    /// 执行了一个步骤
    Yielded,
    /// 没有更多步骤
    Done,
}

impl StepPoll {
    /// 是否已耗尽
    pub fn is_done(self) -> bool {
        matches!(self, StepPoll::Done)
    }
}

/// 步骤生成器
///
/// 耗尽后再次调用必须继续返回 `Done`。
pub trait StepGenerator {
    /// 执行下一个步骤
    fn next_step(&mut self, canvas: &mut Canvas) -> StepPoll;
}

/// 生成器工厂：每次导航重放都创建一个全新的生成器
pub type GeneratorFactory = Box<dyn Fn() -> Box<dyn StepGenerator>>;

/// 步骤体
pub type StepBody = Rc<dyn Fn(&mut Canvas)>;

/// 以闭包列表描述的步骤序列
#[derive(Clone, Default)]
pub struct StepList {
    steps: Vec<StepBody>,
}

impl std::fmt::Debug for StepList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepList")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl StepList {
    /// 创建空序列
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个步骤
    pub fn step(mut self, body: impl Fn(&mut Canvas) + 'static) -> Self {
        self.steps.push(Rc::new(body));
        self
    }

    /// 步骤数
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 转为生成器工厂
    pub fn into_factory(self) -> GeneratorFactory {
        let steps: Rc<[StepBody]> = self.steps.into();
        Box::new(move || {
            Box::new(StepCursor {
                steps: steps.clone(),
                index: 0,
            })
        })
    }
}

/// `StepList` 的游标
struct StepCursor {
    steps: Rc<[StepBody]>,
    index: usize,
}

impl StepGenerator for StepCursor {
    fn next_step(&mut self, canvas: &mut Canvas) -> StepPoll {
        let Some(body) = self.steps.get(self.index).cloned() else {
            return StepPoll::Done;
        };
        self.index += 1;
        body(canvas);
        StepPoll::Yielded
    }
}
