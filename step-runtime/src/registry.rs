//! # Registry 模块
//!
//! 跟踪当前图表实例创建的全部图形、效果与嵌套容器，提供批量的
//! 显示 / 隐藏 / 清空 / 销毁操作。

use std::rc::Rc;

use tracing::debug;

use crate::effect::Effect;
use crate::shape::{AnimatableShape, GraphContainer};

/// 图表对象注册表
#[derive(Default)]
pub struct DiagramObjectRegistry {
    objects: Vec<Rc<dyn AnimatableShape>>,
    effects: Vec<Rc<dyn Effect>>,
    containers: Vec<Rc<dyn GraphContainer>>,
}

impl std::fmt::Debug for DiagramObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramObjectRegistry")
            .field("objects", &self.objects.len())
            .field("effects", &self.effects.len())
            .field("containers", &self.containers.len())
            .finish()
    }
}

impl DiagramObjectRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 跟踪图形
    pub fn track_object(&mut self, shape: Rc<dyn AnimatableShape>) {
        self.objects.push(shape);
    }

    /// 跟踪效果
    pub fn track_effect(&mut self, effect: Rc<dyn Effect>) {
        self.effects.push(effect);
    }

    /// 跟踪嵌套容器
    pub fn track_container(&mut self, container: Rc<dyn GraphContainer>) {
        self.containers.push(container);
    }

    /// 全部图形
    pub fn objects(&self) -> &[Rc<dyn AnimatableShape>] {
        &self.objects
    }

    /// 全部效果
    pub fn effects(&self) -> &[Rc<dyn Effect>] {
        &self.effects
    }

    /// 图形数量
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// 是否没有任何被跟踪的对象
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.effects.is_empty() && self.containers.is_empty()
    }

    /// 隐藏全部图形
    pub fn hide_all(&self) {
        for shape in &self.objects {
            shape.hide();
        }
    }

    /// 显示全部图形
    pub fn show_all(&self) {
        for shape in &self.objects {
            shape.show();
        }
    }

    /// 取消全部效果的定时器
    pub fn stop_animation(&self) {
        for effect in &self.effects {
            effect.stop();
        }
    }

    /// 跳过动画，直接显示全部图形的最终状态
    pub fn show_all_instantly(&self) {
        self.stop_animation();
        for shape in &self.objects {
            shape.render_end_state();
            shape.show();
        }
    }

    /// 清空
    ///
    /// 停止全部效果，移除（不支持移除时隐藏）每个图形，销毁嵌套容器。
    pub fn clear_all(&mut self) {
        debug!(
            objects = self.objects.len(),
            effects = self.effects.len(),
            containers = self.containers.len(),
            "清空图表对象"
        );
        for effect in self.effects.drain(..) {
            effect.dispose();
        }
        for shape in self.objects.drain(..) {
            if !shape.remove() {
                shape.hide();
            }
        }
        for container in self.containers.drain(..) {
            container.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::effect::{PlayOptions, ShapeDrawEffect};
    use crate::headless::{HeadlessGraph, HeadlessShape, Journal, ShapeState};
    use crate::shape::Reveal;
    use crate::timer::VirtualScheduler;

    /// 不支持移除的图形
    struct HideOnly {
        inner: Rc<HeadlessShape>,
    }

    impl AnimatableShape for HideOnly {
        fn show(&self) {
            self.inner.show();
        }
        fn hide(&self) {
            self.inner.hide();
        }
        fn render_end_state(&self) {
            self.inner.render_end_state();
        }
        fn opacity(&self) -> f64 {
            self.inner.opacity()
        }
        fn set_opacity(&self, opacity: f64) {
            self.inner.set_opacity(opacity);
        }
        fn render_with_animation(&self, reveal: Reveal) {
            self.inner.render_with_animation(reveal);
        }
    }

    #[test]
    fn test_clear_all_removes_or_hides() {
        let journal = Journal::default();
        let removable = HeadlessShape::new("A", journal.clone());
        let hide_only = HeadlessShape::new("B", journal.clone());
        let graph = HeadlessGraph::new("g", journal.clone());

        let mut registry = DiagramObjectRegistry::new();
        registry.track_object(removable.clone());
        registry.track_object(Rc::new(HideOnly {
            inner: hide_only.clone(),
        }));
        registry.track_container(graph.clone());
        registry.show_all();

        registry.clear_all();
        assert!(registry.is_empty());
        assert!(removable.state().removed);
        assert!(!hide_only.state().removed);
        assert!(!hide_only.state().visible);
        assert!(graph.is_destroyed());
    }

    #[test]
    fn test_clear_all_cancels_effect_timers() {
        let scheduler = VirtualScheduler::shared();
        let shape = HeadlessShape::new("A", Journal::default());
        let effect = Rc::new(ShapeDrawEffect::new(shape.clone(), scheduler.clone()));
        effect.play(PlayOptions::seconds(1.0));

        let mut registry = DiagramObjectRegistry::new();
        registry.track_object(shape.clone());
        registry.track_effect(effect);
        scheduler.advance(Duration::from_millis(100));
        let before: ShapeState = shape.state();

        registry.clear_all();
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(Duration::from_secs(2));
        assert_eq!(shape.state().reveal, before.reveal);
    }

    #[test]
    fn test_show_all_instantly() {
        let scheduler = VirtualScheduler::shared();
        let journal = Journal::default();
        let a = HeadlessShape::new("A", journal.clone());
        let b = HeadlessShape::new("B", journal.clone());
        let effect = Rc::new(ShapeDrawEffect::new(a.clone(), scheduler.clone()));
        effect.play(PlayOptions::seconds(1.0));

        let mut registry = DiagramObjectRegistry::new();
        registry.track_object(a.clone());
        registry.track_object(b.clone());
        registry.track_effect(effect);

        registry.show_all_instantly();
        assert_eq!(scheduler.pending(), 0);
        for shape in [&a, &b] {
            let state = shape.state();
            assert!(state.visible && state.end_state);
            assert_eq!(state.reveal, 1.0);
        }

        registry.hide_all();
        assert!(!a.state().visible);
        assert_eq!(registry.len(), 2);
    }
}
