//! # 导航集成测试
//!
//! StepSequencer → Canvas → 效果 → 无头图形 的完整链路，
//! 全部运行在虚拟时钟上。

use std::rc::Rc;
use std::time::Duration;

use kurbo::Point;
use step_runtime::headless::{HeadlessBuilder, Journal, RecordingViewport, ShapeState};
use step_runtime::{Canvas, EngineConfig, StepList, StepSequencer, VirtualScheduler};

struct Harness {
    scheduler: Rc<VirtualScheduler>,
    builder: Rc<HeadlessBuilder>,
    journal: Journal,
    seq: StepSequencer,
}

impl Harness {
    fn new(steps: StepList) -> Self {
        let journal = Journal::default();
        let scheduler = VirtualScheduler::shared();
        let builder = HeadlessBuilder::new(journal.clone());
        let canvas = Canvas::new(
            builder.clone(),
            RecordingViewport::new(journal.clone()),
            scheduler.clone(),
            EngineConfig::default(),
        );
        Self {
            scheduler,
            builder,
            journal,
            seq: StepSequencer::new(canvas, steps.into_factory()),
        }
    }

    fn settle(&self) {
        self.scheduler.advance(Duration::from_secs(5));
    }

    fn trace(&self) -> String {
        self.journal.drain().join("\n")
    }

    fn state(&self, name: &str) -> ShapeState {
        self.builder
            .find(name)
            .map(|shape| shape.state())
            .unwrap_or_default()
    }
}

/// 三个步骤，依次创建 A、B、C 三个点
fn abc() -> StepList {
    StepList::new()
        .step(|canvas: &mut Canvas| {
            canvas.point(Point::new(0.0, 0.0), "black");
        })
        .step(|canvas: &mut Canvas| {
            canvas.point(Point::new(4.0, 0.0), "black");
        })
        .step(|canvas: &mut Canvas| {
            canvas.point(Point::new(2.0, 3.0), "black");
        })
}

const NAMES: [&str; 3] = ["point(0,0)", "point(4,0)", "point(2,3)"];

#[test]
fn test_abc_scenario() {
    let mut h = Harness::new(abc());

    h.seq.next();
    h.seq.next();
    h.seq.next();
    assert_eq!(h.seq.current_step(), 2);
    insta::assert_snapshot!(h.trace(), @r"
    point(0,0):animate
    point(4,0):animate
    point(2,3):animate
    ");

    h.settle();
    h.seq.reset_navigation();
    insta::assert_snapshot!(h.trace(), @r"
    point(0,0):remove
    point(4,0):remove
    point(2,3):remove
    ");

    h.seq.go_to(2);
    assert_eq!(h.seq.current_step(), 2);
    insta::assert_snapshot!(h.trace(), @r"
    point(0,0):end_state
    point(4,0):end_state
    point(2,3):animate
    ");

    h.settle();
    for name in NAMES {
        let state = h.state(name);
        assert!(state.visible, "{name} 应该可见");
        assert_eq!(state.reveal, 1.0);
    }
}

#[test]
fn test_next_counts_up_to_step_total() {
    for n in 0..6 {
        let mut h = Harness::new(abc());
        for _ in 0..n {
            h.seq.next();
        }
        let expected = n.min(3) as isize - 1;
        assert_eq!(h.seq.current_step(), expected, "next() x{n}");
    }
}

#[test]
fn test_go_to_never_animates_earlier_steps() {
    for k in 0..3 {
        let mut h = Harness::new(abc());
        h.seq.go_to(k as isize);

        let animated: Vec<String> = h
            .journal
            .entries()
            .into_iter()
            .filter(|entry| entry.ends_with(":animate"))
            .collect();
        assert_eq!(animated, vec![format!("{}:animate", NAMES[k])]);
        assert_eq!(h.seq.current_step(), k as isize);
    }
}

#[test]
fn test_go_to_is_idempotent() {
    let mut h = Harness::new(abc());

    h.seq.go_to(1);
    h.settle();
    let first: Vec<ShapeState> = NAMES.iter().map(|name| h.state(name)).collect();
    let objects = h.seq.canvas().objects().len();

    h.seq.go_to(1);
    h.settle();
    let second: Vec<ShapeState> = NAMES.iter().map(|name| h.state(name)).collect();

    assert_eq!(first, second);
    assert_eq!(h.seq.canvas().objects().len(), objects);
    assert_eq!(h.seq.current_step(), 1);
}

#[test]
fn test_previous_is_noop_at_start() {
    let mut h = Harness::new(abc());

    h.seq.previous();
    assert_eq!(h.seq.current_step(), -1);
    assert!(h.journal.is_empty());

    h.seq.next();
    h.journal.drain();
    h.seq.previous();
    assert_eq!(h.seq.current_step(), 0);
    assert!(h.journal.is_empty());
}

#[test]
fn test_previous_replays_to_earlier_step() {
    let mut h = Harness::new(abc());
    h.seq.go_to(2);
    h.journal.drain();

    h.seq.previous();
    assert_eq!(h.seq.current_step(), 1);
    let trace = h.trace();
    assert!(trace.contains("point(0,0):end_state"));
    assert!(trace.contains("point(4,0):animate"));
    assert!(!trace.contains("point(2,3):animate"));
    assert_eq!(h.seq.canvas().objects().len(), 2);
}

#[test]
fn test_replay_snaps_text_and_viewport() {
    let steps = StepList::new()
        .step(|canvas: &mut Canvas| {
            canvas.zoom_in(Point::new(1.0, 1.0), None, None);
            canvas.write_math_text("ab", Point::new(0.0, 0.0), "black");
        })
        .step(|canvas: &mut Canvas| {
            canvas.pan_to(Point::new(5.0, 5.0), None);
        });
    let mut h = Harness::new(steps);

    h.seq.go_to(1);
    insta::assert_snapshot!(h.trace(), @r"
    viewport:zoom_in:instant
    text(ab):end_state
    viewport:pan_to:animate
    ");
    assert_eq!(
        h.seq.canvas().pen().get(),
        Some(Point::new(20.0, 16.0))
    );
}

#[test]
fn test_stop_animation_freezes_progress() {
    let mut h = Harness::new(abc());
    h.seq.next();
    h.scheduler.advance(Duration::from_millis(200));
    let before = h.state(NAMES[0]);

    h.seq.stop_animation();
    assert_eq!(h.scheduler.pending(), 0);
    h.settle();
    assert_eq!(h.state(NAMES[0]).reveal, before.reveal);
}

#[test]
fn test_destroy_before_and_after_use() {
    let mut h = Harness::new(abc());
    h.seq.destroy();
    assert_eq!(h.seq.current_step(), -1);

    h.seq.go_to(1);
    h.seq.destroy();
    h.seq.destroy();
    assert_eq!(h.seq.current_step(), -1);
    assert!(h.seq.canvas().registry().is_empty());
    assert_eq!(h.scheduler.pending(), 0);

    h.seq.next();
    assert_eq!(h.seq.current_step(), 0);
}
