//! # Step Runtime
//!
//! 分步图表动画引擎的核心库。
//!
//! ## 架构概述
//!
//! 一个图表由若干**步骤**组成，每个步骤在绘制面上创建图形并播放效果。
//! 引擎只决定何时以及以何种方式（动画 / 瞬间）呈现图形，渲染本身由宿主
//! 通过 [`shape`] 与 [`viewport`] 中的 trait 提供。
//!
//! ```text
//! StepSequencer ──next/go_to──► StepGenerator ──步骤体──► Canvas
//!                                                          │ animate_mode?
//!                                          play() ◄────────┤
//!                                   to_end_state() ◄───────┘
//!                                                          │
//!                                        DiagramObjectRegistry（清空 / 销毁）
//! ```
//!
//! 随机跳转通过"瞬间重放前 k 步、动画执行第 k 步"实现，
//! 所以 `go_to(k)` 从不为 k 之前的步骤播放动画。
//!
//! ## 执行模型
//!
//! 单线程协作式调度：效果通过 [`Scheduler`] 注册定时器，
//! 完成回调在之后的定时器中触发。测试与命令行使用 [`VirtualScheduler`]。
//!
//! ## 模块结构
//!
//! - [`effect`]：效果契约与各个具体效果
//! - [`sequencer`]：步骤导航
//! - [`canvas`]：绘制面与模式逻辑
//! - [`registry`]：对象注册表
//! - [`script`]：JSON 步骤脚本与静态检查
//! - [`timer`] / [`tween`] / [`easing`]：定时器、补间与缓动
//! - [`headless`]：外部接口的无头实现
//! - [`config`] / [`error`]：配置与错误类型

pub mod canvas;
pub mod config;
pub mod diagnostic;
pub mod easing;
pub mod effect;
pub mod error;
pub mod headless;
pub mod pen;
pub mod registry;
pub mod script;
pub mod sequencer;
pub mod shape;
pub mod timer;
pub mod tween;
pub mod viewport;

// 重导出核心类型
pub use canvas::Canvas;
pub use config::{EngineConfig, FocusConfig, TimingConfig, VectorConfig};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult};
pub use easing::Easing;
pub use effect::{
    Effect, EffectCore, EffectId, EffectParent, FocusEffect, MathTextRectEffect, MoveVectorEffect,
    PanEffect, PlayContext, PlayOptions, ReverseVectorEffect, ShapeDrawEffect, TextMoveEffect,
    WriteEffect, ZoomEffect,
};
pub use error::{ConfigError, EffectError, ScriptError, StepError, StepResult};
pub use pen::PenCursor;
pub use registry::DiagramObjectRegistry;
pub use script::{DrawCommand, ScriptStep, StepScript};
pub use sequencer::{GeneratorFactory, StepGenerator, StepList, StepPoll, StepSequencer};
pub use shape::{
    AnimatableShape, AnnotationLayer, GraphContainer, IntoShape, MathTextComponent, MovableShape,
    RectStyle, ShapeBuilder, ShapeSpec, Style, TextItem, VectorShape,
};
pub use timer::{Scheduler, SharedScheduler, TimerHandle, TimerSet, VirtualScheduler};
pub use tween::Tween;
pub use viewport::{ViewportController, ViewportRequest};
