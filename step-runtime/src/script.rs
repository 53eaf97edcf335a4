//! # Script 模块
//!
//! JSON 步骤脚本：以有序的命令列表描述一个图表的全部步骤。
//!
//! ## 格式
//!
//! ```json
//! {
//!   "title": "三角形",
//!   "steps": [
//!     { "label": "顶点", "commands": [
//!       { "op": "shape", "id": "A", "shape": { "kind": "point", "at": { "x": 0, "y": 0 } } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! 脚本通过 [`StepScript::into_factory`] 转为生成器工厂，交给
//! [`StepSequencer`](crate::sequencer::StepSequencer) 驱动。每次重放都创建新的
//! 生成器，命令里的 `id` 在生成器内部映射到本次创建的图形。

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use kurbo::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::diagnostic::{Diagnostic, DiagnosticResult};
use crate::error::ScriptError;
use crate::sequencer::{GeneratorFactory, StepGenerator, StepPoll};
use crate::shape::{
    AnimatableShape, IntoShape, MathTextComponent, RectStyle, ShapeSpec, Style, TextItem,
    VectorShape,
};
use crate::timer::MAX_DURATION_SECS;

fn default_color() -> String {
    "black".to_string()
}

/// 步骤脚本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepScript {
    /// 标题
    pub title: String,
    /// 步骤列表
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

/// 单个步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// 说明文字
    #[serde(default)]
    pub label: Option<String>,
    /// 按顺序执行的绘制命令
    #[serde(default)]
    pub commands: Vec<DrawCommand>,
}

/// 绘制命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// 通用图形
    Shape {
        #[serde(default)]
        id: Option<String>,
        shape: ShapeSpec,
        #[serde(default)]
        style: Style,
    },
    /// 向量
    Vector {
        #[serde(default)]
        id: Option<String>,
        start: Point,
        end: Point,
        #[serde(default)]
        dashed: bool,
        #[serde(default)]
        style: Style,
    },
    /// 反向向量
    ReverseVector {
        #[serde(default)]
        id: Option<String>,
        of: String,
        #[serde(default = "default_color")]
        color: String,
    },
    /// 平移向量
    MoveVector {
        #[serde(default)]
        id: Option<String>,
        start: Point,
        end: Point,
        to: Point,
        #[serde(default)]
        style: Style,
    },
    /// 书写数学文本
    Write {
        #[serde(default)]
        id: Option<String>,
        text: String,
        at: Point,
        #[serde(default = "default_color")]
        color: String,
    },
    /// 文本片段注释框
    TextRect {
        text: String,
        #[serde(default)]
        index: usize,
        #[serde(default)]
        style: RectStyle,
    },
    /// 文本片段移动
    MoveText {
        text: String,
        #[serde(default)]
        index: usize,
        to: Point,
    },
    /// 放大
    ZoomIn {
        at: Point,
        #[serde(default)]
        scale: Option<f64>,
        #[serde(default)]
        duration: Option<f64>,
    },
    /// 缩小
    ZoomOut {
        #[serde(default)]
        duration: Option<f64>,
    },
    /// 平移
    PanTo {
        to: Point,
        #[serde(default)]
        duration: Option<f64>,
    },
    /// 聚焦
    Focus {
        keep: Vec<String>,
        #[serde(default)]
        dim: Option<f64>,
    },
    /// 取消聚焦
    Restore,
}

impl DrawCommand {
    /// 命令名
    pub fn op(&self) -> &'static str {
        match self {
            DrawCommand::Shape { .. } => "shape",
            DrawCommand::Vector { .. } => "vector",
            DrawCommand::ReverseVector { .. } => "reverse_vector",
            DrawCommand::MoveVector { .. } => "move_vector",
            DrawCommand::Write { .. } => "write",
            DrawCommand::TextRect { .. } => "text_rect",
            DrawCommand::MoveText { .. } => "move_text",
            DrawCommand::ZoomIn { .. } => "zoom_in",
            DrawCommand::ZoomOut { .. } => "zoom_out",
            DrawCommand::PanTo { .. } => "pan_to",
            DrawCommand::Focus { .. } => "focus",
            DrawCommand::Restore => "restore",
        }
    }

    /// 命令定义的对象 ID
    fn defines(&self) -> Option<(&str, Defined)> {
        match self {
            DrawCommand::Shape { id, .. } => id.as_deref().map(|id| (id, Defined::Shape)),
            DrawCommand::Vector { id, .. }
            | DrawCommand::ReverseVector { id, .. }
            | DrawCommand::MoveVector { id, .. } => id.as_deref().map(|id| (id, Defined::Vector)),
            DrawCommand::Write { id, text, .. } => id
                .as_deref()
                .map(|id| (id, Defined::Text(text.chars().count()))),
            _ => None,
        }
    }
}

impl StepScript {
    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        let script: StepScript =
            serde_json::from_str(text).map_err(|e| ScriptError::Parse(e.to_string()))?;
        if script.steps.is_empty() {
            return Err(ScriptError::Empty {
                title: script.title,
            });
        }
        Ok(script)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ScriptError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// 步骤数
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// 是否没有步骤
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 转为生成器工厂
    pub fn into_factory(self) -> GeneratorFactory {
        let script = Rc::new(self);
        Box::new(move || {
            Box::new(ScriptSteps {
                script: script.clone(),
                index: 0,
                handles: HashMap::new(),
            })
        })
    }

    /// 静态检查
    pub fn validate(&self) -> DiagnosticResult {
        let mut result = DiagnosticResult::new();
        let id = self.title.as_str();
        let mut defined: HashMap<&str, Defined> = HashMap::new();

        if self.steps.is_empty() {
            result.push(Diagnostic::error(id, "脚本没有任何步骤"));
        }

        for (step, body) in self.steps.iter().enumerate() {
            if body.commands.is_empty() {
                result.push(Diagnostic::warn(id, "步骤没有任何命令").at_step(step));
            }

            for command in &body.commands {
                check_command(
                    command,
                    &defined,
                    &mut |d: Diagnostic| result.push(d.at_step(step)),
                    id,
                );
                if let Some((name, kind)) = command.defines() {
                    if defined.insert(name, kind).is_some() {
                        result.push(
                            Diagnostic::warn(id, format!("对象 '{name}' 被重复定义，后者覆盖前者"))
                                .at_step(step),
                        );
                    }
                }
            }
        }

        result
    }
}

/// 脚本中已定义对象的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Defined {
    Shape,
    Vector,
    /// 数学文本及其片段数
    Text(usize),
}

fn check_duration(report: &mut dyn FnMut(Diagnostic), id: &str, op: &str, value: Option<f64>) {
    if let Some(value) = value {
        if !value.is_finite() || value < 0.0 {
            report(Diagnostic::error(
                id,
                format!("{op} 的时长必须是非负数，当前值: {value}"),
            ));
        } else if value > MAX_DURATION_SECS {
            report(Diagnostic::error(
                id,
                format!("{op} 的时长不能超过 {MAX_DURATION_SECS} 秒，当前值: {value}"),
            ));
        }
    }
}

fn check_command(
    command: &DrawCommand,
    defined: &HashMap<&str, Defined>,
    report: &mut dyn FnMut(Diagnostic),
    id: &str,
) {
    match command {
        DrawCommand::ZoomIn {
            scale, duration: d, ..
        } => {
            check_duration(report, id, "zoom_in", *d);
            if let Some(scale) = scale {
                if !(scale.is_finite() && *scale > 0.0) {
                    report(Diagnostic::error(
                        id,
                        format!("zoom_in 的缩放比例必须大于 0，当前值: {scale}"),
                    ));
                }
            }
        }
        DrawCommand::ZoomOut { duration: d } => check_duration(report, id, "zoom_out", *d),
        DrawCommand::PanTo { duration: d, .. } => check_duration(report, id, "pan_to", *d),
        DrawCommand::ReverseVector { of, .. } => match defined.get(of.as_str()) {
            Some(Defined::Vector) => {}
            Some(_) => report(Diagnostic::error(id, format!("'{of}' 不是向量"))),
            None => report(Diagnostic::error(id, format!("未知对象 '{of}'"))),
        },
        DrawCommand::TextRect { text, index, .. } | DrawCommand::MoveText { text, index, .. } => {
            match defined.get(text.as_str()) {
                Some(Defined::Text(len)) if index < len => {}
                Some(Defined::Text(len)) => report(Diagnostic::error(
                    id,
                    format!("文本 '{text}' 只有 {len} 个片段，索引 {index} 越界"),
                )),
                Some(_) => report(Diagnostic::error(id, format!("'{text}' 不是数学文本"))),
                None => report(Diagnostic::error(id, format!("未知对象 '{text}'"))),
            }
        }
        DrawCommand::Focus { keep, dim } => {
            for name in keep {
                if !defined.contains_key(name.as_str()) {
                    report(Diagnostic::error(id, format!("聚焦目标 '{name}' 未定义")));
                }
            }
            if keep.is_empty() {
                report(Diagnostic::info(id, "聚焦目标为空，所有对象都会变暗"));
            }
            if let Some(dim) = dim {
                if !(0.0..=1.0).contains(dim) {
                    report(Diagnostic::error(
                        id,
                        format!("聚焦不透明度必须在 0.0 - 1.0 之间，当前值: {dim}"),
                    ));
                }
            }
        }
        _ => {}
    }
}

/// 脚本命令创建的对象
#[derive(Clone)]
enum Handle {
    Shape(Rc<dyn AnimatableShape>),
    Vector(Rc<dyn VectorShape>),
    Text(Rc<dyn MathTextComponent>),
}

impl Handle {
    fn as_shape(&self) -> Rc<dyn AnimatableShape> {
        match self {
            Handle::Shape(shape) => shape.clone(),
            Handle::Vector(vector) => vector.clone().into_shape(),
            Handle::Text(text) => text.clone().into_shape(),
        }
    }
}

/// 脚本的步骤生成器
struct ScriptSteps {
    script: Rc<StepScript>,
    index: usize,
    handles: HashMap<String, Handle>,
}

impl ScriptSteps {
    fn remember(&mut self, id: &Option<String>, handle: Option<Handle>) {
        if let (Some(id), Some(handle)) = (id, handle) {
            self.handles.insert(id.clone(), handle);
        }
    }

    fn vector(&self, id: &str) -> Option<Rc<dyn VectorShape>> {
        match self.handles.get(id) {
            Some(Handle::Vector(vector)) => Some(vector.clone()),
            _ => {
                warn!(id, "脚本引用的向量不存在，跳过");
                None
            }
        }
    }

    fn text_item(&self, id: &str, index: usize) -> Option<Rc<dyn TextItem>> {
        let item = match self.handles.get(id) {
            Some(Handle::Text(text)) => text.text_items().get(index).cloned(),
            _ => None,
        };
        if item.is_none() {
            warn!(id, index, "脚本引用的文本片段不存在，跳过");
        }
        item
    }

    fn apply(&mut self, canvas: &mut Canvas, command: &DrawCommand) {
        match command {
            DrawCommand::Shape { id, shape, style } => {
                let handle = canvas.shape(shape.clone(), style.clone()).map(Handle::Shape);
                self.remember(id, handle);
            }
            DrawCommand::Vector {
                id,
                start,
                end,
                dashed,
                style,
            } => {
                let mut style = style.clone();
                if *dashed && style.dash_pattern.is_none() {
                    style.dash_pattern = Some(canvas.config().vector.dash_pattern.clone());
                }
                let handle = canvas.vector(*start, *end, style).map(Handle::Vector);
                self.remember(id, handle);
            }
            DrawCommand::ReverseVector { id, of, color } => {
                let handle = self
                    .vector(of)
                    .and_then(|original| canvas.reverse_vector(&original, color))
                    .map(Handle::Vector);
                self.remember(id, handle);
            }
            DrawCommand::MoveVector {
                id,
                start,
                end,
                to,
                style,
            } => {
                let handle = canvas
                    .move_vector(*start, *end, *to, style.clone())
                    .map(Handle::Vector);
                self.remember(id, handle);
            }
            DrawCommand::Write {
                id,
                text,
                at,
                color,
            } => {
                let handle = canvas.write_math_text(text, *at, color).map(Handle::Text);
                self.remember(id, handle);
            }
            DrawCommand::TextRect { text, index, style } => {
                if let Some(item) = self.text_item(text, *index) {
                    canvas.text_rect(item, style.clone());
                }
            }
            DrawCommand::MoveText { text, index, to } => {
                if let Some(item) = self.text_item(text, *index) {
                    canvas.move_text(item, *to);
                }
            }
            DrawCommand::ZoomIn {
                at,
                scale,
                duration,
            } => canvas.zoom_in(*at, *scale, *duration),
            DrawCommand::ZoomOut { duration } => canvas.zoom_out(*duration),
            DrawCommand::PanTo { to, duration } => canvas.pan_to(*to, *duration),
            DrawCommand::Focus { keep, dim } => {
                let keep: Vec<Rc<dyn AnimatableShape>> = keep
                    .iter()
                    .filter_map(|name| match self.handles.get(name) {
                        Some(handle) => Some(handle.as_shape()),
                        None => {
                            warn!(id = name.as_str(), "聚焦目标不存在，忽略");
                            None
                        }
                    })
                    .collect();
                let dim = dim.unwrap_or(canvas.config().focus.dim_opacity);
                canvas.focus_with(&keep, dim);
            }
            DrawCommand::Restore => canvas.restore(),
        }
    }
}

impl StepGenerator for ScriptSteps {
    fn next_step(&mut self, canvas: &mut Canvas) -> StepPoll {
        let script = self.script.clone();
        let Some(step) = script.steps.get(self.index) else {
            return StepPoll::Done;
        };
        debug!(
            step = self.index,
            label = step.label.as_deref().unwrap_or(""),
            commands = step.commands.len(),
            "执行脚本步骤"
        );
        for command in &step.commands {
            self.apply(canvas, command);
        }
        self.index += 1;
        StepPoll::Yielded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::diagnostic::DiagnosticLevel;
    use crate::headless::{HeadlessBuilder, Journal, RecordingViewport};
    use crate::sequencer::StepSequencer;
    use crate::timer::VirtualScheduler;

    const TRIANGLE: &str = r#"{
        "title": "triangle",
        "steps": [
            { "label": "vertices", "commands": [
                { "op": "shape", "id": "A", "shape": { "kind": "point", "at": { "x": 0, "y": 0 } } },
                { "op": "shape", "id": "B", "shape": { "kind": "point", "at": { "x": 4, "y": 0 } } }
            ] },
            { "commands": [
                { "op": "vector", "id": "v", "start": { "x": 0, "y": 0 }, "end": { "x": 4, "y": 0 } },
                { "op": "write", "id": "t", "text": "AB", "at": { "x": 2, "y": 1 } }
            ] },
            { "commands": [
                { "op": "reverse_vector", "of": "v" },
                { "op": "text_rect", "text": "t", "index": 1 },
                { "op": "focus", "keep": ["A", "v"], "dim": 0.2 }
            ] }
        ]
    }"#;

    fn sequencer(script: StepScript) -> (StepSequencer, Rc<HeadlessBuilder>) {
        let journal = Journal::default();
        let builder = HeadlessBuilder::new(journal.clone());
        let canvas = Canvas::new(
            builder.clone(),
            RecordingViewport::new(journal),
            VirtualScheduler::shared(),
            EngineConfig::default(),
        );
        (StepSequencer::new(canvas, script.into_factory()), builder)
    }

    #[test]
    fn test_parse_and_validate() {
        let script = StepScript::from_json(TRIANGLE).unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(script.steps[0].label.as_deref(), Some("vertices"));
        assert!(matches!(
            script.steps[2].commands[0],
            DrawCommand::ReverseVector { ref color, .. } if color == "black"
        ));

        let result = script.validate();
        assert!(result.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_empty_script_rejected() {
        let err = StepScript::from_json(r#"{"title":"x","steps":[]}"#).unwrap_err();
        assert_eq!(err, ScriptError::Empty { title: "x".into() });
        assert!(matches!(
            StepScript::from_json("{"),
            Err(ScriptError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_reports_problems() {
        let script = StepScript::from_json(
            r#"{
            "title": "bad",
            "steps": [
                { "commands": [] },
                { "commands": [
                    { "op": "zoom_in", "at": { "x": 0, "y": 0 }, "duration": -1 },
                    { "op": "focus", "keep": ["ghost"], "dim": 1.5 },
                    { "op": "write", "id": "t", "text": "x", "at": { "x": 0, "y": 0 } },
                    { "op": "move_text", "text": "t", "index": 3, "to": { "x": 1, "y": 1 } },
                    { "op": "reverse_vector", "of": "t" }
                ] }
            ]
        }"#,
        )
        .unwrap();

        let result = script.validate();
        assert_eq!(result.warn_count(), 1);
        assert_eq!(result.error_count(), 5);
        let errors = result.filter_by_level(DiagnosticLevel::Error);
        assert!(errors.iter().all(|d| d.step == Some(1)));
        assert!(errors.iter().any(|d| d.message.contains("ghost")));
        assert!(errors.iter().any(|d| d.message.contains("越界")));
    }

    #[test]
    fn test_huge_duration_rejected_and_playable() {
        let script = StepScript::from_json(
            r#"{
            "title": "far",
            "steps": [
                { "commands": [
                    { "op": "pan_to", "to": { "x": 1, "y": 1 }, "duration": 1e20 }
                ] }
            ]
        }"#,
        )
        .unwrap();

        let result = script.validate();
        assert_eq!(result.error_count(), 1);
        assert!(result.diagnostics.iter().any(|d| d.message.contains("不能超过")));

        // 未经检查的脚本照样可以播放，超大时长被截断而非崩溃
        let (mut seq, _) = sequencer(script);
        seq.next();
        assert_eq!(seq.current_step(), 0);
        seq.go_to(0);
        assert_eq!(seq.current_step(), 0);
    }

    #[test]
    fn test_script_drives_sequencer() {
        let script = StepScript::from_json(TRIANGLE).unwrap();
        let (mut seq, builder) = sequencer(script);

        seq.go_to(2);
        assert_eq!(seq.current_step(), 2);
        // 两个点 + 向量 + 文本 + 反向向量 + 注释框
        assert_eq!(seq.canvas().objects().len(), 6);
        assert!(seq.canvas().is_focused());

        let built = builder.built();
        assert_eq!(built[0].state().opacity, 1.0);
        assert_eq!(builder.layer().created().len(), 1);

        seq.go_to(2);
        assert_eq!(seq.canvas().objects().len(), 6);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triangle.json");
        std::fs::write(&path, TRIANGLE).unwrap();
        assert_eq!(StepScript::load(&path).unwrap().title, "triangle");

        let missing = StepScript::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ScriptError::Io { .. })));
    }
}
