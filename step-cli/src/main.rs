//! # stepdraw
//!
//! 分步图表的无头播放器：加载 JSON 步骤脚本，在虚拟时钟上驱动
//! `StepSequencer`，输出图形与视口的事件轨迹。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p step-cli -- play step-cli/demos/triangle.json
//! cargo run -p step-cli -- play step-cli/demos/triangle.json --steps 2
//! cargo run -p step-cli -- goto step-cli/demos/triangle.json 3 --json
//! cargo run -p step-cli -- check step-cli/demos/*.json
//! cargo run -p step-cli -- --config stepdraw.json -v play demo.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use step_runtime::headless::{HeadlessBuilder, Journal, RecordingViewport};
use step_runtime::{Canvas, EngineConfig, StepScript, StepSequencer, VirtualScheduler};
use tracing::{Level, debug, info};

/// 单次结算允许触发的最大定时器数
const MAX_TIMER_FIRES: usize = 100_000;

#[derive(Parser)]
#[command(name = "stepdraw")]
#[command(about = "分步图表无头播放器 - 在虚拟时钟上播放 JSON 步骤脚本")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 引擎配置文件（缺省使用默认配置）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 逐步播放脚本
    Play {
        /// 脚本路径
        script: PathBuf,

        /// 播放的步骤数（缺省播放全部）
        #[arg(short, long)]
        steps: Option<usize>,

        /// 以 JSON 数组输出轨迹
        #[arg(long)]
        json: bool,
    },

    /// 跳转到指定步骤（之前的步骤瞬间呈现）
    Goto {
        /// 脚本路径
        script: PathBuf,

        /// 目标步骤索引
        #[arg(allow_negative_numbers = true)]
        step: isize,

        /// 以 JSON 数组输出轨迹
        #[arg(long)]
        json: bool,
    },

    /// 静态检查脚本
    Check {
        /// 脚本路径
        #[arg(required = true)]
        scripts: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            script,
            steps,
            json,
        } => {
            let mut player = Player::new(&script, config)?;
            let total = player.total;
            for _ in 0..steps.unwrap_or(total) {
                player.seq.next();
                player.settle();
                if player.seq.is_exhausted() {
                    break;
                }
            }
            player.print(json)?;
        }
        Commands::Goto { script, step, json } => {
            let mut player = Player::new(&script, config)?;
            player.seq.go_to(step);
            player.settle();
            player.print(json)?;
        }
        Commands::Check { scripts } => return check(&scripts),
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let config = EngineConfig::load(path);
    config
        .validate()
        .with_context(|| format!("配置文件无效: {}", path.display()))?;
    Ok(config)
}

/// 无头播放环境
struct Player {
    scheduler: Rc<VirtualScheduler>,
    journal: Journal,
    seq: StepSequencer,
    total: usize,
}

impl Player {
    fn new(path: &Path, config: EngineConfig) -> Result<Self> {
        let script =
            StepScript::load(path).with_context(|| format!("无法加载脚本: {}", path.display()))?;
        let diagnostics = script.validate();
        if diagnostics.has_errors() {
            for d in &diagnostics.diagnostics {
                eprintln!("{d}");
            }
            bail!("脚本存在 {} 个错误", diagnostics.error_count());
        }
        info!(title = %script.title, steps = script.len(), "脚本加载成功");

        let journal = Journal::default();
        let scheduler = VirtualScheduler::shared();
        let canvas = Canvas::new(
            HeadlessBuilder::new(journal.clone()),
            RecordingViewport::new(journal.clone()),
            scheduler.clone(),
            config,
        );
        let total = script.len();
        Ok(Self {
            scheduler,
            journal,
            seq: StepSequencer::new(canvas, script.into_factory()),
            total,
        })
    }

    /// 触发全部待执行的定时器，让本步骤的动画跑完
    fn settle(&self) {
        let fired = self.scheduler.run_until_idle(MAX_TIMER_FIRES);
        debug!(fired, step = self.seq.current_step(), "动画结算");
    }

    fn print(&self, json: bool) -> Result<()> {
        let entries = self.journal.entries();
        if json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            for entry in &entries {
                println!("{entry}");
            }
        }
        eprintln!(
            "当前步骤: {} / {}",
            self.seq.current_step(),
            self.total as isize - 1
        );
        Ok(())
    }
}

fn check(paths: &[PathBuf]) -> Result<ExitCode> {
    let mut errors = 0;
    for path in paths {
        let script = match StepScript::load(path) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("[ERROR] {}: {e}", path.display());
                errors += 1;
                continue;
            }
        };
        let result = script.validate();
        for d in &result.diagnostics {
            println!("{d}");
        }
        errors += result.error_count();
        if result.is_empty() {
            println!("✅ {}", path.display());
        }
    }

    if errors > 0 {
        eprintln!("❌ 共 {errors} 个错误");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
