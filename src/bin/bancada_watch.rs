//! bancada-watch - counter-top monitor
//!
//! This binary:
//! 1. Loads configuration (defaults, `BANCADA_CONFIG`, environment, flags)
//! 2. Checks that every model asset exists
//! 3. Resolves the target class and loads the detector
//! 4. Opens the video and runs the frame loop until the stream ends or the
//!    user quits
//!
//! Startup failures exit with distinct codes: 2 missing assets, 3 classes or
//! model, 4 video. A failure while running exits with 1.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bancada_watch::{
    estimator_for, load_backend, open_display, postprocessor_for, AssetReport, BackendKind,
    ClassNames, FileConfig, FileSource, Monitor, MonitorConfig, RunEnd,
};

#[path = "../ui.rs"]
mod ui;

const EXIT_RUNTIME: u8 = 1;
const EXIT_ASSETS: u8 = 2;
const EXIT_MODEL: u8 = 3;
const EXIT_VIDEO: u8 = 4;

#[derive(Parser, Debug)]
#[command(
    name = "bancada-watch",
    about = "Flag when the target animal is on the monitored surface"
)]
struct Args {
    /// Video file to analyse (overrides BANCADA_VIDEO)
    #[arg(long, value_name = "PATH")]
    video: Option<String>,

    /// Detector backend (stub|darknet|tract)
    #[arg(long, value_name = "NAME")]
    backend: Option<String>,

    /// Config file (JSON or TOML)
    #[arg(long, env = "BANCADA_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run without display windows
    #[arg(long)]
    headless: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

struct Failure {
    code: u8,
    error: anyhow::Error,
}

trait ExitStage<T> {
    fn exit_code(self, code: u8) -> std::result::Result<T, Failure>;
}

impl<T> ExitStage<T> for Result<T> {
    fn exit_code(self, code: u8) -> std::result::Result<T, Failure> {
        self.map_err(|error| Failure { code, error })
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            log::error!("{:#}", failure.error);
            ExitCode::from(failure.code)
        }
    }
}

fn run(args: Args) -> std::result::Result<(), Failure> {
    let is_tty = std::io::stderr().is_terminal();
    let ui_mode = ui::UiMode::parse(&args.ui).exit_code(EXIT_RUNTIME)?;
    let ui = ui::Ui::new(ui_mode, is_tty);

    if let Some(path) = &args.config {
        std::env::set_var("BANCADA_CONFIG", path);
    }
    let mut cfg = {
        let _stage = ui.stage("Load configuration");
        load_config(&args).exit_code(EXIT_RUNTIME)?
    };

    {
        let stage = ui.stage("Check model assets");
        let report = AssetReport::check(&cfg.model.required_assets());
        for line in report.lines() {
            println!("{line}");
        }
        if let Err(e) = report.require_all() {
            stage.fail("missing files");
            return Err(Failure {
                code: EXIT_ASSETS,
                error: e,
            });
        }
    }

    let postprocessor = {
        let _stage = ui.stage("Resolve target class");
        let classes = ClassNames::load(&cfg.model.classes_path).exit_code(EXIT_MODEL)?;
        log::info!(
            "{} classes loaded from {}",
            classes.len(),
            cfg.model.classes_path.display()
        );
        postprocessor_for(&cfg, &classes).exit_code(EXIT_MODEL)?
    };
    log::info!(
        "target {:?} is class {}",
        cfg.target_class,
        postprocessor.config().target_class_id
    );

    let backend = {
        let _stage = ui.stage("Load detector");
        load_backend(&cfg.model)
            .context("failed to load detector model")
            .exit_code(EXIT_MODEL)?
    };
    log::info!(
        "detector {} ready ({}x{} input)",
        backend.name(),
        cfg.model.input_width,
        cfg.model.input_height
    );

    let source = {
        let _stage = ui.stage("Open video");
        FileSource::open(FileConfig::for_path(&cfg.video_path)).exit_code(EXIT_VIDEO)?
    };

    if args.headless {
        cfg.display.enabled = false;
    }
    let display = open_display(
        cfg.display.enabled,
        cfg.display.wait_ms,
        cfg.display.quit_key,
    )
    .exit_code(EXIT_RUNTIME)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")
    .exit_code(EXIT_RUNTIME)?;

    let mut monitor = Monitor::new(
        source,
        backend,
        postprocessor,
        estimator_for(&cfg),
        display,
    )
    .with_stop_flag(stop)
    .with_health_log_interval(cfg.health_log_interval);

    log::info!("monitoring {} region {:?}", cfg.video_path, cfg.region);
    let summary = monitor.run().exit_code(EXIT_RUNTIME)?;
    drop(monitor);

    let ended = match summary.end {
        RunEnd::EndOfStream => "end of video",
        RunEnd::UserQuit => "quit requested",
        RunEnd::Interrupted => "interrupted",
    };
    log::info!(
        "{}: frames={} alert_frames={} occupied_frames={}",
        ended,
        summary.frames_processed,
        summary.alert_frames,
        summary.occupied_frames
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<MonitorConfig> {
    let mut cfg = MonitorConfig::load()?;
    if let Some(video) = &args.video {
        cfg.video_path = video.clone();
    }
    if let Some(backend) = &args.backend {
        cfg.model.set_backend(BackendKind::parse(backend)?);
    }
    cfg.validate()?;
    Ok(cfg)
}
