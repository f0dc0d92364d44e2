/// 头盔检测 (Helmet Detection)
///
/// 桌面程序: 摄像头 / 视频文件 → YOLOv8 → 左侧原始画面, 右侧检测画面, 底部日志
use clap::Parser;
use macroquad::prelude::*;
use std::path::{Path, PathBuf};
use tracing::error;

use helmet_sentinel::detection::{Detector, YoloConfig, YoloModel};
use helmet_sentinel::input::FfmpegOpener;
use helmet_sentinel::renderer::{install_cjk_font, MacroquadDisplay, Viewer};
use helmet_sentinel::{init_tracing, Annotator, AppConfig, Controller, ControllerConfig, LogPanel};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// 头盔检测参数
#[derive(Parser, Debug)]
#[command(author, version, about = "头盔检测 - 安全帽佩戴识别", long_about = None)]
struct Args {
    /// 配置文件
    #[arg(short, long, default_value = helmet_sentinel::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// ONNX 模型路径 (覆盖配置文件)
    #[arg(short, long)]
    model: Option<String>,

    /// 摄像头索引 (覆盖配置文件)
    #[arg(long)]
    camera: Option<usize>,

    /// 启动后直接打开的视频文件
    #[arg(long)]
    video: Option<PathBuf>,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "头盔检测".to_owned(),
        window_width: 1300,
        window_height: 820,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    init_tracing();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config);
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(camera) = args.camera {
        config.camera_index = camera;
    }
    config.print_summary();

    let model = match YoloModel::new(YoloConfig::from(&config)) {
        Ok(model) => model,
        Err(e) => {
            error!("❌ 模型加载失败 {}: {:#}", config.model_path, e);
            return;
        }
    };

    if let Some(font) = &config.font_path {
        install_cjk_font(Path::new(font));
    }

    let controller = Controller::new(
        Box::new(FfmpegOpener::from_config(&config)),
        Box::new(Detector::new(model)),
        Annotator::from_config(&config),
        MacroquadDisplay::new(),
        LogPanel::new(config.log_capacity),
        ControllerConfig::from(&config),
    );
    let mut viewer = Viewer::new(controller, &config.video_dir);

    if let Some(video) = args.video {
        viewer.controller_mut().start_file(video);
    }

    loop {
        viewer.update();
        viewer.draw();
        viewer.draw_egui();
        next_frame().await;
    }
}
