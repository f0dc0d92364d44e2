// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod annotate; // 检测框绘制
pub mod config; // 应用配置
pub mod controller; // 会话状态机与逐帧处理
pub mod detection; // 安全帽检测
pub mod input; // 视频输入系统
pub mod log_panel; // 日志面板
pub mod renderer; // macroquad + egui 界面
pub mod training; // 训练工具

pub use crate::annotate::Annotator;
pub use crate::config::AppConfig;
pub use crate::controller::{Controller, ControllerConfig, DisplaySurface, Session};
pub use crate::log_panel::LogPanel;

/// 初始化日志输出, 未设置 RUST_LOG 时默认 info
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
