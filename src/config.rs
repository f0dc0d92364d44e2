//! 程序配置 - 通过JSON文件调整参数

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "helmet_config.json";

/// 头盔检测程序配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // === 模型参数 ===
    pub model_path: String,     // ONNX 模型路径
    pub input_size: u32,        // 模型输入尺寸 (正方形)
    pub conf_threshold: f32,    // 检测置信度阈值
    pub iou_threshold: f32,     // NMS IOU阈值
    pub cuda: bool,             // 使用 CUDA 推理
    pub intra_threads: usize,   // 推理线程数 (0 = 自动)

    // === 采集参数 ===
    pub camera_index: usize,    // 摄像头设备索引
    pub frame_width: u32,       // 统一帧宽
    pub frame_height: u32,      // 统一帧高
    pub tick_interval_ms: u64,  // 定时器间隔
    pub open_timeout_ms: u64,   // 打开输入源超时
    pub read_timeout_ms: u64,   // 单帧读取超时 (在界面线程上等待, 保持在定时器间隔的两倍左右)
    pub max_consecutive_read_failures: u32, // 连续读帧失败自动停止 (0 = 不停止)

    // === 绘制参数 ===
    pub box_color: [u8; 3],     // 检测框颜色 (RGB)
    pub box_thickness: u32,     // 检测框线宽

    // === 界面参数 ===
    pub log_capacity: usize,    // 日志面板最大行数
    pub font_path: Option<String>, // 中文字体
    pub video_dir: String,      // 文件选择器初始目录
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: "models/best.onnx".to_string(),
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            cuda: false,
            intra_threads: 0,

            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            tick_interval_ms: 30,
            open_timeout_ms: 5000,
            read_timeout_ms: 60,
            max_consecutive_read_failures: 100,

            box_color: [0, 0, 255],
            box_thickness: 2,

            log_capacity: 500,
            font_path: Some("assets/font/msyh.ttc".to_string()),
            video_dir: ".".to_string(),
        }
    }
}

impl AppConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写入默认配置; 解析失败时使用默认值
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存配置失败: {}", e);
                }
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前配置:");
        info!("  模型: {} ({}x{})", self.model_path, self.input_size, self.input_size);
        info!(
            "  置信度: {:.2} | IOU: {:.2}",
            self.conf_threshold, self.iou_threshold
        );
        info!(
            "  帧尺寸: {}x{} | 定时器: {}ms",
            self.frame_width, self.frame_height, self.tick_interval_ms
        );
        info!("  摄像头索引: {}", self.camera_index);
    }
}
