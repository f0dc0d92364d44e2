//! 控制器 (Controller)
//!
//! 会话状态机: Idle ⇄ Running
//! 每个 tick: 读一帧 → 缩放 → 原始画面 → 检测 → 绘制 → 处理后画面 → 日志

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::annotate::Annotator;
use crate::config::AppConfig;
use crate::detection::{summarize, Detect};
use crate::input::{Frame, FrameResizer, FrameSource, InputSource, SourceOpener};
use crate::log_panel::LogPanel;

/// 显示面板 (原始 / 处理后)
pub trait DisplaySurface {
    fn show_raw(&mut self, frame: &Frame);

    fn show_annotated(&mut self, frame: &Frame);

    fn clear(&mut self);
}

/// 固定周期定时器
#[derive(Clone, Copy, Debug)]
pub struct Ticker {
    interval: Duration,
    last: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// 到期返回 true 并记录本次触发时间
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// 正在运行的会话: 采集句柄 + 定时器
pub struct ActiveSession {
    source: Box<dyn FrameSource>,
    input: InputSource,
    ticker: Ticker,
    consecutive_failures: u32,
}

impl ActiveSession {
    pub fn input(&self) -> &InputSource {
        &self.input
    }
}

/// 会话状态
pub enum Session {
    Idle,
    Running(ActiveSession),
}

impl Session {
    pub fn is_running(&self) -> bool {
        matches!(self, Session::Running(_))
    }
}

/// 控制器参数
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub camera_index: usize,
    pub frame_size: (u32, u32),
    pub tick_interval: Duration,
    pub max_consecutive_read_failures: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ControllerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            camera_index: config.camera_index,
            frame_size: (config.frame_width, config.frame_height),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            max_consecutive_read_failures: config.max_consecutive_read_failures,
        }
    }
}

pub struct Controller<S> {
    opener: Box<dyn SourceOpener>,
    detector: Box<dyn Detect>,
    annotator: Annotator,
    resizer: FrameResizer,
    display: S,
    log: LogPanel,
    session: Session,
    config: ControllerConfig,
}

impl<S: DisplaySurface> Controller<S> {
    pub fn new(
        opener: Box<dyn SourceOpener>,
        detector: Box<dyn Detect>,
        annotator: Annotator,
        display: S,
        log: LogPanel,
        config: ControllerConfig,
    ) -> Self {
        let (width, height) = config.frame_size;
        Self {
            opener,
            detector,
            annotator,
            resizer: FrameResizer::new(width, height),
            display,
            log,
            session: Session::Idle,
            config,
        }
    }

    pub fn display(&self) -> &S {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut S {
        &mut self.display
    }

    pub fn log(&self) -> &LogPanel {
        &self.log
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// 打开摄像头 (配置中的设备索引)
    pub fn start_camera(&mut self) -> bool {
        self.start(InputSource::Camera(self.config.camera_index))
    }

    /// 打开视频文件
    pub fn start_file(&mut self, path: impl AsRef<Path>) -> bool {
        self.start(InputSource::File(path.as_ref().to_path_buf()))
    }

    /// 打开输入源, 成功后启动定时器
    ///
    /// 已有会话时先释放旧句柄再打开
    pub fn start(&mut self, input: InputSource) -> bool {
        if let Session::Running(mut previous) = std::mem::replace(&mut self.session, Session::Idle) {
            debug!("🔄 切换输入源, 释放 {}", previous.source.describe());
            previous.source.release();
        }

        let (started, failed) = match input {
            InputSource::Camera(_) => ("摄像头已启动", "无法打开摄像头"),
            InputSource::File(_) => ("视频文件已启动", "无法打开视频文件"),
        };

        match self.opener.open(&input) {
            Ok(source) => {
                self.session = Session::Running(ActiveSession {
                    source,
                    input,
                    ticker: Ticker::new(self.config.tick_interval),
                    consecutive_failures: 0,
                });
                self.log.log(started);
                true
            }
            Err(e) => {
                warn!("❌ {}", e);
                self.log.log(failed);
                false
            }
        }
    }

    /// 停止定时器, 释放句柄, 清空两个画面 (可重复调用)
    pub fn stop(&mut self) {
        if let Session::Running(mut active) = std::mem::replace(&mut self.session, Session::Idle) {
            active.source.release();
            self.log.log("摄像头或视频文件已停止");
        }
        self.display.clear();
    }

    /// 主循环每帧调用: 定时器到期时执行一次 tick
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = match &mut self.session {
            Session::Running(active) => active.ticker.due(now),
            Session::Idle => false,
        };
        if due {
            self.tick();
        }
        due
    }

    /// 处理一帧
    pub fn tick(&mut self) {
        let Session::Running(active) = &mut self.session else {
            return;
        };

        let frame = match active.source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("⚠️ 读取帧失败: {}", e);
                self.read_failed();
                return;
            }
        };

        // 统一帧大小 640x480, 缩放失败与读取失败同样计数
        let frame = match self.resizer.resize(frame) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("❌ 帧缩放失败: {}", e);
                self.read_failed();
                return;
            }
        };
        if let Session::Running(active) = &mut self.session {
            active.consecutive_failures = 0;
        }

        // 原始画面与检测结果无关
        self.display.show_raw(&frame);

        match self.detector.detect(&frame) {
            Ok(detections) => {
                let summary = summarize(&detections);
                if !summary.is_empty() {
                    self.log.log(summary.message());
                }
                let annotated = self.annotator.apply(&frame, &detections);
                self.display.show_annotated(&annotated);
            }
            Err(e) => {
                warn!("❌ 检测失败: {:#}", e);
                self.log.log(format!("检测失败: {}", e));
                // 不绘制检测框, 但处理后画面仍与原始画面保持同一帧
                self.display.show_annotated(&frame);
            }
        }
    }

    /// 记录一次失败, 连续失败达到上限时自动停止
    fn read_failed(&mut self) {
        let Session::Running(active) = &mut self.session else {
            return;
        };
        active.consecutive_failures += 1;
        let failures = active.consecutive_failures;
        self.log.log("无法读取帧");

        let limit = self.config.max_consecutive_read_failures;
        if limit > 0 && failures >= limit {
            self.log.log(format!("连续读取失败 {} 次，已自动停止", failures));
            self.stop();
        }
    }
}
