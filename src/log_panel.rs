//! 日志面板 - 带时间戳, 最新一行在最上面

use std::collections::VecDeque;
use tracing::info;

/// 时间戳格式 (秒级)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 日志面板
#[derive(Clone, Debug)]
pub struct LogPanel {
    lines: VecDeque<String>,
    capacity: usize,
    revision: u64,
}

impl Default for LogPanel {
    fn default() -> Self {
        Self::new(500)
    }
}

impl LogPanel {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            revision: 0,
        }
    }

    /// 追加一行: `[时间] 消息`
    pub fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("📝 {}", message);
        let now = chrono::Local::now().format(TIMESTAMP_FORMAT);
        self.lines.push_front(format!("[{}] {}", now, message));
        self.lines.truncate(self.capacity);
        self.revision += 1;
    }

    /// 从新到旧
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 每次追加递增, 界面据此把滚动条复位到顶部
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
