/// 头盔检测数据结构定义
/// Data structures for helmet detection

// ========== 公共常量 ==========

/// 安全帽数据集类别 (与训练配置中的 names 顺序一致)
pub const CLASS_NAMES: [&str; 10] = [
    "Hardhat",
    "Mask",
    "NO-Hardhat",
    "NO-Mask",
    "NO-Safety Vest",
    "Person",
    "Safety Cone",
    "Safety Vest",
    "machinery",
    "vehicle",
];

/// 佩戴安全帽
pub const HARDHAT: &str = "Hardhat";

/// 未佩戴安全帽
pub const NO_HARDHAT: &str = "NO-Hardhat";

/// 计数与绘制关注的类别
pub const CLASSES_OF_INTEREST: [&str; 2] = [HARDHAT, NO_HARDHAT];

// ========== 数据结构 ==========

/// 检测框 (像素坐标, 左上/右下角点均包含在框内)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// 单个检测结果 (模型输出)
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_id: usize, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            class_id,
            label: label.into(),
            confidence,
        }
    }

    /// 是否属于 Hardhat / NO-Hardhat
    pub fn is_of_interest(&self) -> bool {
        CLASSES_OF_INTEREST.contains(&self.label.as_str())
    }
}

/// 单帧计数
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    pub hardhat: usize,
    pub no_hardhat: usize,
}

impl DetectionSummary {
    pub fn from_detections(detections: &[Detection]) -> Self {
        detections
            .iter()
            .fold(Self::default(), |mut summary, det| {
                match det.label.as_str() {
                    HARDHAT => summary.hardhat += 1,
                    NO_HARDHAT => summary.no_hardhat += 1,
                    _ => {}
                }
                summary
            })
    }

    pub fn is_empty(&self) -> bool {
        self.hardhat == 0 && self.no_hardhat == 0
    }

    /// 日志面板显示的计数行
    pub fn message(&self) -> String {
        format!(
            "检测到 Hardhat: {}, NO-Hardhat: {}",
            self.hardhat, self.no_hardhat
        )
    }
}

/// 类别名 (超出词表时返回 "Unknown")
pub fn class_name(names: &[String], class_id: usize) -> String {
    names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string())
}
