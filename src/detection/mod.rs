/// 检测系统 (Detection System)
///
/// - Model:    模型黑盒 (YOLOv8 ONNX)
/// - Detector: 过滤关注类别并统计
pub mod detector;
pub mod model;
pub mod types;
pub mod yolo;

pub use detector::{summarize, Detect, Detector};
pub use model::Model;
pub use types::{BoundingBox, Detection, DetectionSummary, CLASS_NAMES, HARDHAT, NO_HARDHAT};
pub use yolo::{YoloConfig, YoloModel};
