//! 检测器 (Detector)
//! 职责: 调用模型 → 过滤 Hardhat / NO-Hardhat → 统计

use anyhow::Result;
use image::RgbImage;
use tracing::trace;

use super::model::Model;
use super::types::{Detection, DetectionSummary};

/// 逐帧检测接口 (控制器只依赖它)
pub trait Detect {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;
}

/// 头盔检测器: 模型输出10类, 只保留关注的两类
pub struct Detector<M> {
    model: M,
}

impl<M: Model> Detector<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: Model> Detect for Detector<M> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let all = self.model.infer(frame)?;
        let total = all.len();
        let detections: Vec<Detection> = all.into_iter().filter(Detection::is_of_interest).collect();
        trace!("🔍 检测: {} 个目标, 关注 {} 个", total, detections.len());
        Ok(detections)
    }
}

impl<D: Detect + ?Sized> Detect for Box<D> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}

/// 统计单帧 Hardhat / NO-Hardhat 数量
pub fn summarize(detections: &[Detection]) -> DetectionSummary {
    DetectionSummary::from_detections(detections)
}
