use anyhow::Result;
use image::RgbImage;

use super::types::Detection;

/// 检测模型统一接口
///
/// 模型本身是黑盒: 输入一帧, 输出全部类别的检测框 (已完成NMS)
pub trait Model {
    /// 对单帧执行一次同步推理
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;

    /// 打印模型信息
    fn summary(&self) {}
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        (**self).infer(frame)
    }

    fn summary(&self) {
        (**self).summary()
    }
}
