//! 视口空间变换：模型空间与图纸空间之间的缩放 + 平移。
//!
//! 两个方向都直接由视口快照推导，而不是对单向变换求逆：
//! 平移量分别取自视图中心与视口中心点这一对记录值。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point2, Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FrameError {
    #[error("viewport custom scale {0} is not a usable scale factor")]
    InvalidScale(f64),
}

/// 视口只读快照，每次查询只采集一次。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub custom_scale: f64,
    /// 视口在图纸空间中的中心点。
    pub center_point: Point3,
    /// 视口显示的模型空间视图中心。
    pub view_center: Point2,
}

impl ViewportState {
    /// 模型空间视图中心，Z 取图纸中心点的高程。
    #[inline]
    pub fn elevated_view_center(&self) -> Point3 {
        self.view_center.lift(self.center_point.z())
    }
}

/// 以原点为中心的缩放，再加平移：`p * scale + translation`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineFrame {
    scale: f64,
    translation: Vector3,
}

impl AffineFrame {
    /// 纯缩放帧。零、NaN 与无穷比例均被拒绝。
    pub fn scaling(scale: f64) -> Result<Self, FrameError> {
        if scale == 0.0 || !scale.is_finite() {
            return Err(FrameError::InvalidScale(scale));
        }
        Ok(Self {
            scale,
            translation: Vector3::zero(),
        })
    }

    /// 纯平移帧。
    #[inline]
    pub fn translation(translation: Vector3) -> Self {
        Self {
            scale: 1.0,
            translation,
        }
    }

    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn translation_vector(&self) -> Vector3 {
        self.translation
    }

    #[inline]
    pub fn apply(&self, point: Point3) -> Point3 {
        Point3::from(point.as_vec3() * self.scale + self.translation.as_vec3())
    }
}

/// 一个方向上的缩放帧与平移帧，按“先缩放后平移”的顺序作用。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePair {
    pub scale: AffineFrame,
    pub translate: AffineFrame,
}

impl FramePair {
    #[inline]
    pub fn map_point(&self, point: Point3) -> Point3 {
        self.translate.apply(self.scale.apply(point))
    }

    /// 逐点映射，保持输入顺序。
    pub fn map_points(&self, points: &[Point3]) -> Vec<Point3> {
        points.iter().map(|point| self.map_point(*point)).collect()
    }
}

/// 由视口快照构造两个方向的变换帧。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFrameResolver {
    state: ViewportState,
}

impl ViewportFrameResolver {
    #[inline]
    pub fn new(state: ViewportState) -> Self {
        Self { state }
    }

    #[inline]
    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    /// 模型空间 -> 图纸空间。
    ///
    /// 平移量为：视图中心经缩放后指向图纸中心点的向量。
    pub fn model_to_paper(&self) -> Result<FramePair, FrameError> {
        let scale = AffineFrame::scaling(self.state.custom_scale)?;
        let scaled_view_center = scale.apply(self.state.elevated_view_center());
        let translate = AffineFrame::translation(scaled_view_center.vector_to(self.state.center_point));
        Ok(FramePair { scale, translate })
    }

    /// 图纸空间 -> 模型空间。
    ///
    /// 平移量为：图纸中心点经 `1 / scale` 缩放后指向视图中心的向量。
    pub fn paper_to_model(&self) -> Result<FramePair, FrameError> {
        // 先校验原始比例，避免 1/0 得到无穷后才报错。
        AffineFrame::scaling(self.state.custom_scale)?;
        let scale = AffineFrame::scaling(1.0 / self.state.custom_scale)?;
        let scaled_center = scale.apply(self.state.center_point);
        let translate =
            AffineFrame::translation(scaled_center.vector_to(self.state.elevated_view_center()));
        Ok(FramePair { scale, translate })
    }

    pub fn model_point_to_paper(&self, point: Point3) -> Result<Point3, FrameError> {
        Ok(self.model_to_paper()?.map_point(point))
    }

    pub fn paper_point_to_model(&self, point: Point3) -> Result<Point3, FrameError> {
        Ok(self.paper_to_model()?.map_point(point))
    }

    pub fn model_points_to_paper(&self, points: &[Point3]) -> Result<Vec<Point3>, FrameError> {
        Ok(self.model_to_paper()?.map_points(points))
    }

    pub fn paper_points_to_model(&self, points: &[Point3]) -> Result<Vec<Point3>, FrameError> {
        Ok(self.paper_to_model()?.map_points(points))
    }
}
