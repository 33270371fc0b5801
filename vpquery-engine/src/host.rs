//! 宿主绘图编辑器的协作接口。
//!
//! 宿主返回的原始数据在这一层就转换为强类型（视口快照、边界夹点、选择状态），
//! 查询逻辑不接触宿主的动态对象。

use serde::{Deserialize, Serialize};
use vpquery_core::document::{EntityHandle, EntityKind, Space};
use vpquery_core::frame::ViewportState;
use vpquery_core::geometry::{Bounds2D, Point2, Point3};

use crate::errors::{FilterError, HostError};

/// 视图快照：中心点与可见范围尺寸，按值比较。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: Point2,
    pub width: f64,
    pub height: f64,
}

impl ViewState {
    #[inline]
    pub fn new(center: Point2, width: f64, height: f64) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    /// 当前可见范围。
    pub fn extents(&self) -> Bounds2D {
        let half_w = self.width.abs() * 0.5;
        let half_h = self.height.abs() * 0.5;
        Bounds2D::new(
            Point2::new(self.center.x() - half_w, self.center.y() - half_h),
            Point2::new(self.center.x() + half_w, self.center.y() + half_h),
        )
    }

    #[inline]
    pub fn aspect(&self) -> f64 {
        if self.height.abs() <= f64::EPSILON {
            1.0
        } else {
            (self.width / self.height).abs()
        }
    }

    /// 保持宽高比，使 `bounds` 加上 `margin` 倍留白后完整可见。
    pub fn fitted_to(&self, bounds: &Bounds2D, margin: f64) -> Self {
        // 零宽视图没有可用的宽高比，按正方形处理。
        let aspect = match self.aspect() {
            aspect if aspect.is_finite() && aspect > f64::EPSILON => aspect,
            _ => 1.0,
        };
        let mut height = bounds.height().max(bounds.width() / aspect) * margin;
        if height <= f64::EPSILON {
            height = self.height.abs().max(1.0);
        }
        Self {
            center: bounds.center(),
            width: height * aspect,
            height,
        }
    }
}

/// 宿主交叉选择的返回状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStatus {
    Ok,
    /// 没有实体命中。
    Empty,
    Cancelled,
    /// 宿主拒绝了选择请求（例如多边形无效）。
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub status: SelectionStatus,
    pub handles: Vec<EntityHandle>,
}

impl SelectionResult {
    pub fn ok(handles: Vec<EntityHandle>) -> Self {
        Self {
            status: SelectionStatus::Ok,
            handles,
        }
    }

    pub fn with_status(status: SelectionStatus) -> Self {
        Self {
            status,
            handles: Vec::new(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == SelectionStatus::Ok
    }
}

/// 选择过滤器看到的实体描述。
#[derive(Debug, Clone, Copy)]
pub struct EntityRecord<'a> {
    pub handle: EntityHandle,
    pub kind: EntityKind,
    pub layer: &'a str,
}

/// 宿主选择过滤器；查询引擎只负责透传。
pub trait SelectionFilter {
    fn matches(&self, record: &EntityRecord<'_>) -> bool;
}

impl<F> SelectionFilter for F
where
    F: Fn(&EntityRecord<'_>) -> bool,
{
    fn matches(&self, record: &EntityRecord<'_>) -> bool {
        self(record)
    }
}

/// 按实体类型过滤。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFilter {
    kinds: Vec<EntityKind>,
}

impl KindFilter {
    pub fn new<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = EntityKind>,
    {
        let mut collected: Vec<EntityKind> = Vec::new();
        for kind in kinds {
            if !collected.contains(&kind) {
                collected.push(kind);
            }
        }
        Self { kinds: collected }
    }

    /// 由 DXF 类型名构造，遇到未知名称时报错。
    pub fn from_type_names<I, S>(names: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kinds = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                EntityKind::from_type_name(name)
                    .ok_or_else(|| FilterError::UnknownEntityType(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(kinds))
    }

    #[inline]
    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }
}

impl SelectionFilter for KindFilter {
    fn matches(&self, record: &EntityRecord<'_>) -> bool {
        self.kinds.contains(&record.kind)
    }
}

/// 按图层名过滤（不区分大小写）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerFilter {
    layers: Vec<String>,
}

impl LayerFilter {
    pub fn new<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            layers: layers.into_iter().map(Into::into).collect(),
        }
    }
}

impl SelectionFilter for LayerFilter {
    fn matches(&self, record: &EntityRecord<'_>) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.eq_ignore_ascii_case(record.layer))
    }
}

/// 查询引擎消费的宿主操作。
///
/// 活动空间与活动视图属于宿主的进程级状态；实现者无需自行保护，
/// 由 [`crate::session::EditorSession`] 负责保存与恢复。
pub trait DrawingHost {
    fn viewport_state(&self, viewport: EntityHandle) -> Result<ViewportState, HostError>;

    /// 视口裁剪边界的原始夹点，顺序由宿主决定。
    fn viewport_boundary_grips(&self, viewport: EntityHandle) -> Result<Vec<Point3>, HostError>;

    /// 块参照外轮廓，位于块参照所在空间。
    fn block_boundary(&self, block: EntityHandle) -> Result<Vec<Point3>, HostError>;

    fn entity_space(&self, entity: EntityHandle) -> Result<Space, HostError>;

    fn active_space(&self) -> Result<Space, HostError>;

    fn set_active_space(&mut self, space: Space) -> Result<(), HostError>;

    fn current_view(&self) -> Result<ViewState, HostError>;

    fn restore_view(&mut self, view: &ViewState) -> Result<(), HostError>;

    /// 在指定空间创建临时闭合多段线。
    fn add_scratch_polygon(
        &mut self,
        space: Space,
        points: &[Point3],
    ) -> Result<EntityHandle, HostError>;

    fn erase_entity(&mut self, entity: EntityHandle) -> Result<(), HostError>;

    fn zoom_to_entity(&mut self, entity: EntityHandle) -> Result<(), HostError>;

    /// 在活动空间执行交叉多边形选择。
    fn select_crossing_polygon(
        &mut self,
        polygon: &[Point3],
        filter: Option<&dyn SelectionFilter>,
    ) -> Result<SelectionResult, HostError>;
}
