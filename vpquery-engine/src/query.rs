//! 视口/块边界范围查询。
//!
//! 流程：取图纸边界 -> 映射到模型空间 -> 按容差外扩或内缩 -> 必要时切换活动空间
//! -> 记录视图 -> 借助临时多段线缩放视图 -> 交叉多边形选择 -> 恢复视图与空间。

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vpquery_core::boundary::{BoundaryExtractor, BoundaryPolygon};
use vpquery_core::document::{EntityHandle, Space};
use vpquery_core::frame::ViewportFrameResolver;
use vpquery_core::offset::PolygonOffsetter;

use crate::errors::QueryError;
use crate::host::{DrawingHost, SelectionFilter, SelectionStatus};
use crate::session::EditorSession;

/// 查询结果为空的原因，或命中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutcome {
    Matched,
    /// 边界点少于三个。
    DegenerateBoundary,
    /// 视口比例为零或非有限值。
    MalformedViewport,
    /// 宿主选择未返回成功状态。
    SelectionFailed(SelectionStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReport {
    pub handles: Vec<EntityHandle>,
    pub outcome: QueryOutcome,
}

impl QueryReport {
    fn empty(outcome: QueryOutcome) -> Self {
        Self {
            handles: Vec::new(),
            outcome,
        }
    }
}

/// 查询边界的来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuerySource {
    Viewport(EntityHandle),
    Block(EntityHandle),
}

impl QuerySource {
    #[inline]
    pub fn handle(self) -> EntityHandle {
        match self {
            QuerySource::Viewport(handle) | QuerySource::Block(handle) => handle,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialQueryCoordinator {
    extractor: BoundaryExtractor,
    offsetter: PolygonOffsetter,
}

impl SpatialQueryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 自定义“未请求偏移”的容差阈值。
    pub fn with_tolerance_epsilon(epsilon: f64) -> Self {
        Self {
            extractor: BoundaryExtractor::new(),
            offsetter: PolygonOffsetter::with_epsilon(epsilon),
        }
    }

    #[inline]
    pub fn tolerance_epsilon(&self) -> f64 {
        self.offsetter.epsilon()
    }

    /// 返回视口所显示模型范围内（按容差调整后）的实体句柄。
    pub fn query_entities_in_viewport<H>(
        &self,
        host: &mut H,
        viewport: EntityHandle,
        filter: Option<&dyn SelectionFilter>,
        tolerance: f64,
    ) -> Result<Vec<EntityHandle>, QueryError>
    where
        H: DrawingHost + ?Sized,
    {
        Ok(self
            .query_viewport_report(host, viewport, filter, tolerance)?
            .handles)
    }

    /// 返回块参照外轮廓范围内的实体句柄，不包含块参照自身。
    pub fn query_entities_in_block<H>(
        &self,
        host: &mut H,
        block: EntityHandle,
        filter: Option<&dyn SelectionFilter>,
        tolerance: f64,
    ) -> Result<Vec<EntityHandle>, QueryError>
    where
        H: DrawingHost + ?Sized,
    {
        Ok(self
            .query_block_report(host, block, filter, tolerance)?
            .handles)
    }

    pub fn query<H>(
        &self,
        host: &mut H,
        source: QuerySource,
        filter: Option<&dyn SelectionFilter>,
        tolerance: f64,
    ) -> Result<QueryReport, QueryError>
    where
        H: DrawingHost + ?Sized,
    {
        match source {
            QuerySource::Viewport(viewport) => {
                self.query_viewport_report(host, viewport, filter, tolerance)
            }
            QuerySource::Block(block) => self.query_block_report(host, block, filter, tolerance),
        }
    }

    pub fn query_viewport_report<H>(
        &self,
        host: &mut H,
        viewport: EntityHandle,
        filter: Option<&dyn SelectionFilter>,
        tolerance: f64,
    ) -> Result<QueryReport, QueryError>
    where
        H: DrawingHost + ?Sized,
    {
        info!(viewport = %viewport, tolerance, "开始视口范围查询");

        // 快照只取一次：查询过程会修改活动视图。
        let state = host.viewport_state(viewport)?;
        let grips = host.viewport_boundary_grips(viewport)?;

        let Some(paper_boundary) = self.extractor.extract_paper_boundary(&grips) else {
            warn!(viewport = %viewport, grips = grips.len(), "视口边界点不足，返回空结果");
            return Ok(QueryReport::empty(QueryOutcome::DegenerateBoundary));
        };

        let frames = match ViewportFrameResolver::new(state).paper_to_model() {
            Ok(frames) => frames,
            Err(err) => {
                warn!(viewport = %viewport, error = %err, "视口比例无效，返回空结果");
                return Ok(QueryReport::empty(QueryOutcome::MalformedViewport));
            }
        };
        let model_boundary = paper_boundary.map(&frames, Space::Model);

        self.select_within(host, model_boundary, viewport, filter, tolerance)
    }

    pub fn query_block_report<H>(
        &self,
        host: &mut H,
        block: EntityHandle,
        filter: Option<&dyn SelectionFilter>,
        tolerance: f64,
    ) -> Result<QueryReport, QueryError>
    where
        H: DrawingHost + ?Sized,
    {
        info!(block = %block, tolerance, "开始块边界范围查询");

        let outline = host.block_boundary(block)?;
        let space = host.entity_space(block)?;
        let outline_len = outline.len();
        let Some(boundary) = BoundaryPolygon::new(outline, space) else {
            warn!(block = %block, points = outline_len, "块外轮廓点不足，返回空结果");
            return Ok(QueryReport::empty(QueryOutcome::DegenerateBoundary));
        };

        self.select_within(host, boundary, block, filter, tolerance)
    }

    fn select_within<H>(
        &self,
        host: &mut H,
        boundary: BoundaryPolygon,
        source: EntityHandle,
        filter: Option<&dyn SelectionFilter>,
        tolerance: f64,
    ) -> Result<QueryReport, QueryError>
    where
        H: DrawingHost + ?Sized,
    {
        let boundary = if self.offsetter.is_effective(tolerance) {
            debug!(tolerance, "按容差调整查询边界");
            self.offsetter.offset(&boundary, tolerance)
        } else {
            boundary
        };

        let mut session = EditorSession::begin(host);
        session.ensure_space(boundary.space())?;
        session.save_view()?;
        let scratch = session.fit_to_polygon(&boundary)?;
        let selection = session
            .host()
            .select_crossing_polygon(boundary.points(), filter)?;
        session.finish().map_err(QueryError::Restore)?;

        if !selection.is_success() {
            debug!(status = ?selection.status, "选择未成功，返回空结果");
            return Ok(QueryReport::empty(QueryOutcome::SelectionFailed(
                selection.status,
            )));
        }

        let handles: Vec<EntityHandle> = selection
            .handles
            .into_iter()
            .filter(|handle| *handle != source && *handle != scratch)
            .collect();
        info!(source = %source, matched = handles.len(), "范围查询完成");
        Ok(QueryReport {
            handles,
            outcome: QueryOutcome::Matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use vpquery_core::document::EntityKind;

    use super::*;
    use crate::drawing::MemoryDrawing;
    use crate::host::KindFilter;

    #[test]
    fn main_viewport_returns_room_contents() {
        let mut drawing = MemoryDrawing::new();
        let ids = drawing.populate_demo();
        let coordinator = SpatialQueryCoordinator::new();

        let handles = coordinator
            .query_entities_in_viewport(&mut drawing, ids.main_viewport, None, 0.0)
            .expect("query succeeds");
        assert_eq!(
            handles,
            vec![
                ids.walls,
                ids.axis,
                ids.pump,
                ids.room_label,
                ids.desk,
                ids.desk_lamp,
                ids.desk_tag
            ]
        );
    }

    #[test]
    fn detail_viewport_respects_filter() {
        let mut drawing = MemoryDrawing::new();
        let ids = drawing.populate_demo();
        let coordinator = SpatialQueryCoordinator::new();
        let filter = KindFilter::new([EntityKind::Circle, EntityKind::Text]);

        let handles = coordinator
            .query_entities_in_viewport(&mut drawing, ids.detail_viewport, Some(&filter), 0.0)
            .expect("query succeeds");
        assert_eq!(handles, vec![ids.desk_lamp, ids.desk_tag]);
    }

    #[test]
    fn block_query_excludes_the_block_itself() {
        let mut drawing = MemoryDrawing::new();
        let ids = drawing.populate_demo();
        let coordinator = SpatialQueryCoordinator::new();

        let report = coordinator
            .query_block_report(&mut drawing, ids.desk, None, 0.0)
            .expect("query succeeds");
        assert_eq!(report.outcome, QueryOutcome::Matched);
        assert_eq!(report.handles, vec![ids.desk_lamp, ids.desk_tag]);
    }

    #[test]
    fn malformed_viewport_is_an_empty_result() {
        let mut drawing = MemoryDrawing::new();
        let ids = drawing.populate_demo();
        let report = SpatialQueryCoordinator::new()
            .query(&mut drawing, QuerySource::Viewport(ids.broken_viewport), None, 5.0)
            .expect("not an error");
        assert_eq!(report.outcome, QueryOutcome::MalformedViewport);
        assert!(report.handles.is_empty());
        assert_eq!(drawing.active_space().unwrap(), Space::Paper);
    }

    #[test]
    fn shrinking_detail_boundary_drops_edge_entities() {
        let mut drawing = MemoryDrawing::new();
        let ids = drawing.populate_demo();
        let coordinator = SpatialQueryCoordinator::new();

        // 收缩后桌子外轮廓不再与边界接触，桌面上的灯与编号仍在范围内
        let handles = coordinator
            .query_entities_in_viewport(&mut drawing, ids.detail_viewport, None, -50.0)
            .expect("query succeeds");
        assert_eq!(handles, vec![ids.desk_lamp, ids.desk_tag]);

        // 外扩后仍然包含桌子
        let handles = coordinator
            .query_entities_in_viewport(&mut drawing, ids.detail_viewport, None, 50.0)
            .expect("query succeeds");
        assert_eq!(handles, vec![ids.desk, ids.desk_lamp, ids.desk_tag]);
    }

    #[test]
    fn missing_viewport_propagates_host_error() {
        let mut drawing = MemoryDrawing::new();
        drawing.populate_demo();
        let err = SpatialQueryCoordinator::new()
            .query_entities_in_viewport(&mut drawing, EntityHandle::new(0xFFFF), None, 0.0)
            .unwrap_err();
        assert!(matches!(err, QueryError::Host(_)));
    }
}
