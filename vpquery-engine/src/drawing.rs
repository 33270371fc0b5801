//! 内存中的宿主实现：以 `Document` 为实体库，维护活动空间与各空间的视图。

use tracing::{debug, trace};
use vpquery_core::boundary::BoundaryPolygon;
use vpquery_core::document::{Document, Entity, EntityHandle, Space, Viewport};
use vpquery_core::frame::ViewportState;
use vpquery_core::geometry::{Point2, Point3};

use crate::errors::HostError;
use crate::host::{
    DrawingHost, EntityRecord, SelectionFilter, SelectionResult, SelectionStatus, ViewState,
};

/// 缩放到实体时保留的留白倍数。
const FIT_MARGIN: f64 = 1.05;
const SCRATCH_LAYER: &str = "VPQUERY_SCRATCH";

/// A3 横向图纸的默认视图。
fn default_paper_view() -> ViewState {
    ViewState::new(Point2::new(210.0, 148.5), 420.0, 297.0)
}

fn default_model_view() -> ViewState {
    ViewState::new(Point2::new(0.0, 0.0), 400.0, 300.0)
}

/// 内存绘图：实体库 + 编辑器状态（活动空间、每个空间各自的视图）。
#[derive(Debug, Clone)]
pub struct MemoryDrawing {
    document: Document,
    active_space: Space,
    model_view: ViewState,
    paper_view: ViewState,
}

/// 演示图纸中的关键实体。
#[derive(Debug, Clone, Copy)]
pub struct DemoEntities {
    pub walls: EntityHandle,
    pub axis: EntityHandle,
    pub pump: EntityHandle,
    pub room_label: EntityHandle,
    pub desk: EntityHandle,
    pub desk_lamp: EntityHandle,
    pub desk_tag: EntityHandle,
    pub far_marker: EntityHandle,
    pub title: EntityHandle,
    pub main_viewport: EntityHandle,
    pub detail_viewport: EntityHandle,
    pub broken_viewport: EntityHandle,
}

impl DemoEntities {
    pub fn viewports(&self) -> [EntityHandle; 3] {
        [
            self.main_viewport,
            self.detail_viewport,
            self.broken_viewport,
        ]
    }
}

impl MemoryDrawing {
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// 使用现有文档初始化，活动空间为模型空间。
    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            active_space: Space::Model,
            model_view: default_model_view(),
            paper_view: default_paper_view(),
        }
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    #[inline]
    pub fn model_view(&self) -> ViewState {
        self.model_view
    }

    #[inline]
    pub fn paper_view(&self) -> ViewState {
        self.paper_view
    }

    fn view_mut(&mut self) -> &mut ViewState {
        match self.active_space {
            Space::Model => &mut self.model_view,
            Space::Paper => &mut self.paper_view,
        }
    }

    fn view(&self) -> ViewState {
        match self.active_space {
            Space::Model => self.model_view,
            Space::Paper => self.paper_view,
        }
    }

    fn viewport(&self, handle: EntityHandle) -> Result<&Viewport, HostError> {
        match self.document.entity(handle) {
            Some(Entity::Viewport(viewport)) => Ok(viewport),
            Some(_) => Err(HostError::NotAViewport(handle)),
            None => Err(HostError::EntityNotFound(handle)),
        }
    }

    /// 构建演示图纸：一间平面布置的房间、一张带块参照的桌子，
    /// 以及布局上的整体视口、局部详图视口和一个比例为零的损坏视口。
    /// 构建完成后活动空间为图纸空间。
    pub fn populate_demo(&mut self) -> DemoEntities {
        let doc = &mut self.document;

        let walls = doc.add_polyline(
            Space::Model,
            [
                Point2::new(0.0, 0.0),
                Point2::new(4000.0, 0.0),
                Point2::new(4000.0, 3000.0),
                Point2::new(0.0, 3000.0),
            ],
            true,
            "WALLS",
        );
        let axis = doc.add_line(
            Space::Model,
            Point2::new(1000.0, 1000.0),
            Point2::new(2000.0, 1000.0),
            "AXIS",
        );
        let pump = doc.add_circle(Space::Model, Point2::new(3500.0, 2500.0), 200.0, "EQUIP");
        let room_label = doc.add_text(
            Space::Model,
            Point2::new(500.0, 2800.0),
            "ROOM-101",
            150.0,
            "ANNOT",
        );
        let desk = doc.add_block_reference(
            Space::Model,
            "DESK",
            Point2::new(1500.0, 1500.0),
            [
                Point2::new(1200.0, 1200.0),
                Point2::new(1800.0, 1200.0),
                Point2::new(1800.0, 1800.0),
                Point2::new(1200.0, 1800.0),
            ],
            "FURN",
        );
        let desk_lamp = doc.add_circle(Space::Model, Point2::new(1500.0, 1500.0), 100.0, "EQUIP");
        let desk_tag = doc.add_text(
            Space::Model,
            Point2::new(1300.0, 1300.0),
            "D-01",
            50.0,
            "ANNOT",
        );
        let far_marker = doc.add_line(
            Space::Model,
            Point2::new(9000.0, 9000.0),
            Point2::new(9500.0, 9500.0),
            "AXIS",
        );

        let title = doc.add_text(
            Space::Paper,
            Point2::new(300.0, 20.0),
            "PLAN 1:20",
            5.0,
            "TITLE",
        );
        let main_viewport = doc.add_viewport(Viewport {
            center: Point3::new(150.0, 100.0, 0.0),
            width: 200.0,
            height: 150.0,
            custom_scale: 0.05,
            view_center: Point2::new(2000.0, 1500.0),
            clip: None,
            layer: "VPORTS".to_string(),
        });
        let detail_viewport = doc.add_viewport(Viewport {
            center: Point3::new(330.0, 100.0, 0.0),
            width: 60.0,
            height: 60.0,
            custom_scale: 0.1,
            view_center: Point2::new(1500.0, 1500.0),
            clip: None,
            layer: "VPORTS".to_string(),
        });
        let broken_viewport = doc.add_viewport(Viewport {
            center: Point3::new(330.0, 220.0, 0.0),
            width: 40.0,
            height: 40.0,
            custom_scale: 0.0,
            view_center: Point2::new(0.0, 0.0),
            clip: None,
            layer: "VPORTS".to_string(),
        });

        self.active_space = Space::Paper;

        let ids = DemoEntities {
            walls,
            axis,
            pump,
            room_label,
            desk,
            desk_lamp,
            desk_tag,
            far_marker,
            title,
            main_viewport,
            detail_viewport,
            broken_viewport,
        };

        debug!(
            main_viewport = %ids.main_viewport,
            detail_viewport = %ids.detail_viewport,
            desk = %ids.desk,
            "已创建演示图纸"
        );

        ids
    }
}

impl Default for MemoryDrawing {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingHost for MemoryDrawing {
    fn viewport_state(&self, viewport: EntityHandle) -> Result<ViewportState, HostError> {
        Ok(self.viewport(viewport)?.state())
    }

    fn viewport_boundary_grips(&self, viewport: EntityHandle) -> Result<Vec<Point3>, HostError> {
        Ok(self.viewport(viewport)?.grip_points())
    }

    fn block_boundary(&self, block: EntityHandle) -> Result<Vec<Point3>, HostError> {
        match self.document.entity(block) {
            Some(Entity::BlockReference(reference)) => Ok(reference
                .outline
                .iter()
                .map(|point| point.lift(0.0))
                .collect()),
            Some(_) => Err(HostError::NotABlock(block)),
            None => Err(HostError::EntityNotFound(block)),
        }
    }

    fn entity_space(&self, entity: EntityHandle) -> Result<Space, HostError> {
        self.document
            .entry(entity)
            .map(|entry| entry.space)
            .ok_or(HostError::EntityNotFound(entity))
    }

    fn active_space(&self) -> Result<Space, HostError> {
        Ok(self.active_space)
    }

    fn set_active_space(&mut self, space: Space) -> Result<(), HostError> {
        self.active_space = space;
        Ok(())
    }

    fn current_view(&self) -> Result<ViewState, HostError> {
        Ok(self.view())
    }

    fn restore_view(&mut self, view: &ViewState) -> Result<(), HostError> {
        *self.view_mut() = *view;
        Ok(())
    }

    fn add_scratch_polygon(
        &mut self,
        space: Space,
        points: &[Point3],
    ) -> Result<EntityHandle, HostError> {
        if points.len() < 2 {
            return Err(HostError::Rejected {
                operation: "add_scratch_polygon",
                reason: format!("{} 个顶点不足以构成多段线", points.len()),
            });
        }
        Ok(self.document.add_polyline(
            space,
            points.iter().map(|point| point.xy()),
            true,
            SCRATCH_LAYER,
        ))
    }

    fn erase_entity(&mut self, entity: EntityHandle) -> Result<(), HostError> {
        self.document
            .erase(entity)
            .map(|_| ())
            .ok_or(HostError::EntityNotFound(entity))
    }

    fn zoom_to_entity(&mut self, entity: EntityHandle) -> Result<(), HostError> {
        let bounds = self
            .document
            .entity(entity)
            .ok_or(HostError::EntityNotFound(entity))?
            .bounds()
            .ok_or_else(|| HostError::Rejected {
                operation: "zoom_to_entity",
                reason: format!("实体 {entity} 没有有效范围"),
            })?;
        let fitted = self.view().fitted_to(&bounds, FIT_MARGIN);
        trace!(
            center_x = fitted.center.x(),
            center_y = fitted.center.y(),
            height = fitted.height,
            "视图已缩放到实体"
        );
        *self.view_mut() = fitted;
        Ok(())
    }

    fn select_crossing_polygon(
        &mut self,
        polygon: &[Point3],
        filter: Option<&dyn SelectionFilter>,
    ) -> Result<SelectionResult, HostError> {
        let Some(boundary) = BoundaryPolygon::new(polygon.to_vec(), self.active_space) else {
            return Ok(SelectionResult::with_status(SelectionStatus::Rejected));
        };
        // 与真实编辑器一致：只有当前视图内可见的实体才能被选中。
        let visible = self.view().extents();
        let handles: Vec<EntityHandle> = self
            .document
            .entries_in(self.active_space)
            .filter(|entry| self.document.is_layer_visible(entry.entity.layer_name()))
            .filter(|entry| {
                entry
                    .entity
                    .bounds()
                    .is_some_and(|bounds| bounds.intersects(&visible))
            })
            .filter(|entry| {
                filter.is_none_or(|filter| {
                    filter.matches(&EntityRecord {
                        handle: entry.handle,
                        kind: entry.entity.kind(),
                        layer: entry.entity.layer_name(),
                    })
                })
            })
            .filter(|entry| {
                entry
                    .entity
                    .outline_segments()
                    .iter()
                    .any(|(start, end)| boundary.touches_segment(*start, *end))
            })
            .map(|entry| entry.handle)
            .collect();

        if handles.is_empty() {
            Ok(SelectionResult::with_status(SelectionStatus::Empty))
        } else {
            Ok(SelectionResult::ok(handles))
        }
    }
}
