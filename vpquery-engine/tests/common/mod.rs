//! 可按调用次数注入失败的宿主替身。

#![allow(dead_code)]

use vpquery_core::document::{EntityHandle, Space};
use vpquery_core::frame::ViewportState;
use vpquery_core::geometry::Point3;
use vpquery_engine::drawing::MemoryDrawing;
use vpquery_engine::errors::HostError;
use vpquery_engine::host::{
    DrawingHost, SelectionFilter, SelectionResult, SelectionStatus, ViewState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetActiveSpace,
    CurrentView,
    RestoreView,
    AddScratch,
    Erase,
    Zoom,
    Select,
}

#[derive(Debug, Default)]
pub struct FaultyHost {
    pub drawing: MemoryDrawing,
    fail_on: Option<(Operation, usize)>,
    forced_status: Option<SelectionStatus>,
    calls: Vec<Operation>,
}

/// 可直接比较的编辑器状态快照。
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub active_space: Space,
    pub model_view: ViewState,
    pub paper_view: ViewState,
    pub entity_count: usize,
}

impl FaultyHost {
    pub fn new(drawing: MemoryDrawing) -> Self {
        Self {
            drawing,
            ..Self::default()
        }
    }

    /// 第 `nth` 次（从 1 开始）调用 `operation` 时失败。
    pub fn failing_on(mut self, operation: Operation, nth: usize) -> Self {
        self.fail_on = Some((operation, nth));
        self
    }

    pub fn with_selection_status(mut self, status: SelectionStatus) -> Self {
        self.forced_status = Some(status);
        self
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.iter().filter(|call| **call == operation).count()
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            active_space: self.drawing.active_space().expect("memory host"),
            model_view: self.drawing.model_view(),
            paper_view: self.drawing.paper_view(),
            entity_count: self.drawing.document().entries().count(),
        }
    }

    fn record(&mut self, operation: Operation) -> Result<(), HostError> {
        self.calls.push(operation);
        match self.fail_on {
            Some((target, nth)) if target == operation && self.calls(operation) == nth => {
                Err(HostError::Rejected {
                    operation: "injected",
                    reason: format!("{operation:?} #{nth}"),
                })
            }
            _ => Ok(()),
        }
    }
}

impl DrawingHost for FaultyHost {
    fn viewport_state(&self, viewport: EntityHandle) -> Result<ViewportState, HostError> {
        self.drawing.viewport_state(viewport)
    }

    fn viewport_boundary_grips(&self, viewport: EntityHandle) -> Result<Vec<Point3>, HostError> {
        self.drawing.viewport_boundary_grips(viewport)
    }

    fn block_boundary(&self, block: EntityHandle) -> Result<Vec<Point3>, HostError> {
        self.drawing.block_boundary(block)
    }

    fn entity_space(&self, entity: EntityHandle) -> Result<Space, HostError> {
        self.drawing.entity_space(entity)
    }

    fn active_space(&self) -> Result<Space, HostError> {
        self.drawing.active_space()
    }

    fn set_active_space(&mut self, space: Space) -> Result<(), HostError> {
        self.record(Operation::SetActiveSpace)?;
        self.drawing.set_active_space(space)
    }

    // 只读接口无法计数，注入后每次都失败。
    fn current_view(&self) -> Result<ViewState, HostError> {
        match self.fail_on {
            Some((Operation::CurrentView, _)) => Err(HostError::Rejected {
                operation: "injected",
                reason: "CurrentView".to_string(),
            }),
            _ => self.drawing.current_view(),
        }
    }

    fn restore_view(&mut self, view: &ViewState) -> Result<(), HostError> {
        self.record(Operation::RestoreView)?;
        self.drawing.restore_view(view)
    }

    fn add_scratch_polygon(
        &mut self,
        space: Space,
        points: &[Point3],
    ) -> Result<EntityHandle, HostError> {
        self.record(Operation::AddScratch)?;
        self.drawing.add_scratch_polygon(space, points)
    }

    fn erase_entity(&mut self, entity: EntityHandle) -> Result<(), HostError> {
        self.record(Operation::Erase)?;
        self.drawing.erase_entity(entity)
    }

    fn zoom_to_entity(&mut self, entity: EntityHandle) -> Result<(), HostError> {
        self.record(Operation::Zoom)?;
        self.drawing.zoom_to_entity(entity)
    }

    fn select_crossing_polygon(
        &mut self,
        polygon: &[Point3],
        filter: Option<&dyn SelectionFilter>,
    ) -> Result<SelectionResult, HostError> {
        self.record(Operation::Select)?;
        let result = self.drawing.select_crossing_polygon(polygon, filter)?;
        Ok(match self.forced_status {
            Some(status) => SelectionResult { status, ..result },
            None => result,
        })
    }
}
