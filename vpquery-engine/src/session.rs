//! 编辑器会话守卫：保存活动空间与视图，离开作用域时恢复。

use tracing::{debug, warn};
use vpquery_core::boundary::BoundaryPolygon;
use vpquery_core::document::{EntityHandle, Space};

use crate::errors::HostError;
use crate::host::{DrawingHost, ViewState};

/// 借用宿主完成一次查询期间的状态修改。
///
/// 恢复顺序固定为：删除残留临时实体 -> 恢复视图 -> 恢复活动空间。
/// 每一步都会尝试，即使前一步失败。未调用 [`EditorSession::finish`]
/// 就离开作用域（包括 `?` 提前返回）时，由 `Drop` 完成同样的恢复并记录失败。
pub struct EditorSession<'h, H: DrawingHost + ?Sized> {
    host: &'h mut H,
    saved_space: Option<Space>,
    saved_view: Option<ViewState>,
    scratch: Option<EntityHandle>,
    finished: bool,
}

impl<'h, H: DrawingHost + ?Sized> EditorSession<'h, H> {
    pub fn begin(host: &'h mut H) -> Self {
        Self {
            host,
            saved_space: None,
            saved_view: None,
            scratch: None,
            finished: false,
        }
    }

    #[inline]
    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    /// 是否已切换过活动空间。
    #[inline]
    pub fn switched_space(&self) -> bool {
        self.saved_space.is_some()
    }

    /// 确保活动空间为 `target`，必要时切换并记录原空间。返回是否发生切换。
    pub fn ensure_space(&mut self, target: Space) -> Result<bool, HostError> {
        let current = self.host.active_space()?;
        if current == target {
            return Ok(false);
        }
        // 先记录再切换：切换半途失败也要尝试回到原空间。
        if self.saved_space.is_none() {
            self.saved_space = Some(current);
        }
        self.host.set_active_space(target)?;
        debug!(from = %current, to = %target, "已切换活动空间");
        Ok(true)
    }

    /// 记录当前视图，仅首次调用生效。
    pub fn save_view(&mut self) -> Result<ViewState, HostError> {
        let view = self.host.current_view()?;
        if self.saved_view.is_none() {
            self.saved_view = Some(view);
        }
        Ok(view)
    }

    /// 创建临时多段线、缩放视图到该实体，再删除它。返回临时实体句柄。
    pub fn fit_to_polygon(&mut self, polygon: &BoundaryPolygon) -> Result<EntityHandle, HostError> {
        let scratch = self
            .host
            .add_scratch_polygon(polygon.space(), polygon.points())?;
        self.scratch = Some(scratch);
        debug!(scratch = %scratch, "已创建临时边界实体");
        self.host.zoom_to_entity(scratch)?;
        self.host.erase_entity(scratch)?;
        self.scratch = None;
        Ok(scratch)
    }

    /// 正常结束会话并恢复状态，返回第一个恢复失败。
    pub fn finish(mut self) -> Result<(), HostError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), HostError> {
        self.finished = true;
        let mut first_error: Option<HostError> = None;

        if let Some(scratch) = self.scratch.take() {
            if let Err(err) = self.host.erase_entity(scratch) {
                warn!(scratch = %scratch, error = %err, "删除临时边界实体失败");
                first_error.get_or_insert(err);
            }
        }

        if let Some(view) = self.saved_view.take() {
            match self.host.restore_view(&view) {
                Ok(()) => debug!("已恢复视图"),
                Err(err) => {
                    warn!(error = %err, "恢复视图失败");
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(space) = self.saved_space.take() {
            match self.host.set_active_space(space) {
                Ok(()) => debug!(space = %space, "已恢复活动空间"),
                Err(err) => {
                    warn!(space = %space, error = %err, "恢复活动空间失败");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<H: DrawingHost + ?Sized> Drop for EditorSession<'_, H> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.restore() {
            warn!(error = %err, "提前退出时恢复编辑器状态失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use vpquery_core::geometry::{Point2, Point3};

    use super::*;
    use crate::drawing::MemoryDrawing;

    fn square(space: Space) -> BoundaryPolygon {
        BoundaryPolygon::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(100.0, 0.0, 0.0),
                Point3::new(100.0, 100.0, 0.0),
                Point3::new(0.0, 100.0, 0.0),
            ],
            space,
        )
        .expect("square")
    }

    #[test]
    fn finish_restores_space_and_view() {
        let mut drawing = MemoryDrawing::new();
        drawing.set_active_space(Space::Paper).unwrap();
        let paper_view = drawing.current_view().unwrap();
        drawing.set_active_space(Space::Model).unwrap();
        let model_view = drawing.current_view().unwrap();
        drawing.set_active_space(Space::Paper).unwrap();

        let mut session = EditorSession::begin(&mut drawing);
        assert!(session.ensure_space(Space::Model).unwrap());
        assert!(!session.ensure_space(Space::Model).unwrap());
        assert!(session.switched_space());
        assert_eq!(session.save_view().unwrap(), model_view);
        let scratch = session.fit_to_polygon(&square(Space::Model)).unwrap();
        assert_ne!(session.host().current_view().unwrap(), model_view);
        session.finish().expect("restore succeeds");

        assert!(drawing.document().entity(scratch).is_none());
        assert_eq!(drawing.active_space().unwrap(), Space::Paper);
        assert_eq!(drawing.current_view().unwrap(), paper_view);
        drawing.set_active_space(Space::Model).unwrap();
        assert_eq!(drawing.current_view().unwrap(), model_view);
    }

    #[test]
    fn dropping_unfinished_session_restores_state() {
        let mut drawing = MemoryDrawing::new();
        drawing.set_active_space(Space::Paper).unwrap();
        let before_view = drawing.current_view().unwrap();

        {
            let mut session = EditorSession::begin(&mut drawing);
            session.ensure_space(Space::Model).unwrap();
            session.save_view().unwrap();
            session
                .host()
                .restore_view(&ViewState::new(Point2::new(-500.0, 20.0), 10.0, 5.0))
                .unwrap();
        }

        assert_eq!(drawing.active_space().unwrap(), Space::Paper);
        assert_eq!(drawing.current_view().unwrap(), before_view);
        drawing.set_active_space(Space::Model).unwrap();
        assert_eq!(drawing.current_view().unwrap(), MemoryDrawing::new().model_view());
    }

    #[test]
    fn session_without_changes_is_a_no_op() {
        let mut drawing = MemoryDrawing::new();
        let before = drawing.current_view().unwrap();
        let space = drawing.active_space().unwrap();
        let session = EditorSession::begin(&mut drawing);
        session.finish().unwrap();
        assert_eq!(drawing.current_view().unwrap(), before);
        assert_eq!(drawing.active_space().unwrap(), space);
    }
}
