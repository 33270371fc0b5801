//! 查询边界多边形及视口裁剪夹点的整理。

use serde::{Deserialize, Serialize};

use crate::document::Space;
use crate::frame::FramePair;
use crate::geometry::{Bounds2D, Point2, Point3};

/// 构成多边形所需的最少顶点数。
pub const MIN_BOUNDARY_POINTS: usize = 3;

/// 有序闭合多边形，并标记其所在坐标空间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPolygon {
    points: Vec<Point3>,
    space: Space,
}

impl BoundaryPolygon {
    /// 少于三个点时无法构成边界，返回 `None`。
    pub fn new(points: Vec<Point3>, space: Space) -> Option<Self> {
        if points.len() < MIN_BOUNDARY_POINTS {
            return None;
        }
        Some(Self { points, space })
    }

    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[inline]
    pub fn into_points(self) -> Vec<Point3> {
        self.points
    }

    #[inline]
    pub fn space(&self) -> Space {
        self.space
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 通过变换帧映射到另一坐标空间，顶点顺序不变。
    pub fn map(&self, frames: &FramePair, target: Space) -> Self {
        Self {
            points: frames.map_points(&self.points),
            space: target,
        }
    }

    /// 用新的顶点替换，保持所在空间。
    pub(crate) fn with_points(&self, points: Vec<Point3>) -> Self {
        Self {
            points,
            space: self.space,
        }
    }

    pub fn vertices_2d(&self) -> Vec<Point2> {
        self.points.iter().map(|point| point.xy()).collect()
    }

    pub fn bounds(&self) -> Bounds2D {
        Bounds2D::from_points(self.points.iter().map(|point| point.xy()))
    }

    /// XY 平面上的有向面积（鞋带公式），逆时针为正。
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        let mut twice_area = 0.0;
        for i in 0..n {
            let a = self.points[i].xy();
            let b = self.points[(i + 1) % n].xy();
            twice_area += a.x() * b.y() - b.x() * a.y();
        }
        twice_area * 0.5
    }

    /// 顶点平均值。
    pub fn centroid(&self) -> Point2 {
        let sum = self
            .points
            .iter()
            .fold(glam::DVec2::ZERO, |acc, point| acc + point.xy().as_vec2());
        Point2::from_vec(sum / self.points.len() as f64)
    }

    /// 绕数法判定点是否位于多边形内部，凹多边形同样适用。
    pub fn contains_point(&self, point: Point2) -> bool {
        let n = self.points.len();
        let mut winding: i32 = 0;
        for i in 0..n {
            let p1 = self.points[i].xy();
            let p2 = self.points[(i + 1) % n].xy();
            let cross = orient2d(p1, p2, point);
            if p1.y() <= point.y() {
                if p2.y() > point.y() && cross > 0.0 {
                    winding += 1;
                }
            } else if p2.y() <= point.y() && cross < 0.0 {
                winding -= 1;
            }
        }
        winding != 0
    }

    /// 线段是否与任一边相交（含端点接触）。
    pub fn crosses_segment(&self, start: Point2, end: Point2) -> bool {
        let n = self.points.len();
        (0..n).any(|i| {
            let a = self.points[i].xy();
            let b = self.points[(i + 1) % n].xy();
            segments_intersect(a, b, start, end)
        })
    }

    /// 交叉选择语义：线段落在内部或穿过边界都算命中。
    pub fn touches_segment(&self, start: Point2, end: Point2) -> bool {
        self.contains_point(start) || self.contains_point(end) || self.crosses_segment(start, end)
    }
}

/// 视口裁剪夹点整理器。
///
/// 宿主返回的矩形/裁剪视口夹点在第二位放置对角点，直接连成多边形会自交，
/// 因此恰好四个点时交换下标 1 与 2。
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundaryExtractor;

impl BoundaryExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 从原始夹点得到图纸空间边界；少于三个点时为空（合法结果）。
    pub fn extract_paper_boundary(&self, raw_grips: &[Point3]) -> Option<BoundaryPolygon> {
        if raw_grips.len() < MIN_BOUNDARY_POINTS {
            return None;
        }
        let mut points = raw_grips.to_vec();
        if points.len() == 4 {
            points.swap(1, 2);
        }
        BoundaryPolygon::new(points, Space::Paper)
    }
}

fn orient2d(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x() - a.x()) * (c.y() - a.y()) - (b.y() - a.y()) * (c.x() - a.x())
}

fn point_on_segment(p: Point2, a: Point2, b: Point2) -> bool {
    p.x() >= a.x().min(b.x())
        && p.x() <= a.x().max(b.x())
        && p.y() >= a.y().min(b.y())
        && p.y() <= a.y().max(b.y())
}

fn segments_intersect(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let o1 = orient2d(a, b, c);
    let o2 = orient2d(a, b, d);
    let o3 = orient2d(c, d, a);
    let o4 = orient2d(c, d, b);

    if o1 == 0.0 && point_on_segment(c, a, b) {
        return true;
    }
    if o2 == 0.0 && point_on_segment(d, a, b) {
        return true;
    }
    if o3 == 0.0 && point_on_segment(a, c, d) {
        return true;
    }
    if o4 == 0.0 && point_on_segment(b, c, d) {
        return true;
    }

    let ab = (o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0);
    let cd = (o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0);
    ab && cd
}
