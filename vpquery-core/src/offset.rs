//! 角平分线法的多边形外扩/内缩。
//!
//! 每个顶点沿其两条邻边的外角平分线移动 `tolerance`：正值外扩，负值内缩。
//! 顶点位移量固定为 `|tolerance|`，不做斜接补偿，也不消除高度凹陷输入产生的自交。

use glam::DVec2;

use crate::boundary::BoundaryPolygon;
use crate::geometry::{Point3, Vector2};

/// `|tolerance|` 低于该值时视为未请求偏移。
pub const DEFAULT_TOLERANCE_EPSILON: f64 = 0.1;

/// 平分线长度低于该值时视为两边共线。
const COLLINEAR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonOffsetter {
    epsilon: f64,
}

impl Default for PolygonOffsetter {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_TOLERANCE_EPSILON,
        }
    }
}

impl PolygonOffsetter {
    /// 非法的阈值（负数、NaN、无穷）回退到默认值。
    pub fn with_epsilon(epsilon: f64) -> Self {
        if epsilon.is_finite() && epsilon >= 0.0 {
            Self { epsilon }
        } else {
            Self::default()
        }
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// 判定容差是否足以触发偏移。
    #[inline]
    pub fn is_effective(&self, tolerance: f64) -> bool {
        tolerance.is_finite() && tolerance.abs() >= self.epsilon
    }

    pub fn offset(&self, polygon: &BoundaryPolygon, tolerance: f64) -> BoundaryPolygon {
        if !self.is_effective(tolerance) {
            return polygon.clone();
        }

        let points = polygon.points();
        let n = points.len();
        let orientation = Orientation::of(polygon.signed_area());
        let offset = (0..n)
            .map(|i| {
                let prev = points[(i + n - 1) % n];
                let current = points[i];
                let next = points[(i + 1) % n];
                match outward_bisector(prev, current, next, orientation) {
                    Some(direction) => Point3::new(
                        current.x() + direction.x * tolerance,
                        current.y() + direction.y * tolerance,
                        current.z(),
                    ),
                    None => current,
                }
            })
            .collect();
        polygon.with_points(offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    CounterClockwise,
    Clockwise,
    /// 面积为零（如蝶形自交输入），无法区分内外。
    Degenerate,
}

impl Orientation {
    fn of(signed_area: f64) -> Self {
        if signed_area > f64::EPSILON {
            Orientation::CounterClockwise
        } else if signed_area < -f64::EPSILON {
            Orientation::Clockwise
        } else {
            Orientation::Degenerate
        }
    }

    /// 沿 `direction` 行进时多边形外侧的法向。
    fn outward_normal(self, direction: DVec2) -> DVec2 {
        match self {
            Orientation::Clockwise => DVec2::new(-direction.y, direction.x),
            Orientation::CounterClockwise | Orientation::Degenerate => {
                DVec2::new(direction.y, -direction.x)
            }
        }
    }
}

/// 计算顶点处指向多边形外侧的单位平分线方向。
///
/// 入边与出边单位方向之差即外角平分线；凸顶点上它总是指向外侧，
/// 凹顶点上方向相反，需按多边形绕向翻转。两边共线时退化为边的外法向。
fn outward_bisector(
    prev: Point3,
    current: Point3,
    next: Point3,
    orientation: Orientation,
) -> Option<DVec2> {
    let incoming = Vector2::from_points(prev.xy(), current.xy()).normalize();
    let outgoing = Vector2::from_points(current.xy(), next.xy()).normalize();

    let (incoming, outgoing) = match (incoming, outgoing) {
        (Some(incoming), Some(outgoing)) => (incoming, outgoing),
        // 重复顶点：只有一条有效边时取其外法向
        (Some(edge), None) | (None, Some(edge)) => {
            return Some(orientation.outward_normal(edge.as_vec2()));
        }
        (None, None) => return None,
    };

    let bisector = incoming.as_vec2() - outgoing.as_vec2();
    if bisector.length() < COLLINEAR_EPSILON {
        return Some(orientation.outward_normal(incoming.as_vec2()));
    }
    let bisector = bisector.normalize();

    let turn = incoming.cross(outgoing);
    let is_reflex = match orientation {
        Orientation::CounterClockwise => turn < 0.0,
        Orientation::Clockwise => turn > 0.0,
        Orientation::Degenerate => false,
    };
    Some(if is_reflex { -bisector } else { bisector })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Space;
    use crate::geometry::Point2;

    fn polygon(points: &[(f64, f64)]) -> BoundaryPolygon {
        BoundaryPolygon::new(
            points.iter().map(|(x, y)| Point3::new(*x, *y, 0.0)).collect(),
            Space::Model,
        )
        .expect("at least three points")
    }

    fn distances_to_centroid(polygon: &BoundaryPolygon, centroid: Point2) -> Vec<f64> {
        polygon
            .points()
            .iter()
            .map(|point| point.xy().distance(centroid))
            .collect()
    }

    fn convex_samples() -> Vec<BoundaryPolygon> {
        vec![
            polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
            polygon(&[(0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)]),
            polygon(&[(0.0, 0.0), (30.0, 0.0), (12.0, 20.0)]),
            polygon(&[
                (0.0, 0.0),
                (8.0, -2.0),
                (14.0, 4.0),
                (12.0, 12.0),
                (4.0, 14.0),
                (-2.0, 7.0),
            ]),
        ]
    }

    #[test]
    fn square_corners_move_along_diagonals() {
        let square = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let grown = PolygonOffsetter::default().offset(&square, 2.0_f64.sqrt());
        let expected = [(-1.0, -1.0), (11.0, -1.0), (11.0, 11.0), (-1.0, 11.0)];
        for (point, (x, y)) in grown.points().iter().zip(expected) {
            assert!((point.x() - x).abs() < 1e-9, "{point:?}");
            assert!((point.y() - y).abs() < 1e-9, "{point:?}");
        }
        assert_eq!(grown.space(), Space::Model);
    }

    #[test]
    fn positive_tolerance_moves_vertices_away_from_centroid() {
        let offsetter = PolygonOffsetter::default();
        for sample in convex_samples() {
            let centroid = sample.centroid();
            let before = distances_to_centroid(&sample, centroid);
            let after = distances_to_centroid(&offsetter.offset(&sample, 0.5), centroid);
            for (b, a) in before.iter().zip(&after) {
                assert!(a > b, "expected {a} > {b}");
            }
        }
    }

    #[test]
    fn negative_tolerance_moves_vertices_toward_centroid() {
        let offsetter = PolygonOffsetter::default();
        for sample in convex_samples() {
            let centroid = sample.centroid();
            let before = distances_to_centroid(&sample, centroid);
            let after = distances_to_centroid(&offsetter.offset(&sample, -0.5), centroid);
            for (b, a) in before.iter().zip(&after) {
                assert!(a < b, "expected {a} < {b}");
            }
        }
    }

    #[test]
    fn tolerance_inside_epsilon_band_is_identity() {
        let offsetter = PolygonOffsetter::default();
        let sample = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        for tolerance in [0.0, 0.05, -0.099, 1e-12, f64::NAN] {
            assert_eq!(offsetter.offset(&sample, tolerance), sample);
        }
        assert_ne!(offsetter.offset(&sample, 0.1), sample);
    }

    #[test]
    fn reflex_vertex_moves_outward_too() {
        // L 形，(4,4) 为凹顶点
        let l_shape = polygon(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 4.0),
            (4.0, 4.0),
            (4.0, 10.0),
            (0.0, 10.0),
        ]);
        let grown = PolygonOffsetter::default().offset(&l_shape, 1.0);
        let reflex = grown.points()[3];
        assert!(reflex.x() > 4.0 && reflex.y() > 4.0, "{reflex:?}");
        assert!(!l_shape.contains_point(reflex.xy()));
    }

    #[test]
    fn collinear_vertex_uses_edge_normal() {
        let with_midpoint = polygon(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let grown = PolygonOffsetter::default().offset(&with_midpoint, 1.0);
        let mid = grown.points()[1];
        assert!((mid.x() - 5.0).abs() < 1e-9);
        assert!((mid.y() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn elevation_is_preserved() {
        let raised = BoundaryPolygon::new(
            vec![
                Point3::new(0.0, 0.0, 7.5),
                Point3::new(4.0, 0.0, 7.5),
                Point3::new(0.0, 4.0, 7.5),
            ],
            Space::Paper,
        )
        .expect("triangle");
        let grown = PolygonOffsetter::default().offset(&raised, 1.0);
        assert!(grown.points().iter().all(|point| point.z() == 7.5));
    }

    #[test]
    fn invalid_epsilon_falls_back_to_default() {
        assert_eq!(PolygonOffsetter::with_epsilon(-1.0).epsilon(), DEFAULT_TOLERANCE_EPSILON);
        assert_eq!(PolygonOffsetter::with_epsilon(f64::NAN).epsilon(), DEFAULT_TOLERANCE_EPSILON);
        assert_eq!(PolygonOffsetter::with_epsilon(0.5).epsilon(), 0.5);
    }
}
