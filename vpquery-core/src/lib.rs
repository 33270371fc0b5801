pub mod boundary;
pub mod frame;
pub mod offset;

pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，保持双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        /// 以给定 Z 值提升为三维点。
        #[inline]
        pub fn lift(self, z: f64) -> Point3 {
            Point3::new(self.0.x, self.0.y, z)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        /// 单位化；长度接近零时返回 `None`。
        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        /// 二维叉积（z 分量），正值表示 `other` 位于逆时针一侧。
        #[inline]
        pub fn cross(self, other: Vector2) -> f64 {
            self.0.perp_dot(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    /// 三维点。视口中心点等图纸空间坐标带有 Z 值。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn vector_to(self, other: Point3) -> Vector3 {
            Vector3(other.0 - self.0)
        }

        /// 投影到 XY 平面。
        #[inline]
        pub fn xy(self) -> Point2 {
            Point2::new(self.0.x, self.0.y)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn zero() -> Self {
            Self(DVec3::ZERO)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    /// 轴对齐边界框，用于实体范围与视图范围的判定。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        pub fn from_points<I>(points: I) -> Self
        where
            I: IntoIterator<Item = Point2>,
        {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(point);
            }
            bounds
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        /// 闭区间相交判定，边界接触也视为相交。
        pub fn intersects(&self, other: &Bounds2D) -> bool {
            if self.is_empty() || other.is_empty() {
                return false;
            }
            self.min.x() <= other.max.x()
                && other.min.x() <= self.max.x()
                && self.min.y() <= other.max.y()
                && other.min.y() <= self.max.y()
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }
    }

}

pub mod document {
    use std::collections::HashMap;
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::frame::ViewportState;
    use crate::geometry::{Bounds2D, Point2, Point3};

    /// 圆在相交判定中离散化的边数。
    const CIRCLE_SEGMENTS: usize = 64;

    /// 实体句柄，由宿主分配，在一次会话内唯一。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityHandle(u64);

    impl EntityHandle {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    impl fmt::Display for EntityHandle {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:X}", self.0)
        }
    }

    /// 绘图空间：模型空间或图纸空间。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Space {
        Model,
        Paper,
    }

    impl fmt::Display for Space {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Space::Model => f.write_str("model"),
                Space::Paper => f.write_str("paper"),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum EntityKind {
        Line,
        Circle,
        Polyline,
        Text,
        BlockReference,
        Viewport,
    }

    impl EntityKind {
        pub const ALL: [EntityKind; 6] = [
            EntityKind::Line,
            EntityKind::Circle,
            EntityKind::Polyline,
            EntityKind::Text,
            EntityKind::BlockReference,
            EntityKind::Viewport,
        ];

        /// 宿主使用的 DXF 类型名。
        pub fn type_name(self) -> &'static str {
            match self {
                EntityKind::Line => "LINE",
                EntityKind::Circle => "CIRCLE",
                EntityKind::Polyline => "LWPOLYLINE",
                EntityKind::Text => "TEXT",
                EntityKind::BlockReference => "INSERT",
                EntityKind::Viewport => "VIEWPORT",
            }
        }

        /// 按类型名解析，大小写不敏感；`POLYLINE` 与 `LWPOLYLINE` 等价。
        pub fn from_type_name(name: &str) -> Option<Self> {
            let upper = name.trim().to_ascii_uppercase();
            if upper == "POLYLINE" {
                return Some(EntityKind::Polyline);
            }
            Self::ALL
                .into_iter()
                .find(|kind| kind.type_name() == upper)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub is_visible: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                is_visible: true,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub layer: String,
    }

    /// 块参照。`outline` 为宿主计算出的外轮廓（世界坐标，按边界顺序）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockReference {
        pub name: String,
        pub insert: Point2,
        pub outline: Vec<Point2>,
        pub layer: String,
    }

    /// 图纸空间视口。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Viewport {
        /// 图纸空间中心点。
        pub center: Point3,
        pub width: f64,
        pub height: f64,
        pub custom_scale: f64,
        /// 模型空间视图中心。
        pub view_center: Point2,
        /// 非矩形裁剪边界，按宿主夹点的原始顺序保存。
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub clip: Option<Vec<Point3>>,
        pub layer: String,
    }

    impl Viewport {
        #[inline]
        pub fn state(&self) -> ViewportState {
            ViewportState {
                custom_scale: self.custom_scale,
                center_point: self.center,
                view_center: self.view_center,
            }
        }

        /// 返回宿主原始夹点顺序：矩形视口的对角点位于第二位。
        pub fn grip_points(&self) -> Vec<Point3> {
            if let Some(clip) = &self.clip {
                return clip.clone();
            }
            let half_w = self.width * 0.5;
            let half_h = self.height * 0.5;
            let (cx, cy, cz) = (self.center.x(), self.center.y(), self.center.z());
            vec![
                Point3::new(cx - half_w, cy - half_h, cz),
                Point3::new(cx + half_w, cy + half_h, cz),
                Point3::new(cx + half_w, cy - half_h, cz),
                Point3::new(cx - half_w, cy + half_h, cz),
            ]
        }

        fn frame_bounds(&self) -> Bounds2D {
            let half_w = self.width * 0.5;
            let half_h = self.height * 0.5;
            let center = self.center.xy();
            Bounds2D::new(
                Point2::new(center.x() - half_w, center.y() - half_h),
                Point2::new(center.x() + half_w, center.y() + half_h),
            )
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Polyline(Polyline),
        Text(Text),
        BlockReference(BlockReference),
        Viewport(Viewport),
    }

    impl Entity {
        pub fn kind(&self) -> EntityKind {
            match self {
                Entity::Line(_) => EntityKind::Line,
                Entity::Circle(_) => EntityKind::Circle,
                Entity::Polyline(_) => EntityKind::Polyline,
                Entity::Text(_) => EntityKind::Text,
                Entity::BlockReference(_) => EntityKind::BlockReference,
                Entity::Viewport(_) => EntityKind::Viewport,
            }
        }

        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Text(text) => &text.layer,
                Entity::BlockReference(reference) => &reference.layer,
                Entity::Viewport(viewport) => &viewport.layer,
            }
        }

        /// 计算实体的 2D 轴对齐范围，文本退化为插入点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let bounds = match self {
                Entity::Line(line) => Bounds2D::from_points([line.start, line.end]),
                Entity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    Bounds2D::new(
                        Point2::new(center.x() - radius, center.y() - radius),
                        Point2::new(center.x() + radius, center.y() + radius),
                    )
                }
                Entity::Polyline(polyline) => Bounds2D::from_points(polyline.vertices.iter().copied()),
                Entity::Text(text) => Bounds2D::from_points([text.insert]),
                Entity::BlockReference(reference) => {
                    let mut bounds = Bounds2D::from_points(reference.outline.iter().copied());
                    bounds.include_point(reference.insert);
                    bounds
                }
                Entity::Viewport(viewport) => viewport.frame_bounds(),
            };
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        /// 以折线段描述实体轮廓，供交叉选择判定使用。
        /// 点状实体返回起止相同的单个线段。
        pub fn outline_segments(&self) -> Vec<(Point2, Point2)> {
            match self {
                Entity::Line(line) => vec![(line.start, line.end)],
                Entity::Circle(circle) => {
                    let points: Vec<Point2> = (0..CIRCLE_SEGMENTS)
                        .map(|i| {
                            let angle = std::f64::consts::TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                            Point2::new(
                                circle.center.x() + circle.radius * angle.cos(),
                                circle.center.y() + circle.radius * angle.sin(),
                            )
                        })
                        .collect();
                    ring_segments(&points, true)
                }
                Entity::Polyline(polyline) => ring_segments(&polyline.vertices, polyline.is_closed),
                Entity::Text(text) => vec![(text.insert, text.insert)],
                Entity::BlockReference(reference) => {
                    if reference.outline.is_empty() {
                        vec![(reference.insert, reference.insert)]
                    } else {
                        ring_segments(&reference.outline, true)
                    }
                }
                Entity::Viewport(viewport) => {
                    let bounds = viewport.frame_bounds();
                    let (min, max) = (bounds.min(), bounds.max());
                    let corners = [
                        min,
                        Point2::new(max.x(), min.y()),
                        max,
                        Point2::new(min.x(), max.y()),
                    ];
                    ring_segments(&corners, true)
                }
            }
        }
    }

    fn ring_segments(points: &[Point2], closed: bool) -> Vec<(Point2, Point2)> {
        match points.len() {
            0 => Vec::new(),
            1 => vec![(points[0], points[0])],
            len => {
                let mut segments: Vec<(Point2, Point2)> =
                    points.windows(2).map(|pair| (pair[0], pair[1])).collect();
                if closed && len > 2 {
                    segments.push((points[len - 1], points[0]));
                }
                segments
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EntityEntry {
        pub handle: EntityHandle,
        pub space: Space,
        pub entity: Entity,
    }

    /// 内存中的实体库，实体按所属空间标记。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        entities: Vec<EntityEntry>,
        next_handle: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self {
                next_handle: 0x100,
                ..Self::default()
            };
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        pub fn add_line(
            &mut self,
            space: Space,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityHandle {
            let layer = layer.into();
            self.push(space, Entity::Line(Line { start, end, layer }))
        }

        pub fn add_circle(
            &mut self,
            space: Space,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityHandle {
            let layer = layer.into();
            self.push(
                space,
                Entity::Circle(Circle {
                    center,
                    radius: radius.abs(),
                    layer,
                }),
            )
        }

        pub fn add_polyline<I>(
            &mut self,
            space: Space,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityHandle
        where
            I: IntoIterator<Item = Point2>,
        {
            let layer = layer.into();
            self.push(
                space,
                Entity::Polyline(Polyline {
                    vertices: vertices.into_iter().collect(),
                    is_closed,
                    layer,
                }),
            )
        }

        pub fn add_text(
            &mut self,
            space: Space,
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            layer: impl Into<String>,
        ) -> EntityHandle {
            let layer = layer.into();
            self.push(
                space,
                Entity::Text(Text {
                    insert,
                    content: content.into(),
                    height,
                    layer,
                }),
            )
        }

        pub fn add_block_reference<I>(
            &mut self,
            space: Space,
            name: impl Into<String>,
            insert: Point2,
            outline: I,
            layer: impl Into<String>,
        ) -> EntityHandle
        where
            I: IntoIterator<Item = Point2>,
        {
            let layer = layer.into();
            self.push(
                space,
                Entity::BlockReference(BlockReference {
                    name: name.into(),
                    insert,
                    outline: outline.into_iter().collect(),
                    layer,
                }),
            )
        }

        /// 视口总是位于图纸空间。
        pub fn add_viewport(&mut self, viewport: Viewport) -> EntityHandle {
            self.push(Space::Paper, Entity::Viewport(viewport))
        }

        /// 删除实体并返回其内容。
        pub fn erase(&mut self, handle: EntityHandle) -> Option<Entity> {
            let index = self.entities.iter().position(|entry| entry.handle == handle)?;
            Some(self.entities.remove(index).entity)
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        /// 图层不存在时返回 `false`。
        pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> bool {
            match self.layers.get_mut(name) {
                Some(layer) => {
                    layer.is_visible = visible;
                    true
                }
                None => false,
            }
        }

        /// 未登记的图层视为可见。
        pub fn is_layer_visible(&self, name: &str) -> bool {
            self.layers.get(name).is_none_or(|layer| layer.is_visible)
        }

        #[inline]
        pub fn entries(&self) -> impl Iterator<Item = &EntityEntry> {
            self.entities.iter()
        }

        /// 指定空间内的实体。
        pub fn entries_in(&self, space: Space) -> impl Iterator<Item = &EntityEntry> {
            self.entities.iter().filter(move |entry| entry.space == space)
        }

        #[inline]
        pub fn entry(&self, handle: EntityHandle) -> Option<&EntityEntry> {
            self.entities.iter().find(|entry| entry.handle == handle)
        }

        #[inline]
        pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
            self.entry(handle).map(|entry| &entry.entity)
        }

        pub fn viewports(&self) -> impl Iterator<Item = (EntityHandle, &Viewport)> {
            self.entities.iter().filter_map(|entry| match &entry.entity {
                Entity::Viewport(viewport) => Some((entry.handle, viewport)),
                _ => None,
            })
        }

        fn push(&mut self, space: Space, entity: Entity) -> EntityHandle {
            self.ensure_layer(entity.layer_name());
            let handle = self.next_handle();
            self.entities.push(EntityEntry {
                handle,
                space,
                entity,
            });
            handle
        }

        #[inline]
        fn next_handle(&mut self) -> EntityHandle {
            let handle = self.next_handle;
            self.next_handle += 1;
            EntityHandle(handle)
        }
    }

}
