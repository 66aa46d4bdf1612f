//! Lateral polygons, vertical bands, and block positions.
//!
//! Zones are vertical prisms: a 2D polygon in the `(x, z)` plane extruded
//! over a `(floor, ceiling)` band of heights. Heights follow the Minecraft
//! convention where `y` is up.

use smallvec::SmallVec;

use crate::error::{ZoneError, ZoneResult};

/// Default floor for new zones.
pub const DEFAULT_FLOOR: i32 = 0;

/// Default ceiling for new zones.
pub const DEFAULT_CEILING: i32 = 128;

/// A block position in a world. `y` is the height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing a continuous world position.
    #[must_use]
    pub fn from_world(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
            z: z.floor() as i32,
        }
    }
}

/// A polygon vertex in the lateral `(x, z)` plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Vertex {
    pub x: i32,
    pub z: i32,
}

impl Vertex {
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Ordered vertex ring. The closing edge from the last vertex back to the
/// first is implicit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Polygon {
    vertices: SmallVec<[Vertex; 8]>,
}

impl Polygon {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex.
    pub fn push(&mut self, vertex: Vertex) {
        self.vertices.push(vertex);
    }

    /// Remove every vertex.
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Even-odd (crossing number) containment test.
    ///
    /// Casts a ray towards `+x` and counts edge crossings. Uses exact integer
    /// arithmetic, so results do not depend on float rounding. Polygons with
    /// fewer than three vertices contain nothing.
    #[must_use]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let (px, pz) = (i128::from(x), i128::from(z));
        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let (xi, zi) = (i128::from(self.vertices[i].x), i128::from(self.vertices[i].z));
            let (xj, zj) = (i128::from(self.vertices[j].x), i128::from(self.vertices[j].z));

            // Edge straddles the horizontal line through the point
            if (zi > pz) != (zj > pz) {
                // px < intercept, multiplied through by (zj - zi)
                let lhs = (px - xi) * (zj - zi);
                let rhs = (xj - xi) * (pz - zi);
                let crosses = if zj > zi { lhs < rhs } else { lhs > rhs };
                if crosses {
                    inside = !inside;
                }
            }
            j = i;
        }

        inside
    }

    /// Twice the enclosed area (shoelace formula), always non-negative.
    #[must_use]
    pub fn area2(&self) -> u128 {
        let n = self.vertices.len();
        if n < 3 {
            return 0;
        }

        let mut sum: i128 = 0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            sum += i128::from(a.x) * i128::from(b.z) - i128::from(b.x) * i128::from(a.z);
        }
        sum.unsigned_abs()
    }
}

impl FromIterator<Vertex> for Polygon {
    fn from_iter<I: IntoIterator<Item = Vertex>>(iter: I) -> Self {
        Self {
            vertices: iter.into_iter().collect(),
        }
    }
}

/// Height range with `floor <= ceiling`. Containment is strict on both sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VerticalBand {
    floor: i32,
    ceiling: i32,
}

impl VerticalBand {
    /// Create a band, rejecting `floor > ceiling`.
    pub fn new(floor: i32, ceiling: i32) -> ZoneResult<Self> {
        if floor > ceiling {
            return Err(ZoneError::InvalidBounds { floor, ceiling });
        }
        Ok(Self { floor, ceiling })
    }

    #[inline]
    #[must_use]
    pub const fn floor(&self) -> i32 {
        self.floor
    }

    #[inline]
    #[must_use]
    pub const fn ceiling(&self) -> i32 {
        self.ceiling
    }

    /// This band with a new ceiling, validated against the current floor.
    pub fn with_ceiling(self, ceiling: i32) -> ZoneResult<Self> {
        Self::new(self.floor, ceiling)
    }

    /// This band with a new floor, validated against the current ceiling.
    pub fn with_floor(self, floor: i32) -> ZoneResult<Self> {
        Self::new(floor, self.ceiling)
    }

    /// `floor < y < ceiling`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, y: i32) -> bool {
        self.floor < y && y < self.ceiling
    }
}

impl Default for VerticalBand {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR,
            ceiling: DEFAULT_CEILING,
        }
    }
}
