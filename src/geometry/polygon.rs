//! ROI polygons, bounding rectangles and scanline rasterization

/// Integer pixel coordinate as `[x, y]`
pub type Point = [i32; 2];

/// Axis-aligned rectangle in pixel coordinates
///
/// `x`/`y` are inclusive, `width`/`height` count pixels, matching the
/// bounding rectangle convention used by common raster libraries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingRect {
    /// Leftmost column
    pub x: i32,
    /// Topmost row
    pub y: i32,
    /// Number of columns covered
    pub width: i32,
    /// Number of rows covered
    pub height: i32,
}

impl BoundingRect {
    /// One past the last covered row
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// One past the last covered column
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Test whether row `y` falls inside the rectangle
    pub const fn contains_row(&self, y: i32) -> bool {
        y >= self.y && y < self.bottom()
    }

    /// Intersect with an image of `rows` x `cols` pixels
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clip(&self, rows: usize, cols: usize) -> Option<Self> {
        let max_y = i32::try_from(rows).unwrap_or(i32::MAX);
        let max_x = i32::try_from(cols).unwrap_or(i32::MAX);

        let x = self.x.max(0);
        let y = self.y.max(0);
        let right = self.right().min(max_x);
        let bottom = self.bottom().min(max_y);

        (right > x && bottom > y).then_some(Self {
            x,
            y,
            width: right - x,
            height: bottom - y,
        })
    }
}

/// Closed polygon outlining one LED footprint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Create a polygon from its vertices in drawing order
    pub const fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Vertices in drawing order
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Smallest rectangle containing every vertex
    pub fn bounding_rect(&self) -> Option<BoundingRect> {
        let first = self.vertices.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first[0], first[1], first[0], first[1]);
        for &[x, y] in &self.vertices {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Some(BoundingRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Twice the enclosed area (shoelace formula), always non-negative
    pub fn doubled_area(&self) -> i64 {
        self.edges()
            .map(|(a, b)| i64::from(a[0]) * i64::from(b[1]) - i64::from(b[0]) * i64::from(a[1]))
            .sum::<i64>()
            .abs()
    }

    /// A polygon needs three vertices and a non-zero area to cover an LED
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3 || self.doubled_area() == 0
    }

    /// Shift every vertex by `(dx, dy)`
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|&[x, y]| [x + dx, y + dy])
                .collect(),
        }
    }

    /// Iterate closed edges as `(start, end)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.vertices
            .iter()
            .copied()
            .zip(self.vertices.iter().copied().cycle().skip(1))
    }

    /// Column spans filled in row `y`, boundary included
    ///
    /// Interior spans follow the even-odd rule sampled at pixel centres;
    /// every edge additionally contributes the pixels it passes through in
    /// this row so thin and sloped outlines stay closed. Spans are inclusive
    /// and may overlap.
    pub fn row_spans(&self, y: i32) -> Vec<(i32, i32)> {
        let yf = f64::from(y);
        let mut spans = Vec::new();
        let mut crossings = Vec::new();

        for (a, b) in self.edges() {
            if a[1] == b[1] {
                if a[1] == y {
                    spans.push((a[0].min(b[0]), a[0].max(b[0])));
                }
                continue;
            }

            let (lo, hi) = if a[1] < b[1] { (a, b) } else { (b, a) };
            if y < lo[1] || y > hi[1] {
                continue;
            }

            let (lo_x, lo_y) = (f64::from(lo[0]), f64::from(lo[1]));
            let (hi_x, hi_y) = (f64::from(hi[0]), f64::from(hi[1]));
            let slope = (hi_x - lo_x) / (hi_y - lo_y);

            // Pixels the outline passes through inside this row's band
            let band_top = (yf - 0.5).max(lo_y);
            let band_bottom = (yf + 0.5).min(hi_y);
            let x_top = (band_top - lo_y).mul_add(slope, lo_x);
            let x_bottom = (band_bottom - lo_y).mul_add(slope, lo_x);
            spans.push((
                x_top.min(x_bottom).round() as i32,
                x_top.max(x_bottom).round() as i32,
            ));

            // Half-open on y so shared vertices are counted once
            if y < hi[1] {
                crossings.push((yf - lo_y).mul_add(slope, lo_x));
            }
        }

        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks_exact(2) {
            if let [left, right] = pair {
                spans.push((left.ceil() as i32, right.floor() as i32));
            }
        }

        spans.retain(|(left, right)| left <= right);
        spans
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(vertices: Vec<Point>) -> Self {
        Self::new(vertices)
    }
}
