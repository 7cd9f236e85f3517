/// Append-only list of the points an avatar has printed.
///
/// The world's trail bodies mirror these points; clearing here only resets
/// the bookkeeping (and the gap-distance anchor), the lethal bodies stay in
/// the spatial index until the whole world is cleared.
#[derive(Debug, Default)]
pub struct Trail {
    points: Vec<(f64, f64)>,
    last: Option<(f64, f64)>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
        self.last = Some((x, y));
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.last
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.last = None;
    }
}
