const PRINT_DISTANCE: f64 = 60.0;
const HOLE_DISTANCE: f64 = 5.0;

/// Budget tracker that toggles an avatar's printing on and off to carve
/// gaps into the trail. The avatar drives it: every frame the travelled
/// distance is subtracted from the budget, and at zero the printing state
/// flips and a fresh budget is sampled.
#[derive(Debug, Default)]
pub struct PrintManager {
    pub active: bool,
    pub last: (f64, f64),
    pub distance: f64,
}

impl PrintManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance until the next toggle, given the state just entered.
    pub fn sample(&self, printing: bool) -> f64 {
        if printing {
            PRINT_DISTANCE * (0.3 + rand::random::<f64>() * 0.7)
        } else {
            HOLE_DISTANCE * (0.8 + rand::random::<f64>() * 0.5)
        }
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.distance = 0.0;
        self.last = (0.0, 0.0);
    }
}
