use easel::prelude::*;

const SIZE: f64 = 24.0;

/// A square bouncing around a software canvas. Coordinates are logical;
/// the canvas maps them onto physical pixels.
pub struct Bounce {
    x: f64,
    y: f64,
    dx: f64,
    dy: f64,
    limit: Option<u64>,
    drawn: u64,
}

impl Bounce {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            x: 10.0,
            y: 30.0,
            dx: 3.0,
            dy: 2.0,
            limit,
            drawn: 0,
        }
    }

    pub fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl RasterRenderer for Bounce {
    fn resized(&mut self, canvas: &mut PixelBuffer) {
        debug!(
            "bounce canvas is now {}x{} at scale {}",
            canvas.width(),
            canvas.height(),
            canvas.scale()
        );
    }

    fn draw(&mut self, canvas: &mut PixelBuffer) -> Result<(), String> {
        let width = canvas.width() as f64 / canvas.scale();
        let height = canvas.height() as f64 / canvas.scale();

        self.x += self.dx;
        self.y += self.dy;
        if self.x <= 0.0 || self.x + SIZE >= width {
            self.dx = -self.dx;
            self.x = self.x.clamp(0.0, (width - SIZE).max(0.0));
        }
        if self.y <= 0.0 || self.y + SIZE >= height {
            self.dy = -self.dy;
            self.y = self.y.clamp(0.0, (height - SIZE).max(0.0));
        }

        canvas.fill(Rgba::gray(24));
        let color = Rgba::new(240, 180, 40, 255);
        canvas.fill_rect(self.x, self.y, SIZE, SIZE, color);
        self.drawn += 1;
        Ok(())
    }

    fn exit_requested(&self) -> bool {
        self.limit.is_some_and(|limit| self.drawn >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_inside_the_canvas() {
        let mut canvas = PixelBuffer::new(60, 40, 1.0);
        let mut bounce = Bounce::new(Some(200));

        for _ in 0..200 {
            bounce.draw(&mut canvas).unwrap();
            assert!(bounce.x >= 0.0 && bounce.x + SIZE <= 60.0);
            assert!(bounce.y >= 0.0 && bounce.y + SIZE <= 40.0);
        }
        assert!(bounce.exit_requested());
    }
}
