#![allow(dead_code)]

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use easel::prelude::*;

/// GPU-backed tests need a real adapter, so they only run when
/// `EASEL_RUN_GPU_TESTS=1`.
pub fn gpu_tests_enabled() -> bool {
    env::var("EASEL_RUN_GPU_TESTS").is_ok_and(|value| value == "1")
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Fills the canvas with one color and counts draws. Optionally asks to
/// exit, or fails, after a number of frames.
pub struct Fill {
    pub color: Rgba,
    pub draws: Arc<AtomicU64>,
    pub exit_after: Option<u64>,
    pub fail_after: Option<u64>,
}

impl Fill {
    pub fn new(color: Rgba) -> Self {
        Self {
            color,
            draws: Arc::new(AtomicU64::new(0)),
            exit_after: None,
            fail_after: None,
        }
    }
}

impl RasterRenderer for Fill {
    fn draw(&mut self, canvas: &mut PixelBuffer) -> Result<(), String> {
        let draws = self.draws.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_after.is_some_and(|limit| draws > limit) {
            return Err(format!("fill failed on draw {}", draws));
        }

        canvas.fill(self.color);
        Ok(())
    }

    fn exit_requested(&self) -> bool {
        self.exit_after
            .is_some_and(|limit| self.draws.load(Ordering::SeqCst) >= limit)
    }
}
