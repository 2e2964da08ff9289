use std::sync::Once;

static HIGH_RES_TIMER: Once = Once::new();

/// Windows drops to a coarse scheduler tick unless some thread keeps a
/// sleep pending for a duration that is not a multiple of 10 ms. The helper
/// thread parks in such a sleep forever; it is never joined.
pub fn ensure_high_res_timer() {
    HIGH_RES_TIMER.call_once(|| {
        if !cfg!(target_os = "windows") {
            return;
        }

        let spawned = std::thread::Builder::new()
            .name("easel-high-res-timer".to_string())
            .spawn(|| {
                loop {
                    std::thread::sleep(std::time::Duration::from_millis(
                        i32::MAX as u64 - 1,
                    ));
                }
            });

        if let Err(err) = spawned {
            log::warn!("failed to start high resolution timer thread: {}", err);
        }
    });
}
