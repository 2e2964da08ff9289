use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use super::frame_clock::FrameClock;
use super::relay::{
    ExceptionRelay, FaultHandler, PacerFault, default_fault_handler,
    spawn_listener,
};
use super::timer::ensure_high_res_timer;
use crate::error::{FrameError, SurfaceError};
use crate::framework::util::AtomicF32;

pub const MIN_FRAME_RATE: f32 = 1.0;
pub const MAX_FRAME_RATE: f32 = 1000.0;
pub const DEFAULT_FRAME_RATE: f32 = 60.0;

/// Whatever owns the rendering context and knows how to draw one frame.
pub trait FrameTarget: Send + 'static {
    fn produce_frame(&mut self) -> Result<(), FrameError>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PacerState {
    Running,
    Paused,
    Stopped,
}

type Task<T> = Box<dyn FnOnce(&mut T) + Send>;

enum Message<T> {
    Task(Task<T>),
    Wake,
    Stop,
}

struct Control<T> {
    state: PacerState,
    tasks: Option<Sender<Message<T>>>,
    worker: Option<ThreadId>,
    generation: u64,
}

struct Core<T> {
    target: Mutex<Option<T>>,
    control: Mutex<Control<T>>,
    frames: AtomicU64,
    measured_fps: AtomicF32,
}

thread_local! {
    static ACTIVE_CONTEXTS: RefCell<Vec<usize>> = const {
        RefCell::new(Vec::new())
    };
}

// Marks a context as entered on this thread for re-entrancy checks.
struct ActiveScope(usize);

impl ActiveScope {
    fn enter(id: usize) -> Self {
        ACTIVE_CONTEXTS.with(|active| active.borrow_mut().push(id));
        Self(id)
    }

    fn is_active(id: usize) -> bool {
        ACTIVE_CONTEXTS.with(|active| active.borrow().contains(&id))
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        ACTIVE_CONTEXTS.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|id| *id == self.0) {
                active.remove(pos);
            }
        });
    }
}

impl<T: FrameTarget> Core<T> {
    fn new(target: Option<T>) -> Self {
        Self {
            target: Mutex::new(target),
            control: Mutex::new(Control {
                state: PacerState::Stopped,
                tasks: None,
                worker: None,
                generation: 0,
            }),
            frames: AtomicU64::new(0),
            measured_fps: AtomicF32::new(0.0),
        }
    }

    fn id(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as *const () as usize
    }

    fn state(&self) -> PacerState {
        self.control.lock().state
    }

    // Sends while holding the control lock so that a retiring worker
    // either sees the message in its drain or the sender sees no channel.
    fn send(&self, message: Message<T>) -> Result<(), Message<T>> {
        let control = self.control.lock();
        if control.state == PacerState::Stopped {
            return Err(message);
        }

        match control.tasks.as_ref() {
            Some(tx) => tx.send(message).map_err(|err| err.0),
            None => Err(message),
        }
    }

    fn run_task(self: &Arc<Self>, task: Task<T>) {
        let mut guard = self.target.lock();
        let Some(target) = guard.as_mut() else {
            debug!("dropping context task, no target is bound");
            return;
        };

        let _scope = ActiveScope::enter(self.id());
        task(target);
    }

    fn produce_frame(self: &Arc<Self>) -> Result<(), PacerFault> {
        let mut guard = self.target.lock();
        let Some(target) = guard.as_mut() else {
            return Ok(());
        };

        let _scope = ActiveScope::enter(self.id());
        match panic::catch_unwind(AssertUnwindSafe(|| target.produce_frame())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(FrameError::Shutdown)) => Err(PacerFault::Shutdown),
            Ok(Err(FrameError::Failed(message))) => {
                Err(PacerFault::Failed(message))
            }
            Err(payload) => Err(PacerFault::Panicked(payload)),
        }
    }

    fn retire(self: &Arc<Self>, generation: u64, rx: &Receiver<Message<T>>) {
        {
            let mut control = self.control.lock();
            if control.generation == generation {
                control.state = PacerState::Stopped;
                control.tasks = None;
                control.worker = None;
            }
        }

        // Anything that made it into the channel still runs, on this thread.
        while let Ok(message) = rx.try_recv() {
            if let Message::Task(task) = message {
                self.run_task(task);
            }
        }
    }
}

/// Cloneable entry point for running work on whichever thread currently
/// owns the rendering context.
pub struct ContextHandle<T> {
    core: Arc<Core<T>>,
}

impl<T> Clone for ContextHandle<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T: FrameTarget> ContextHandle<T> {
    /// Runs `f` to completion against the context. While the pacer is
    /// animating, `f` is queued onto the pacer thread and serialized with
    /// frame production; otherwise it runs on the calling thread under the
    /// context lock. Blocks until `f` has returned. A panic inside `f` is
    /// resumed on the calling thread.
    pub fn render<R, F>(&self, f: F) -> Result<R, SurfaceError>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        if ActiveScope::is_active(self.core.id()) {
            return Err(SurfaceError::Reentrant);
        }

        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let task: Task<T> = Box::new(move |target| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(target)));
            let _ = done_tx.send(result);
        });

        if let Err(Message::Task(task)) =
            self.core.send(Message::Task(task))
        {
            if self.core.target.lock().is_none() {
                return Err(SurfaceError::NotInitialized);
            }
            self.core.run_task(task);
        }

        match done_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(SurfaceError::ContextLost),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.core.target.lock().is_some()
    }

    pub fn state(&self) -> PacerState {
        self.core.state()
    }

    pub fn frame_count(&self) -> u64 {
        self.core.frames.load(Ordering::Relaxed)
    }
}

struct Worker {
    handle: JoinHandle<()>,
    thread_id: ThreadId,
    relay: Arc<ExceptionRelay>,
    listener: JoinHandle<()>,
}

// Waits for the fault listener so a relayed fault has reached its handler
// by the time the pacer reports stopped.
fn join_listener(listener: JoinHandle<()>) {
    if thread::current().id() != listener.thread().id()
        && listener.join().is_err()
    {
        debug!("fault listener re-raised a pacer fault");
    }
}

/// Dedicated frame-pacing thread. At most one worker thread exists per
/// pacer; the context it drives is shared with [`ContextHandle`]s.
pub struct FramePacer<T: FrameTarget> {
    core: Arc<Core<T>>,
    fps: f32,
    name: String,
    fault_handler: FaultHandler,
    worker: Option<Worker>,
}

impl<T: FrameTarget> Default for FramePacer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FrameTarget> FramePacer<T> {
    pub fn new() -> Self {
        Self::from_core(Core::new(None))
    }

    pub fn with_target(target: T) -> Self {
        Self::from_core(Core::new(Some(target)))
    }

    fn from_core(core: Core<T>) -> Self {
        Self {
            core: Arc::new(core),
            fps: DEFAULT_FRAME_RATE,
            name: "easel-animation".to_string(),
            fault_handler: default_fault_handler(),
            worker: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Installs the target, returning the previous one.
    pub fn bind(&self, target: T) -> Option<T> {
        self.core.target.lock().replace(target)
    }

    pub fn unbind(&mut self) -> Option<T> {
        self.stop();
        self.core.target.lock().take()
    }

    pub fn handle(&self) -> ContextHandle<T> {
        ContextHandle {
            core: self.core.clone(),
        }
    }

    pub fn set_fault_handler(&mut self, handler: FaultHandler) {
        self.fault_handler = handler;
    }

    pub fn render<R, F>(&self, f: F) -> Result<R, SurfaceError>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle().render(f)
    }

    /// Spawns the pacer thread. No-op (returns false) while a pacer is
    /// already running or paused.
    pub fn start(&mut self) -> Result<bool, SurfaceError> {
        if self.worker.is_some() && !self.is_stopped() {
            return Ok(false);
        }
        self.reap();

        if !self.handle().is_bound() {
            return Err(SurfaceError::NotInitialized);
        }

        ensure_high_res_timer();

        let relay = Arc::new(ExceptionRelay::new());
        let (tx, rx) = mpsc::channel();
        let generation = {
            let mut control = self.core.control.lock();
            control.generation += 1;
            control.state = PacerState::Running;
            control.tasks = Some(tx);
            control.generation
        };

        let spawned = spawn_listener(relay.clone(), self.fault_handler.clone())
            .and_then(|listener| {
                let core = self.core.clone();
                let relay = relay.clone();
                let fps = self.fps;
                thread::Builder::new()
                    .name(self.name.clone())
                    .spawn(move || {
                        run_worker(core, rx, relay, fps, generation)
                    })
                    .map(|handle| (handle, listener))
            });

        let (handle, listener) = match spawned {
            Ok(spawned) => spawned,
            Err(err) => {
                relay.interrupt();
                let mut control = self.core.control.lock();
                control.state = PacerState::Stopped;
                control.tasks = None;
                return Err(SurfaceError::Context(format!(
                    "failed to spawn pacer thread: {}",
                    err
                )));
            }
        };

        let thread_id = handle.thread().id();
        {
            let mut control = self.core.control.lock();
            if control.generation == generation
                && control.state != PacerState::Stopped
            {
                control.worker = Some(thread_id);
            }
        }

        info!("pacer started at {} fps", self.fps);
        self.worker = Some(Worker {
            handle,
            thread_id,
            relay,
            listener,
        });

        Ok(true)
    }

    pub fn pause(&self) {
        if self.worker.is_none() {
            return;
        }

        let changed = {
            let mut control = self.core.control.lock();
            if control.state == PacerState::Running {
                control.state = PacerState::Paused;
                true
            } else {
                false
            }
        };

        if changed {
            let _ = self.core.send(Message::Wake);
        }
    }

    pub fn resume(&self) {
        if self.worker.is_none() {
            return;
        }

        let changed = {
            let mut control = self.core.control.lock();
            if control.state == PacerState::Paused {
                control.state = PacerState::Running;
                true
            } else {
                false
            }
        };

        if changed {
            let _ = self.core.send(Message::Wake);
        }
    }

    /// Halts the pacer and interrupts its fault listener. Returns whether a
    /// live pacer was actually stopped. Safe to call repeatedly and from any
    /// thread.
    ///
    /// The worker is joined before the listener is interrupted, so a fault
    /// raised by the frame in flight still reaches the handler.
    pub fn stop(&mut self) -> bool {
        let Some(Worker {
            handle,
            thread_id,
            relay,
            listener,
        }) = self.worker.take()
        else {
            return false;
        };

        let was_live = {
            let control = self.core.control.lock();
            control.state != PacerState::Stopped
        };
        let _ = self.core.send(Message::Stop);
        {
            let mut control = self.core.control.lock();
            control.state = PacerState::Stopped;
        }

        if thread::current().id() != thread_id && handle.join().is_err() {
            warn!("pacer thread panicked outside of frame production");
        }
        relay.interrupt();
        join_listener(listener);

        if was_live {
            debug!("pacer stopped");
        }
        was_live
    }

    pub fn is_stopped(&self) -> bool {
        self.worker.is_none() || self.core.state() == PacerState::Stopped
    }

    pub fn is_paused(&self) -> bool {
        self.worker.is_some() && self.core.state() == PacerState::Paused
    }

    pub fn state(&self) -> PacerState {
        if self.worker.is_none() {
            PacerState::Stopped
        } else {
            self.core.state()
        }
    }

    pub fn frame_rate(&self) -> f32 {
        self.fps
    }

    /// Clamps to `[MIN_FRAME_RATE, MAX_FRAME_RATE]` and restarts a live
    /// pacer at the new rate instead of retiming it in flight.
    pub fn set_frame_rate(&mut self, fps: f32) -> Result<f32, SurfaceError> {
        let fps = clamp_frame_rate(fps);
        self.fps = fps;

        if self.worker.is_some() {
            let previous = self.state();
            self.stop();

            if previous != PacerState::Stopped {
                self.start()?;
                if previous == PacerState::Paused {
                    self.pause();
                }
            }
        }

        Ok(fps)
    }

    pub fn frame_count(&self) -> u64 {
        self.core.frames.load(Ordering::Relaxed)
    }

    pub fn average_fps(&self) -> f32 {
        self.core.measured_fps.load(Ordering::Relaxed)
    }

    /// The fault relay of the current pacer lifetime, if any.
    pub fn relay(&self) -> Option<Arc<ExceptionRelay>> {
        self.worker.as_ref().map(|worker| worker.relay.clone())
    }

    // Joins a worker that already ended on its own (fault or shutdown).
    fn reap(&mut self) {
        if let Some(worker) = self.worker.take() {
            if thread::current().id() != worker.thread_id {
                let _ = worker.handle.join();
            }
            worker.relay.interrupt();
            join_listener(worker.listener);
        }
    }
}

impl<T: FrameTarget> Drop for FramePacer<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn clamp_frame_rate(fps: f32) -> f32 {
    if fps.is_nan() || fps < MIN_FRAME_RATE {
        warn!(
            "frame rate {} is below the minimum of {}; running at {} fps",
            fps, MIN_FRAME_RATE, MIN_FRAME_RATE
        );
        MIN_FRAME_RATE
    } else if fps > MAX_FRAME_RATE {
        warn!(
            "frame rate {} is above the maximum of {}; running at {} fps",
            fps, MAX_FRAME_RATE, MAX_FRAME_RATE
        );
        MAX_FRAME_RATE
    } else {
        fps
    }
}

fn run_worker<T: FrameTarget>(
    core: Arc<Core<T>>,
    rx: Receiver<Message<T>>,
    relay: Arc<ExceptionRelay>,
    fps: f32,
    generation: u64,
) {
    let mut clock = FrameClock::new(fps);
    let mut resuming = false;

    loop {
        let message = match core.state() {
            PacerState::Stopped => break,
            PacerState::Paused => {
                rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
            }
            PacerState::Running => {
                let wait = clock
                    .next_deadline()
                    .saturating_duration_since(Instant::now());
                rx.recv_timeout(wait)
            }
        };

        match message {
            Ok(Message::Task(task)) => core.run_task(task),
            Ok(Message::Wake) | Err(RecvTimeoutError::Timeout) => {}
            Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }

        match core.state() {
            PacerState::Stopped => break,
            PacerState::Paused => {
                resuming = true;
                continue;
            }
            PacerState::Running => {}
        }

        if resuming {
            resuming = false;
            clock.reset(Instant::now());
            continue;
        }

        let tick = clock.tick(Instant::now());
        if !tick.should_render {
            continue;
        }
        if tick.frames_due > 1 {
            trace!("pacer behind, skipping {} frames", tick.frames_due - 1);
        }

        match core.produce_frame() {
            Ok(()) => {
                core.frames.fetch_add(1, Ordering::Relaxed);
                core.measured_fps
                    .store(clock.average_fps(), Ordering::Relaxed);
            }
            Err(fault) => {
                if !fault.is_shutdown() {
                    warn!("pacer halted by fault: {}", fault);
                }
                relay.post(fault);
                break;
            }
        }
    }

    core.retire(generation, &rx);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Counter {
        frames: Arc<AtomicUsize>,
    }

    impl FrameTarget for Counter {
        fn produce_frame(&mut self) -> Result<(), FrameError> {
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn clamps_frame_rate_bounds() {
        assert_eq!(clamp_frame_rate(0.0), MIN_FRAME_RATE);
        assert_eq!(clamp_frame_rate(-30.0), MIN_FRAME_RATE);
        assert_eq!(clamp_frame_rate(f32::NAN), MIN_FRAME_RATE);
        assert_eq!(clamp_frame_rate(2000.0), MAX_FRAME_RATE);
        assert_eq!(clamp_frame_rate(24.0), 24.0);
    }

    #[test]
    fn stop_without_start_returns_false() {
        let mut pacer = FramePacer::with_target(Counter::default());
        assert!(pacer.is_stopped());
        assert!(!pacer.stop());
        assert!(!pacer.stop());
    }

    #[test]
    fn start_requires_a_bound_target() {
        let mut pacer = FramePacer::<Counter>::new();
        assert!(matches!(pacer.start(), Err(SurfaceError::NotInitialized)));
    }

    #[test]
    fn pause_and_resume_before_start_are_noops() {
        let pacer = FramePacer::with_target(Counter::default());
        pacer.pause();
        pacer.resume();
        assert_eq!(pacer.state(), PacerState::Stopped);
    }

    #[test]
    fn start_is_idempotent_and_produces_frames() {
        let counter = Counter::default();
        let frames = counter.frames.clone();
        let mut pacer = FramePacer::with_target(counter);
        pacer.set_frame_rate(200.0).unwrap();

        assert!(pacer.start().unwrap());
        assert!(!pacer.start().unwrap());
        assert!(wait_for(|| frames.load(Ordering::SeqCst) >= 3));

        assert!(pacer.stop());
        assert!(!pacer.stop());
        assert!(pacer.is_stopped());
    }

    #[test]
    fn paused_pacer_produces_no_frames() {
        let counter = Counter::default();
        let frames = counter.frames.clone();
        let mut pacer = FramePacer::with_target(counter);
        pacer.set_frame_rate(500.0).unwrap();
        pacer.start().unwrap();
        assert!(wait_for(|| frames.load(Ordering::SeqCst) >= 1));

        pacer.pause();
        assert!(pacer.is_paused());
        // Let an in-flight frame settle before sampling.
        thread::sleep(Duration::from_millis(20));
        let paused_at = frames.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(frames.load(Ordering::SeqCst), paused_at);

        pacer.resume();
        assert!(wait_for(|| frames.load(Ordering::SeqCst) > paused_at));
        pacer.stop();
    }

    #[test]
    fn set_frame_rate_restarts_with_clamped_rate() {
        let mut pacer = FramePacer::with_target(Counter::default());
        pacer.set_frame_rate(60.0).unwrap();
        pacer.start().unwrap();

        assert_eq!(pacer.set_frame_rate(2000.0).unwrap(), MAX_FRAME_RATE);
        assert_eq!(pacer.frame_rate(), MAX_FRAME_RATE);
        assert_eq!(pacer.state(), PacerState::Running);

        assert_eq!(pacer.set_frame_rate(0.5).unwrap(), MIN_FRAME_RATE);
        assert_eq!(pacer.state(), PacerState::Running);
        pacer.stop();
    }

    #[test]
    fn set_frame_rate_keeps_paused_pacer_paused() {
        let mut pacer = FramePacer::with_target(Counter::default());
        pacer.start().unwrap();
        pacer.pause();

        pacer.set_frame_rate(30.0).unwrap();
        assert_eq!(pacer.state(), PacerState::Paused);
        pacer.stop();
    }

    #[test]
    fn render_runs_inline_when_not_animating() {
        let pacer = FramePacer::with_target(Counter::default());
        let caller = thread::current().id();

        let ran_on = pacer.render(|_| thread::current().id()).unwrap();
        assert_eq!(ran_on, caller);
    }

    #[test]
    fn render_runs_on_pacer_thread_while_animating() {
        let mut pacer = FramePacer::with_target(Counter::default())
            .with_name("pacer-under-test");
        pacer.start().unwrap();

        let name = pacer
            .render(|_| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(name.as_deref(), Some("pacer-under-test"));
        pacer.stop();
    }

    #[test]
    fn nested_render_is_rejected() {
        let pacer = FramePacer::with_target(Counter::default());
        let handle = pacer.handle();

        let nested = pacer
            .render(move |_| {
                matches!(handle.render(|_| ()), Err(SurfaceError::Reentrant))
            })
            .unwrap();
        assert!(nested);
    }

    struct SlowFailure {
        entered: Arc<AtomicUsize>,
    }

    impl FrameTarget for SlowFailure {
        fn produce_frame(&mut self) -> Result<(), FrameError> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Err(FrameError::Failed("late failure".into()))
        }
    }

    #[test]
    fn fault_in_flight_during_stop_reaches_handler() {
        let entered = Arc::new(AtomicUsize::new(0));
        let mut pacer = FramePacer::with_target(SlowFailure {
            entered: entered.clone(),
        });
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        pacer.set_fault_handler(Arc::new(move |fault: PacerFault| {
            let _ = tx.lock().send(fault.message());
        }));

        pacer.start().unwrap();
        assert!(wait_for(|| entered.load(Ordering::SeqCst) > 0));
        pacer.stop();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).as_deref(),
            Ok("late failure")
        );
    }

    #[test]
    fn render_before_bind_reports_not_initialized() {
        let pacer = FramePacer::<Counter>::new();
        assert!(matches!(
            pacer.render(|_| ()),
            Err(SurfaceError::NotInitialized)
        ));
    }
}
