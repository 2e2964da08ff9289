use std::any::Any;
use std::fmt;
use std::io;
use std::panic;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error};
use parking_lot::{Condvar, Mutex};

use crate::framework::util::panic_message;

/// An error raised on the pacer thread while producing a frame.
pub enum PacerFault {
    /// Expected shutdown signal; the listener swallows it.
    Shutdown,
    Failed(String),
    Panicked(Box<dyn Any + Send>),
}

impl PacerFault {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, PacerFault::Shutdown)
    }

    pub fn message(&self) -> String {
        match self {
            PacerFault::Shutdown => "shutdown".to_string(),
            PacerFault::Failed(message) => message.clone(),
            PacerFault::Panicked(payload) => panic_message(payload.as_ref()),
        }
    }
}

impl fmt::Debug for PacerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacerFault::Shutdown => write!(f, "Shutdown"),
            PacerFault::Failed(message) => {
                f.debug_tuple("Failed").field(message).finish()
            }
            PacerFault::Panicked(payload) => f
                .debug_tuple("Panicked")
                .field(&panic_message(payload.as_ref()))
                .finish(),
        }
    }
}

impl fmt::Display for PacerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacerFault::Shutdown => write!(f, "pacer shut down"),
            PacerFault::Failed(message) => {
                write!(f, "frame failed: {}", message)
            }
            PacerFault::Panicked(payload) => {
                write!(f, "frame panicked: {}", panic_message(payload.as_ref()))
            }
        }
    }
}

#[derive(Debug)]
pub enum Relayed {
    Fault(PacerFault),
    Interrupted,
}

enum Slot {
    Empty,
    Posted(PacerFault),
    Drained,
    Interrupted,
}

/// Single-slot mailbox carrying the first pacer fault to a supervising
/// thread. A relay serves exactly one pacer lifetime: once a fault has been
/// posted, later posts are refused.
pub struct ExceptionRelay {
    slot: Mutex<Slot>,
    posted: Condvar,
}

impl Default for ExceptionRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionRelay {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            posted: Condvar::new(),
        }
    }

    /// Returns false when a fault was already posted for this lifetime.
    pub fn post(&self, fault: PacerFault) -> bool {
        let mut slot = self.slot.lock();

        match *slot {
            Slot::Empty | Slot::Interrupted => {
                *slot = Slot::Posted(fault);
                self.posted.notify_all();
                true
            }
            Slot::Posted(_) | Slot::Drained => {
                debug!(
                    "dropping pacer fault, one was already relayed: {}",
                    fault
                );
                false
            }
        }
    }

    /// Wakes a blocked listener without a fault. A fault that is already
    /// posted stays deliverable.
    pub fn interrupt(&self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Empty) {
            *slot = Slot::Interrupted;
        }
        self.posted.notify_all();
    }

    /// Blocks until a fault is posted or the relay is interrupted.
    pub fn wait(&self) -> Relayed {
        let mut slot = self.slot.lock();

        loop {
            match std::mem::replace(&mut *slot, Slot::Drained) {
                Slot::Posted(fault) => return Relayed::Fault(fault),
                Slot::Interrupted => {
                    *slot = Slot::Interrupted;
                    return Relayed::Interrupted;
                }
                Slot::Drained => return Relayed::Interrupted,
                Slot::Empty => {
                    *slot = Slot::Empty;
                    self.posted.wait(&mut slot);
                }
            }
        }
    }

    pub fn try_take(&self) -> Option<PacerFault> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Drained) {
            Slot::Posted(fault) => Some(fault),
            other => {
                *slot = other;
                None
            }
        }
    }
}

pub type FaultHandler = Arc<dyn Fn(PacerFault) + Send + Sync>;

/// Re-raises a fault on the calling thread so the process panic hook sees
/// it. This is the default listener behavior.
pub fn raise(fault: PacerFault) {
    match fault {
        PacerFault::Shutdown => {}
        PacerFault::Failed(message) => {
            error!("frame failed on pacer thread: {}", message);
            panic!("frame failed on pacer thread: {}", message);
        }
        PacerFault::Panicked(payload) => {
            error!(
                "frame panicked on pacer thread: {}",
                panic_message(payload.as_ref())
            );
            panic::resume_unwind(payload);
        }
    }
}

pub fn default_fault_handler() -> FaultHandler {
    Arc::new(raise)
}

/// Spawns the supervising listener. Shutdown signals and interrupts end the
/// listener quietly; any other fault goes to `handler`.
pub fn spawn_listener(
    relay: Arc<ExceptionRelay>,
    handler: FaultHandler,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("easel-fault-relay".to_string())
        .spawn(move || match relay.wait() {
            Relayed::Interrupted => {
                debug!("fault relay listener interrupted");
            }
            Relayed::Fault(PacerFault::Shutdown) => {
                debug!("pacer reported clean shutdown");
            }
            Relayed::Fault(fault) => handler(fault),
        })
}
