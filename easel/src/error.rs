use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SurfaceError {
    /// No usable rendering tier exists on this host.
    UnsupportedProfile(String),
    Window(String),
    Context(String),
    Config(String),
    NotInitialized,
    Unsupported(&'static str),
    /// A context task tried to submit another context task.
    Reentrant,
    /// The pacer went away before a submitted task could run.
    ContextLost,
    EventLoop(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::UnsupportedProfile(detail) => {
                write!(f, "unsupported rendering profile: {}", detail)
            }
            SurfaceError::Window(detail) => {
                write!(f, "window error: {}", detail)
            }
            SurfaceError::Context(detail) => {
                write!(f, "rendering context error: {}", detail)
            }
            SurfaceError::Config(detail) => {
                write!(f, "invalid surface config: {}", detail)
            }
            SurfaceError::NotInitialized => {
                write!(f, "surface has not been initialized")
            }
            SurfaceError::Unsupported(what) => {
                write!(f, "not supported by this surface: {}", what)
            }
            SurfaceError::Reentrant => {
                write!(f, "render called from inside a context task")
            }
            SurfaceError::ContextLost => {
                write!(f, "context thread stopped before the task ran")
            }
            SurfaceError::EventLoop(detail) => {
                write!(f, "event loop error: {}", detail)
            }
        }
    }
}

impl Error for SurfaceError {}

/// Failure reported by a frame target while producing one frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FrameError {
    /// The target asked to shut down; not a fault.
    Shutdown,
    Failed(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Shutdown => write!(f, "shutdown requested"),
            FrameError::Failed(detail) => write!(f, "{}", detail),
        }
    }
}

impl Error for FrameError {}

impl From<String> for FrameError {
    fn from(detail: String) -> Self {
        FrameError::Failed(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_errors_do_not_assume_creation() {
        let err = SurfaceError::Window("invalid window icon: bad size".into());
        assert_eq!(
            err.to_string(),
            "window error: invalid window icon: bad size"
        );

        let err = SurfaceError::Context("renderer rejected 4 samples".into());
        assert_eq!(
            err.to_string(),
            "rendering context error: renderer rejected 4 samples"
        );
    }
}
