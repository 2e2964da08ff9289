pub mod error;
pub mod framework;
pub mod input;
pub mod prelude;
pub mod render;
pub mod runtime;
pub mod surface;

pub use runtime::app::{Onscreen, OnscreenApp, run_onscreen, run_sketch};
pub use {wgpu, winit};
