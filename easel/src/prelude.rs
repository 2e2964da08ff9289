pub use crate::error::{FrameError, SurfaceError};
pub use crate::framework::config::SurfaceConfig;
pub use crate::framework::logging::init_logger;
pub use crate::framework::logging::{debug, error, info, trace, warn};
pub use crate::input::{
    EventSink, InputEvent, KeyAction, KeyEvent, Modifiers, PointerAction,
    PointerButton, PointerEvent, SurfaceEvent, WindowNotice, event_channel,
};
pub use crate::render::capture::Capture;
pub use crate::render::context::RenderContext;
pub use crate::render::frame::Frame;
pub use crate::render::raster::{PixelBuffer, RasterRenderer, Rgba};
pub use crate::render::renderer::{CapabilityRequest, Renderer, TargetInfo};
pub use crate::render::shader::create_shader_module;
pub use crate::{run_onscreen, run_sketch};
pub use crate::runtime::app::Onscreen;
pub use crate::runtime::events::{SurfaceCommand, SurfaceControl};
pub use crate::runtime::pacer::{FrameTarget, PacerState};
pub use crate::runtime::relay::{FaultHandler, PacerFault};
pub use crate::surface::cursor::{CursorImage, CursorKind};
pub use crate::surface::factory::GpuContext;
pub use crate::surface::geometry::Resize;
pub use crate::surface::profile::Tier;
pub use crate::surface::{
    GpuSurface, HeadlessSurface, NativeHandle, RasterContext, RasterSurface,
    RendererKind, SizeProvider, Surface, SurfaceTarget,
};
