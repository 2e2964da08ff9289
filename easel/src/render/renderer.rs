use super::frame::Frame;
use crate::surface::factory::GpuContext;

pub use crate::surface::profile::CapabilityRequest;

/// Everything a renderer needs to build pipelines against the current
/// render target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetInfo {
    pub format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
    pub logical: [u32; 2],
    pub physical: [u32; 2],
    pub scale: f64,
}

/// The graphics-primitive renderer driven by a surface.
pub trait Renderer: Send + 'static {
    fn requested_capabilities(&self) -> CapabilityRequest {
        CapabilityRequest::default()
    }

    /// Called once the context exists, and again whenever the target format
    /// or sample count changes.
    fn bind_to_context(
        &mut self,
        gpu: &GpuContext,
        target: &TargetInfo,
    ) -> Result<(), String>;

    fn set_size(&mut self, _target: &TargetInfo) {}

    fn draw_frame(&mut self, frame: &mut Frame) -> Result<(), String>;

    /// Polled before every frame; `true` ends animation cleanly.
    fn exit_requested(&self) -> bool {
        false
    }
}
