use std::sync::Arc;

use super::renderer::TargetInfo;

/// One frame in flight: the attachments to draw into and the encoder that
/// records into them.
pub struct Frame {
    color_view: wgpu::TextureView,
    resolve_view: Option<wgpu::TextureView>,
    depth_view: Option<wgpu::TextureView>,
    encoder: wgpu::CommandEncoder,
    output: Option<wgpu::SurfaceTexture>,
    queue: Arc<wgpu::Queue>,
    target: TargetInfo,
    index: u64,
}

pub struct FrameAttachments {
    pub color_view: wgpu::TextureView,
    pub resolve_view: Option<wgpu::TextureView>,
    pub depth_view: Option<wgpu::TextureView>,
}

impl Frame {
    pub fn new(
        device: &wgpu::Device,
        queue: Arc<wgpu::Queue>,
        attachments: FrameAttachments,
        output: Option<wgpu::SurfaceTexture>,
        target: TargetInfo,
        index: u64,
    ) -> Self {
        let encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("easel-frame-encoder"),
            });

        Self {
            color_view: attachments.color_view,
            resolve_view: attachments.resolve_view,
            depth_view: attachments.depth_view,
            encoder,
            output,
            queue,
            target,
            index,
        }
    }

    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    /// Begins a pass over the frame's color (and depth, when negotiated)
    /// attachments, resolving multisampled color into the output. `None`
    /// keeps the previous contents.
    pub fn begin_pass(
        &mut self,
        clear: Option<wgpu::Color>,
    ) -> wgpu::RenderPass<'_> {
        let load = match clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let has_stencil = self
            .target
            .depth_format
            .is_some_and(|format| format.has_stencil_aspect());

        let depth_stencil_attachment = self.depth_view.as_ref().map(|view| {
            wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: has_stencil.then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Discard,
                }),
            }
        });

        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("easel-frame-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                depth_slice: None,
                resolve_target: self.resolve_view.as_ref(),
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    pub fn submit(self) -> wgpu::SubmissionIndex {
        let Frame {
            encoder,
            output,
            queue,
            ..
        } = self;

        let index = queue.submit(Some(encoder.finish()));

        if let Some(output) = output {
            output.present();
        }

        index
    }
}
