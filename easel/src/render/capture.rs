use std::fs;
use std::io::Write;
use std::path::Path;

/// Tightly packed RGBA8 pixels read back from a render target.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Capture {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let start = ((y * self.width + x) * 4) as usize;
        let px = self.rgba.get(start..start + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn save_png(&self, path: &Path) -> Result<(), String> {
        let file = fs::File::create(path).map_err(|err| {
            format!("failed to create '{}': {}", path.display(), err)
        })?;
        let mut writer = std::io::BufWriter::new(file);
        let mut encoder =
            png::Encoder::new(&mut writer, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        encoder.set_filter(png::Filter::Sub);
        let mut png_writer = encoder
            .write_header()
            .map_err(|err| format!("png header failed: {}", err))?;
        png_writer
            .write_image_data(&self.rgba)
            .map_err(|err| format!("png write failed: {}", err))?;
        drop(png_writer);
        writer
            .flush()
            .map_err(|err| format!("png flush failed: {}", err))?;

        Ok(())
    }
}

pub fn compute_row_padding(unpadded_bytes_per_row: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let rem = unpadded_bytes_per_row % align;
    if rem == 0 { 0 } else { align - rem }
}

/// Copies a single-sampled 8-bit RGBA/BGRA texture to host memory, waiting
/// for the copy to finish.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Capture, String> {
    let width = texture.width();
    let height = texture.height();
    let format = texture.format();

    if format.block_copy_size(None) != Some(4) {
        return Err(format!("cannot read back texture format {:?}", format));
    }

    let unpadded_bytes_per_row = width * 4;
    let padded_bytes_per_row =
        unpadded_bytes_per_row + compute_row_padding(unpadded_bytes_per_row);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("easel-readback-buffer"),
        size: (padded_bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("easel-readback-encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    let submission_index = queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::sync_channel(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ =
        device.poll(wgpu::PollType::WaitForSubmissionIndex(submission_index));
    let map_result = rx
        .recv()
        .map_err(|err| format!("map channel recv failed: {}", err))?;
    map_result.map_err(|err| format!("map failed: {:?}", err))?;

    let data = slice.get_mapped_range();
    let unpadded_bytes_per_row = unpadded_bytes_per_row as usize;
    let padded_bytes_per_row = padded_bytes_per_row as usize;
    let mut rgba = vec![0u8; unpadded_bytes_per_row * (height as usize)];

    for row in 0..(height as usize) {
        let src_start = row * padded_bytes_per_row;
        let src_end = src_start + unpadded_bytes_per_row;
        let dst_start = row * unpadded_bytes_per_row;
        let dst_end = dst_start + unpadded_bytes_per_row;
        rgba[dst_start..dst_end].copy_from_slice(&data[src_start..src_end]);
    }

    drop(data);
    buffer.unmap();

    if matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    ) {
        for px in rgba.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }

    Ok(Capture {
        width,
        height,
        rgba,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_to_copy_alignment() {
        assert_eq!(compute_row_padding(256), 0);
        assert_eq!(compute_row_padding(4), 252);
        assert_eq!(compute_row_padding(400), 112);
    }

    #[test]
    fn pixel_lookup_is_bounds_checked() {
        let capture = Capture {
            width: 2,
            height: 1,
            rgba: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        assert_eq!(capture.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(capture.pixel(2, 0), None);
        assert_eq!(capture.pixel(0, 1), None);
    }
}
