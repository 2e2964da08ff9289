use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Parses and validates WGSL up front so a broken shader surfaces as an
/// error instead of a device-lost panic inside the pacer thread.
pub fn validate_wgsl(source: &str) -> Result<(), String> {
    let module = wgsl::parse_str(source).map_err(|err| err.to_string())?;

    let mut validator =
        Validator::new(ValidationFlags::all(), Capabilities::all());

    validator
        .validate(&module)
        .map_err(|err| err.to_string())
        .map(|_| ())
}

pub fn create_shader_module(
    device: &wgpu::Device,
    source: &str,
    label: &str,
) -> Result<wgpu::ShaderModule, String> {
    validate_wgsl(source)
        .map_err(|err| format!("shader '{}' is invalid: {}", label, err))?;

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}
