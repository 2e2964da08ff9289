use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;

pub const DEFAULT_ALPHA_BITS: u8 = 8;
pub const DEFAULT_DEPTH_BITS: u8 = 24;
pub const DEFAULT_STENCIL_BITS: u8 = 8;

/// Rendering-API capability level requested at negotiation time. Ordered
/// from weakest to strongest.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    FixedFunction,
    #[default]
    Es2,
    Gl3,
    Gl4,
}

impl Tier {
    pub fn from_level(level: u8) -> Result<Self, SurfaceError> {
        match level {
            1 => Ok(Tier::FixedFunction),
            2 => Ok(Tier::Es2),
            3 => Ok(Tier::Gl3),
            4 => Ok(Tier::Gl4),
            other => Err(SurfaceError::UnsupportedProfile(format!(
                "unknown profile level {}",
                other
            ))),
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Tier::FixedFunction => 1,
            Tier::Es2 => 2,
            Tier::Gl3 => 3,
            Tier::Gl4 => 4,
        }
    }

    pub fn is_programmable(self) -> bool {
        self != Tier::FixedFunction
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::FixedFunction => "fixed-function",
            Tier::Es2 => "ES2",
            Tier::Gl3 => "GL3",
            Tier::Gl4 => "GL4",
        };
        write!(f, "{}", name)
    }
}

/// A concrete profile offered by the host: one adapter/backend pairing and
/// the tier it is able to satisfy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConcreteProfile {
    pub name: String,
    pub backend: String,
    pub tier: Tier,
    pub hardware: bool,
}

impl fmt::Display for ConcreteProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} via {}]", self.name, self.tier, self.backend)
    }
}

/// What the host platform can offer.
pub trait ProfileHost {
    fn exact(&self, tier: Tier) -> Option<ConcreteProfile>;
    fn max_fixed_function(&self) -> Option<ConcreteProfile>;
    fn max_programmable(&self) -> Option<ConcreteProfile>;
}

/// Pixel-format requirements declared by a renderer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CapabilityRequest {
    pub alpha_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub smooth: u32,
    pub pixel_density: u32,
}

impl Default for CapabilityRequest {
    fn default() -> Self {
        Self {
            alpha_bits: DEFAULT_ALPHA_BITS,
            depth_bits: DEFAULT_DEPTH_BITS,
            stencil_bits: DEFAULT_STENCIL_BITS,
            smooth: 2,
            pixel_density: 1,
        }
    }
}

impl CapabilityRequest {
    pub fn sample_count(&self) -> u32 {
        smooth_to_samples(self.smooth)
    }
}

/// Smoothing level 0 means no multisampling, 1 maps to 2x, anything else
/// is taken as the sample count.
pub fn smooth_to_samples(smooth: u32) -> u32 {
    match smooth {
        0 => 1,
        1 => 2,
        n => n,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Capabilities {
    pub alpha_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub samples: u32,
    pub sample_buffers: bool,
    pub background_opaque: bool,
    pub onscreen: bool,
}

impl Capabilities {
    pub fn from_request(request: &CapabilityRequest, onscreen: bool) -> Self {
        let samples = request.sample_count();
        Self {
            alpha_bits: request.alpha_bits,
            depth_bits: request.depth_bits,
            stencil_bits: request.stencil_bits,
            samples,
            sample_buffers: samples > 1,
            background_opaque: onscreen,
            onscreen,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderProfile {
    pub requested: Tier,
    pub resolved: ConcreteProfile,
    pub capabilities: Capabilities,
    /// The resolved profile cannot satisfy the requested tier.
    pub downgraded: bool,
}

impl RenderProfile {
    /// Rebuilds the capability descriptor for a new smoothing level. The
    /// tier is not renegotiated.
    pub fn with_smoothing(&self, smooth: u32) -> Self {
        let samples = smooth_to_samples(smooth);
        let mut profile = self.clone();
        profile.capabilities.samples = samples;
        profile.capabilities.sample_buffers = samples > 1;
        profile
    }

    pub fn satisfies_request(&self) -> bool {
        !self.downgraded
    }
}

/// Process-wide memo of resolved profiles, one entry per requested tier.
#[derive(Default)]
pub struct ProfileCache {
    resolved: Mutex<HashMap<Tier, ConcreteProfile>>,
}

static PROFILE_CACHE: LazyLock<ProfileCache> =
    LazyLock::new(ProfileCache::default);

impl ProfileCache {
    pub fn global() -> &'static ProfileCache {
        &PROFILE_CACHE
    }

    pub fn get(&self, tier: Tier) -> Option<ConcreteProfile> {
        self.resolved.lock().get(&tier).cloned()
    }

    pub fn len(&self) -> usize {
        self.resolved.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The lock is held across the host query so two surfaces resolving the
    // same tier for the first time cannot both populate the entry.
    fn resolve(
        &self,
        host: &dyn ProfileHost,
        tier: Tier,
    ) -> Result<ConcreteProfile, SurfaceError> {
        let mut resolved = self.resolved.lock();
        if let Some(profile) = resolved.get(&tier) {
            return Ok(profile.clone());
        }

        let profile = fall_back(host, tier).ok_or_else(|| {
            SurfaceError::UnsupportedProfile(format!(
                "no usable profile for requested tier {}",
                tier
            ))
        })?;

        if profile.tier < tier {
            warn!(
                "requested {} profile is not available, using {} instead",
                tier, profile
            );
        } else {
            debug!("resolved {} profile to {}", tier, profile);
        }

        resolved.insert(tier, profile.clone());
        Ok(profile)
    }
}

fn fall_back(host: &dyn ProfileHost, tier: Tier) -> Option<ConcreteProfile> {
    host.exact(tier)
        .or_else(|| {
            if tier.is_programmable() {
                None
            } else {
                host.max_fixed_function()
            }
        })
        .or_else(|| host.max_programmable())
        .or_else(|| host.max_fixed_function())
}

/// Picks the best available concrete profile for `tier` and binds the
/// requested pixel format to it. Only the absence of any usable profile is
/// fatal; a downgrade is logged and reported through
/// [`RenderProfile::downgraded`].
pub fn resolve_profile(
    cache: &ProfileCache,
    host: &dyn ProfileHost,
    tier: Tier,
    request: &CapabilityRequest,
    onscreen: bool,
) -> Result<RenderProfile, SurfaceError> {
    let resolved = cache.resolve(host, tier)?;

    Ok(RenderProfile {
        requested: tier,
        downgraded: resolved.tier < tier,
        resolved,
        capabilities: Capabilities::from_request(request, onscreen),
    })
}

/// Classifies wgpu adapters into tiers by shader model. The legacy GL
/// backend stands in for the fixed-function tier.
pub struct WgpuProfileHost {
    adapters: Vec<(ConcreteProfile, wgpu::Adapter)>,
}

impl WgpuProfileHost {
    pub fn new(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Self {
        let mut adapters: Vec<(ConcreteProfile, wgpu::Adapter)> = instance
            .enumerate_adapters(wgpu::Backends::all())
            .into_iter()
            .filter(|adapter| match compatible_surface {
                Some(surface) => adapter.is_surface_supported(surface),
                None => true,
            })
            .map(|adapter| (classify_adapter(&adapter), adapter))
            .collect();

        // Strongest hardware first.
        adapters.sort_by(|(a, _), (b, _)| {
            b.tier.cmp(&a.tier).then(b.hardware.cmp(&a.hardware))
        });

        debug!(
            "profile host found {} adapter(s): {:?}",
            adapters.len(),
            adapters
                .iter()
                .map(|(profile, _)| profile.to_string())
                .collect::<Vec<_>>()
        );

        Self { adapters }
    }

    /// Hands out the adapter behind `profile`. A cached profile may name an
    /// adapter this host did not see; the strongest one is used instead.
    pub fn into_adapter(
        mut self,
        profile: &ConcreteProfile,
    ) -> Option<wgpu::Adapter> {
        if self.adapters.is_empty() {
            return None;
        }

        let index = self
            .adapters
            .iter()
            .position(|(candidate, _)| {
                candidate.name == profile.name
                    && candidate.backend == profile.backend
            })
            .unwrap_or(0);

        Some(self.adapters.swap_remove(index).1)
    }

    fn find(
        &self,
        predicate: impl Fn(&ConcreteProfile) -> bool,
    ) -> Option<ConcreteProfile> {
        self.adapters
            .iter()
            .map(|(profile, _)| profile)
            .find(|profile| predicate(profile))
            .cloned()
    }
}

impl ProfileHost for WgpuProfileHost {
    fn exact(&self, tier: Tier) -> Option<ConcreteProfile> {
        self.find(|profile| profile.tier == tier)
    }

    fn max_fixed_function(&self) -> Option<ConcreteProfile> {
        self.find(|profile| profile.backend == "Gl").map(|profile| {
            ConcreteProfile {
                tier: Tier::FixedFunction,
                ..profile
            }
        })
    }

    fn max_programmable(&self) -> Option<ConcreteProfile> {
        self.find(|profile| profile.tier.is_programmable())
    }
}

fn classify_adapter(adapter: &wgpu::Adapter) -> ConcreteProfile {
    let info = adapter.get_info();
    let downlevel = adapter.get_downlevel_capabilities();

    let tier = match downlevel.shader_model {
        wgpu::ShaderModel::Sm2 => Tier::Es2,
        wgpu::ShaderModel::Sm4 => Tier::Gl3,
        wgpu::ShaderModel::Sm5 => Tier::Gl4,
    };

    ConcreteProfile {
        name: info.name,
        backend: format!("{:?}", info.backend),
        tier,
        hardware: info.device_type != wgpu::DeviceType::Cpu,
    }
}
