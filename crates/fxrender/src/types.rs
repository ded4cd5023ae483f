use std::fmt;
use std::path::PathBuf;

use wgpu::naga::ShaderStage;

/// Bytes per texel of the `Rgba8Unorm` format every pass renders through.
pub const GPU_BYTES_PER_PIXEL: u32 = 4;

/// Vertex stage used when an effect does not customise geometry.
pub const DEFAULT_VERTEX_SHADER: &str = "default.vert";

/// Pixel stage used when an effect does not customise colour mapping.
pub const DEFAULT_PIXEL_SHADER: &str = "default.frag";

/// Logical layout of a caller-owned pixel buffer.
///
/// Rows are tightly packed: the buffer holds `width * height * channels`
/// bytes with no padding between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Shorthand for an RGBA8 buffer, the only layout the GPU pass accepts.
    pub fn rgba(width: u32, height: u32) -> Self {
        Self::new(width, height, GPU_BYTES_PER_PIXEL)
    }

    /// Number of bytes in one logical row, or `None` if it overflows `usize`.
    pub fn row_bytes(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.channels as usize)
    }

    /// Total byte length of a buffer with these dimensions, or `None` if it
    /// overflows `usize`.
    pub fn byte_len(&self) -> Option<usize> {
        self.row_bytes()?.checked_mul(self.height as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// Which half of a shader program a source file feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    Vertex,
    Pixel,
}

impl ProgramStage {
    pub(crate) fn naga_stage(self) -> ShaderStage {
        match self {
            ProgramStage::Vertex => ShaderStage::Vertex,
            ProgramStage::Pixel => ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ProgramStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramStage::Vertex => f.write_str("vertex"),
            ProgramStage::Pixel => f.write_str("pixel"),
        }
    }
}

/// The pair of shader files that make up one program.
///
/// Paths are resolved against the [`ShaderStore`](crate::ShaderStore) root, so
/// two identities compare equal when they name the same files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderIdentity {
    pub vertex: PathBuf,
    pub pixel: PathBuf,
}

impl ShaderIdentity {
    pub fn new(vertex: impl Into<PathBuf>, pixel: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            pixel: pixel.into(),
        }
    }

    pub fn path(&self, stage: ProgramStage) -> &PathBuf {
        match stage {
            ProgramStage::Vertex => &self.vertex,
            ProgramStage::Pixel => &self.pixel,
        }
    }
}

impl Default for ShaderIdentity {
    /// The pass-through pair: positions and colours are forwarded untouched.
    fn default() -> Self {
        Self::new(DEFAULT_VERTEX_SHADER, DEFAULT_PIXEL_SHADER)
    }
}

impl fmt::Display for ShaderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.vertex.display(), self.pixel.display())
    }
}

/// Adapter power preference forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Settings consumed when the manager brings up its device.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory that relative shader identities are resolved against.
    pub shader_root: PathBuf,
    /// Adapter power preference.
    pub power: GpuPowerPreference,
    /// Accept software rasterisers (llvmpipe, WARP) when no hardware adapter exists.
    pub allow_software: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            shader_root: PathBuf::from("shaders"),
            power: GpuPowerPreference::default(),
            allow_software: false,
        }
    }
}

/// Summary of the adapter the manager selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        let driver = if info.driver_info.is_empty() {
            info.driver.clone()
        } else {
            format!("{} ({})", info.driver, info.driver_info)
        };
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            driver,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_report_tight_row_layout() {
        let dims = ImageDimensions::new(5, 3, 4);
        assert_eq!(dims.row_bytes(), Some(20));
        assert_eq!(dims.byte_len(), Some(60));
        assert!(!dims.is_empty());
        assert!(ImageDimensions::rgba(0, 7).is_empty());
        assert_eq!(dims.to_string(), "5x3x4");
    }

    #[test]
    fn byte_len_of_huge_dimensions_is_none() {
        let dims = ImageDimensions::rgba(u32::MAX, u32::MAX);
        assert_eq!(dims.byte_len(), None);
    }

    #[test]
    fn default_identity_is_pass_through_pair() {
        let identity = ShaderIdentity::default();
        assert_eq!(identity.vertex, PathBuf::from(DEFAULT_VERTEX_SHADER));
        assert_eq!(identity.pixel, PathBuf::from(DEFAULT_PIXEL_SHADER));
        assert_eq!(identity.path(ProgramStage::Pixel), &identity.pixel);
        assert_eq!(identity.to_string(), "default.vert + default.frag");
    }

    #[test]
    fn software_adapters_are_flagged() {
        let profile = AdapterProfile {
            name: "llvmpipe".into(),
            backend: wgpu::Backend::Vulkan,
            device_type: wgpu::DeviceType::Cpu,
            driver: "mesa".into(),
            max_texture_dimension: 8192,
        };
        assert!(profile.is_software());
    }
}
