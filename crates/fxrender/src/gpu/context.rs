use crate::error::FxError;
use crate::types::{AdapterProfile, GpuPowerPreference};

pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    pub(crate) fn new(power: GpuPowerPreference, allow_software: bool) -> Result<Self, FxError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = match request_adapter(&instance, power, false) {
            Ok(adapter) => adapter,
            Err(err) if allow_software => {
                tracing::warn!(error = %err, "no hardware adapter; trying software fallback");
                request_adapter(&instance, power, true)?
            }
            Err(err) => return Err(err),
        };

        let info = adapter.get_info();
        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&info, &limits);
        let is_software = adapter_profile.is_software();
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            driver = %adapter_profile.driver,
            is_software,
            "selected GPU adapter"
        );

        if is_software && !allow_software {
            return Err(FxError::DeviceCreation(format!(
                "only a software adapter is available ({}); hardware acceleration is required",
                adapter_profile.name
            )));
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("shaderfx device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| FxError::DeviceCreation(format!("device request failed: {err}")))?;

        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            tracing::error!(%error, "uncaptured GPU error");
        }));

        Ok(Self {
            _instance: instance,
            device,
            queue,
            adapter_profile,
        })
    }
}

fn request_adapter(
    instance: &wgpu::Instance,
    power: GpuPowerPreference,
    force_fallback_adapter: bool,
) -> Result<wgpu::Adapter, FxError> {
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: power.to_wgpu(),
        compatible_surface: None,
        force_fallback_adapter,
    }))
    .map_err(|err| FxError::DeviceCreation(format!("no suitable GPU adapter: {err}")))
}

/// Runs `build` inside validation and out-of-memory error scopes.
///
/// Returns whatever `build` produced together with the first captured error;
/// when an error is present the returned object is invalid and must only be
/// dropped.
pub(crate) fn capture_errors<T>(
    device: &wgpu::Device,
    build: impl FnOnce() -> T,
) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    (value, validation.or(out_of_memory))
}
