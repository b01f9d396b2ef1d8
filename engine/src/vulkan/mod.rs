use context::VulkanContext;
use device::{DeviceQuery, VulkanDevice, VulkanDeviceQuery};
use instance::VulkanInstance;
use lifecycle::ResourceLifecycle;
use log::*;
use pipeline::{PipelineDescriptor, VulkanPipeline};
use swapchain::VulkanSwapchain;
use vulkanalia::{
    loader::{LibloadingLoader, LIBRARY},
    vk::{DeviceV1_0, ExtDebugUtilsExtension, InstanceV1_0, KhrSurfaceExtension, KhrSwapchainExtension},
    Entry,
};

use crate::config::EngineConfig;

pub mod constants;
pub mod context;
pub mod device;
pub mod error;
pub mod image;
pub mod instance;
pub mod lifecycle;
pub mod pipeline;
pub mod shader;
pub mod surface;
pub mod swapchain;

pub use error::{InitError, LifecycleError, SuitabilityError};
pub use shader::{ShaderDirectory, ShaderSource, ShaderStage};
pub use surface::PresentationTarget;

/// A device, swapchain and pipeline descriptor ready for a render pass.
///
/// Every native handle is registered with `lifecycle` right after it is
/// created. If any step fails, the partially built lifecycle is dropped on the
/// way out and releases what was created so far.
pub struct VulkanRenderer {
    lifecycle: ResourceLifecycle,
    pub instance: VulkanInstance,
    pub device: VulkanDevice,
    pub pipeline: PipelineDescriptor,
    pub context: VulkanContext,
    // Dropped last: the loaded library backs every function pointer above.
    _entry: Entry,
}

impl std::fmt::Debug for VulkanRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanRenderer")
            .field("lifecycle", &self.lifecycle)
            .field("instance", &self.instance)
            .field("device", &self.device)
            .field("pipeline", &self.pipeline)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl VulkanRenderer {
    pub unsafe fn new(
        target: &dyn PresentationTarget,
        shaders: &dyn ShaderSource,
        config: &EngineConfig,
    ) -> Result<VulkanRenderer, InitError> {
        let loader = LibloadingLoader::new(LIBRARY)
            .map_err(|e| InitError::LoaderUnavailable(e.to_string()))?;
        let entry = Entry::new(loader).map_err(|b| InitError::LoaderUnavailable(b.to_string()))?;

        let mut lifecycle = ResourceLifecycle::new();

        // Instance
        let instance = VulkanInstance::new(target, &entry, config)?;
        let vk_instance = instance.vk_instance.clone();
        lifecycle.track("instance", move || unsafe { vk_instance.destroy_instance(None) })?;

        if let Some(messenger) = instance.messenger {
            let vk_instance = instance.vk_instance.clone();
            lifecycle.track("diagnostic messenger", move || unsafe {
                vk_instance.destroy_debug_utils_messenger_ext(messenger, None)
            })?;
        }

        // Surface
        let surface = target
            .create_surface(&instance.vk_instance)
            .map_err(InitError::SurfaceCreationFailed)?;
        let vk_instance = instance.vk_instance.clone();
        lifecycle.track("surface", move || unsafe { vk_instance.destroy_surface_khr(surface, None) })?;

        // Device
        let query = VulkanDeviceQuery {
            instance: &instance.vk_instance,
            surface,
        };
        let selected_device = device::select_device(&query, &config.required_device_extensions)?;
        let device = VulkanDevice::new(
            &instance.vk_instance,
            &selected_device,
            config.enabled_layers(),
            &config.required_device_extensions,
        )?;
        let vk_device = device.vk_device.clone();
        lifecycle.track("logical device", move || unsafe { vk_device.destroy_device(None) })?;

        // Swapchain
        let snapshot = query
            .surface_snapshot(selected_device.physical_device)
            .map_err(|code| InitError::QueryFailed {
                query: "surface capabilities",
                code,
            })?;
        let swapchain_config = swapchain::negotiate(
            &snapshot,
            config.preferred_surface_format,
            config.preferred_color_space,
            || target.framebuffer_size(),
            selected_device.queue_families,
        );
        let swapchain = VulkanSwapchain::create(&device.vk_device, surface, &swapchain_config)?;
        let vk_device = device.vk_device.clone();
        let vk_swapchain = swapchain.swapchain;
        lifecycle.track("swapchain", move || unsafe {
            vk_device.destroy_swapchain_khr(vk_swapchain, None)
        })?;

        let swapchain_image_views = image::create_image_views(
            &device.vk_device,
            &swapchain.images,
            swapchain_config.format,
            &mut lifecycle,
        )?;

        // Pipeline
        let vertex_bytecode = shaders.read(ShaderStage::Vertex)?;
        let fragment_bytecode = shaders.read(ShaderStage::Fragment)?;
        let pipeline = VulkanPipeline::assemble(
            &device.vk_device,
            &vertex_bytecode,
            &fragment_bytecode,
            swapchain_config.extent,
        )?;
        let vk_device = device.vk_device.clone();
        let layout = pipeline.layout();
        lifecycle.track("pipeline layout", move || unsafe {
            vk_device.destroy_pipeline_layout(layout, None)
        })?;

        info!("Renderer ready ({} tracked resources).", lifecycle.len());

        Ok(VulkanRenderer {
            lifecycle,
            instance,
            device,
            pipeline,
            context: VulkanContext {
                surface,
                selected_device,
                swapchain_config,
                swapchain,
                swapchain_image_views,
            },
            _entry: entry,
        })
    }

    pub unsafe fn device_wait_idle(&self) -> Result<(), InitError> {
        self.device
            .vk_device
            .device_wait_idle()
            .map_err(|code| InitError::QueryFailed {
                query: "device idle",
                code,
            })
    }

    /// Destroys every handle in reverse creation order. Calling it again is
    /// reported and otherwise ignored.
    pub unsafe fn destroy(&mut self) {
        if self.lifecycle.is_torn_down() {
            warn!("Renderer was already destroyed.");
            return;
        }

        if let Err(error) = self.device_wait_idle() {
            warn!("{}", error);
        }

        if let Err(error) = self.lifecycle.teardown_all() {
            warn!("{}", error);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.is_torn_down()
    }
}
