use log::*;
use std::collections::HashSet;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder, InstanceV1_0, KhrSurfaceExtension};
use vulkanalia::{Device, Instance, VkResult};

use super::constants;
use super::error::{InitError, SuitabilityError};
use super::swapchain::SurfaceCapabilitiesSnapshot;

/// The queries device selection makes against a candidate.
pub trait DeviceQuery {
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String;
    fn queue_families(&self, physical_device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
    fn supports_present(&self, physical_device: vk::PhysicalDevice, family: u32) -> VkResult<bool>;
    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<HashSet<vk::ExtensionName>>;
    fn surface_snapshot(&self, physical_device: vk::PhysicalDevice) -> VkResult<SurfaceCapabilitiesSnapshot>;
}

/// [`DeviceQuery`] backed by a live instance and presentation surface.
pub struct VulkanDeviceQuery<'a> {
    pub instance: &'a Instance,
    pub surface: vk::SurfaceKHR,
}

impl DeviceQuery for VulkanDeviceQuery<'_> {
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices() }
    }

    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String {
        let properties = unsafe { self.instance.get_physical_device_properties(physical_device) };
        properties.device_name.to_string()
    }

    fn queue_families(&self, physical_device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(physical_device)
        }
    }

    fn supports_present(&self, physical_device: vk::PhysicalDevice, family: u32) -> VkResult<bool> {
        unsafe {
            self.instance
                .get_physical_device_surface_support_khr(physical_device, family, self.surface)
        }
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<HashSet<vk::ExtensionName>> {
        let extensions = unsafe {
            self.instance
                .enumerate_device_extension_properties(physical_device, None)?
        };
        Ok(extensions.iter().map(|e| e.extension_name).collect())
    }

    fn surface_snapshot(&self, physical_device: vk::PhysicalDevice) -> VkResult<SurfaceCapabilitiesSnapshot> {
        unsafe { SurfaceCapabilitiesSnapshot::get(self.instance, physical_device, self.surface) }
    }
}

/// Queue family roles found on one candidate. Recomputed per candidate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Scans families in order, taking the first graphics family and,
    /// independently, the first family that can present to the surface.
    pub fn find(query: &dyn DeviceQuery, physical_device: vk::PhysicalDevice) -> VkResult<Self> {
        let mut indices = Self::default();

        for (index, properties) in query.queue_families(physical_device).iter().enumerate() {
            let index = index as u32;

            if indices.graphics.is_none() && properties.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }

            if indices.present.is_none() && query.supports_present(physical_device, index)? {
                indices.present = Some(index);
            }

            if indices.is_complete() {
                break;
            }
        }

        Ok(indices)
    }

    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    pub fn complete(&self) -> Option<QueueFamilies> {
        match (self.graphics, self.present) {
            (Some(graphics), Some(present)) => Some(QueueFamilies { graphics, present }),
            _ => None,
        }
    }
}

/// Both queue family roles, resolved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Graphics and presentation use one family, so swapchain images need
    /// no cross-family sharing.
    pub fn is_same_family(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, graphics first.
    pub fn unique(&self) -> Vec<u32> {
        if self.is_same_family() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

#[derive(Clone, Debug)]
pub struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub queue_families: QueueFamilies,
}

/// Picks the first physical device, in enumeration order, that has both queue
/// family roles, every required extension and a usable surface.
///
/// Candidates are not ranked: on a multi-GPU system this takes whichever
/// suitable device the driver lists first, discrete or not.
pub fn select_device(
    query: &dyn DeviceQuery,
    required_extensions: &[vk::ExtensionName],
) -> Result<SelectedDevice, InitError> {
    let physical_devices = query
        .physical_devices()
        .map_err(|code| InitError::QueryFailed {
            query: "physical devices",
            code,
        })?;

    if physical_devices.is_empty() {
        return Err(InitError::NoDevicesFound);
    }
    info!("Found {} physical devices.", physical_devices.len());

    for physical_device in physical_devices {
        let name = query.device_name(physical_device);

        match check_physical_device(query, physical_device, required_extensions) {
            Err(error) => warn!("Skipping physical device (`{}`): {}", name, error),
            Ok(queue_families) => {
                info!("Selected physical device (`{}`).", name);
                return Ok(SelectedDevice {
                    physical_device,
                    name,
                    queue_families,
                });
            }
        }
    }

    Err(InitError::NoSuitableDevice)
}

fn check_physical_device(
    query: &dyn DeviceQuery,
    physical_device: vk::PhysicalDevice,
    required_extensions: &[vk::ExtensionName],
) -> Result<QueueFamilies, SuitabilityError> {
    let queue_families = QueueFamilyIndices::find(query, physical_device)?
        .complete()
        .ok_or(SuitabilityError::MissingQueueFamilies)?;

    let available = query.device_extensions(physical_device)?;
    if let Some(missing) = required_extensions.iter().find(|e| !available.contains(*e)) {
        return Err(SuitabilityError::MissingExtension(missing.to_string()));
    }

    let support = query.surface_snapshot(physical_device)?;
    if support.formats.is_empty() || support.present_modes.is_empty() {
        return Err(SuitabilityError::InsufficientSwapchainSupport);
    }

    Ok(queue_families)
}

/// The logical device and the queues retrieved from it.
#[derive(Debug)]
pub struct VulkanDevice {
    pub vk_device: Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl VulkanDevice {
    pub unsafe fn new(
        instance: &Instance,
        selected: &SelectedDevice,
        layers: &[vk::ExtensionName],
        required_extensions: &[vk::ExtensionName],
    ) -> Result<VulkanDevice, InitError> {
        let families = selected.queue_families;

        let queue_priorities = &[1.0];
        let queue_infos = families
            .unique()
            .into_iter()
            .map(|i| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(i)
                    .queue_priorities(queue_priorities)
            })
            .collect::<Vec<_>>();

        let layers = layers.iter().map(|l| l.as_ptr()).collect::<Vec<_>>();

        let mut extensions = required_extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        if constants::PORTABILITY_REQUIRED {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::builder();

        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = instance
            .create_device(selected.physical_device, &info, None)
            .map_err(InitError::DeviceCreationFailed)?;

        let graphics_queue = device.get_device_queue(families.graphics, 0);
        let present_queue = device.get_device_queue(families.present, 0);
        debug!(
            "Retrieved graphics queue {:?} (family {}) and present queue {:?} (family {}).",
            graphics_queue, families.graphics, present_queue, families.present,
        );

        Ok(VulkanDevice {
            vk_device: device,
            graphics_queue,
            present_queue,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use vulkanalia::vk::Handle;

    use super::*;

    /// One fake GPU: which families do graphics, which can present, what
    /// extensions it has, and what the surface reports for it.
    #[derive(Clone)]
    struct FakeGpu {
        pub name: &'static str,
        pub graphics: Vec<bool>,
        pub present: Vec<bool>,
        pub extensions: Vec<vk::ExtensionName>,
        pub formats: Vec<vk::SurfaceFormatKHR>,
        pub present_modes: Vec<vk::PresentModeKHR>,
    }

    impl FakeGpu {
        fn suitable(name: &'static str) -> Self {
            Self {
                name,
                graphics: vec![true],
                present: vec![true],
                extensions: vec![vk::KHR_SWAPCHAIN_EXTENSION.name],
                formats: vec![vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                }],
                present_modes: vec![vk::PresentModeKHR::FIFO],
            }
        }
    }

    struct FakeQuery {
        gpus: HashMap<u64, FakeGpu>,
        order: Vec<vk::PhysicalDevice>,
    }

    impl FakeQuery {
        fn new(gpus: Vec<FakeGpu>) -> Self {
            let mut map = HashMap::new();
            let mut order = Vec::new();
            for (i, gpu) in gpus.into_iter().enumerate() {
                let handle = vk::PhysicalDevice::from_raw(i + 1);
                map.insert(handle.as_raw() as u64, gpu);
                order.push(handle);
            }
            Self { gpus: map, order }
        }

        fn gpu(&self, physical_device: vk::PhysicalDevice) -> &FakeGpu {
            &self.gpus[&(physical_device.as_raw() as u64)]
        }
    }

    impl DeviceQuery for FakeQuery {
        fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
            Ok(self.order.clone())
        }

        fn device_name(&self, physical_device: vk::PhysicalDevice) -> String {
            self.gpu(physical_device).name.to_string()
        }

        fn queue_families(&self, physical_device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
            let gpu = self.gpu(physical_device);
            gpu.graphics
                .iter()
                .map(|&graphics| vk::QueueFamilyProperties {
                    queue_flags: if graphics {
                        vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER
                    } else {
                        vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER
                    },
                    queue_count: 1,
                    ..Default::default()
                })
                .collect()
        }

        fn supports_present(&self, physical_device: vk::PhysicalDevice, family: u32) -> VkResult<bool> {
            Ok(self
                .gpu(physical_device)
                .present
                .get(family as usize)
                .copied()
                .unwrap_or(false))
        }

        fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<HashSet<vk::ExtensionName>> {
            Ok(self.gpu(physical_device).extensions.iter().copied().collect())
        }

        fn surface_snapshot(&self, physical_device: vk::PhysicalDevice) -> VkResult<SurfaceCapabilitiesSnapshot> {
            let gpu = self.gpu(physical_device);
            Ok(SurfaceCapabilitiesSnapshot {
                capabilities: vk::SurfaceCapabilitiesKHR::default(),
                formats: gpu.formats.clone(),
                present_modes: gpu.present_modes.clone(),
            })
        }
    }

    fn required() -> Vec<vk::ExtensionName> {
        vec![vk::KHR_SWAPCHAIN_EXTENSION.name]
    }

    #[test]
    fn empty_enumeration_fails() {
        let query = FakeQuery::new(vec![]);
        assert!(matches!(select_device(&query, &required()), Err(InitError::NoDevicesFound)));
    }

    #[test]
    fn first_suitable_candidate_wins() {
        let query = FakeQuery::new(vec![FakeGpu::suitable("first"), FakeGpu::suitable("second")]);
        let selected = select_device(&query, &required()).unwrap();
        assert_eq!(selected.name, "first");
        assert_eq!(selected.queue_families, QueueFamilies { graphics: 0, present: 0 });
    }

    #[test]
    fn candidate_without_present_family_is_skipped() {
        let mut headless = FakeGpu::suitable("headless");
        headless.present = vec![false];
        let query = FakeQuery::new(vec![headless, FakeGpu::suitable("display")]);
        assert_eq!(select_device(&query, &required()).unwrap().name, "display");
    }

    #[test]
    fn candidate_without_graphics_family_is_skipped() {
        let mut compute = FakeGpu::suitable("compute");
        compute.graphics = vec![false, false];
        compute.present = vec![true, true];
        let query = FakeQuery::new(vec![compute, FakeGpu::suitable("graphics")]);
        assert_eq!(select_device(&query, &required()).unwrap().name, "graphics");
    }

    #[test]
    fn candidate_missing_extension_is_skipped() {
        let mut bare = FakeGpu::suitable("bare");
        bare.extensions.clear();
        let query = FakeQuery::new(vec![bare.clone(), FakeGpu::suitable("full"), bare]);
        assert_eq!(select_device(&query, &required()).unwrap().name, "full");
    }

    #[test]
    fn candidate_with_empty_surface_lists_is_skipped() {
        let mut no_formats = FakeGpu::suitable("no formats");
        no_formats.formats.clear();
        let mut no_modes = FakeGpu::suitable("no modes");
        no_modes.present_modes.clear();
        let query = FakeQuery::new(vec![no_formats, no_modes, FakeGpu::suitable("usable")]);
        assert_eq!(select_device(&query, &required()).unwrap().name, "usable");
    }

    #[test]
    fn no_suitable_candidate_fails() {
        let mut a = FakeGpu::suitable("a");
        a.extensions.clear();
        let mut b = FakeGpu::suitable("b");
        b.present = vec![false];
        for order in [vec![a.clone(), b.clone()], vec![b, a]] {
            let query = FakeQuery::new(order);
            assert!(matches!(select_device(&query, &required()), Err(InitError::NoSuitableDevice)));
        }
    }

    #[test]
    fn graphics_and_present_may_come_from_different_families() {
        let mut split = FakeGpu::suitable("split");
        split.graphics = vec![true, false, false];
        split.present = vec![false, false, true];
        let query = FakeQuery::new(vec![split]);
        let handle = query.physical_devices().unwrap()[0];

        let indices = QueueFamilyIndices::find(&query, handle).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics: Some(0), present: Some(2) });

        let families = indices.complete().unwrap();
        assert!(!families.is_same_family());
        assert_eq!(families.unique(), vec![0, 2]);
    }

    #[test]
    fn first_matching_family_is_recorded_per_role() {
        let mut gpu = FakeGpu::suitable("gpu");
        gpu.graphics = vec![false, true, true];
        gpu.present = vec![false, true, true];
        let query = FakeQuery::new(vec![gpu]);
        let handle = query.physical_devices().unwrap()[0];

        let indices = QueueFamilyIndices::find(&query, handle).unwrap();
        assert_eq!(indices.complete(), Some(QueueFamilies { graphics: 1, present: 1 }));
        assert!(indices.complete().unwrap().is_same_family());
        assert_eq!(indices.complete().unwrap().unique(), vec![1]);
    }

    #[test]
    fn incomplete_indices_do_not_resolve() {
        let indices = QueueFamilyIndices { graphics: Some(0), present: None };
        assert!(!indices.is_complete());
        assert_eq!(indices.complete(), None);
    }
}
