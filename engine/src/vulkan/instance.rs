use log::*;
use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::ExtDebugUtilsExtension;
use vulkanalia::Entry;
use vulkanalia::Instance;

use super::constants;
use super::error::InitError;
use super::surface::PresentationTarget;
use crate::config::EngineConfig;

/// The instance plus the diagnostic messenger, when one was registered.
#[derive(Debug)]
pub struct VulkanInstance {
    pub vk_instance: Instance,
    pub messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanInstance {
    pub unsafe fn new(
        target: &dyn PresentationTarget,
        entry: &Entry,
        config: &EngineConfig,
    ) -> Result<VulkanInstance, InitError> {
        // Layers
        let available_layers = entry
            .enumerate_instance_layer_properties()
            .map_err(|code| InitError::QueryFailed {
                query: "instance layers",
                code,
            })?
            .iter()
            .map(|l| l.layer_name)
            .collect::<HashSet<_>>();

        let layers = config.enabled_layers();
        if let Some(missing) = first_missing_layer(&available_layers, layers) {
            return Err(InitError::LayerUnavailable(missing.to_string()));
        }
        for layer in layers {
            info!("Enabling layer `{}`.", layer);
        }
        let layer_ptrs = layers.iter().map(|l| l.as_ptr()).collect::<Vec<_>>();

        // Extensions
        let available_extensions = entry
            .enumerate_instance_extension_properties(None)
            .map_err(|code| InitError::QueryFailed {
                query: "instance extensions",
                code,
            })?;
        info!("{} instance extensions available.", available_extensions.len());
        for extension in &available_extensions {
            debug!("\t{}", extension.extension_name);
        }

        let (extensions, flags) = required_instance_extensions(
            target.required_instance_extensions(),
            config.diagnostics_enabled,
            constants::PORTABILITY_REQUIRED,
        );
        if constants::PORTABILITY_REQUIRED {
            info!("Enabling extensions for macOS portability.");
        }
        let extension_ptrs = extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();

        // Application Info
        let application_name = c_name("application name", &config.application_name)?;
        let engine_name = c_name("engine name", &config.engine_name)?;
        let (major, minor, patch) = config.application_version;
        let application_info = vk::ApplicationInfo::builder()
            .application_name(application_name.as_bytes_with_nul())
            .application_version(vk::make_version(major, minor, patch))
            .engine_name(engine_name.as_bytes_with_nul())
            .engine_version(vk::make_version(major, minor, patch))
            .api_version(vk::make_version(1, 0, 0));

        // Create
        // Chained so that instance creation and destruction are diagnosed too.
        let mut debug_info = messenger_create_info();
        let mut info = vk::InstanceCreateInfo::builder()
            .application_info(&application_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs)
            .flags(flags);

        if config.diagnostics_enabled {
            info = info.push_next(&mut debug_info);
        }

        let instance = entry
            .create_instance(&info, None)
            .map_err(InitError::ContextCreationFailed)?;

        // Messenger
        let messenger = if config.diagnostics_enabled {
            match instance.create_debug_utils_messenger_ext(&messenger_create_info(), None) {
                Ok(messenger) => Some(messenger),
                Err(code) => {
                    instance.destroy_instance(None);
                    return Err(InitError::DiagnosticChannelFailed(code));
                }
            }
        } else {
            None
        };

        Ok(VulkanInstance {
            vk_instance: instance,
            messenger,
        })
    }
}

fn c_name(field: &'static str, value: &str) -> Result<CString, InitError> {
    CString::new(value).map_err(|_| InitError::InvalidName {
        field,
        value: value.escape_debug().to_string(),
    })
}

/// The first requested layer the loader does not know about.
pub fn first_missing_layer<'a>(
    available: &HashSet<vk::ExtensionName>,
    required: &'a [vk::ExtensionName],
) -> Option<&'a vk::ExtensionName> {
    required.iter().find(|layer| !available.contains(*layer))
}

/// Extensions the instance is created with: the window's, the debug utils
/// extension when diagnostics are on, and the portability pair (with its
/// enumeration flag) on the portability platform.
pub fn required_instance_extensions(
    window_extensions: &[&vk::ExtensionName],
    diagnostics_enabled: bool,
    portability: bool,
) -> (Vec<vk::ExtensionName>, vk::InstanceCreateFlags) {
    let mut extensions = window_extensions.iter().map(|e| **e).collect::<Vec<_>>();

    let flags = if portability {
        extensions.push(vk::KHR_GET_PHYSICAL_DEVICE_PROPERTIES2_EXTENSION.name);
        extensions.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name);
        vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
    } else {
        vk::InstanceCreateFlags::empty()
    };

    if diagnostics_enabled {
        extensions.push(vk::EXT_DEBUG_UTILS_EXTENSION.name);
    }

    (extensions, flags)
}

fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXTBuilder<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .user_callback(Some(debug_callback))
}

extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    type_: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let data = unsafe { *data };
    let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        error!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        warn!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        debug!("({:?}) {}", type_, message);
    } else {
        trace!("({:?}) {}", type_, message);
    }

    vk::FALSE
}
