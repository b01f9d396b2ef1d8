use std::path::PathBuf;

use thiserror::Error;
use vulkanalia::vk;

use super::shader::ShaderStage;

/// Fatal failures of the initialization sequence. None of these are retried.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),

    #[error("Required layer `{0}` is not available.")]
    LayerUnavailable(String),

    #[error("{field} `{value}` contains an interior NUL byte.")]
    InvalidName { field: &'static str, value: String },

    #[error("Failed to create instance ({0}).")]
    ContextCreationFailed(vk::ErrorCode),

    #[error("Failed to create diagnostic messenger ({0}).")]
    DiagnosticChannelFailed(vk::ErrorCode),

    #[error("Failed to create presentation surface ({0}).")]
    SurfaceCreationFailed(vk::ErrorCode),

    #[error("Query `{query}` failed ({code}).")]
    QueryFailed {
        query: &'static str,
        code: vk::ErrorCode,
    },

    #[error("Failed to find GPUs with Vulkan support.")]
    NoDevicesFound,

    #[error("Failed to find a suitable physical device.")]
    NoSuitableDevice,

    #[error("Failed to create logical device ({0}).")]
    DeviceCreationFailed(vk::ErrorCode),

    #[error("Failed to create swapchain ({0}).")]
    SwapchainCreationFailed(vk::ErrorCode),

    #[error("Failed to create view for swapchain image {index} ({code}).")]
    ImageViewCreationFailed { index: usize, code: vk::ErrorCode },

    #[error("Failed to read {stage} shader from `{}`: {source}", path.display())]
    ShaderReadFailed {
        stage: ShaderStage,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create {stage} shader module: {reason}")]
    ShaderModuleCreationFailed { stage: ShaderStage, reason: String },

    #[error("Failed to create pipeline layout ({0}).")]
    PipelineLayoutCreationFailed(vk::ErrorCode),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Why a single physical device was passed over. Logged, never propagated.
#[derive(Debug, Error, PartialEq)]
pub enum SuitabilityError {
    #[error("Missing required queue families.")]
    MissingQueueFamilies,
    #[error("Missing required device extension `{0}`.")]
    MissingExtension(String),
    #[error("Insufficient swapchain support.")]
    InsufficientSwapchainSupport,
    #[error("Query failed ({0}).")]
    Query(vk::ErrorCode),
}

impl From<vk::ErrorCode> for SuitabilityError {
    fn from(code: vk::ErrorCode) -> Self {
        SuitabilityError::Query(code)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Resources were already torn down.")]
    AlreadyTornDown,
}
