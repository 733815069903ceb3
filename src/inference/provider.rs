//! Execution providers and the order they are tried in.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hardware backend a model session can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Android Neural Networks API.
    Nnapi,
    /// Apple Core ML.
    #[serde(rename = "coreml")]
    CoreMl,
    /// Qualcomm AI Engine.
    Qnn,
    /// XNNPACK optimized CPU kernels.
    Xnnpack,
    /// NVIDIA CUDA.
    Cuda,
    /// Windows `DirectML`.
    #[serde(rename = "directml")]
    DirectMl,
    /// Plain CPU execution.
    Cpu,
}

/// Metadata for an execution provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderMetadata {
    /// Config/CLI identifier (e.g. "nnapi").
    pub id: &'static str,
    /// Display name (e.g. "NNAPI").
    pub name: &'static str,
    /// Description for human output.
    pub description: &'static str,
}

impl ExecutionProvider {
    /// Every provider, in display order.
    pub const ALL: [Self; 7] = [
        Self::Nnapi,
        Self::CoreMl,
        Self::Qnn,
        Self::Xnnpack,
        Self::Cuda,
        Self::DirectMl,
        Self::Cpu,
    ];

    /// Identifier used in config files and on the command line.
    pub const fn id(self) -> &'static str {
        self.metadata().id
    }

    /// Static metadata for display.
    pub const fn metadata(self) -> ProviderMetadata {
        match self {
            Self::Nnapi => ProviderMetadata {
                id: "nnapi",
                name: "NNAPI",
                description: "NNAPI (Android neural accelerator)",
            },
            Self::CoreMl => ProviderMetadata {
                id: "coreml",
                name: "CoreML",
                description: "CoreML (Apple GPU/Neural Engine)",
            },
            Self::Qnn => ProviderMetadata {
                id: "qnn",
                name: "QNN",
                description: "QNN (Qualcomm Neural Network)",
            },
            Self::Xnnpack => ProviderMetadata {
                id: "xnnpack",
                name: "XNNPACK",
                description: "XNNPACK (optimized CPU for ARM/x86)",
            },
            Self::Cuda => ProviderMetadata {
                id: "cuda",
                name: "CUDA",
                description: "CUDA (NVIDIA GPU acceleration)",
            },
            Self::DirectMl => ProviderMetadata {
                id: "directml",
                name: "DirectML",
                description: "DirectML (Windows GPU acceleration)",
            },
            Self::Cpu => ProviderMetadata {
                id: "cpu",
                name: "CPU",
                description: "CPU (always available)",
            },
        }
    }

    /// True if this provider is worth trying on the current target.
    pub const fn supported_on_target(self) -> bool {
        match self {
            Self::Nnapi => cfg!(target_os = "android"),
            Self::CoreMl => cfg!(target_vendor = "apple"),
            Self::DirectMl => cfg!(target_os = "windows"),
            Self::Cuda => cfg!(any(target_os = "linux", target_os = "windows")),
            Self::Qnn => cfg!(any(target_os = "android", target_os = "windows")),
            Self::Xnnpack | Self::Cpu => true,
        }
    }
}

impl fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metadata().name)
    }
}

impl FromStr for ExecutionProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.id() == needle)
            .ok_or_else(|| Error::ConfigValidation {
                message: format!(
                    "unknown execution provider '{s}' (expected one of: {})",
                    Self::ALL.map(Self::id).join(", ")
                ),
            })
    }
}

/// Coarse device preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Platform accelerator first, CPU last.
    #[default]
    Auto,
    /// Prefer desktop GPU providers, then the platform chain.
    Gpu,
    /// CPU only.
    Cpu,
}

impl fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Ordered list of providers to try, most preferred first.
///
/// An explicit `providers` list wins over the device preference. CPU is
/// always the final fallback.
pub fn provider_chain(
    device: InferenceDevice,
    providers: Option<&[ExecutionProvider]>,
) -> Vec<ExecutionProvider> {
    let mut chain: Vec<ExecutionProvider> = match (device, providers) {
        (_, Some(explicit)) if !explicit.is_empty() => explicit.to_vec(),
        (InferenceDevice::Cpu, _) => return vec![ExecutionProvider::Cpu],
        (InferenceDevice::Gpu, _) => {
            let mut chain = vec![ExecutionProvider::Cuda, ExecutionProvider::DirectMl];
            chain.extend(platform_chain());
            chain
        }
        (InferenceDevice::Auto, _) => platform_chain(),
    };

    chain.retain(|p| p.supported_on_target());
    let mut seen = Vec::with_capacity(chain.len());
    chain.retain(|p| {
        if seen.contains(p) {
            false
        } else {
            seen.push(*p);
            true
        }
    });
    if !chain.contains(&ExecutionProvider::Cpu) {
        chain.push(ExecutionProvider::Cpu);
    }
    chain
}

fn platform_chain() -> Vec<ExecutionProvider> {
    if cfg!(target_os = "android") {
        vec![ExecutionProvider::Nnapi, ExecutionProvider::Xnnpack]
    } else if cfg!(target_vendor = "apple") {
        vec![ExecutionProvider::CoreMl, ExecutionProvider::Xnnpack]
    } else {
        vec![ExecutionProvider::Xnnpack]
    }
}
