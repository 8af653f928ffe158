//! Hand-maintained exceptions to the general classification rules
//!
//! Every registry irregularity that cannot be inferred from annotations lives in
//! [`OVERRIDES`], keyed by canonical command or structure name. The classifier
//! consults this table before it applies a general rule.

/// Storage types that are fixed regardless of what the registry declares
pub const MANUAL_TYPE_MAPPINGS: &[(&str, &str)] = &[
    ("char", "uint8_t"),
    ("int", "int32_t"),
    ("long", "int64_t"),
    ("size_t", "uint64_t"),
    ("VkFlags", "uint32_t"),
    ("VkFlags64", "uint64_t"),
    ("void", "uint8_t"),
    ("xcb_visualid_t", "uint32_t"),
];

/// Per-name exceptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Override {
    pub name: &'static str,
    /// Handle count parameter for create/destroy commands whose count is nested
    /// inside a create-info structure.
    pub handle_count: Option<&'static str>,
    /// Output arrays filled before the final parameter in a query-twice command.
    pub leading_outputs: &'static [(&'static str, &'static str)],
    /// Members that must be externally synchronized but are not annotated.
    pub externally_synchronized: &'static [&'static str],
    /// Parameters or members not named `*Count` that other parameters size against.
    pub count_like: &'static [&'static str],
}

impl Override {
    const EMPTY: Override = Override {
        name: "",
        handle_count: None,
        leading_outputs: &[],
        externally_synchronized: &[],
        count_like: &[],
    };
}

pub static OVERRIDES: &[Override] = &[
    Override {
        name: "vkAllocateDescriptorSets",
        handle_count: Some("descriptorSetCount"),
        ..Override::EMPTY
    },
    Override {
        name: "vkAllocateCommandBuffers",
        handle_count: Some("commandBufferCount"),
        ..Override::EMPTY
    },
    Override {
        name: "vkEnumeratePhysicalDeviceQueueFamilyPerformanceQueryCountersKHR",
        leading_outputs: &[("pCounters", "VkPerformanceCounterKHR")],
        ..Override::EMPTY
    },
    Override {
        name: "VkDescriptorSetAllocateInfo",
        externally_synchronized: &["descriptorPool"],
        ..Override::EMPTY
    },
    Override {
        name: "VkCommandBufferAllocateInfo",
        externally_synchronized: &["commandPool"],
        ..Override::EMPTY
    },
    Override {
        name: "VkSwapchainCreateInfoKHR",
        externally_synchronized: &["surface", "oldSwapchain"],
        ..Override::EMPTY
    },
    Override {
        name: "VkDebugMarkerObjectTagInfoEXT",
        externally_synchronized: &["object"],
        ..Override::EMPTY
    },
    Override {
        name: "VkDebugMarkerObjectNameInfoEXT",
        externally_synchronized: &["object"],
        ..Override::EMPTY
    },
    Override {
        name: "VkDebugUtilsObjectNameInfoEXT",
        externally_synchronized: &["objectHandle"],
        ..Override::EMPTY
    },
    Override {
        name: "vkSetDebugUtilsObjectTagEXT",
        externally_synchronized: &["objectHandle"],
        count_like: &["tagSize"],
        ..Override::EMPTY
    },
    Override {
        name: "VkPipelineShaderStageModuleIdentifierCreateInfoEXT",
        count_like: &["identifierSize"],
        ..Override::EMPTY
    },
    Override {
        name: "vkCreateRayTracingPipelinesKHR",
        count_like: &["dataSize"],
        ..Override::EMPTY
    },
    Override {
        name: "vkGetPipelineExecutableInternalRepresentationsKHR",
        count_like: &["dataSize"],
        ..Override::EMPTY
    },
    Override {
        name: "vkCreateGraphicsPipelines",
        count_like: &["rasterizationSamples", "dataSize", "pRasterizationState"],
        ..Override::EMPTY
    },
    Override {
        name: "vkCreateComputePipelines",
        count_like: &["dataSize"],
        ..Override::EMPTY
    },
    Override {
        name: "vkUpdateDescriptorSets",
        count_like: &["dataSize", "descriptorType"],
        ..Override::EMPTY
    },
    Override {
        name: "vkCmdPushDescriptorSetKHR",
        count_like: &["dataSize", "descriptorType"],
        ..Override::EMPTY
    },
    Override {
        name: "vkCreateShaderModule",
        count_like: &["codeSize"],
        ..Override::EMPTY
    },
    Override {
        name: "vkCreateValidationCacheEXT",
        count_like: &["initialDataSize"],
        ..Override::EMPTY
    },
    Override {
        name: "vkDebugMarkerSetObjectTagEXT",
        count_like: &["tagSize"],
        ..Override::EMPTY
    },
    Override {
        name: "vkCreatePipelineCache",
        count_like: &["initialDataSize"],
        ..Override::EMPTY
    },
];

pub fn lookup(name: &str) -> Option<&'static Override> {
    OVERRIDES.iter().find(|o| o.name == name)
}

pub fn handle_count(name: &str) -> Option<&'static str> {
    lookup(name).and_then(|o| o.handle_count)
}

pub fn leading_outputs(name: &str) -> &'static [(&'static str, &'static str)] {
    lookup(name).map_or(&[], |o| o.leading_outputs)
}

pub fn count_like(name: &str) -> &'static [&'static str] {
    lookup(name).map_or(&[], |o| o.count_like)
}

/// All manually curated (owner, member) synchronization pairs, in table order
pub fn externally_synchronized() -> impl Iterator<Item = (&'static str, &'static str)> {
    OVERRIDES
        .iter()
        .flat_map(|o| o.externally_synchronized.iter().map(move |m| (o.name, *m)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for o in OVERRIDES {
            assert!(seen.insert(o.name), "duplicate override for {}", o.name);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(handle_count("vkAllocateCommandBuffers"), Some("commandBufferCount"));
        assert_eq!(handle_count("vkAllocateDescriptorSets"), Some("descriptorSetCount"));
        assert_eq!(handle_count("vkCreateBuffer"), None);

        assert_eq!(
            leading_outputs("vkEnumeratePhysicalDeviceQueueFamilyPerformanceQueryCountersKHR"),
            &[("pCounters", "VkPerformanceCounterKHR")]
        );
        assert!(leading_outputs("vkEnumeratePhysicalDevices").is_empty());
        assert_eq!(count_like("vkCreateShaderModule"), &["codeSize"]);
    }

    #[test]
    fn test_manual_synchronization_pairs() {
        let pairs: Vec<_> = externally_synchronized().collect();
        assert!(pairs.contains(&("VkCommandBufferAllocateInfo", "commandPool")));
        assert!(pairs.contains(&("VkSwapchainCreateInfoKHR", "oldSwapchain")));
        assert_eq!(pairs.len(), 8);
    }
}
