// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! driver limits, behavior switches and API-side bindings

use glsl_linker_ir::ShaderStage;
use hashbrown::HashMap;

impl_struct_with_default! {
    /// resource limits of one shader stage
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct StageLimits {
        /// default uniform block components
        max_uniform_components: u32 = 4096,
        /// uniform blocks
        max_uniform_blocks: u32 = 14,
        /// shader storage blocks
        max_shader_storage_blocks: u32 = 16,
        /// texture image units (samplers)
        max_texture_image_units: u32 = 32,
        /// image uniforms
        max_image_uniforms: u32 = 8,
        /// atomic counters
        max_atomic_counters: u32 = 4096,
        /// atomic counter buffers
        max_atomic_counter_buffers: u32 = 8,
        /// input components
        max_input_components: u32 = 128,
        /// output components
        max_output_components: u32 = 128,
    }
}

impl_struct_with_default! {
    /// the driver's implementation limits
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct LinkerConstants {
        /// generic varying vec4 slots
        max_varyings: u32 = 32,
        /// generic vertex attributes
        max_vertex_attribs: u32 = 16,
        /// draw buffers
        max_draw_buffers: u32 = 8,
        /// draw buffers usable with dual-source blending
        max_dual_source_draw_buffers: u32 = 1,
        /// transform feedback buffers
        max_transform_feedback_buffers: u32 = 4,
        /// components per varying in separate attribs mode
        max_transform_feedback_separate_components: u32 = 4,
        /// components per buffer in interleaved mode
        max_transform_feedback_interleaved_components: u32 = 64,
        /// vertex streams
        max_vertex_streams: u32 = 4,
        /// `gl_ClipDistance` size
        max_clip_distances: u32 = 8,
        /// `gl_CullDistance` size
        max_cull_distances: u32 = 8,
        /// combined clip and cull distance size
        max_combined_clip_and_cull_distances: u32 = 8,
        /// default block uniform locations
        max_uniform_locations: u32 = 16384,
        /// subroutine functions per stage
        max_subroutines: u32 = 256,
        /// subroutine uniform locations per stage
        max_subroutine_uniform_locations: u32 = 1024,
        /// `gl_MaxPatchVertices`
        max_patch_vertices: u32 = 32,
        /// geometry `max_vertices`
        max_geometry_output_vertices: u32 = 256,
        /// geometry `invocations`
        max_geometry_shader_invocations: u32 = 32,
        /// compute local size per dimension
        max_compute_work_group_size: [u32; 3] = [1024, 1024, 64],
        /// compute local size product
        max_compute_work_group_invocations: u32 = 1024,
        /// uniform blocks over all stages
        max_combined_uniform_blocks: u32 = 70,
        /// shader storage blocks over all stages
        max_combined_shader_storage_blocks: u32 = 80,
        /// texture image units over all stages
        max_combined_texture_image_units: u32 = 192,
        /// image uniforms over all stages
        max_combined_image_uniforms: u32 = 48,
        /// atomic counters over all stages
        max_combined_atomic_counters: u32 = 4096,
        /// atomic counter buffers over all stages
        max_combined_atomic_counter_buffers: u32 = 8,
        /// bytes in a uniform block
        max_uniform_block_size: u32 = 65536,
        /// bytes in a shader storage block
        max_shader_storage_block_size: u32 = 1 << 27,
        /// uniform buffer binding points
        max_uniform_buffer_bindings: u32 = 84,
        /// shader storage buffer binding points
        max_shader_storage_buffer_bindings: u32 = 96,
        /// atomic counter buffer binding points
        max_atomic_counter_buffer_bindings: u32 = 8,
        /// image units
        max_image_units: u32 = 32,
        /// per-stage limits, indexed by `ShaderStage::index`
        stages: [StageLimits; ShaderStage::COUNT] = [StageLimits::default(); ShaderStage::COUNT],
    }
}

impl LinkerConstants {
    /// the limits of `stage`
    pub fn stage(&self, stage: ShaderStage) -> &StageLimits {
        &self.stages[stage.index()]
    }
}

impl_struct_with_default! {
    /// driver behavior switches
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct LinkerOptions {
        /// give every varying its own slot
        disable_varying_packing: bool = false,
        /// don't pack varyings captured by transform feedback
        disable_transform_feedback_packing: bool = false,
        /// report interpolation mismatches as warnings
        allow_relaxed_interpolation_mismatch: bool = false,
        /// blocks without a layout qualifier use std430 instead of std140
        use_std430_as_default: bool = false,
        /// link a stage even when no compilation unit defines `main`
        allow_bodyless_link: bool = false,
        /// separable program: outward-facing interfaces stay intact
        separable: bool = false,
        /// the back end can address varying components directly
        native_per_component_varyings: bool = true,
    }
}

/// transform feedback capture mode
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TransformFeedbackBufferMode {
    /// all varyings into one buffer, or several with `gl_NextBuffer`
    Interleaved,
    /// one buffer per varying
    Separate,
}

impl Default for TransformFeedbackBufferMode {
    fn default() -> Self {
        TransformFeedbackBufferMode::Interleaved
    }
}

impl_struct_with_default! {
    /// state set through the API before linking
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct ProgramBindings {
        /// `glBindAttribLocation`
        attribute_bindings: HashMap<String, u32> = HashMap::new(),
        /// `glBindFragDataLocation`
        frag_data_bindings: HashMap<String, u32> = HashMap::new(),
        /// `glBindFragDataLocationIndexed` indexes
        frag_data_index_bindings: HashMap<String, u32> = HashMap::new(),
        /// `glTransformFeedbackVaryings` names
        transform_feedback_varyings: Vec<String> = Vec::new(),
        /// `glTransformFeedbackVaryings` buffer mode
        transform_feedback_buffer_mode: TransformFeedbackBufferMode =
            TransformFeedbackBufferMode::Interleaved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let constants = LinkerConstants::default();
        assert_eq!(constants.max_varyings, 32);
        assert_eq!(constants.stage(ShaderStage::Fragment).max_uniform_blocks, 14);
        let options = LinkerOptions::default();
        assert!(!options.separable);
        assert!(options.native_per_component_varyings);
        let bindings = ProgramBindings {
            transform_feedback_varyings: vec!["a".into()],
            ..ProgramBindings::default()
        };
        assert_eq!(
            bindings.transform_feedback_buffer_mode,
            TransformFeedbackBufferMode::Interleaved
        );
    }
}
