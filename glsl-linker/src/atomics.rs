// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! atomic counter buffers

use crate::block_layout::stages_of;
use crate::diagnostics::Diagnostics;
use crate::errors::{
    AtomicCounterOverlap, BindingOutOfRange, TooManyCombinedResources, TooManyStageResources,
};
use crate::options::LinkerConstants;
use crate::uniforms::ResourceTable;
use glsl_linker_ir::ShaderStage;
use std::collections::BTreeMap;

/// size of one counter in bytes
const ATOMIC_COUNTER_SIZE: u32 = 4;

/// the counters sharing one binding point
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AtomicBuffer {
    /// binding point
    pub binding: u32,
    /// bytes the bound buffer must have
    pub minimum_size: u32,
    /// indexes of the counters in the uniform table, by offset
    pub uniforms: Vec<usize>,
    /// bit `1 << stage.index()` for every stage referencing a counter of the buffer
    pub stage_references: u8,
}

/// group the atomic counters of `table` by binding and check their offsets and the counter
/// limits; each counter gets its buffer index
pub fn link_atomic_counters(
    table: &mut ResourceTable,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> Vec<AtomicBuffer> {
    let mut by_binding: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (index, uniform) in table.uniforms.iter().enumerate() {
        if uniform.uniform_type.is_atomic_uint() {
            by_binding.entry(uniform.binding).or_default().push(index);
        }
    }
    let mut buffers = Vec::with_capacity(by_binding.len());
    let mut stage_counters = [0u32; ShaderStage::COUNT];
    for (binding, mut counters) in by_binding {
        if binding >= constants.max_atomic_counter_buffer_bindings {
            let first = &table.uniforms[counters[0]];
            diagnostics.error(BindingOutOfRange {
                kind: "atomic counter",
                name: first.name.clone(),
                binding,
                max: constants.max_atomic_counter_buffer_bindings.saturating_sub(1),
            });
        }
        counters.sort_by_key(|&index| table.uniforms[index].offset);
        let mut buffer = AtomicBuffer {
            binding,
            ..AtomicBuffer::default()
        };
        let mut previous_end = 0u32;
        for (position, &index) in counters.iter().enumerate() {
            let uniform = &table.uniforms[index];
            let offset = uniform.offset.max(0) as u32;
            let elements = uniform.array_elements.max(1);
            if position > 0 && offset < previous_end {
                diagnostics.error(AtomicCounterOverlap {
                    name: uniform.name.clone(),
                    binding,
                    offset,
                });
            }
            previous_end = previous_end.max(offset + elements * ATOMIC_COUNTER_SIZE);
            buffer.stage_references |= uniform.active_shader_mask;
            for stage in stages_of(uniform.active_shader_mask) {
                stage_counters[stage.index()] += elements;
            }
        }
        buffer.minimum_size = previous_end;
        buffer.uniforms = counters;
        let buffer_index = buffers.len();
        for &index in &buffer.uniforms {
            table.uniforms[index].atomic_buffer_index = Some(buffer_index);
        }
        tracing::trace!(
            binding,
            minimum_size = buffer.minimum_size,
            "atomic counter buffer"
        );
        buffers.push(buffer);
    }
    for stage in ShaderStage::ALL {
        let limits = constants.stage(stage);
        let buffer_count = buffers
            .iter()
            .filter(|buffer| buffer.stage_references & (1 << stage.index()) != 0)
            .count() as u32;
        for (kind, count, max) in [
            (
                "atomic counters",
                stage_counters[stage.index()],
                limits.max_atomic_counters,
            ),
            (
                "atomic counter buffers",
                buffer_count,
                limits.max_atomic_counter_buffers,
            ),
        ] {
            if count > max {
                diagnostics.error(TooManyStageResources {
                    stage: stage.name(),
                    kind,
                    count,
                    max,
                });
            }
        }
    }
    let total_counters: u32 = stage_counters.iter().sum();
    let total_buffers: u32 = buffers
        .iter()
        .map(|buffer| buffer.stage_references.count_ones())
        .sum();
    for (kind, count, max) in [
        (
            "atomic counters",
            total_counters,
            constants.max_combined_atomic_counters,
        ),
        (
            "atomic counter buffers",
            total_buffers,
            constants.max_combined_atomic_counter_buffers,
        ),
    ] {
        if count > max {
            diagnostics.error(TooManyCombinedResources { kind, count, max });
        }
    }
    buffers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LinkError;
    use crate::uniforms::link_uniforms;
    use glsl_linker_ir::{Shader, Type, Variable, VariableMode};

    fn counter(name: &str, t: Type, binding: u32, offset: u32) -> Variable {
        let mut variable = Variable::new(name, t, VariableMode::Uniform).with_binding(binding);
        variable.data.explicit_offset = true;
        variable.data.offset = offset;
        variable
    }

    fn link(stages: &[&Shader], constants: &LinkerConstants) -> (Vec<AtomicBuffer>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut table = link_uniforms(stages, &[], &[], constants, &mut diagnostics);
        let buffers = link_atomic_counters(&mut table, constants, &mut diagnostics);
        for buffer in &buffers {
            for &index in &buffer.uniforms {
                assert!(table.uniforms[index].atomic_buffer_index.is_some());
            }
        }
        (buffers, diagnostics)
    }

    #[test]
    fn test_buffers_by_binding() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        vs.add_global(counter("b", Type::AtomicUint, 1, 0));
        vs.add_global(counter("a1", Type::AtomicUint, 0, 4));
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(counter("a0", Type::array(Type::AtomicUint, 1), 0, 0));
        fs.add_global(counter("a1", Type::AtomicUint, 0, 4));
        let (buffers, diagnostics) = link(&[&vs, &fs], &LinkerConstants::default());
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers[0].binding, 0);
        assert_eq!(buffers[0].minimum_size, 8);
        assert_eq!(buffers[0].uniforms.len(), 2);
        assert_eq!(buffers[0].stage_references, 0b10001);
        assert_eq!(buffers[1].binding, 1);
        assert_eq!(buffers[1].stage_references, 0b00001);
    }

    #[test]
    fn test_overlapping_counters() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(counter("a", Type::array(Type::AtomicUint, 2), 0, 0));
        fs.add_global(counter("b", Type::AtomicUint, 0, 4));
        let (_, diagnostics) = link(&[&fs], &LinkerConstants::default());
        assert_eq!(
            diagnostics.errors(),
            &[LinkError::from(AtomicCounterOverlap {
                name: "b".into(),
                binding: 0,
                offset: 4,
            })]
        );
    }

    #[test]
    fn test_counter_limits() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(counter("a", Type::array(Type::AtomicUint, 3), 0, 0));
        fs.add_global(counter("b", Type::AtomicUint, 9, 0));
        let mut constants = LinkerConstants::default();
        constants.max_combined_atomic_counters = 2;
        let (_, diagnostics) = link(&[&fs], &constants);
        assert_eq!(
            diagnostics.info_log(),
            "error: layout(binding = 9) for atomic counter `b' exceeds the maximum binding (7)\n\
             error: too many combined atomic counters (4 > 2)\n"
        );
    }
}
