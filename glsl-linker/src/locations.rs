// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! locations of generic vertex shader inputs and fragment shader outputs
//!
//! Placement order: `layout(location)` in the shader, then the locations bound through
//! the API, then first fit with the variables needing the most slots placed first.

use crate::diagnostics::Diagnostics;
use crate::errors::{
    AttributeLocationAliasing, InsufficientAttributeLocations, InvalidExplicitAttributeLocation,
};
use crate::options::{LinkerConstants, ProgramBindings};
use fixedbitset::FixedBitSet;
use glsl_linker_ir::{Shader, ShaderStage, VariableId, VariableMode};
use hashbrown::HashMap;

struct Target {
    mode: VariableMode,
    kind: &'static str,
    max_locations: u32,
    is_vertex_input: bool,
}

impl Target {
    fn new(stage: ShaderStage, constants: &LinkerConstants) -> Option<Self> {
        match stage {
            ShaderStage::Vertex => Some(Self {
                mode: VariableMode::ShaderIn,
                kind: "vertex shader input",
                max_locations: constants.max_vertex_attribs,
                is_vertex_input: true,
            }),
            ShaderStage::Fragment => Some(Self {
                mode: VariableMode::ShaderOut,
                kind: "fragment shader output",
                max_locations: constants.max_draw_buffers,
                is_vertex_input: false,
            }),
            _ => None,
        }
    }
}

struct Placed {
    variable: VariableId,
    location: u32,
    slots: u32,
    index: u32,
}

/// the first run of `slots` free bits below `max`
fn find_available_slots(used: &FixedBitSet, slots: u32, max: u32) -> Option<u32> {
    if slots > max {
        return None;
    }
    (0..=max - slots)
        .find(|&start| (start..start + slots).all(|slot| !used.contains(slot as usize)))
}

/// assign locations to the generic vertex inputs or fragment outputs of `shader`; other
/// stages are left alone
pub fn assign_attribute_or_color_locations(
    shader: &mut Shader,
    bindings: &ProgramBindings,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) {
    let target = match Target::new(shader.stage, constants) {
        Some(target) => target,
        None => return,
    };
    let _span = tracing::debug_span!("attribute locations", stage = %shader.stage.name())
        .entered();
    let (location_bindings, index_bindings): (&HashMap<String, u32>, Option<_>) =
        if target.is_vertex_input {
            (&bindings.attribute_bindings, None)
        } else {
            (
                &bindings.frag_data_bindings,
                Some(&bindings.frag_data_index_bindings),
            )
        };
    let generic: Vec<VariableId> = shader
        .globals()
        .filter(|&id| {
            let variable = &shader.variables[id];
            variable.mode == target.mode && !variable.is_builtin()
        })
        .collect();
    let uses_dual_source = generic.iter().any(|&id| {
        let variable = &shader.variables[id];
        let bound_index = index_bindings.and_then(|map| map.get(&variable.name));
        (variable.data.explicit_index && variable.data.index > 0)
            || bound_index.map_or(false, |&index| index > 0)
    });
    let max_locations = if uses_dual_source {
        constants.max_dual_source_draw_buffers
    } else {
        target.max_locations
    };
    let mut placed: Vec<Placed> = Vec::new();
    let mut to_assign: Vec<(VariableId, u32)> = Vec::new();
    for id in generic {
        let variable = &shader.variables[id];
        let slots = variable
            .var_type
            .count_attribute_slots(target.is_vertex_input)
            .max(1);
        let location = if variable.data.explicit_location {
            Some((variable.data.location.max(0) as u32, variable.data.index))
        } else if let Some(&location) = location_bindings.get(&variable.name) {
            let index = index_bindings
                .and_then(|map| map.get(&variable.name))
                .copied()
                .unwrap_or(0);
            Some((location, index))
        } else {
            None
        };
        match location {
            Some((location, index)) => {
                if location + slots > max_locations || index > 1 {
                    diagnostics.error(InvalidExplicitAttributeLocation {
                        kind: target.kind,
                        name: variable.name.clone(),
                        location,
                    });
                    continue;
                }
                placed.push(Placed {
                    variable: id,
                    location,
                    slots,
                    index,
                });
            }
            None => to_assign.push((id, slots)),
        }
    }
    let aliasing_allowed = target.is_vertex_input && !shader.is_es;
    let mut used = [FixedBitSet::with_capacity(32), FixedBitSet::with_capacity(32)];
    let mut owners: HashMap<(u32, u32), VariableId> = HashMap::new();
    for placement in &placed {
        for slot in placement.location..placement.location + placement.slots {
            let key = (placement.index, slot);
            if let Some(&other) = owners.get(&key) {
                if !aliasing_allowed {
                    diagnostics.error(AttributeLocationAliasing {
                        kind: target.kind,
                        first: shader.variables[other].name.clone(),
                        second: shader.variables[placement.variable].name.clone(),
                        location: slot,
                    });
                    break;
                }
            } else {
                owners.insert(key, placement.variable);
            }
        }
        let used = &mut used[placement.index as usize];
        used.grow((placement.location + placement.slots) as usize);
        used.insert_range(
            placement.location as usize..(placement.location + placement.slots) as usize,
        );
    }
    to_assign.sort_by(|(_, a), (_, b)| b.cmp(a));
    for (id, slots) in to_assign {
        match find_available_slots(&used[0], slots, max_locations) {
            Some(location) => {
                used[0].grow((location + slots) as usize);
                used[0].insert_range(location as usize..(location + slots) as usize);
                placed.push(Placed {
                    variable: id,
                    location,
                    slots,
                    index: 0,
                });
            }
            None => diagnostics.error(InsufficientAttributeLocations {
                kind: target.kind,
                name: shader.variables[id].name.clone(),
            }),
        }
    }
    for placement in placed {
        let variable = &mut shader.variables[placement.variable];
        tracing::trace!(
            name = %variable.name,
            location = placement.location,
            index = placement.index,
            "assigned location"
        );
        variable.data.location = placement.location as i32;
        variable.data.index = placement.index;
        variable.data.is_unmatched_generic_inout = false;
    }
}
