// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! cross-validation of global declarations
//!
//! The first declaration of every global becomes the canonical one. Later declarations
//! are checked against it and may refine it (an explicit array size, a location, a
//! binding or an initializer seen only later). Once all declarations are seen the
//! canonical state is written back to every declaration, so whichever copy ends up in
//! the linked shader carries the merged qualifiers.

use crate::diagnostics::Diagnostics;
use crate::errors::ArrayAccessOutOfBounds;
use crate::errors::MismatchedDepthLayout;
use crate::errors::MismatchedExplicitBinding;
use crate::errors::MismatchedExplicitLocation;
use crate::errors::MismatchedExplicitOffset;
use crate::errors::MismatchedGlobalQualifier;
use crate::errors::MismatchedGlobalType;
use crate::errors::MismatchedInitializer;
use crate::errors::MismatchedInterfaceMembership;
use glsl_linker_ir::variable::DepthLayout;
use glsl_linker_ir::{Shader, Type, Variable, VariableMode};
use hashbrown::HashMap;

fn depth_layout_name(layout: DepthLayout) -> &'static str {
    match layout {
        DepthLayout::None => "depth_none",
        DepthLayout::Any => "depth_any",
        DepthLayout::Greater => "depth_greater",
        DepthLayout::Less => "depth_less",
        DepthLayout::Unchanged => "depth_unchanged",
    }
}

/// unify `existing` and `variable` when both are arrays of the same element type and
/// exactly one of them is unsized; `existing` takes the sized type. Returns `false` when
/// the types can't be unified this way.
pub(crate) fn validate_intrastage_arrays(
    existing: &mut Variable,
    variable: &Variable,
    diagnostics: &mut Diagnostics,
) -> bool {
    let (variable_element, variable_length, existing_element, existing_length) =
        match (&variable.var_type, &existing.var_type) {
            (
                Type::Array {
                    element: variable_element,
                    length: variable_length,
                },
                Type::Array {
                    element: existing_element,
                    length: existing_length,
                },
            ) => (
                variable_element,
                *variable_length,
                existing_element,
                *existing_length,
            ),
            _ => return false,
        };
    if !variable_element.compare(existing_element, false) {
        return false;
    }
    match (variable_length, existing_length) {
        (Some(length), None) => {
            if length as i32 <= existing.max_array_access {
                diagnostics.error(ArrayAccessOutOfBounds {
                    mode: variable.mode.name(),
                    name: variable.name.clone(),
                    size: length,
                    index: existing.max_array_access,
                });
            }
            existing.var_type = variable.var_type.clone();
            true
        }
        (None, Some(length)) => {
            if length as i32 <= variable.max_array_access {
                diagnostics.error(ArrayAccessOutOfBounds {
                    mode: variable.mode.name(),
                    name: variable.name.clone(),
                    size: length,
                    index: variable.max_array_access,
                });
            }
            true
        }
        _ => false,
    }
}

fn should_validate(variable: &Variable, uniforms_only: bool) -> bool {
    if variable.mode == VariableMode::Temporary {
        return false;
    }
    if uniforms_only && !variable.mode.is_in_buffer_or_uniform() {
        return false;
    }
    !variable.var_type.contains_subroutine() && !variable.is_interface_instance()
}

fn block_description(variable: &Variable) -> String {
    match variable.interface_name() {
        Some(name) => format!("block `{}'", name),
        None => "no block".to_string(),
    }
}

/// check `variable` against the canonical declaration `existing`, refining `existing`;
/// checking stops at the first error reported for the variable
fn cross_validate_variable(
    existing: &mut Variable,
    variable: &Variable,
    is_es: bool,
    diagnostics: &mut Diagnostics,
) {
    let mode = variable.mode.name();
    if !variable.var_type.compare(&existing.var_type, false)
        && !validate_intrastage_arrays(existing, variable, diagnostics)
    {
        if variable.var_type.is_record()
            && existing.var_type.is_record()
            && existing
                .var_type
                .record_compare(&variable.var_type, true, true, false)
        {
            existing.var_type = variable.var_type.clone();
        } else {
            diagnostics.error(MismatchedGlobalType {
                mode,
                name: variable.name.clone(),
                first_type: variable.var_type.name(),
                second_type: existing.var_type.name(),
            });
            return;
        }
    }
    existing.max_array_access = existing.max_array_access.max(variable.max_array_access);
    if variable.data.explicit_location {
        if existing.data.explicit_location && variable.data.location != existing.data.location {
            diagnostics.error(MismatchedExplicitLocation {
                mode,
                name: variable.name.clone(),
                first: variable.data.location,
                second: existing.data.location,
            });
            return;
        }
        if variable.data.location_frac != existing.data.location_frac
            && existing.data.explicit_location
        {
            diagnostics.error(MismatchedGlobalQualifier {
                mode,
                name: variable.name.clone(),
                qualifier: "component",
            });
            return;
        }
        existing.data.location = variable.data.location;
        existing.data.location_frac = variable.data.location_frac;
        existing.data.explicit_location = true;
    }
    if variable.data.explicit_binding {
        if existing.data.explicit_binding && variable.data.binding != existing.data.binding {
            diagnostics.error(MismatchedExplicitBinding {
                mode,
                name: variable.name.clone(),
                first: variable.data.binding,
                second: existing.data.binding,
            });
            return;
        }
        existing.data.binding = variable.data.binding;
        existing.data.explicit_binding = true;
    }
    if variable.var_type.contains_atomic() && variable.data.offset != existing.data.offset {
        diagnostics.error(MismatchedExplicitOffset {
            mode,
            name: variable.name.clone(),
            first: variable.data.offset,
            second: existing.data.offset,
        });
        return;
    }
    if variable.name == "gl_FragDepth" {
        let layout_declared = variable.data.depth_layout != DepthLayout::None;
        let layout_differs = variable.data.depth_layout != existing.data.depth_layout;
        if (layout_declared || variable.data.used) && layout_differs {
            diagnostics.error(MismatchedDepthLayout {
                current: depth_layout_name(variable.data.depth_layout).into(),
                previous: depth_layout_name(existing.data.depth_layout).into(),
            });
            return;
        }
    }
    if let Some(initializer) = &variable.constant_initializer {
        match &existing.constant_initializer {
            Some(existing_initializer) => {
                if existing_initializer != initializer {
                    diagnostics.error(MismatchedInitializer {
                        mode,
                        name: variable.name.clone(),
                    });
                    return;
                }
            }
            None => existing.constant_initializer = Some(initializer.clone()),
        }
    }
    let qualifier_mismatch = if existing.data.explicit_invariant
        != variable.data.explicit_invariant
    {
        Some("invariant")
    } else if existing.data.centroid != variable.data.centroid {
        Some("centroid")
    } else if existing.data.sample != variable.data.sample {
        Some("sample")
    } else if existing.data.image_format != variable.data.image_format {
        Some("image format")
    } else if is_es
        && variable.mode == VariableMode::Uniform
        && existing.data.precision != variable.data.precision
    {
        Some("precision")
    } else {
        None
    };
    if let Some(qualifier) = qualifier_mismatch {
        diagnostics.error(MismatchedGlobalQualifier {
            mode,
            name: variable.name.clone(),
            qualifier,
        });
        return;
    }
    if existing.interface_name() != variable.interface_name() {
        diagnostics.error(MismatchedInterfaceMembership {
            mode,
            name: variable.name.clone(),
            first: block_description(variable),
            second: block_description(existing),
        });
    }
}

/// every global declared in more than one of `shaders` must be declared consistently;
/// with `uniforms_only` only uniforms and buffer variables are considered
pub fn cross_validate_globals(
    shaders: &mut [&mut Shader],
    uniforms_only: bool,
    diagnostics: &mut Diagnostics,
) {
    let mut canonical: HashMap<String, Variable> = HashMap::new();
    for shader in shaders.iter() {
        for id in shader.globals() {
            let variable = &shader.variables[id];
            if !should_validate(variable, uniforms_only) {
                continue;
            }
            match canonical.get_mut(&variable.name) {
                Some(existing) => {
                    cross_validate_variable(existing, variable, shader.is_es, diagnostics);
                }
                None => {
                    canonical.insert(variable.name.clone(), variable.clone());
                }
            }
        }
    }
    for shader in shaders.iter_mut() {
        let globals: Vec<_> = shader.globals().collect();
        for id in globals {
            let variable = &mut shader.variables[id];
            if !should_validate(variable, uniforms_only) {
                continue;
            }
            let existing = match canonical.get(&variable.name) {
                Some(existing) => existing,
                None => continue,
            };
            if existing.var_type.compare(&variable.var_type, false)
                || (existing.var_type.is_array()
                    && variable.var_type.is_unsized_array()
                    && existing.var_type.element_type() == variable.var_type.element_type())
                || (existing.var_type.is_record() && variable.var_type.is_record())
            {
                variable.var_type = existing.var_type.clone();
            }
            variable.max_array_access = existing.max_array_access;
            variable.data.location = existing.data.location;
            variable.data.location_frac = existing.data.location_frac;
            variable.data.explicit_location = existing.data.explicit_location;
            variable.data.binding = existing.data.binding;
            variable.data.explicit_binding = existing.data.explicit_binding;
            if variable.constant_initializer.is_none() {
                variable.constant_initializer = existing.constant_initializer.clone();
            }
        }
    }
}
