// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! sizing of arrays declared without a size

use crate::diagnostics::Diagnostics;
use crate::errors::ArrayAccessOutOfBounds;
use crate::errors::PerVertexArraySizeMismatch;
use crate::options::LinkerConstants;
use glsl_linker_ir::visit::for_each_dereference;
use glsl_linker_ir::{
    Dereference, Expression, InterfaceType, Shader, ShaderStage, Type, VariableId, VariableMode,
};
use hashbrown::HashMap;

/// an access of a global array with a constant index
struct ConstantAccess {
    variable: VariableId,
    /// member of a block instance
    field: Option<String>,
    index: i32,
}

fn constant_index(expression: &Expression) -> Option<i32> {
    match expression {
        Expression::Constant(constant) => constant.as_index().map(|v| v as i32),
        _ => None,
    }
}

fn collect_accesses(dereference: &Dereference, accesses: &mut Vec<ConstantAccess>) {
    match dereference {
        Dereference::Variable(_) => {}
        Dereference::ArrayIndex { array, index } => {
            if let Some(index) = constant_index(index) {
                match &**array {
                    Dereference::Variable(variable) => accesses.push(ConstantAccess {
                        variable: *variable,
                        field: None,
                        index,
                    }),
                    Dereference::Record { record, field } => {
                        let variable = match &**record {
                            Dereference::Variable(variable) => Some(*variable),
                            Dereference::ArrayIndex { array, .. } => match &**array {
                                Dereference::Variable(variable) => Some(*variable),
                                _ => None,
                            },
                            Dereference::Record { .. } => None,
                        };
                        if let Some(variable) = variable {
                            accesses.push(ConstantAccess {
                                variable,
                                field: Some(field.clone()),
                                index,
                            });
                        }
                    }
                    Dereference::ArrayIndex { .. } => {}
                }
            }
            collect_accesses(array, accesses);
        }
        Dereference::Record { record, .. } => collect_accesses(record, accesses),
    }
}

/// raise `max_array_access` of globals, and of block instance members, to the largest
/// constant index the shader uses
pub fn note_constant_array_accesses(shader: &mut Shader) {
    let mut accesses = Vec::new();
    let mut visit = |instructions: &[glsl_linker_ir::Instruction]| {
        for_each_dereference(instructions, |dereference, _| {
            collect_accesses(dereference, &mut accesses)
        })
    };
    visit(&shader.instructions);
    for function in &shader.functions {
        for signature in &function.signatures {
            visit(&signature.body);
        }
    }
    for access in accesses {
        let variable = &mut shader.variables[access.variable];
        match access.field {
            None => variable.note_array_access(access.index),
            Some(field) => {
                let field_index = match variable.var_type.without_array().field_index(&field) {
                    Some(field_index) => field_index,
                    None => continue,
                };
                let field_count = variable
                    .var_type
                    .without_array()
                    .fields()
                    .map_or(0, |fields| fields.len());
                if variable.max_ifc_array_access.len() < field_count {
                    variable.max_ifc_array_access.resize(field_count, -1);
                }
                let max = &mut variable.max_ifc_array_access[field_index];
                *max = (*max).max(access.index);
            }
        }
    }
}

/// the size an unsized array takes from its largest access
fn inferred_length(max_array_access: i32) -> u32 {
    (max_array_access + 1).max(1) as u32
}

fn size_outermost(t: &Type, max_array_access: i32) -> Option<Type> {
    match t {
        Type::Array {
            element,
            length: None,
        } => Some(Type::array((**element).clone(), inferred_length(max_array_access))),
        _ => None,
    }
}

/// size the unsized members of `interface`; the last member of a shader storage block
/// stays a runtime-sized array
fn size_interface_members(
    interface: &InterfaceType,
    max_ifc_array_access: &[i32],
    is_shader_storage: bool,
) -> Option<InterfaceType> {
    let mut retval = interface.clone();
    let mut changed = false;
    let field_count = retval.fields.len();
    for (index, field) in retval.fields.iter_mut().enumerate() {
        if is_shader_storage && index + 1 == field_count {
            continue;
        }
        let max_access = max_ifc_array_access.get(index).copied().unwrap_or(-1);
        if let Some(sized) = size_outermost(&field.field_type, max_access) {
            field.field_type = sized;
            field.implicit_sized_array = true;
            changed = true;
        }
    }
    if changed {
        Some(retval)
    } else {
        None
    }
}

/// give every unsized global array the size implied by its largest access; members of
/// unnamed blocks get their block type rebuilt
pub fn fixup_array_sizes(shader: &mut Shader) {
    let globals: Vec<_> = shader.globals().collect();
    let mut unnamed_blocks: HashMap<(VariableMode, String), Vec<VariableId>> = HashMap::new();
    for &id in &globals {
        let variable = &mut shader.variables[id];
        let is_shader_storage = variable.mode == VariableMode::ShaderStorage;
        if variable.is_interface_instance() {
            let interface = match variable.var_type.without_array() {
                Type::Interface(interface) => interface.clone(),
                _ => continue,
            };
            if let Some(sized) = size_interface_members(
                &interface,
                &variable.max_ifc_array_access,
                is_shader_storage,
            ) {
                variable.var_type = variable.var_type.with_innermost(sized.clone().into());
                variable.interface_type = Some(sized);
            }
            if let Some(sized) = size_outermost(&variable.var_type, variable.max_array_access) {
                variable.var_type = sized;
            }
            continue;
        }
        if let Some(interface) = &variable.interface_type {
            let key = (variable.mode, interface.name.clone());
            let is_last_storage_member = is_shader_storage
                && interface
                    .fields
                    .last()
                    .map_or(false, |field| field.name == variable.name);
            unnamed_blocks.entry(key).or_default().push(id);
            if is_last_storage_member {
                continue;
            }
        }
        if let Some(sized) = size_outermost(&variable.var_type, variable.max_array_access) {
            tracing::trace!(name = %variable.name, %sized, "sized array");
            variable.var_type = sized;
        }
    }
    for (_, members) in unnamed_blocks {
        let interface = match &shader.variables[members[0]].interface_type {
            Some(interface) => interface.clone(),
            None => continue,
        };
        let mut rebuilt = interface.clone();
        for &member in &members {
            let variable = &shader.variables[member];
            if let Some(field) = rebuilt
                .fields
                .iter_mut()
                .find(|field| field.name == variable.name)
            {
                if field.field_type != variable.var_type {
                    field.field_type = variable.var_type.clone();
                    field.implicit_sized_array = true;
                }
            }
        }
        if rebuilt != interface {
            for &member in &members {
                shader.variables[member].interface_type = Some(rebuilt.clone());
            }
        }
    }
}

fn size_per_vertex_arrays(
    shader: &mut Shader,
    mode: VariableMode,
    vertex_count: u32,
    what: &'static str,
    check_declared_size: bool,
    diagnostics: &mut Diagnostics,
) {
    let stage = shader.stage;
    let globals: Vec<_> = shader.globals().collect();
    for id in globals {
        let variable = &mut shader.variables[id];
        if variable.mode != mode || variable.data.patch {
            continue;
        }
        let element = match &variable.var_type {
            Type::Array { element, length } => match *length {
                Some(length) if check_declared_size && length != vertex_count => {
                    diagnostics.error(PerVertexArraySizeMismatch {
                        stage: stage.name(),
                        name: variable.name.clone(),
                        declared: length,
                        what,
                        expected: vertex_count,
                    });
                    continue;
                }
                // explicitly sized inputs keep their size
                Some(_) if !check_declared_size => continue,
                _ => (**element).clone(),
            },
            _ => continue,
        };
        if variable.max_array_access >= vertex_count as i32 {
            diagnostics.error(ArrayAccessOutOfBounds {
                mode: variable.mode.name(),
                name: variable.name.clone(),
                size: vertex_count,
                index: variable.max_array_access,
            });
            continue;
        }
        variable.var_type = Type::array(element, vertex_count);
        variable.max_array_access = vertex_count as i32 - 1;
    }
}

/// size the per-vertex arrays of geometry and tessellation stages: geometry inputs from
/// the input primitive, tessellation control outputs from the output vertex count, and
/// tessellation inputs to `gl_MaxPatchVertices`
pub fn size_stage_arrays(
    shader: &mut Shader,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) {
    match shader.stage {
        ShaderStage::Geometry => {
            if let Some(primitive) = shader.layout.gs_input_primitive {
                size_per_vertex_arrays(
                    shader,
                    VariableMode::ShaderIn,
                    primitive.vertices_per_primitive(),
                    "input vertices",
                    true,
                    diagnostics,
                );
            }
        }
        ShaderStage::TessControl => {
            if let Some(vertices) = shader.layout.tcs_vertices_out {
                size_per_vertex_arrays(
                    shader,
                    VariableMode::ShaderOut,
                    vertices,
                    "output vertices",
                    true,
                    diagnostics,
                );
            }
            size_per_vertex_arrays(
                shader,
                VariableMode::ShaderIn,
                constants.max_patch_vertices,
                "input vertices",
                false,
                diagnostics,
            );
        }
        ShaderStage::TessEval => size_per_vertex_arrays(
            shader,
            VariableMode::ShaderIn,
            constants.max_patch_vertices,
            "input vertices",
            false,
            diagnostics,
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsl_linker_ir::{Instruction, InterfacePacking, PrimitiveMode, StructField, Variable};

    #[test]
    fn test_size_from_constant_accesses() {
        let mut shader = Shader::new("fs", ShaderStage::Fragment, 450, false);
        let weights = shader.add_global(Variable::new(
            "weights",
            Type::unsized_array(Type::float()),
            VariableMode::Uniform,
        ));
        let out = shader.add_global(Variable::new("o", Type::float(), VariableMode::ShaderOut));
        shader.add_main(vec![
            Instruction::assign(out, Dereference::from(weights).index(2)),
            Instruction::assign(out, Dereference::from(weights).index(5)),
        ]);
        note_constant_array_accesses(&mut shader);
        assert_eq!(shader.variables[weights].max_array_access, 5);
        fixup_array_sizes(&mut shader);
        assert_eq!(
            shader.variables[weights].var_type,
            Type::array(Type::float(), 6)
        );
    }

    #[test]
    fn test_fixup_is_idempotent() {
        let mut shader = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let mut a = Variable::new(
            "a",
            Type::unsized_array(Type::vec(4)),
            VariableMode::Uniform,
        );
        a.max_array_access = 3;
        let a = shader.add_global(a);
        let interface = InterfaceType {
            name: "Block".into(),
            fields: vec![
                StructField::new("fixed", Type::unsized_array(Type::float())),
                StructField::new("tail", Type::unsized_array(Type::float())),
            ],
            packing: InterfacePacking::Std430,
            row_major: false,
        };
        let mut instance = Variable::new(
            "b",
            interface.clone().into(),
            VariableMode::ShaderStorage,
        )
        .with_interface(interface);
        instance.max_ifc_array_access = vec![1, 7];
        let b = shader.add_global(instance);
        fixup_array_sizes(&mut shader);
        let once = shader.variables.clone();
        fixup_array_sizes(&mut shader);
        assert_eq!(shader.variables[a], once[a]);
        assert_eq!(shader.variables[b], once[b]);
        assert_eq!(shader.variables[a].var_type, Type::array(Type::vec(4), 4));
        let fields = shader.variables[b].var_type.fields().unwrap().to_vec();
        assert_eq!(fields[0].field_type, Type::array(Type::float(), 2));
        assert!(fields[0].implicit_sized_array);
        assert!(fields[1].field_type.is_unsized_array());
    }

    #[test]
    fn test_unnamed_block_rebuilt() {
        let mut shader = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let interface = InterfaceType {
            name: "Lights".into(),
            fields: vec![StructField::new("colors", Type::unsized_array(Type::vec(3)))],
            packing: InterfacePacking::Std140,
            row_major: false,
        };
        let mut colors = Variable::new(
            "colors",
            Type::unsized_array(Type::vec(3)),
            VariableMode::Uniform,
        )
        .with_interface(interface);
        colors.max_array_access = 1;
        let colors = shader.add_global(colors);
        fixup_array_sizes(&mut shader);
        let variable = &shader.variables[colors];
        assert_eq!(variable.var_type, Type::array(Type::vec(3), 2));
        assert_eq!(
            variable.interface_type.as_ref().unwrap().fields[0].field_type,
            variable.var_type
        );
    }

    #[test]
    fn test_geometry_inputs() {
        let mut shader = Shader::new("gs", ShaderStage::Geometry, 450, false);
        shader.layout.gs_input_primitive = Some(PrimitiveMode::Triangles);
        let unsized_input = shader.add_global(Variable::new(
            "color",
            Type::unsized_array(Type::vec(4)),
            VariableMode::ShaderIn,
        ));
        shader.add_global(Variable::new(
            "normal",
            Type::array(Type::vec(3), 2),
            VariableMode::ShaderIn,
        ));
        let mut diagnostics = Diagnostics::new();
        size_stage_arrays(&mut shader, &LinkerConstants::default(), &mut diagnostics);
        assert_eq!(
            shader.variables[unsized_input].var_type,
            Type::array(Type::vec(4), 3)
        );
        assert_eq!(
            diagnostics.info_log(),
            "error: geometry shader: size of array normal declared as 2, but number of input \
             vertices is 3\n"
        );
    }

    #[test]
    fn test_tessellation_control_arrays() {
        let mut shader = Shader::new("tcs", ShaderStage::TessControl, 450, false);
        shader.layout.tcs_vertices_out = Some(4);
        let output = shader.add_global(Variable::new(
            "o",
            Type::unsized_array(Type::vec(4)),
            VariableMode::ShaderOut,
        ));
        let mut patch = Variable::new("p", Type::array(Type::float(), 2), VariableMode::ShaderOut);
        patch.data.patch = true;
        let patch = shader.add_global(patch);
        let input = shader.add_global(Variable::new(
            "i",
            Type::unsized_array(Type::vec(4)),
            VariableMode::ShaderIn,
        ));
        let mut diagnostics = Diagnostics::new();
        size_stage_arrays(&mut shader, &LinkerConstants::default(), &mut diagnostics);
        assert!(diagnostics.link_status());
        assert_eq!(shader.variables[output].var_type, Type::array(Type::vec(4), 4));
        assert_eq!(shader.variables[patch].var_type, Type::array(Type::float(), 2));
        assert_eq!(shader.variables[input].var_type, Type::array(Type::vec(4), 32));
    }

    #[test]
    fn test_tessellation_evaluation_inputs_keep_declared_size() {
        let mut shader = Shader::new("tes", ShaderStage::TessEval, 450, false);
        let sized = shader.add_global(Variable::new(
            "sized",
            Type::array(Type::vec(3), 3),
            VariableMode::ShaderIn,
        ));
        let unsized_input = shader.add_global(Variable::new(
            "unsized_input",
            Type::unsized_array(Type::vec(3)),
            VariableMode::ShaderIn,
        ));
        let mut diagnostics = Diagnostics::new();
        size_stage_arrays(&mut shader, &LinkerConstants::default(), &mut diagnostics);
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        assert_eq!(shader.variables[sized].var_type, Type::array(Type::vec(3), 3));
        assert_eq!(
            shader.variables[unsized_input].var_type,
            Type::array(Type::vec(3), 32)
        );
    }
}
