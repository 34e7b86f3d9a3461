// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! interface block validation within a stage, between stages and for uniform and buffer
//! blocks across the whole program

use crate::diagnostics::Diagnostics;
use crate::errors::InputBlockNotOutput;
use crate::errors::MismatchedInterfaceBlock;
use crate::global_validation::validate_intrastage_arrays;
use glsl_linker_ir::variable::DeclarationKind;
use glsl_linker_ir::{Shader, ShaderStage, Type, Variable, VariableMode};
use hashbrown::HashMap;

fn is_implicitly_declared(variable: &Variable) -> bool {
    variable.data.how_declared == DeclarationKind::ImplicitlyDeclared
}

/// the declaration first seen for each interface block, keyed by mode and block name
#[derive(Default)]
struct BlockDefinitions {
    definitions: HashMap<(VariableMode, String), Variable>,
}

impl BlockDefinitions {
    fn lookup(&self, mode: VariableMode, name: &str) -> Option<&Variable> {
        self.definitions.get(&(mode, name.to_string()))
    }
    fn lookup_mut(&mut self, mode: VariableMode, name: &str) -> Option<&mut Variable> {
        self.definitions.get_mut(&(mode, name.to_string()))
    }
    fn store(&mut self, variable: &Variable) {
        if let Some(name) = variable.interface_name() {
            self.definitions
                .insert((variable.mode, name.to_string()), variable.clone());
        }
    }
}

/// two declarations of the same block inside one stage or across the uniform namespace
fn intrastage_match(a: &mut Variable, b: &Variable, diagnostics: &mut Diagnostics) -> bool {
    let (a_interface, b_interface) = match (&a.interface_type, &b.interface_type) {
        (Some(a_interface), Some(b_interface)) => (a_interface, b_interface),
        _ => return false,
    };
    if a_interface != b_interface
        && !(is_implicitly_declared(a) && is_implicitly_declared(b))
        && !a_interface.compare(b_interface, true, true, false)
    {
        return false;
    }
    if a.is_interface_instance() != b.is_interface_instance() {
        return false;
    }
    if a.is_interface_instance() && !b.mode.is_in_buffer_or_uniform() && a.name != b.name {
        return false;
    }
    if b.var_type != a.var_type
        && (a.var_type.is_array() || b.var_type.is_array())
        && (a.is_interface_instance() || b.is_interface_instance())
    {
        if !validate_intrastage_arrays(a, b, diagnostics) {
            return false;
        }
    }
    true
}

/// every compilation unit of one stage must declare its in, out, uniform and buffer
/// blocks alike
pub fn validate_intrastage_interface_blocks(units: &[Shader], diagnostics: &mut Diagnostics) {
    let mut definitions = BlockDefinitions::default();
    for unit in units {
        for id in unit.globals() {
            let variable = &unit.variables[id];
            let name = match variable.interface_name() {
                Some(name) => name,
                None => continue,
            };
            match variable.mode {
                VariableMode::ShaderIn
                | VariableMode::ShaderOut
                | VariableMode::Uniform
                | VariableMode::ShaderStorage => {}
                _ => continue,
            }
            match definitions.lookup_mut(variable.mode, name) {
                None => definitions.store(variable),
                Some(previous) => {
                    if !intrastage_match(previous, variable, diagnostics) {
                        diagnostics.error(MismatchedInterfaceBlock {
                            name: name.to_string(),
                        });
                        return;
                    }
                }
            }
        }
    }
}

/// strip the per-vertex array level of `variable` when it has one
fn instance_type(variable: &Variable, has_per_vertex_level: bool) -> &Type {
    match (&variable.var_type, has_per_vertex_level && !variable.data.patch) {
        (Type::Array { element, .. }, true) => element,
        (var_type, _) => var_type,
    }
}

fn interstage_match(
    producer: &Variable,
    consumer: &Variable,
    producer_stage: ShaderStage,
    consumer_stage: ShaderStage,
) -> bool {
    let (producer_interface, consumer_interface) =
        match (&producer.interface_type, &consumer.interface_type) {
            (Some(producer_interface), Some(consumer_interface)) => {
                (producer_interface, consumer_interface)
            }
            _ => return false,
        };
    if producer_interface != consumer_interface
        && !(is_implicitly_declared(producer) && is_implicitly_declared(consumer))
        && !producer_interface.compare(consumer_interface, true, true, false)
    {
        return false;
    }
    if producer.is_interface_instance() != consumer.is_interface_instance()
        && !(producer.is_builtin() || consumer.is_builtin())
    {
        return false;
    }
    let producer_instance_type = instance_type(producer, producer_stage.has_per_vertex_outputs());
    let consumer_instance_type = instance_type(consumer, consumer_stage.has_per_vertex_inputs());
    if ((consumer.is_interface_instance() && consumer_instance_type.is_array())
        || (producer.is_interface_instance() && producer_instance_type.is_array()))
        && consumer_instance_type != producer_instance_type
    {
        return false;
    }
    true
}

fn is_builtin_gl_in_block(variable: &Variable, stage: ShaderStage) -> bool {
    variable.name == "gl_in" && stage.has_per_vertex_inputs()
}

/// output blocks of `producer` must match the same-named input blocks of `consumer`
pub fn validate_interstage_inout_blocks(
    producer: &Shader,
    consumer: &Shader,
    diagnostics: &mut Diagnostics,
) {
    let mut inputs = BlockDefinitions::default();
    let mut outputs = BlockDefinitions::default();
    for id in consumer.globals() {
        let variable = &consumer.variables[id];
        if variable.mode == VariableMode::ShaderIn && variable.interface_type.is_some() {
            inputs.store(variable);
        }
    }
    for id in producer.globals() {
        let variable = &producer.variables[id];
        if variable.mode != VariableMode::ShaderOut {
            continue;
        }
        let name = match variable.interface_name() {
            Some(name) => name,
            None => continue,
        };
        outputs.store(variable);
        if let Some(consumer_definition) = inputs.lookup(VariableMode::ShaderIn, name) {
            if !interstage_match(
                variable,
                consumer_definition,
                producer.stage,
                consumer.stage,
            ) {
                diagnostics.error(MismatchedInterfaceBlock {
                    name: name.to_string(),
                });
                return;
            }
        }
    }
    for id in consumer.globals() {
        let variable = &consumer.variables[id];
        if variable.mode != VariableMode::ShaderIn {
            continue;
        }
        let name = match variable.interface_name() {
            Some(name) => name,
            None => continue,
        };
        if outputs.lookup(VariableMode::ShaderOut, name).is_none()
            && !is_builtin_gl_in_block(variable, consumer.stage)
            && !variable.is_builtin()
            && variable.data.used
        {
            diagnostics.error(InputBlockNotOutput {
                name: name.to_string(),
            });
            return;
        }
    }
}

/// uniform and buffer blocks of the same name must match in every stage
pub fn validate_interstage_uniform_blocks(stages: &[&Shader], diagnostics: &mut Diagnostics) {
    let mut definitions = BlockDefinitions::default();
    for shader in stages {
        for id in shader.globals() {
            let variable = &shader.variables[id];
            if !variable.mode.is_in_buffer_or_uniform() {
                continue;
            }
            let name = match variable.interface_name() {
                Some(name) => name,
                None => continue,
            };
            match definitions.lookup_mut(variable.mode, name) {
                None => definitions.store(variable),
                Some(previous) => {
                    if !intrastage_match(previous, variable, diagnostics) {
                        diagnostics.error(MismatchedInterfaceBlock {
                            name: name.to_string(),
                        });
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsl_linker_ir::{InterfacePacking, InterfaceType, StructField};

    fn block(name: &str, members: &[(&str, Type)]) -> InterfaceType {
        InterfaceType {
            name: name.into(),
            fields: members
                .iter()
                .map(|(name, t)| StructField::new(*name, t.clone()))
                .collect(),
            packing: InterfacePacking::Std140,
            row_major: false,
        }
    }

    fn add_block(
        shader: &mut Shader,
        interface: InterfaceType,
        instance: Option<&str>,
        mode: VariableMode,
    ) {
        match instance {
            Some(instance) => {
                shader.add_global(
                    Variable::new(instance, interface.clone().into(), mode)
                        .with_interface(interface),
                );
            }
            None => {
                for field in interface.fields.clone() {
                    shader.add_global(
                        Variable::new(field.name, field.field_type, mode)
                            .with_interface(interface.clone()),
                    );
                }
            }
        }
    }

    #[test]
    fn test_intrastage_mismatch() {
        let mut a = Shader::new("a", ShaderStage::Vertex, 450, false);
        add_block(
            &mut a,
            block("Data", &[("x", Type::float())]),
            Some("data"),
            VariableMode::Uniform,
        );
        let mut b = Shader::new("b", ShaderStage::Vertex, 450, false);
        add_block(
            &mut b,
            block("Data", &[("x", Type::float())]),
            Some("other_name"),
            VariableMode::Uniform,
        );
        let mut diagnostics = Diagnostics::new();
        validate_intrastage_interface_blocks(&[a.clone(), b], &mut diagnostics);
        assert!(diagnostics.link_status());
        let mut c = Shader::new("c", ShaderStage::Vertex, 450, false);
        add_block(
            &mut c,
            block("Data", &[("x", Type::int())]),
            Some("data"),
            VariableMode::Uniform,
        );
        validate_intrastage_interface_blocks(&[a, c], &mut diagnostics);
        assert_eq!(
            diagnostics.info_log(),
            "error: definitions of interface block `Data' do not match\n"
        );
    }

    #[test]
    fn test_interstage_named_vs_unnamed() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        add_block(
            &mut vs,
            block("Varyings", &[("color", Type::vec(4))]),
            Some("v"),
            VariableMode::ShaderOut,
        );
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        add_block(
            &mut fs,
            block("Varyings", &[("color", Type::vec(4))]),
            None,
            VariableMode::ShaderIn,
        );
        let mut diagnostics = Diagnostics::new();
        validate_interstage_inout_blocks(&vs, &fs, &mut diagnostics);
        assert!(!diagnostics.link_status());
    }

    #[test]
    fn test_interstage_per_vertex_level_ignored() {
        let interface = block("Varyings", &[("color", Type::vec(4))]);
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        add_block(&mut vs, interface.clone(), Some("v"), VariableMode::ShaderOut);
        let mut gs = Shader::new("gs", ShaderStage::Geometry, 450, false);
        gs.add_global(
            Variable::new(
                "v",
                Type::array(interface.clone().into(), 3),
                VariableMode::ShaderIn,
            )
            .with_interface(interface),
        );
        let mut diagnostics = Diagnostics::new();
        validate_interstage_inout_blocks(&vs, &gs, &mut diagnostics);
        assert!(diagnostics.link_status());
    }

    #[test]
    fn test_used_input_block_without_output() {
        let vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        add_block(
            &mut fs,
            block("Varyings", &[("color", Type::vec(4))]),
            Some("v"),
            VariableMode::ShaderIn,
        );
        let mut diagnostics = Diagnostics::new();
        validate_interstage_inout_blocks(&vs, &fs, &mut diagnostics);
        assert!(diagnostics.link_status());
        let id = fs.get_variable("v").unwrap();
        fs.variables[id].data.used = true;
        validate_interstage_inout_blocks(&vs, &fs, &mut diagnostics);
        assert_eq!(
            diagnostics.info_log(),
            "error: input block `Varyings' is not an output of the previous stage\n"
        );
    }

    #[test]
    fn test_uniform_blocks_across_stages() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        add_block(
            &mut vs,
            block("Camera", &[("view", Type::mat(4, 4))]),
            None,
            VariableMode::Uniform,
        );
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        add_block(
            &mut fs,
            block("Camera", &[("view", Type::mat(3, 3))]),
            None,
            VariableMode::Uniform,
        );
        let mut diagnostics = Diagnostics::new();
        validate_interstage_uniform_blocks(&[&vs, &vs], &mut diagnostics);
        assert!(diagnostics.link_status());
        validate_interstage_uniform_blocks(&[&vs, &fs], &mut diagnostics);
        assert!(!diagnostics.link_status());
    }
}
