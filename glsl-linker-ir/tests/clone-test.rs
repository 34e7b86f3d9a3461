// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use glsl_linker_ir::clone::clone_signature;
use glsl_linker_ir::clone::copy_variable;
use glsl_linker_ir::visit::for_each_variable_access;
use glsl_linker_ir::{
    Constant, Dereference, Instruction, RemapTable, Shader, ShaderStage, Signature, Type,
    Variable, VariableMode,
};

#[test]
fn test_clone_signature_into_other_shader() {
    let mut source = Shader::new("a.vert", ShaderStage::Vertex, 450, false);
    let global = source.add_global(Variable::new("g", Type::vec(4), VariableMode::ShaderOut));
    let parameter = source.add_local(Variable::new("p", Type::float(), VariableMode::FunctionIn));
    let local = source.add_local(Variable::new("t", Type::float(), VariableMode::Auto));
    let body = vec![
        Instruction::Declare(local),
        Instruction::assign(local, parameter),
        Instruction::assign(global, Constant::vec(&[1.0, 2.0, 3.0, 4.0])),
        Instruction::Return(Some(Dereference::Variable(local).into())),
    ];
    source.add_signature("f", Signature::new(Type::float(), vec![parameter], body));

    let mut target = Shader::new("linked", ShaderStage::Vertex, 450, false);
    let target_global =
        target.add_global(Variable::new("g", Type::vec(4), VariableMode::ShaderOut));
    let symbols = target.symbols.clone();
    let mut remap = RemapTable::new();
    let mut resolved = Vec::new();
    let signature = clone_signature(
        &source.functions[0].signatures[0],
        &source.variables,
        &mut target.variables,
        &mut remap,
        |id, variable, arena| {
            resolved.push(variable.name.clone());
            match symbols.get_variable(&variable.name) {
                Some(existing) => existing,
                None => copy_variable(id, variable, arena),
            }
        },
    );
    // only the global goes through the resolver; locals and parameters are copied
    assert_eq!(resolved, vec!["g".to_string()]);
    assert_eq!(remap.get(global), Some(target_global));
    assert_eq!(signature.parameters.len(), 1);
    assert_eq!(remap.get(parameter), Some(signature.parameters[0]));
    assert_eq!(target.variables[signature.parameters[0]].name, "p");
    let mut written_global = false;
    for_each_variable_access(&signature.body, |id, access| {
        if id == target_global && access.may_write() {
            written_global = true;
        }
    });
    assert!(written_global);
    // source is untouched
    assert_eq!(source.functions[0].signatures[0].parameters, vec![parameter]);
    assert_eq!(target.variables.len(), 3);
    assert_eq!(target.variables[remap.get(local).unwrap()].name, "t");
}
