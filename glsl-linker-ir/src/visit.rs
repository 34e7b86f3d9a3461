// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! instruction tree traversal

use crate::clone::RemapTable;
use crate::instructions::Call;
use crate::instructions::Dereference;
use crate::instructions::Expression;
use crate::instructions::Instruction;
use crate::variable::VariableId;

/// how a dereference is used
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Access {
    /// the value is read
    Read,
    /// the value is overwritten
    Write,
    /// passed to a call; the parameter may be `in`, `out` or `inout`
    CallArgument,
}

impl Access {
    /// may this access write the storage
    pub fn may_write(self) -> bool {
        self != Access::Read
    }
}

/// callbacks for `walk_instructions`; every method defaults to doing nothing
pub trait Visitor<'a> {
    /// called for each instruction before its children
    fn instruction(&mut self, _instruction: &'a Instruction) {}
    /// called for each expression before its children
    fn expression(&mut self, _expression: &'a Expression) {}
    /// called for each outermost dereference of a chain
    fn dereference(&mut self, _dereference: &'a Dereference, _access: Access) {}
    /// called for each call before its arguments
    fn call(&mut self, _call: &'a Call) {}
}

/// visit `instructions` and everything under them in program order
pub fn walk_instructions<'a, V: Visitor<'a>>(instructions: &'a [Instruction], visitor: &mut V) {
    for instruction in instructions {
        walk_instruction(instruction, visitor);
    }
}

fn walk_instruction<'a, V: Visitor<'a>>(instruction: &'a Instruction, visitor: &mut V) {
    visitor.instruction(instruction);
    match instruction {
        Instruction::Declare(_)
        | Instruction::Break
        | Instruction::Continue
        | Instruction::EmitVertex { .. }
        | Instruction::EndPrimitive { .. }
        | Instruction::Barrier
        | Instruction::Return(None)
        | Instruction::Discard(None) => {}
        Instruction::Assign(assignment) => {
            walk_dereference(&assignment.lhs, Access::Write, visitor);
            walk_expression(&assignment.rhs, visitor);
        }
        Instruction::Call(call) => {
            visitor.call(call);
            for argument in &call.arguments {
                match argument {
                    Expression::Dereference(dereference) => {
                        visitor.expression(argument);
                        walk_dereference(dereference, Access::CallArgument, visitor);
                    }
                    _ => walk_expression(argument, visitor),
                }
            }
            if let Some(target) = &call.return_target {
                walk_dereference(target, Access::Write, visitor);
            }
        }
        Instruction::Return(Some(value))
        | Instruction::Discard(Some(value))
        | Instruction::Expression(value) => walk_expression(value, visitor),
        Instruction::If {
            condition,
            then_block,
            else_block,
        } => {
            walk_expression(condition, visitor);
            walk_instructions(then_block, visitor);
            walk_instructions(else_block, visitor);
        }
        Instruction::Loop { body } => walk_instructions(body, visitor),
    }
}

fn walk_expression<'a, V: Visitor<'a>>(expression: &'a Expression, visitor: &mut V) {
    visitor.expression(expression);
    match expression {
        Expression::Constant(_) => {}
        Expression::Dereference(dereference) => {
            walk_dereference(dereference, Access::Read, visitor)
        }
        Expression::Operation { operands, .. } => {
            for operand in operands {
                walk_expression(operand, visitor);
            }
        }
        Expression::Swizzle { value, .. } => walk_expression(value, visitor),
        Expression::Texture {
            sampler,
            coordinate,
            ..
        } => {
            walk_dereference(sampler, Access::Read, visitor);
            walk_expression(coordinate, visitor);
        }
    }
}

fn walk_dereference<'a, V: Visitor<'a>>(
    dereference: &'a Dereference,
    access: Access,
    visitor: &mut V,
) {
    visitor.dereference(dereference, access);
    walk_dereference_indexes(dereference, visitor);
}

fn walk_dereference_indexes<'a, V: Visitor<'a>>(dereference: &'a Dereference, visitor: &mut V) {
    match dereference {
        Dereference::Variable(_) => {}
        Dereference::ArrayIndex { array, index } => {
            walk_dereference_indexes(array, visitor);
            walk_expression(index, visitor);
        }
        Dereference::Record { record, .. } => walk_dereference_indexes(record, visitor),
    }
}

struct FnVisitor<I, E, D, C> {
    instruction: I,
    expression: E,
    dereference: D,
    call: C,
}

impl<'a, I, E, D, C> Visitor<'a> for FnVisitor<I, E, D, C>
where
    I: FnMut(&'a Instruction),
    E: FnMut(&'a Expression),
    D: FnMut(&'a Dereference, Access),
    C: FnMut(&'a Call),
{
    fn instruction(&mut self, instruction: &'a Instruction) {
        (self.instruction)(instruction)
    }
    fn expression(&mut self, expression: &'a Expression) {
        (self.expression)(expression)
    }
    fn dereference(&mut self, dereference: &'a Dereference, access: Access) {
        (self.dereference)(dereference, access)
    }
    fn call(&mut self, call: &'a Call) {
        (self.call)(call)
    }
}

/// call `f` for every instruction, including nested ones
pub fn visit_instructions<'a>(instructions: &'a [Instruction], f: impl FnMut(&'a Instruction)) {
    walk_instructions(
        instructions,
        &mut FnVisitor {
            instruction: f,
            expression: |_: &'a Expression| {},
            dereference: |_: &'a Dereference, _: Access| {},
            call: |_: &'a Call| {},
        },
    )
}

/// call `f` for every expression, including nested ones
pub fn visit_expressions<'a>(instructions: &'a [Instruction], f: impl FnMut(&'a Expression)) {
    walk_instructions(
        instructions,
        &mut FnVisitor {
            instruction: |_: &'a Instruction| {},
            expression: f,
            dereference: |_: &'a Dereference, _: Access| {},
            call: |_: &'a Call| {},
        },
    )
}

/// call `f` for the outermost dereference of every chain
pub fn for_each_dereference<'a>(
    instructions: &'a [Instruction],
    f: impl FnMut(&'a Dereference, Access),
) {
    walk_instructions(
        instructions,
        &mut FnVisitor {
            instruction: |_: &'a Instruction| {},
            expression: |_: &'a Expression| {},
            dereference: f,
            call: |_: &'a Call| {},
        },
    )
}

/// call `f` with the root variable of every dereference chain
pub fn for_each_variable_access(
    instructions: &[Instruction],
    mut f: impl FnMut(VariableId, Access),
) {
    for_each_dereference(instructions, |dereference, access| {
        f(dereference.variable(), access)
    })
}

/// call `f` for every call
pub fn for_each_call<'a>(instructions: &'a [Instruction], f: impl FnMut(&'a Call)) {
    walk_instructions(
        instructions,
        &mut FnVisitor {
            instruction: |_: &'a Instruction| {},
            expression: |_: &'a Expression| {},
            dereference: |_: &'a Dereference, _: Access| {},
            call: f,
        },
    )
}

/// call `f` for every instruction mutably, parents before children
pub fn visit_instructions_mut(
    instructions: &mut [Instruction],
    f: &mut impl FnMut(&mut Instruction),
) {
    for instruction in instructions {
        f(instruction);
        match instruction {
            Instruction::If {
                then_block,
                else_block,
                ..
            } => {
                visit_instructions_mut(then_block, f);
                visit_instructions_mut(else_block, f);
            }
            Instruction::Loop { body } => visit_instructions_mut(body, f),
            _ => {}
        }
    }
}

/// call `f` for every call mutably
pub fn for_each_call_mut(instructions: &mut [Instruction], mut f: impl FnMut(&mut Call)) {
    visit_instructions_mut(instructions, &mut |instruction| {
        if let Instruction::Call(call) = instruction {
            f(call)
        }
    })
}

fn dereference_variables_mut(dereference: &mut Dereference, f: &mut impl FnMut(&mut VariableId)) {
    match dereference {
        Dereference::Variable(id) => f(id),
        Dereference::ArrayIndex { array, index } => {
            dereference_variables_mut(array, f);
            expression_variables_mut(index, f);
        }
        Dereference::Record { record, .. } => dereference_variables_mut(record, f),
    }
}

fn expression_variables_mut(expression: &mut Expression, f: &mut impl FnMut(&mut VariableId)) {
    match expression {
        Expression::Constant(_) => {}
        Expression::Dereference(dereference) => dereference_variables_mut(dereference, f),
        Expression::Operation { operands, .. } => {
            for operand in operands {
                expression_variables_mut(operand, f);
            }
        }
        Expression::Swizzle { value, .. } => expression_variables_mut(value, f),
        Expression::Texture {
            sampler,
            coordinate,
            ..
        } => {
            dereference_variables_mut(sampler, f);
            expression_variables_mut(coordinate, f);
        }
    }
}

/// call `f` for every variable reference, including declarations
pub fn for_each_variable_mut(
    instructions: &mut [Instruction],
    f: &mut impl FnMut(&mut VariableId),
) {
    visit_instructions_mut(instructions, &mut |instruction| match instruction {
        Instruction::Declare(id) => f(id),
        Instruction::Assign(assignment) => {
            dereference_variables_mut(&mut assignment.lhs, f);
            expression_variables_mut(&mut assignment.rhs, f);
        }
        Instruction::Call(call) => {
            for argument in &mut call.arguments {
                expression_variables_mut(argument, f);
            }
            if let Some(target) = &mut call.return_target {
                dereference_variables_mut(target, f);
            }
        }
        Instruction::Return(Some(value))
        | Instruction::Discard(Some(value))
        | Instruction::Expression(value) => expression_variables_mut(value, f),
        Instruction::If { condition, .. } => expression_variables_mut(condition, f),
        Instruction::Return(None)
        | Instruction::Discard(None)
        | Instruction::Loop { .. }
        | Instruction::Break
        | Instruction::Continue
        | Instruction::EmitVertex { .. }
        | Instruction::EndPrimitive { .. }
        | Instruction::Barrier => {}
    })
}

/// replace every variable in `remap` with its mapping
pub fn remap_variables(instructions: &mut [Instruction], remap: &RemapTable) {
    for_each_variable_mut(instructions, &mut |id| {
        if let Some(new_id) = remap.get(*id) {
            *id = new_id;
        }
    })
}

/// `true` if some instruction may write variable `id`
pub fn is_variable_written(instructions: &[Instruction], id: VariableId) -> bool {
    let mut retval = false;
    for_each_variable_access(instructions, |variable, access| {
        if variable == id && access.may_write() {
            retval = true;
        }
    });
    retval
}

/// `true` if some instruction reads variable `id`
pub fn is_variable_read(instructions: &[Instruction], id: VariableId) -> bool {
    let mut retval = false;
    for_each_variable_access(instructions, |variable, access| {
        if variable == id && access != Access::Write {
            retval = true;
        }
    });
    retval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::instructions::Constant;
    use crate::instructions::SignatureKey;
    use crate::types::Type;
    use crate::variable::Variable;
    use crate::variable::VariableMode;

    #[test]
    fn test_variable_accesses() {
        let mut variables = Arena::new();
        let a = variables.alloc(Variable::new("a", Type::vec(4), VariableMode::ShaderOut));
        let b = variables.alloc(Variable::new("b", Type::vec(4), VariableMode::ShaderIn));
        let i = variables.alloc(Variable::new("i", Type::int(), VariableMode::Uniform));
        let c = variables.alloc(Variable::new(
            "c",
            Type::array(Type::vec(4), 4),
            VariableMode::Auto,
        ));
        let body = vec![Instruction::If {
            condition: Constant::bool(true).into(),
            then_block: vec![Instruction::assign(a, b)],
            else_block: vec![Instruction::call(
                SignatureKey::new("f", vec![Type::vec(4)]),
                vec![Dereference::Variable(c)
                    .index(0)
                    .into()],
            )],
        }];
        let body = {
            let mut body = body;
            body.push(Instruction::assign(
                Dereference::ArrayIndex {
                    array: Box::new(c.into()),
                    index: Box::new(i.into()),
                },
                b,
            ));
            body
        };
        assert!(is_variable_written(&body, a));
        assert!(!is_variable_written(&body, b));
        assert!(is_variable_read(&body, b));
        assert!(is_variable_written(&body, c));
        assert!(is_variable_read(&body, i));
        assert!(!is_variable_written(&body, i));
        let mut calls = 0;
        for_each_call(&body, |_| calls += 1);
        assert_eq!(calls, 1);
        let mut instructions = 0;
        visit_instructions(&body, |_| instructions += 1);
        assert_eq!(instructions, 4);
    }

    #[test]
    fn test_remap_variables() {
        let mut variables = Arena::new();
        let a = variables.alloc(Variable::new("a", Type::float(), VariableMode::Auto));
        let b = variables.alloc(Variable::new("b", Type::float(), VariableMode::Auto));
        let mut body = vec![
            Instruction::Declare(a),
            Instruction::Loop {
                body: vec![Instruction::assign(a, a), Instruction::Break],
            },
        ];
        let mut remap = RemapTable::new();
        remap.insert(a, b);
        remap_variables(&mut body, &remap);
        assert_eq!(
            body,
            vec![
                Instruction::Declare(b),
                Instruction::Loop {
                    body: vec![Instruction::assign(b, b), Instruction::Break],
                },
            ]
        );
    }
}
