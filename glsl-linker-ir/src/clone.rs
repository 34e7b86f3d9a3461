// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! deep cloning of IR between shaders
//!
//! Cloning copies instructions out of one shader's variable arena into another's.
//! Every variable reference is looked up in a `RemapTable`; locals declared inside the
//! cloned code are copied into the target arena, anything else is handed to a resolver
//! callback which decides whether to reuse a variable already in the target or copy it.

use crate::arena::Arena;
use crate::function::Signature;
use crate::instructions::Assignment;
use crate::instructions::Call;
use crate::instructions::Dereference;
use crate::instructions::Expression;
use crate::instructions::Instruction;
use crate::variable::Variable;
use crate::variable::VariableId;
use hashbrown::HashMap;

/// maps variables of a source shader to variables of a target shader
#[derive(Clone, Debug, Default)]
pub struct RemapTable {
    map: HashMap<VariableId, VariableId>,
}

impl RemapTable {
    /// create an empty table
    pub fn new() -> Self {
        Self::default()
    }
    /// map `source` to `target`, returning the previous mapping
    pub fn insert(&mut self, source: VariableId, target: VariableId) -> Option<VariableId> {
        self.map.insert(source, target)
    }
    /// look up the mapping for `source`
    pub fn get(&self, source: VariableId) -> Option<VariableId> {
        self.map.get(&source).copied()
    }
    /// number of mappings
    pub fn len(&self) -> usize {
        self.map.len()
    }
    /// `true` when there are no mappings
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    /// iterate over `(source, target)` pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, VariableId)> + '_ {
        self.map.iter().map(|(&k, &v)| (k, v))
    }
}

/// copy the variable into the target arena without further processing
pub fn copy_variable(
    _: VariableId,
    variable: &Variable,
    target: &mut Arena<Variable>,
) -> VariableId {
    target.alloc(variable.clone())
}

/// deep-clones IR from `source` into `target`
pub struct Cloner<'a, F> {
    source: &'a Arena<Variable>,
    target: &'a mut Arena<Variable>,
    remap: &'a mut RemapTable,
    resolve: F,
}

impl<'a, F> Cloner<'a, F>
where
    F: FnMut(VariableId, &Variable, &mut Arena<Variable>) -> VariableId,
{
    /// create a `Cloner`; `resolve` is called once for each variable referenced but not yet
    /// in `remap`
    pub fn new(
        source: &'a Arena<Variable>,
        target: &'a mut Arena<Variable>,
        remap: &'a mut RemapTable,
        resolve: F,
    ) -> Self {
        Self {
            source,
            target,
            remap,
            resolve,
        }
    }
    /// the target variable for `id`
    pub fn variable(&mut self, id: VariableId) -> VariableId {
        if let Some(retval) = self.remap.get(id) {
            return retval;
        }
        let retval = (self.resolve)(id, &self.source[id], &mut *self.target);
        self.remap.insert(id, retval);
        retval
    }
    fn declare_local(&mut self, id: VariableId) -> VariableId {
        let retval = self.target.alloc(self.source[id].clone());
        self.remap.insert(id, retval);
        retval
    }
    /// clone a block of instructions
    pub fn instructions(&mut self, instructions: &[Instruction]) -> Vec<Instruction> {
        instructions
            .iter()
            .map(|instruction| self.instruction(instruction))
            .collect()
    }
    /// clone one instruction; declarations create fresh locals
    pub fn instruction(&mut self, instruction: &Instruction) -> Instruction {
        match instruction {
            Instruction::Declare(id) => Instruction::Declare(self.declare_local(*id)),
            Instruction::Assign(Assignment {
                lhs,
                rhs,
                write_mask,
            }) => Instruction::Assign(Assignment {
                lhs: self.dereference(lhs),
                rhs: self.expression(rhs),
                write_mask: *write_mask,
            }),
            Instruction::Call(call) => Instruction::Call(self.call(call)),
            Instruction::Return(value) => {
                Instruction::Return(value.as_ref().map(|value| self.expression(value)))
            }
            Instruction::Discard(condition) => Instruction::Discard(
                condition
                    .as_ref()
                    .map(|condition| self.expression(condition)),
            ),
            Instruction::If {
                condition,
                then_block,
                else_block,
            } => Instruction::If {
                condition: self.expression(condition),
                then_block: self.instructions(then_block),
                else_block: self.instructions(else_block),
            },
            Instruction::Loop { body } => Instruction::Loop {
                body: self.instructions(body),
            },
            Instruction::Break => Instruction::Break,
            Instruction::Continue => Instruction::Continue,
            Instruction::Expression(expression) => {
                Instruction::Expression(self.expression(expression))
            }
            Instruction::EmitVertex { stream } => Instruction::EmitVertex { stream: *stream },
            Instruction::EndPrimitive { stream } => Instruction::EndPrimitive { stream: *stream },
            Instruction::Barrier => Instruction::Barrier,
        }
    }
    /// clone a call; the callee is referenced by key and needs no remapping
    pub fn call(&mut self, call: &Call) -> Call {
        Call {
            callee: call.callee.clone(),
            arguments: call
                .arguments
                .iter()
                .map(|argument| self.expression(argument))
                .collect(),
            return_target: call
                .return_target
                .as_ref()
                .map(|target| self.dereference(target)),
        }
    }
    /// clone an expression
    pub fn expression(&mut self, expression: &Expression) -> Expression {
        match expression {
            Expression::Constant(constant) => Expression::Constant(constant.clone()),
            Expression::Dereference(dereference) => {
                Expression::Dereference(self.dereference(dereference))
            }
            Expression::Operation {
                operator,
                operands,
                result_type,
            } => Expression::Operation {
                operator: *operator,
                operands: operands
                    .iter()
                    .map(|operand| self.expression(operand))
                    .collect(),
                result_type: result_type.clone(),
            },
            Expression::Swizzle { value, components } => Expression::Swizzle {
                value: Box::new(self.expression(value)),
                components: components.clone(),
            },
            Expression::Texture {
                op,
                sampler,
                coordinate,
                result_type,
            } => Expression::Texture {
                op: *op,
                sampler: self.dereference(sampler),
                coordinate: Box::new(self.expression(coordinate)),
                result_type: result_type.clone(),
            },
        }
    }
    /// clone a dereference chain
    pub fn dereference(&mut self, dereference: &Dereference) -> Dereference {
        match dereference {
            Dereference::Variable(id) => Dereference::Variable(self.variable(*id)),
            Dereference::ArrayIndex { array, index } => Dereference::ArrayIndex {
                array: Box::new(self.dereference(array)),
                index: Box::new(self.expression(index)),
            },
            Dereference::Record { record, field } => Dereference::Record {
                record: Box::new(self.dereference(record)),
                field: field.clone(),
            },
        }
    }
    /// clone a signature; parameters become fresh variables of the target
    pub fn signature(&mut self, signature: &Signature) -> Signature {
        let parameters = signature
            .parameters
            .iter()
            .map(|&parameter| self.declare_local(parameter))
            .collect();
        Signature {
            return_type: signature.return_type.clone(),
            parameters,
            body: self.instructions(&signature.body),
            is_defined: signature.is_defined,
            is_intrinsic: signature.is_intrinsic,
            is_builtin: signature.is_builtin,
        }
    }
}

/// clone `instructions` from `source` into `target`
pub fn clone_instructions<F>(
    instructions: &[Instruction],
    source: &Arena<Variable>,
    target: &mut Arena<Variable>,
    remap: &mut RemapTable,
    resolve: F,
) -> Vec<Instruction>
where
    F: FnMut(VariableId, &Variable, &mut Arena<Variable>) -> VariableId,
{
    Cloner::new(source, target, remap, resolve).instructions(instructions)
}

/// clone one instruction from `source` into `target`
pub fn clone_instruction<F>(
    instruction: &Instruction,
    source: &Arena<Variable>,
    target: &mut Arena<Variable>,
    remap: &mut RemapTable,
    resolve: F,
) -> Instruction
where
    F: FnMut(VariableId, &Variable, &mut Arena<Variable>) -> VariableId,
{
    Cloner::new(source, target, remap, resolve).instruction(instruction)
}

/// clone an expression from `source` into `target`
pub fn clone_expression<F>(
    expression: &Expression,
    source: &Arena<Variable>,
    target: &mut Arena<Variable>,
    remap: &mut RemapTable,
    resolve: F,
) -> Expression
where
    F: FnMut(VariableId, &Variable, &mut Arena<Variable>) -> VariableId,
{
    Cloner::new(source, target, remap, resolve).expression(expression)
}

/// clone a signature from `source` into `target`
pub fn clone_signature<F>(
    signature: &Signature,
    source: &Arena<Variable>,
    target: &mut Arena<Variable>,
    remap: &mut RemapTable,
    resolve: F,
) -> Signature
where
    F: FnMut(VariableId, &Variable, &mut Arena<Variable>) -> VariableId,
{
    Cloner::new(source, target, remap, resolve).signature(signature)
}
