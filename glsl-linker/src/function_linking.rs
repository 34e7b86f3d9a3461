// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! resolution of function calls against the compilation units of a stage
//!
//! Starting from the code already in the linked shader, every call whose callee isn't
//! defined there yet is looked up in the compilation units, first definition wins. The
//! definition is cloned into the linked shader and its own calls are resolved in turn.
//! Globals the cloned code references are imported by name.

use crate::diagnostics::Diagnostics;
use crate::errors::LinkResult;
use crate::errors::UnresolvedFunction;
use glsl_linker_ir::clone::Cloner;
use hashbrown::HashSet;
use glsl_linker_ir::visit::for_each_call;
use glsl_linker_ir::{
    Arena, Instruction, RemapTable, Shader, Signature, SignatureKey, Variable, VariableId,
};

/// the resolver callback used while cloning from a compilation unit
pub(crate) type Resolver<'r> =
    &'r mut dyn FnMut(VariableId, &Variable, &mut Arena<Variable>) -> VariableId;

/// clone code out of `unit` into `linked`; globals referenced by the cloned code map to
/// the same-named global of `linked`, which is imported first when it doesn't exist yet
pub(crate) fn clone_from_unit<R>(
    linked: &mut Shader,
    unit: &Shader,
    remap: &mut RemapTable,
    f: impl FnOnce(&mut Cloner<'_, Resolver<'_>>) -> R,
) -> R {
    let mut imported: Vec<(String, VariableId)> = Vec::new();
    let retval = {
        let symbols = &linked.symbols;
        let mut resolve = |_: VariableId, variable: &Variable, target: &mut Arena<Variable>| {
            if let Some(id) = symbols.get_variable(&variable.name) {
                return id;
            }
            if let Some(&(_, id)) = imported.iter().find(|(name, _)| *name == variable.name) {
                return id;
            }
            let id = target.alloc(variable.clone());
            imported.push((variable.name.clone(), id));
            id
        };
        let mut cloner = Cloner::new(
            &unit.variables,
            &mut linked.variables,
            remap,
            &mut resolve as Resolver<'_>,
        );
        f(&mut cloner)
    };
    for (name, id) in imported {
        tracing::trace!(%name, unit = %unit.name, "imported global");
        linked.instructions.push(Instruction::Declare(id));
        linked.symbols.add_variable(name, id);
    }
    retval
}

/// the first definition of `key` in `units`, as (unit, function, signature) indexes;
/// intrinsics count as definitions
fn find_definition(units: &[Shader], key: &SignatureKey) -> Option<(usize, usize, usize)> {
    units.iter().enumerate().find_map(|(unit_index, unit)| {
        let (function_index, signature_index) = unit.find_signature_index(key)?;
        let signature = &unit.functions[function_index].signatures[signature_index];
        if signature.is_defined || signature.is_intrinsic {
            Some((unit_index, function_index, signature_index))
        } else {
            None
        }
    })
}

fn is_resolved(linked: &Shader, key: &SignatureKey) -> bool {
    linked
        .find_signature(key)
        .map_or(false, |signature| signature.is_defined || signature.is_intrinsic)
}

/// store `signature` in `linked`, replacing a prototype with the same parameters
fn add_linked_signature(linked: &mut Shader, key: &SignatureKey, signature: Signature) {
    if let Some((function_index, signature_index)) = linked.find_signature_index(key) {
        linked.functions[function_index].signatures[signature_index] = signature;
    } else {
        linked.add_signature(&key.name, signature);
    }
}

fn calls_of(signature: &Signature) -> Vec<SignatureKey> {
    let mut retval = Vec::new();
    for_each_call(&signature.body, |call| retval.push(call.callee.clone()));
    retval
}

/// resolve every call reachable from the code in `linked`; `roots` are signatures of
/// `units` that must be pulled in even without a call, such as subroutine
/// implementations. Each unresolved callee is reported once.
pub fn link_function_calls(
    linked: &mut Shader,
    units: &[Shader],
    roots: &[SignatureKey],
    diagnostics: &mut Diagnostics,
) -> LinkResult<()> {
    let mut worklist: Vec<SignatureKey> = Vec::new();
    for_each_call(&linked.instructions, |call| worklist.push(call.callee.clone()));
    for function in &linked.functions {
        for signature in &function.signatures {
            worklist.extend(calls_of(signature));
        }
    }
    worklist.extend(roots.iter().cloned());
    worklist.reverse();
    let mut first_error = None;
    let mut reported = HashSet::new();
    while let Some(key) = worklist.pop() {
        if is_resolved(linked, &key) {
            continue;
        }
        let (unit_index, function_index, signature_index) = match find_definition(units, &key)
        {
            Some(found) => found,
            None => {
                if reported.insert(key.clone()) {
                    let error = UnresolvedFunction {
                        signature: key.to_string(),
                    };
                    diagnostics.error(error.clone());
                    first_error.get_or_insert(error);
                }
                continue;
            }
        };
        let unit = &units[unit_index];
        let source_function = &unit.functions[function_index];
        let source = &source_function.signatures[signature_index];
        tracing::debug!(callee = %key, unit = %unit.name, "linking function");
        let mut remap = RemapTable::new();
        let signature = clone_from_unit(linked, unit, &mut remap, |cloner| {
            cloner.signature(source)
        });
        let callees = calls_of(&signature);
        add_linked_signature(linked, &key, signature);
        if let Some(function) = linked.function_mut(&key.name) {
            function.is_subroutine |= source_function.is_subroutine;
            if function.subroutine_types.is_empty() {
                function.subroutine_types = source_function.subroutine_types.clone();
            }
            if function.subroutine_index.is_none() {
                function.subroutine_index = source_function.subroutine_index;
            }
        }
        worklist.extend(callees.into_iter().rev());
    }
    match first_error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
