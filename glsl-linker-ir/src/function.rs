// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! functions and signatures

use crate::arena::Arena;
use crate::instructions::Instruction;
use crate::instructions::SignatureKey;
use crate::types::Type;
use crate::variable::Variable;
use crate::variable::VariableId;

/// one overload of a function
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    /// return type
    pub return_type: Type,
    /// parameters, in order; their modes are the parameter qualifiers
    pub parameters: Vec<VariableId>,
    /// function body
    pub body: Vec<Instruction>,
    /// the signature has a body
    pub is_defined: bool,
    /// implemented by the back end rather than by a body
    pub is_intrinsic: bool,
    /// built-in function
    pub is_builtin: bool,
}

impl Signature {
    /// a defined signature
    pub fn new(return_type: Type, parameters: Vec<VariableId>, body: Vec<Instruction>) -> Self {
        Self {
            return_type,
            parameters,
            body,
            is_defined: true,
            is_intrinsic: false,
            is_builtin: false,
        }
    }
    /// a prototype without a body
    pub fn prototype(return_type: Type, parameters: Vec<VariableId>) -> Self {
        Self {
            is_defined: false,
            ..Self::new(return_type, parameters, Vec::new())
        }
    }
    /// the parameter types in order
    pub fn parameter_types(&self, variables: &Arena<Variable>) -> Vec<Type> {
        self.parameters
            .iter()
            .map(|&parameter| variables[parameter].var_type.clone())
            .collect()
    }
    /// `true` if the parameter types equal `parameter_types` exactly
    pub fn matches_parameters(
        &self,
        parameter_types: &[Type],
        variables: &Arena<Variable>,
    ) -> bool {
        self.parameters.len() == parameter_types.len()
            && self
                .parameters
                .iter()
                .zip(parameter_types)
                .all(|(&parameter, parameter_type)| {
                    variables[parameter].var_type == *parameter_type
                })
    }
    /// the key identifying this signature of function `name`
    pub fn key(&self, name: &str, variables: &Arena<Variable>) -> SignatureKey {
        SignatureKey::new(name, self.parameter_types(variables))
    }
}

/// a function with all its overloads
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    /// function name
    pub name: String,
    /// overloads in declaration order
    pub signatures: Vec<Signature>,
    /// declares a subroutine type
    pub is_subroutine: bool,
    /// subroutine types this function implements
    pub subroutine_types: Vec<String>,
    /// explicit `layout(index)` of a subroutine function
    pub subroutine_index: Option<u32>,
}

impl Function {
    /// a function without signatures
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signatures: Vec::new(),
            is_subroutine: false,
            subroutine_types: Vec::new(),
            subroutine_index: None,
        }
    }
    /// the signature with exactly `parameter_types`
    pub fn exact_matching_signature(
        &self,
        parameter_types: &[Type],
        variables: &Arena<Variable>,
    ) -> Option<&Signature> {
        self.signatures
            .iter()
            .find(|signature| signature.matches_parameters(parameter_types, variables))
    }
    /// `true` if any signature is user-declared
    pub fn has_user_signature(&self) -> bool {
        self.signatures
            .iter()
            .any(|signature| !signature.is_builtin)
    }
}
