// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information
#![warn(missing_docs)]

//! GLSL Linker Intermediate Representation
//!
//! The compiled form of one GLSL compilation unit as handed to the linker: variables and
//! their qualifiers, functions, instruction trees and stage layout qualifiers.

pub mod arena;
pub mod clone;
pub mod function;
pub mod instructions;
pub mod shader;
pub mod symbol_table;
pub mod types;
pub mod variable;
pub mod visit;

pub use crate::arena::Arena;
pub use crate::arena::Id;
pub use crate::clone::RemapTable;
pub use crate::function::Function;
pub use crate::function::Signature;
pub use crate::instructions::Assignment;
pub use crate::instructions::Call;
pub use crate::instructions::Constant;
pub use crate::instructions::ConstantValue;
pub use crate::instructions::Dereference;
pub use crate::instructions::Expression;
pub use crate::instructions::Instruction;
pub use crate::instructions::Operator;
pub use crate::instructions::SignatureKey;
pub use crate::shader::PrimitiveMode;
pub use crate::shader::Shader;
pub use crate::shader::ShaderLayout;
pub use crate::shader::ShaderStage;
pub use crate::shader::MAX_FEEDBACK_BUFFERS;
pub use crate::symbol_table::SymbolTable;
pub use crate::types::InterfacePacking;
pub use crate::types::InterfaceType;
pub use crate::types::Interpolation;
pub use crate::types::ScalarKind;
pub use crate::types::StructField;
pub use crate::types::StructType;
pub use crate::types::Type;
pub use crate::variable::Variable;
pub use crate::variable::VariableData;
pub use crate::variable::VariableId;
pub use crate::variable::VariableMode;
