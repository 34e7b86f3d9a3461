// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! GLSL Linker
//!
//! Combines separately compiled GLSL compilation units into one program: the units of
//! each stage are linked into a single shader, the stage interfaces are matched and
//! given locations, and uniforms, blocks, atomic counters, subroutines and transform
//! feedback are laid out. See [`link_program`].

#[macro_use]
mod macros;

pub mod array_sizing;
pub mod atomics;
pub mod block_layout;
pub mod call_graph;
pub mod diagnostics;
pub mod errors;
pub mod function_linking;
pub mod global_validation;
pub mod interface_blocks;
pub mod intrastage;
pub mod locations;
pub mod options;
pub mod program;
pub mod subroutines;
pub mod uniforms;
pub mod validate;
pub mod varyings;
pub mod xfb;

pub use crate::diagnostics::Diagnostics;
pub use crate::errors::LinkError;
pub use crate::options::LinkerConstants;
pub use crate::options::LinkerOptions;
pub use crate::options::ProgramBindings;
pub use crate::options::StageLimits;
pub use crate::options::TransformFeedbackBufferMode;
pub use crate::program::link_program;
pub use crate::program::LinkedProgram;
pub use crate::program::ProgramStage;
pub use crate::program::StageInterface;
