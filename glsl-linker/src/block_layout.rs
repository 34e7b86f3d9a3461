// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! uniform and shader storage block layout

use crate::diagnostics::Diagnostics;
use crate::errors::BindingOutOfRange;
use crate::errors::BlockMismatchingDefinitions;
use crate::errors::BlockTooLarge;
use crate::errors::TooManyCombinedResources;
use crate::errors::TooManyStageResources;
use crate::options::LinkerConstants;
use crate::options::LinkerOptions;
use glsl_linker_ir::types::align_up;
use glsl_linker_ir::visit::for_each_dereference;
use glsl_linker_ir::{
    Dereference, Expression, InterfacePacking, InterfaceType, Shader, ShaderStage, Type,
    VariableId, VariableMode,
};
use hashbrown::HashSet;

/// one leaf member of a block, with its byte layout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformBlockMember {
    /// fully qualified name, `Block.member` for blocks with an instance name
    pub name: String,
    /// name used for API lookups; arrays get `[0]` appended
    pub index_name: String,
    /// leaf type, a scalar, vector, matrix or an array of those
    pub member_type: Type,
    /// byte offset from the start of the block
    pub offset: u32,
    /// stride between array elements, 0 for non-arrays
    pub array_stride: u32,
    /// stride between matrix columns (rows when row major), 0 for non-matrices
    pub matrix_stride: u32,
    /// matrix majorness
    pub row_major: bool,
    /// size of the array the top-level block member is, 1 when it isn't an array
    pub top_level_array_size: u32,
    /// stride of the top-level block member array
    pub top_level_array_stride: u32,
}

/// a uniform or shader storage block, one per element of block arrays
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformBlock {
    /// block name, with `[i]` suffixes for block array elements
    pub name: String,
    /// instance name, if declared with one
    pub instance_name: Option<String>,
    /// leaf members in layout order
    pub members: Vec<UniformBlockMember>,
    /// binding point
    pub binding: u32,
    /// binding was given with `layout(binding)`
    pub explicit_binding: bool,
    /// minimum buffer size in bytes
    pub buffer_size: u32,
    /// declared packing
    pub packing: InterfacePacking,
    /// block-level `row_major`
    pub row_major: bool,
    /// bit `1 << stage.index()` for every stage referencing the block
    pub stageref: u8,
    /// `buffer` rather than `uniform`
    pub is_shader_storage: bool,
    /// indexes of this element in each array dimension of a block array
    pub array_elements: Vec<u32>,
}

impl UniformBlock {
    fn kind(&self) -> &'static str {
        if self.is_shader_storage {
            "buffer"
        } else {
            "uniform"
        }
    }
    /// `true` if `self` and `rhs` can be the same block seen by different stages
    pub fn is_compatible_with(&self, rhs: &UniformBlock) -> bool {
        self.name == rhs.name
            && self.is_shader_storage == rhs.is_shader_storage
            && self.packing == rhs.packing
            && self.row_major == rhs.row_major
            && self.binding == rhs.binding
            && self.members.len() == rhs.members.len()
            && self.members.iter().zip(&rhs.members).all(|(lhs, rhs)| {
                lhs.name == rhs.name
                    && lhs.member_type == rhs.member_type
                    && lhs.row_major == rhs.row_major
                    && lhs.offset == rhs.offset
            })
    }
}

/// the rules actually used to lay out a block declared with `packing`; `shared` and
/// `packed` blocks get the default rules
pub fn effective_packing(packing: InterfacePacking, options: &LinkerOptions) -> InterfacePacking {
    match packing {
        InterfacePacking::Std140 | InterfacePacking::Std430 => packing,
        InterfacePacking::Shared | InterfacePacking::Packed => {
            if options.use_std430_as_default {
                InterfacePacking::Std430
            } else {
                InterfacePacking::Std140
            }
        }
    }
}

fn base_alignment(t: &Type, row_major: bool, packing: InterfacePacking) -> u32 {
    if packing == InterfacePacking::Std430 {
        t.std430_base_alignment(row_major)
    } else {
        t.std140_base_alignment(row_major)
    }
}

fn size(t: &Type, row_major: bool, packing: InterfacePacking) -> u32 {
    if packing == InterfacePacking::Std430 {
        t.std430_size(row_major)
    } else {
        t.std140_size(row_major)
    }
}

/// the stride between array elements of type `element`
pub fn array_stride(element: &Type, row_major: bool, packing: InterfacePacking) -> u32 {
    if packing == InterfacePacking::Std430 {
        if element.is_record() {
            element.std430_size(row_major)
        } else {
            element.std430_array_stride(row_major)
        }
    } else {
        align_up(element.std140_size(row_major), 16)
    }
}

/// the stride between the columns (rows when `row_major`) of `matrix`; std430 doesn't
/// round two-component columns up to a vec4
pub fn matrix_stride(matrix: &Type, row_major: bool, packing: InterfacePacking) -> u32 {
    let n = if matrix.is_64bit() { 8 } else { 4 };
    let items = if row_major {
        matrix.matrix_columns()
    } else {
        matrix.vector_elements()
    };
    if packing == InterfacePacking::Std430 && items < 3 {
        items * n
    } else {
        align_up(items * n, 16)
    }
}

/// the byte layout of a whole block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    /// leaf members in layout order
    pub members: Vec<UniformBlockMember>,
    /// minimum buffer size
    pub buffer_size: u32,
}

struct BlockLayoutBuilder {
    packing: InterfacePacking,
    offset: u32,
    buffer_size: u32,
    top_level_array_size: u32,
    top_level_array_stride: u32,
    members: Vec<UniformBlockMember>,
}

impl BlockLayoutBuilder {
    fn recurse(&mut self, t: &Type, name: &str, row_major: bool) {
        match t {
            Type::Struct(record) => {
                self.offset = align_up(self.offset, base_alignment(t, row_major, self.packing));
                for field in &record.fields {
                    let field_row_major = field.matrix_layout.is_row_major(row_major);
                    self.recurse(
                        &field.field_type,
                        &format!("{}.{}", name, field.name),
                        field_row_major,
                    );
                }
                self.offset = align_up(self.offset, base_alignment(t, row_major, self.packing));
            }
            Type::Array { element, length } if element.without_array().is_record() => {
                let length = length.unwrap_or(1);
                for index in 0..length {
                    self.recurse(element, &format!("{}[{}]", name, index), row_major);
                }
            }
            _ => self.leaf(t, name, row_major),
        }
    }
    fn leaf(&mut self, t: &Type, name: &str, row_major: bool) {
        let type_for_size = if t.is_unsized_array() {
            t.without_array()
        } else {
            t
        };
        let alignment = base_alignment(t, row_major, self.packing);
        self.offset = align_up(self.offset, alignment);
        let offset = self.offset;
        self.offset += size(type_for_size, row_major, self.packing);
        self.buffer_size = align_up(self.offset, 16);
        let element = t.without_array();
        let (matrix_stride, row_major) = if element.is_matrix() {
            (matrix_stride(element, row_major, self.packing), row_major)
        } else {
            (0, false)
        };
        self.members.push(UniformBlockMember {
            name: name.to_string(),
            index_name: if t.is_array() {
                format!("{}[0]", name)
            } else {
                name.to_string()
            },
            member_type: t.clone(),
            offset,
            array_stride: if t.is_array() {
                array_stride(element, row_major, self.packing)
            } else {
                0
            },
            matrix_stride,
            row_major,
            top_level_array_size: self.top_level_array_size,
            top_level_array_stride: self.top_level_array_stride,
        });
    }
}

/// lay out the members of `block` with `packing` rules; `prefix` is prepended to member
/// names when the block has an instance name
pub fn compute_block_layout(
    block: &InterfaceType,
    packing: InterfacePacking,
    prefix: Option<&str>,
) -> BlockLayout {
    let mut builder = BlockLayoutBuilder {
        packing,
        offset: 0,
        buffer_size: 0,
        top_level_array_size: 1,
        top_level_array_stride: 0,
        members: Vec::new(),
    };
    for field in &block.fields {
        if let Some(offset) = field.offset {
            builder.offset = offset;
        }
        let row_major = field.matrix_layout.is_row_major(block.row_major);
        let (top_level_array_size, top_level_array_stride) = match &field.field_type {
            Type::Array { element, length } => (
                length.unwrap_or(0),
                array_stride(element.without_array(), row_major, packing)
                    * if element.is_array() {
                        element.arrays_of_arrays_size()
                    } else {
                        1
                    },
            ),
            _ => (1, 0),
        };
        builder.top_level_array_size = top_level_array_size;
        builder.top_level_array_stride = top_level_array_stride;
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field.name),
            None => field.name.clone(),
        };
        builder.recurse(&field.field_type, &name, row_major);
    }
    BlockLayout {
        buffer_size: builder.buffer_size,
        members: builder.members,
    }
}

fn constant_index(expression: &Expression) -> Option<u32> {
    match expression {
        Expression::Constant(constant) => constant.as_index().map(|v| v.max(0) as u32),
        _ => None,
    }
}

/// linear indexes of the elements of block array `id` that `shader` references; `None`
/// when any access uses a dynamic index
fn referenced_block_elements(shader: &Shader, id: VariableId) -> Option<HashSet<u32>> {
    let var_type = &shader.variables[id].var_type;
    let mut dimensions = Vec::new();
    let mut t = var_type;
    while let Type::Array { element, length } = t {
        dimensions.push(length.unwrap_or(1));
        t = element;
    }
    let mut retval = Some(HashSet::new());
    let mut visit = |instructions: &[glsl_linker_ir::Instruction]| {
        for_each_dereference(instructions, |dereference, _| {
            if dereference.variable() != id {
                return;
            }
            let mut indexes = Vec::new();
            let mut d = dereference;
            loop {
                match d {
                    Dereference::Variable(_) => break,
                    Dereference::ArrayIndex { array, index } => {
                        indexes.push(constant_index(index));
                        d = array;
                    }
                    Dereference::Record { record, .. } => {
                        indexes.clear();
                        d = record;
                    }
                }
            }
            indexes.reverse();
            if indexes.len() < dimensions.len() || indexes.iter().any(Option::is_none) {
                retval = None;
                return;
            }
            let mut linear = 0;
            for (index, dimension) in indexes.iter().zip(&dimensions) {
                linear = linear * dimension + index.unwrap_or(0);
            }
            if let Some(set) = &mut retval {
                set.insert(linear);
            }
        });
    };
    visit(&shader.instructions);
    for function in &shader.functions {
        for signature in &function.signatures {
            visit(&signature.body);
        }
    }
    retval
}

fn is_block_referenced(shader: &Shader, block_name: &str, mode: VariableMode) -> bool {
    let members: HashSet<VariableId> = shader
        .globals()
        .filter(|&id| {
            let variable = &shader.variables[id];
            variable.mode == mode && variable.interface_name() == Some(block_name)
        })
        .collect();
    let mut referenced = false;
    let mut visit = |instructions: &[glsl_linker_ir::Instruction]| {
        for_each_dereference(instructions, |dereference, _| {
            if members.contains(&dereference.variable()) {
                referenced = true;
            }
        })
    };
    visit(&shader.instructions);
    for function in &shader.functions {
        for signature in &function.signatures {
            visit(&signature.body);
        }
    }
    referenced
}

/// the uniform and shader storage blocks of one linked stage, as `(ubos, ssbos)`
pub fn compute_stage_blocks(
    shader: &Shader,
    constants: &LinkerConstants,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) -> (Vec<UniformBlock>, Vec<UniformBlock>) {
    let mut ubos = Vec::new();
    let mut ssbos = Vec::new();
    let mut seen = HashSet::new();
    for id in shader.globals() {
        let variable = &shader.variables[id];
        if !variable.mode.is_in_buffer_or_uniform() {
            continue;
        }
        let interface = match &variable.interface_type {
            Some(interface) => interface,
            None => continue,
        };
        if !seen.insert((variable.mode, interface.name.clone())) {
            continue;
        }
        let is_shader_storage = variable.mode == VariableMode::ShaderStorage;
        let instance_name = if variable.is_interface_instance() {
            Some(variable.name.clone())
        } else {
            None
        };
        let interface = match variable.var_type.without_array() {
            Type::Interface(resized) => resized,
            _ => interface,
        };
        let packing = effective_packing(interface.packing, options);
        let referenced_elements = if interface.packing == InterfacePacking::Packed {
            if !is_block_referenced(shader, &interface.name, variable.mode) {
                continue;
            }
            if variable.var_type.is_array() {
                referenced_block_elements(shader, id)
            } else {
                None
            }
        } else {
            None
        };
        let layout = compute_block_layout(
            interface,
            packing,
            instance_name.as_ref().map(|_| interface.name.as_str()),
        );
        let max_size = if is_shader_storage {
            constants.max_shader_storage_block_size
        } else {
            constants.max_uniform_block_size
        };
        if layout.buffer_size > max_size {
            diagnostics.error(BlockTooLarge {
                kind: if is_shader_storage { "buffer" } else { "uniform" },
                name: interface.name.clone(),
                size: layout.buffer_size,
                max: max_size,
            });
        }
        let mut dimensions = Vec::new();
        let mut t = &variable.var_type;
        while let Type::Array { element, length } = t {
            dimensions.push(length.unwrap_or(1));
            t = element;
        }
        let element_count: u32 = dimensions.iter().product();
        let blocks = if is_shader_storage {
            &mut ssbos
        } else {
            &mut ubos
        };
        for linear in 0..element_count {
            if let Some(referenced) = &referenced_elements {
                if !referenced.contains(&linear) {
                    continue;
                }
            }
            let mut array_elements = Vec::with_capacity(dimensions.len());
            let mut remainder = linear;
            for &dimension in dimensions.iter().rev() {
                array_elements.push(remainder % dimension);
                remainder /= dimension;
            }
            array_elements.reverse();
            let mut name = interface.name.clone();
            for element in &array_elements {
                name += &format!("[{}]", element);
            }
            let binding = if variable.data.explicit_binding {
                variable.data.binding + linear
            } else {
                0
            };
            blocks.push(UniformBlock {
                name,
                instance_name: instance_name.clone(),
                members: layout.members.clone(),
                binding,
                explicit_binding: variable.data.explicit_binding,
                buffer_size: layout.buffer_size,
                packing: interface.packing,
                row_major: interface.row_major,
                stageref: 1 << shader.stage.index(),
                is_shader_storage,
                array_elements,
            });
        }
    }
    let limits = constants.stage(shader.stage);
    for (blocks, kind, max, max_binding) in [
        (
            &ubos,
            "uniform blocks",
            limits.max_uniform_blocks,
            constants.max_uniform_buffer_bindings,
        ),
        (
            &ssbos,
            "shader storage blocks",
            limits.max_shader_storage_blocks,
            constants.max_shader_storage_buffer_bindings,
        ),
    ] {
        if blocks.len() as u32 > max {
            diagnostics.error(TooManyStageResources {
                stage: shader.stage.name(),
                kind,
                count: blocks.len() as u32,
                max,
            });
        }
        for block in blocks.iter() {
            if block.explicit_binding && block.binding >= max_binding {
                diagnostics.error(BindingOutOfRange {
                    kind: block.kind(),
                    name: block.name.clone(),
                    binding: block.binding,
                    max: max_binding - 1,
                });
            }
        }
    }
    tracing::debug!(
        stage = %shader.stage,
        ubos = ubos.len(),
        ssbos = ssbos.len(),
        "computed block layouts"
    );
    (ubos, ssbos)
}

/// merge one stage's blocks into the program-wide list; same-named blocks must be
/// compatible, the first definition wins and stage masks are unioned. Returns the program
/// index of each of the stage's blocks.
pub fn merge_stage_blocks(
    program_blocks: &mut Vec<UniformBlock>,
    stage_blocks: &[UniformBlock],
    diagnostics: &mut Diagnostics,
) -> Vec<Option<usize>> {
    let mut retval = Vec::with_capacity(stage_blocks.len());
    for block in stage_blocks {
        match program_blocks
            .iter()
            .position(|existing| existing.name == block.name)
        {
            Some(index) => {
                let existing = &mut program_blocks[index];
                if existing.is_compatible_with(block) {
                    existing.stageref |= block.stageref;
                    retval.push(Some(index));
                } else {
                    diagnostics.error(BlockMismatchingDefinitions {
                        kind: block.kind(),
                        name: block.name.clone(),
                    });
                    retval.push(None);
                }
            }
            None => {
                retval.push(Some(program_blocks.len()));
                program_blocks.push(block.clone());
            }
        }
    }
    retval
}

/// check the program-wide block counts
pub fn check_combined_block_limits(
    ubos: &[UniformBlock],
    ssbos: &[UniformBlock],
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) {
    let count_references = |blocks: &[UniformBlock]| -> u32 {
        blocks
            .iter()
            .map(|block| block.stageref.count_ones())
            .sum()
    };
    let ubo_count = count_references(ubos);
    if ubo_count > constants.max_combined_uniform_blocks {
        diagnostics.error(TooManyCombinedResources {
            kind: "uniform blocks",
            count: ubo_count,
            max: constants.max_combined_uniform_blocks,
        });
    }
    let ssbo_count = count_references(ssbos);
    if ssbo_count > constants.max_combined_shader_storage_blocks {
        diagnostics.error(TooManyCombinedResources {
            kind: "shader storage blocks",
            count: ssbo_count,
            max: constants.max_combined_shader_storage_blocks,
        });
    }
}

/// the stages referencing a block
pub fn stages_of(stageref: u8) -> impl Iterator<Item = ShaderStage> {
    ShaderStage::ALL
        .into_iter()
        .filter(move |stage| stageref & (1 << stage.index()) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsl_linker_ir::types::MatrixLayout;
    use glsl_linker_ir::{StructField, StructType, Variable};

    fn block(name: &str, fields: Vec<StructField>, packing: InterfacePacking) -> InterfaceType {
        InterfaceType {
            name: name.into(),
            fields,
            packing,
            row_major: false,
        }
    }

    fn offsets(layout: &BlockLayout) -> Vec<(&str, u32)> {
        layout
            .members
            .iter()
            .map(|member| (member.name.as_str(), member.offset))
            .collect()
    }

    #[test]
    fn test_std140_scalar_vec3_scalar() {
        let b = block(
            "B",
            vec![
                StructField::new("a", Type::float()),
                StructField::new("b", Type::vec(3)),
                StructField::new("c", Type::float()),
            ],
            InterfacePacking::Std140,
        );
        let layout = compute_block_layout(&b, InterfacePacking::Std140, None);
        assert_eq!(offsets(&layout), vec![("a", 0), ("b", 16), ("c", 28)]);
        assert_eq!(layout.buffer_size, 32);
        let layout = compute_block_layout(&b, InterfacePacking::Std430, None);
        assert_eq!(offsets(&layout), vec![("a", 0), ("b", 16), ("c", 28)]);
        assert_eq!(layout.buffer_size, 32);
    }

    #[test]
    fn test_array_strides() {
        let b = block(
            "B",
            vec![StructField::new("v", Type::unsized_array(Type::vec(2)))],
            InterfacePacking::Std430,
        );
        let layout = compute_block_layout(&b, InterfacePacking::Std430, None);
        assert_eq!(layout.members[0].array_stride, 8);
        assert_eq!(layout.members[0].index_name, "v[0]");
        assert_eq!(layout.buffer_size, 16);
        let layout = compute_block_layout(&b, InterfacePacking::Std140, None);
        assert_eq!(layout.members[0].array_stride, 16);
    }

    #[test]
    fn test_unsized_trailing_array_counts_one_element() {
        let b = block(
            "Particles",
            vec![
                StructField::new("origin", Type::vec(4)),
                StructField::new("weights", Type::unsized_array(Type::float())),
            ],
            InterfacePacking::Std430,
        );
        let layout = compute_block_layout(&b, InterfacePacking::Std430, None);
        assert_eq!(offsets(&layout), vec![("origin", 0), ("weights", 16)]);
        assert_eq!(layout.members[1].array_stride, 4);
        assert_eq!(layout.buffer_size, 32);
    }

    #[test]
    fn test_matrix_strides() {
        assert_eq!(matrix_stride(&Type::mat(2, 2), false, InterfacePacking::Std430), 8);
        assert_eq!(matrix_stride(&Type::mat(2, 2), false, InterfacePacking::Std140), 16);
        assert_eq!(matrix_stride(&Type::mat(4, 3), false, InterfacePacking::Std430), 16);
        assert_eq!(matrix_stride(&Type::mat(4, 2), true, InterfacePacking::Std430), 16);
    }

    #[test]
    fn test_struct_members_and_explicit_offset() {
        let s = Type::Struct(StructType {
            name: "S".into(),
            fields: vec![
                StructField::new("x", Type::float()),
                StructField::new("y", Type::vec(2)),
            ],
        });
        let mut m = StructField::new("m", Type::mat(3, 3));
        m.matrix_layout = MatrixLayout::RowMajor;
        let mut late = StructField::new("late", Type::float());
        late.offset = Some(128);
        let b = block(
            "B",
            vec![
                StructField::new("f", Type::float()),
                StructField::new("s", Type::array(s, 2)),
                m,
                late,
            ],
            InterfacePacking::Std140,
        );
        let layout = compute_block_layout(&b, InterfacePacking::Std140, Some("B"));
        assert_eq!(
            offsets(&layout),
            vec![
                ("B.f", 0),
                ("B.s[0].x", 16),
                ("B.s[0].y", 24),
                ("B.s[1].x", 32),
                ("B.s[1].y", 40),
                ("B.m", 48),
                ("B.late", 128),
            ]
        );
        assert!(layout.members[5].row_major);
        assert_eq!(layout.members[5].matrix_stride, 16);
        assert_eq!(layout.members[1].top_level_array_size, 2);
        assert_eq!(layout.buffer_size, 144);
    }

    #[test]
    fn test_merge_stage_blocks() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let b = block(
            "Matrices",
            vec![StructField::new("mvp", Type::mat(4, 4))],
            InterfacePacking::Std140,
        );
        vs.add_global(
            Variable::new("mvp", Type::mat(4, 4), VariableMode::Uniform).with_interface(b.clone()),
        );
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(
            Variable::new("mvp", Type::mat(4, 4), VariableMode::Uniform).with_interface(b),
        );
        let constants = LinkerConstants::default();
        let options = LinkerOptions::default();
        let mut diagnostics = Diagnostics::new();
        let (vs_ubos, _) = compute_stage_blocks(&vs, &constants, &options, &mut diagnostics);
        let (fs_ubos, _) = compute_stage_blocks(&fs, &constants, &options, &mut diagnostics);
        let mut program = Vec::new();
        assert_eq!(
            merge_stage_blocks(&mut program, &vs_ubos, &mut diagnostics),
            vec![Some(0)]
        );
        assert_eq!(
            merge_stage_blocks(&mut program, &fs_ubos, &mut diagnostics),
            vec![Some(0)]
        );
        assert_eq!(program.len(), 1);
        assert_eq!(
            stages_of(program[0].stageref).collect::<Vec<_>>(),
            vec![ShaderStage::Vertex, ShaderStage::Fragment]
        );
        assert_eq!(program[0].buffer_size, 64);
        let mut other = fs_ubos[0].clone();
        other.members[0].offset = 16;
        merge_stage_blocks(&mut program, &[other], &mut diagnostics);
        assert!(!diagnostics.link_status());
    }

    #[test]
    fn test_block_arrays() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let b = block(
            "Lights",
            vec![StructField::new("color", Type::vec(4))],
            InterfacePacking::Std140,
        );
        vs.add_global(
            Variable::new("lights", Type::array(b.clone().into(), 3), VariableMode::Uniform)
                .with_interface(b)
                .with_binding(2),
        );
        let mut diagnostics = Diagnostics::new();
        let (ubos, ssbos) = compute_stage_blocks(
            &vs,
            &LinkerConstants::default(),
            &LinkerOptions::default(),
            &mut diagnostics,
        );
        assert!(ssbos.is_empty());
        let names: Vec<_> = ubos.iter().map(|b| (b.name.as_str(), b.binding)).collect();
        assert_eq!(
            names,
            vec![("Lights[0]", 2), ("Lights[1]", 3), ("Lights[2]", 4)]
        );
        assert_eq!(ubos[0].members[0].name, "Lights.color");
    }
}
