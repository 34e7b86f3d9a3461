// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! the program's uniform storage table
//!
//! Allocation runs in two passes over the linked stages. [`ResourceLayoutPlan::count_uniform_size`]
//! flattens every uniform into its leaves, gives each distinct leaf name one entry and
//! checks the per-stage resource limits. [`ResourceLayoutPlan::parcel_out`] then hands out
//! backing storage, opaque indices, block offsets and API locations.

use crate::block_layout::UniformBlock;
use crate::diagnostics::Diagnostics;
use crate::errors::{
    TooManyCombinedResources, TooManyStageResources, TooManyUniformLocations,
    UniformLocationOverlap,
};
use crate::options::LinkerConstants;
use fixedbitset::FixedBitSet;
use glsl_linker_ir::variable::DeclarationKind;
use glsl_linker_ir::{Shader, ShaderStage, Type, Variable, VariableMode};
use hashbrown::HashMap;

/// an opaque uniform's slot in one stage
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OpaqueInfo {
    /// the stage references the uniform
    pub active: bool,
    /// first sampler or image slot of the stage the uniform uses
    pub index: u32,
}

/// one entry of the program's uniform table
#[derive(Clone, Debug, PartialEq)]
pub struct UniformStorage {
    /// API name, such as `s[1].color`
    pub name: String,
    /// type of one element
    pub uniform_type: Type,
    /// array length, 0 for non-arrays
    pub array_elements: u32,
    /// index into the program's uniform or shader storage blocks, -1 for the default block
    pub block_index: i32,
    /// byte offset inside the block; atomic counters use it for the offset in their buffer
    pub offset: i32,
    /// byte stride between array elements inside a block
    pub array_stride: i32,
    /// byte stride between matrix columns, or rows when row major, inside a block
    pub matrix_stride: i32,
    /// matrix majorness inside a block
    pub row_major: bool,
    /// first backing storage slot of default block values
    pub storage_offset: u32,
    /// backing storage slots, 0 for opaque uniforms and block members
    pub storage_slots: u32,
    /// first API location, `None` for entries without a location
    pub remap_location: Option<u32>,
    /// per-stage opaque slots, indexed by `ShaderStage::index`
    pub opaque: [OpaqueInfo; ShaderStage::COUNT],
    /// bit `1 << stage.index()` for every stage referencing the uniform
    pub active_shader_mask: u8,
    /// member of a shader storage block
    pub is_shader_storage: bool,
    /// `gl_*` built-in
    pub builtin: bool,
    /// not visible through the API
    pub hidden: bool,
    /// initial binding of opaque uniforms, binding point of atomic counters
    pub binding: u32,
    /// bindless sampler or image
    pub bindless: bool,
    /// atomic counter buffer, set by atomic counter linking
    pub atomic_buffer_index: Option<usize>,
    /// size of the top-level block member array, 1 when it isn't an array
    pub top_level_array_size: u32,
    /// stride of the top-level block member array
    pub top_level_array_stride: u32,
}

impl UniformStorage {
    fn element_count(&self) -> u32 {
        self.array_elements.max(1)
    }
    /// takes API locations of the default uniform block
    pub fn has_location(&self) -> bool {
        self.block_index < 0
            && !self.hidden
            && !self.builtin
            && !self.uniform_type.is_atomic_uint()
            && !self.uniform_type.is_subroutine()
    }
}

/// the `layout(location)` reservations of default block uniforms, made before anything
/// is eliminated
#[derive(Clone, Debug, Default)]
pub struct ExplicitUniformLocations {
    locations: HashMap<String, u32>,
    reserved: FixedBitSet,
}

impl ExplicitUniformLocations {
    /// the explicit location of uniform `name`
    pub fn get(&self, name: &str) -> Option<u32> {
        self.locations.get(name).copied()
    }
    /// number of explicitly reserved locations
    pub fn count(&self) -> usize {
        self.reserved.count_ones(..)
    }
}

fn any_in_range(bits: &FixedBitSet, start: u32, end: u32) -> bool {
    (start..end).any(|bit| bits.contains(bit as usize))
}

fn is_default_block_uniform(variable: &Variable) -> bool {
    variable.mode == VariableMode::Uniform && variable.interface_type.is_none()
}

/// reserve the explicit locations of every stage; a location taken by a uniform of another
/// name is an error, the same name at the same location in several stages is fine. Ranges
/// past `max_uniform_locations` are reported and not reserved.
pub fn reserve_explicit_locations(
    stages: &[&Shader],
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> ExplicitUniformLocations {
    let mut retval = ExplicitUniformLocations::default();
    for shader in stages {
        for id in shader.globals() {
            let variable = &shader.variables[id];
            if !is_default_block_uniform(variable) || !variable.data.explicit_location {
                continue;
            }
            let location = variable.data.location.max(0) as u32;
            if retval.locations.contains_key(&variable.name) {
                continue;
            }
            let slots = variable.var_type.uniform_locations().max(1);
            let end = match location.checked_add(slots) {
                Some(end) if end <= constants.max_uniform_locations => end,
                end => {
                    diagnostics.error(TooManyUniformLocations {
                        count: end.unwrap_or(u32::MAX),
                        max: constants.max_uniform_locations,
                    });
                    continue;
                }
            };
            retval.reserved.grow(end as usize);
            if any_in_range(&retval.reserved, location, end) {
                diagnostics.error(UniformLocationOverlap {
                    name: variable.name.clone(),
                });
                continue;
            }
            retval.reserved.insert_range(location as usize..end as usize);
            retval.locations.insert(variable.name.clone(), location);
        }
    }
    retval
}

/// a leaf of a uniform variable
struct Leaf {
    name: String,
    leaf_type: Type,
    array_elements: u32,
    /// locations taken by the leaves before this one in the variable
    location_offset: u32,
    /// opaque leaves inside arrays of structs share an index range per member; the key
    /// names the member with the array indexes removed and the count is the number of
    /// elements of the enclosing arrays
    record_array: Option<(String, u32)>,
}

fn flatten(
    name: String,
    t: &Type,
    record_array: Option<(String, u32)>,
    location_offset: &mut u32,
    leaves: &mut Vec<Leaf>,
) {
    match t {
        Type::Struct(struct_type) => {
            for field in &struct_type.fields {
                let record_array = record_array
                    .as_ref()
                    .map(|(key, count)| (format!("{}.{}", key, field.name), *count));
                flatten(
                    format!("{}.{}", name, field.name),
                    &field.field_type,
                    record_array,
                    location_offset,
                    leaves,
                );
            }
        }
        Type::Array { element, length } if element.is_array() || element.is_record() => {
            let length = length.unwrap_or(1);
            let (key, count) = record_array.unwrap_or_else(|| (name.clone(), 1));
            let record_array = Some((format!("{}[]", key), count * length));
            for index in 0..length {
                flatten(
                    format!("{}[{}]", name, index),
                    element,
                    record_array.clone(),
                    location_offset,
                    leaves,
                );
            }
        }
        Type::Array { element, length } => {
            let array_elements = length.unwrap_or(1);
            leaves.push(Leaf {
                name,
                leaf_type: (**element).clone(),
                array_elements,
                location_offset: *location_offset,
                record_array,
            });
            *location_offset += array_elements;
        }
        _ => {
            leaves.push(Leaf {
                name,
                leaf_type: t.clone(),
                array_elements: 0,
                location_offset: *location_offset,
                record_array,
            });
            *location_offset += 1;
        }
    }
}

/// a default block uniform leaf as planned by the first pass
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedUniform {
    /// API name
    pub name: String,
    /// type of one element
    pub uniform_type: Type,
    /// array length, 0 for non-arrays
    pub array_elements: u32,
    /// not visible through the API
    pub hidden: bool,
    /// `gl_*` built-in
    pub builtin: bool,
    /// location from `layout(location)`
    pub explicit_location: Option<u32>,
    /// initial binding or atomic counter binding point
    pub binding: u32,
    /// atomic counter offset
    pub atomic_offset: u32,
    /// bindless sampler or image
    pub bindless: bool,
    /// stages referencing the uniform
    pub active_shader_mask: u8,
    /// backing storage slots
    pub storage_slots: u32,
    record_array: Option<(String, u32)>,
}

#[derive(Copy, Clone, Default)]
struct StageTally {
    components: u32,
    samplers: u32,
    images: u32,
}

/// the result of the first allocation pass
#[derive(Clone, Debug, Default)]
pub struct ResourceLayoutPlan {
    /// visible uniforms in the order first seen, then hidden ones
    pub uniforms: Vec<PlannedUniform>,
    /// backing storage slots needed by all default block values
    pub num_storage_slots: u32,
}

fn planned_from_leaf(
    leaf: Leaf,
    variable: &Variable,
    explicit: &ExplicitUniformLocations,
) -> PlannedUniform {
    let elements = leaf.array_elements.max(1);
    let storage_slots = if leaf.leaf_type.is_opaque() && !variable.data.bindless {
        0
    } else if leaf.leaf_type.is_subroutine() {
        0
    } else {
        leaf.leaf_type.component_slots() * elements
    };
    let explicit_location = explicit
        .get(&variable.name)
        .map(|location| location + leaf.location_offset);
    PlannedUniform {
        name: leaf.name,
        uniform_type: leaf.leaf_type,
        array_elements: leaf.array_elements,
        hidden: variable.data.how_declared == DeclarationKind::Hidden,
        builtin: variable.is_builtin(),
        explicit_location,
        binding: variable.data.binding + leaf.location_offset,
        atomic_offset: variable.data.offset,
        bindless: variable.data.bindless,
        active_shader_mask: 0,
        storage_slots,
        record_array: leaf.record_array,
    }
}

impl ResourceLayoutPlan {
    /// first pass: one entry per distinct default block leaf, per-stage limits checked
    pub fn count_uniform_size(
        stages: &[&Shader],
        explicit: &ExplicitUniformLocations,
        constants: &LinkerConstants,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut visible: Vec<PlannedUniform> = Vec::new();
        let mut hidden: Vec<PlannedUniform> = Vec::new();
        let mut by_name: HashMap<String, (bool, usize)> = HashMap::new();
        let mut combined = StageTally::default();
        for shader in stages {
            let stage_bit = 1 << shader.stage.index();
            let mut tally = StageTally::default();
            for id in shader.globals() {
                let variable = &shader.variables[id];
                if !is_default_block_uniform(variable) {
                    continue;
                }
                let mut leaves = Vec::new();
                flatten(
                    variable.name.clone(),
                    &variable.var_type,
                    None,
                    &mut 0,
                    &mut leaves,
                );
                for leaf in leaves {
                    let elements = leaf.array_elements.max(1);
                    if !variable.data.bindless {
                        if leaf.leaf_type.is_sampler() {
                            tally.samplers += elements;
                        } else if leaf.leaf_type.is_image() {
                            tally.images += elements;
                        }
                    }
                    let planned = match by_name.get(&leaf.name) {
                        Some(&(false, index)) => &mut visible[index],
                        Some(&(true, index)) => &mut hidden[index],
                        None => {
                            let planned = planned_from_leaf(leaf, variable, explicit);
                            let list = if planned.hidden {
                                &mut hidden
                            } else {
                                &mut visible
                            };
                            by_name.insert(planned.name.clone(), (planned.hidden, list.len()));
                            list.push(planned);
                            let index = list.len() - 1;
                            &mut list[index]
                        }
                    };
                    planned.active_shader_mask |= stage_bit;
                    tally.components += planned.storage_slots;
                }
            }
            let limits = constants.stage(shader.stage);
            for (kind, count, max) in [
                (
                    "default uniform block components",
                    tally.components,
                    limits.max_uniform_components,
                ),
                ("samplers", tally.samplers, limits.max_texture_image_units),
                ("image uniforms", tally.images, limits.max_image_uniforms),
            ] {
                if count > max {
                    diagnostics.error(TooManyStageResources {
                        stage: shader.stage.name(),
                        kind,
                        count,
                        max,
                    });
                }
            }
            combined.samplers += tally.samplers;
            combined.images += tally.images;
        }
        for (kind, count, max) in [
            (
                "texture image units",
                combined.samplers,
                constants.max_combined_texture_image_units,
            ),
            (
                "image uniforms",
                combined.images,
                constants.max_combined_image_uniforms,
            ),
        ] {
            if count > max {
                diagnostics.error(TooManyCombinedResources { kind, count, max });
            }
        }
        visible.append(&mut hidden);
        let num_storage_slots = visible.iter().map(|planned| planned.storage_slots).sum();
        tracing::debug!(
            uniforms = visible.len(),
            num_storage_slots,
            "counted uniform storage"
        );
        Self {
            uniforms: visible,
            num_storage_slots,
        }
    }

    /// second pass: backing storage, opaque indices, block members and API locations
    pub fn parcel_out(
        self,
        uniform_blocks: &[UniformBlock],
        shader_storage_blocks: &[UniformBlock],
        explicit: &ExplicitUniformLocations,
        constants: &LinkerConstants,
        diagnostics: &mut Diagnostics,
    ) -> ResourceTable {
        let mut table = ResourceTable {
            num_storage_slots: self.num_storage_slots,
            ..ResourceTable::default()
        };
        let mut opaque = OpaqueAllocator::default();
        let mut storage_offset = 0;
        let (visible, hidden): (Vec<_>, Vec<_>) = self
            .uniforms
            .into_iter()
            .partition(|planned| !planned.hidden);
        for planned in visible {
            let uniform = opaque.parcel_out(planned, &mut storage_offset);
            table.uniforms.push(uniform);
        }
        for (is_shader_storage, blocks) in [(false, uniform_blocks), (true, shader_storage_blocks)]
        {
            for (block_index, block) in blocks.iter().enumerate() {
                if block.array_elements.iter().any(|&element| element != 0) {
                    continue;
                }
                for member in &block.members {
                    let (uniform_type, array_elements) = match &member.member_type {
                        Type::Array { element, length } => {
                            ((**element).clone(), length.unwrap_or(0))
                        }
                        t => (t.clone(), 0),
                    };
                    table.uniforms.push(UniformStorage {
                        name: member.name.clone(),
                        uniform_type,
                        array_elements,
                        block_index: block_index as i32,
                        offset: member.offset as i32,
                        array_stride: member.array_stride as i32,
                        matrix_stride: member.matrix_stride as i32,
                        row_major: member.row_major,
                        storage_offset: 0,
                        storage_slots: 0,
                        remap_location: None,
                        opaque: Default::default(),
                        active_shader_mask: block.stageref,
                        is_shader_storage,
                        builtin: false,
                        hidden: false,
                        binding: block.binding,
                        bindless: false,
                        atomic_buffer_index: None,
                        top_level_array_size: member.top_level_array_size,
                        top_level_array_stride: member.top_level_array_stride,
                    });
                }
            }
        }
        for planned in hidden {
            let uniform = opaque.parcel_out(planned, &mut storage_offset);
            table.uniforms.push(uniform);
        }
        table.num_samplers = opaque.bound_samplers;
        table.num_images = opaque.bound_images;
        table.assign_locations(explicit, constants, diagnostics);
        table
    }
}

#[derive(Default)]
struct OpaquePool {
    next: [u32; ShaderStage::COUNT],
    record_next: [HashMap<String, u32>; ShaderStage::COUNT],
}

impl OpaquePool {
    fn allocate(
        &mut self,
        stage: ShaderStage,
        count: u32,
        record_array: &Option<(String, u32)>,
    ) -> u32 {
        let stage = stage.index();
        match record_array {
            Some((key, enclosing)) => {
                let next = &mut self.next[stage];
                let slot = self.record_next[stage].entry(key.clone()).or_insert_with(|| {
                    let base = *next;
                    *next += count * enclosing;
                    base
                });
                let index = *slot;
                *slot += count;
                index
            }
            None => {
                let index = self.next[stage];
                self.next[stage] += count;
                index
            }
        }
    }
}

/// separate pools for bound and bindless samplers and images
#[derive(Default)]
struct OpaqueAllocator {
    samplers: OpaquePool,
    bindless_samplers: OpaquePool,
    images: OpaquePool,
    bindless_images: OpaquePool,
    bound_samplers: [u32; ShaderStage::COUNT],
    bound_images: [u32; ShaderStage::COUNT],
}

impl OpaqueAllocator {
    fn parcel_out(&mut self, planned: PlannedUniform, storage_offset: &mut u32) -> UniformStorage {
        let mut opaque = [OpaqueInfo::default(); ShaderStage::COUNT];
        let count = planned.array_elements.max(1);
        let pool = match (
            planned.uniform_type.is_sampler(),
            planned.uniform_type.is_image(),
            planned.bindless,
        ) {
            (true, _, false) => Some(&mut self.samplers),
            (true, _, true) => Some(&mut self.bindless_samplers),
            (_, true, false) => Some(&mut self.images),
            (_, true, true) => Some(&mut self.bindless_images),
            _ => None,
        };
        if let Some(pool) = pool {
            for stage in ShaderStage::ALL {
                if planned.active_shader_mask & (1 << stage.index()) == 0 {
                    continue;
                }
                opaque[stage.index()] = OpaqueInfo {
                    active: true,
                    index: pool.allocate(stage, count, &planned.record_array),
                };
            }
            self.bound_samplers = self.samplers.next;
            self.bound_images = self.images.next;
        }
        let is_atomic = planned.uniform_type.is_atomic_uint();
        let uniform = UniformStorage {
            name: planned.name,
            uniform_type: planned.uniform_type,
            array_elements: planned.array_elements,
            block_index: -1,
            offset: if is_atomic {
                planned.atomic_offset as i32
            } else {
                -1
            },
            array_stride: -1,
            matrix_stride: -1,
            row_major: false,
            storage_offset: *storage_offset,
            storage_slots: planned.storage_slots,
            remap_location: planned.explicit_location,
            opaque,
            active_shader_mask: planned.active_shader_mask,
            is_shader_storage: false,
            builtin: planned.builtin,
            hidden: planned.hidden,
            binding: planned.binding,
            bindless: planned.bindless,
            atomic_buffer_index: None,
            top_level_array_size: 1,
            top_level_array_stride: 0,
        };
        *storage_offset += planned.storage_slots;
        uniform
    }
}

/// the program's uniform table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceTable {
    /// every uniform: visible default block uniforms, block members, then hidden ones
    pub uniforms: Vec<UniformStorage>,
    /// API location to uniform index
    pub remap_table: Vec<Option<usize>>,
    /// backing storage slots of all default block values
    pub num_storage_slots: u32,
    /// bound sampler slots used per stage
    pub num_samplers: [u32; ShaderStage::COUNT],
    /// bound image slots used per stage
    pub num_images: [u32; ShaderStage::COUNT],
}

impl ResourceTable {
    /// look up a uniform by API name
    pub fn find(&self, name: &str) -> Option<&UniformStorage> {
        self.uniforms.iter().find(|uniform| uniform.name == name)
    }
    /// look up a uniform by API name
    pub fn find_mut(&mut self, name: &str) -> Option<&mut UniformStorage> {
        self.uniforms.iter_mut().find(|uniform| uniform.name == name)
    }
    /// the uniform at API `location`
    pub fn uniform_at(&self, location: u32) -> Option<&UniformStorage> {
        let index = (*self.remap_table.get(location as usize)?)?;
        Some(&self.uniforms[index])
    }
    /// explicit locations first, then first fit into the holes left between them, then
    /// the end of the table
    fn assign_locations(
        &mut self,
        explicit: &ExplicitUniformLocations,
        constants: &LinkerConstants,
        diagnostics: &mut Diagnostics,
    ) {
        let mut used = explicit.reserved.clone();
        for (index, uniform) in self.uniforms.iter_mut().enumerate() {
            if !uniform.has_location() {
                uniform.remap_location = None;
                continue;
            }
            let count = uniform.element_count();
            let location = match uniform.remap_location {
                Some(location) => location,
                None => {
                    let len = used.len() as u32;
                    let hole = if count <= len {
                        (0..=len - count).find(|&start| !any_in_range(&used, start, start + count))
                    } else {
                        None
                    };
                    hole.unwrap_or(len)
                }
            };
            let end = location + count;
            used.grow(end as usize);
            used.insert_range(location as usize..end as usize);
            if self.remap_table.len() < end as usize {
                self.remap_table.resize(end as usize, None);
            }
            for slot in location..end {
                self.remap_table[slot as usize] = Some(index);
            }
            uniform.remap_location = Some(location);
            tracing::trace!(name = %uniform.name, location, "assigned uniform location");
        }
        let count = self.remap_table.len() as u32;
        if count > constants.max_uniform_locations {
            diagnostics.error(TooManyUniformLocations {
                count,
                max: constants.max_uniform_locations,
            });
        }
    }
}

/// allocate the uniforms of the linked stages
pub fn link_uniforms(
    stages: &[&Shader],
    uniform_blocks: &[UniformBlock],
    shader_storage_blocks: &[UniformBlock],
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> ResourceTable {
    let explicit = reserve_explicit_locations(stages, constants, diagnostics);
    let plan = ResourceLayoutPlan::count_uniform_size(stages, &explicit, constants, diagnostics);
    plan.parcel_out(
        uniform_blocks,
        shader_storage_blocks,
        &explicit,
        constants,
        diagnostics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_layout::compute_stage_blocks;
    use crate::errors::LinkError;
    use crate::options::LinkerOptions;
    use glsl_linker_ir::types::{SamplerDim, SamplerType};
    use glsl_linker_ir::variable::DeclarationKind;
    use glsl_linker_ir::{
        InterfacePacking, InterfaceType, ScalarKind, StructField, StructType,
    };

    fn sampler2d() -> Type {
        SamplerType {
            dim: SamplerDim::Dim2D,
            shadow: false,
            arrayed: false,
            sampled: ScalarKind::Float,
        }
        .into()
    }

    fn uniform(name: &str, t: Type) -> Variable {
        Variable::new(name, t, VariableMode::Uniform)
    }

    fn link(stages: &[&Shader], constants: &LinkerConstants) -> (ResourceTable, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let table = link_uniforms(stages, &[], &[], constants, &mut diagnostics);
        (table, diagnostics)
    }

    #[test]
    fn test_storage_and_locations() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        vs.add_global(uniform("x", Type::float()));
        vs.add_global(uniform("m", Type::mat(4, 4)));
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(uniform("x", Type::float()));
        fs.add_global(uniform("c", Type::vec(4)).with_location(5));
        let (table, diagnostics) = link(&[&vs, &fs], &LinkerConstants::default());
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        let names: Vec<_> = table.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["x", "m", "c"]);
        let x = table.find("x").unwrap();
        assert_eq!(x.active_shader_mask, 0b10001);
        assert_eq!((x.storage_offset, x.remap_location), (0, Some(0)));
        let m = table.find("m").unwrap();
        assert_eq!((m.storage_offset, m.storage_slots), (1, 16));
        assert_eq!(m.remap_location, Some(1));
        assert_eq!(table.find("c").unwrap().storage_offset, 17);
        assert_eq!(table.num_storage_slots, 21);
        assert_eq!(
            table.remap_table,
            [Some(0), Some(1), None, None, None, Some(2)]
        );
        assert_eq!(table.uniform_at(5).unwrap().name, "c");
    }

    #[test]
    fn test_holes_are_filled_first() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(uniform("a", Type::float()).with_location(0));
        fs.add_global(uniform("b", Type::float()).with_location(3));
        fs.add_global(uniform("arr", Type::array(Type::float(), 2)));
        fs.add_global(uniform("big", Type::array(Type::float(), 3)));
        let (table, diagnostics) = link(&[&fs], &LinkerConstants::default());
        assert!(diagnostics.link_status());
        assert_eq!(table.find("arr").unwrap().remap_location, Some(1));
        assert_eq!(table.find("big").unwrap().remap_location, Some(4));
        assert_eq!(table.remap_table.len(), 7);
    }

    #[test]
    fn test_explicit_location_overlap() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        vs.add_global(uniform("a", Type::array(Type::float(), 3)).with_location(0));
        vs.add_global(uniform("shared", Type::float()).with_location(7));
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(uniform("b", Type::float()).with_location(2));
        fs.add_global(uniform("shared", Type::float()).with_location(7));
        let (_, diagnostics) = link(&[&vs, &fs], &LinkerConstants::default());
        assert_eq!(
            diagnostics.errors(),
            &[LinkError::from(UniformLocationOverlap { name: "b".into() })]
        );
    }

    #[test]
    fn test_too_many_locations() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(uniform("a", Type::array(Type::float(), 5)));
        let constants = LinkerConstants {
            max_uniform_locations: 4,
            ..LinkerConstants::default()
        };
        let (_, diagnostics) = link(&[&fs], &constants);
        assert_eq!(
            diagnostics.info_log(),
            "error: count of uniform locations > MAX_UNIFORM_LOCATIONS (5 > 4)\n"
        );
    }

    #[test]
    fn test_explicit_location_out_of_range() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(uniform("far", Type::float()).with_location(i32::MAX as u32));
        fs.add_global(uniform("edge", Type::array(Type::float(), 2)).with_location(3));
        let constants = LinkerConstants {
            max_uniform_locations: 4,
            ..LinkerConstants::default()
        };
        let (table, diagnostics) = link(&[&fs], &constants);
        assert_eq!(
            diagnostics.errors(),
            &[
                LinkError::from(TooManyUniformLocations {
                    count: 1 << 31,
                    max: 4,
                }),
                LinkError::from(TooManyUniformLocations { count: 5, max: 4 }),
            ]
        );
        assert!(table.remap_table.len() <= 4);
    }

    #[test]
    fn test_struct_array_samplers() {
        let s = StructType {
            name: "S".into(),
            fields: vec![
                StructField::new("t", sampler2d()),
                StructField::new("u", sampler2d()),
                StructField::new("scale", Type::float()),
            ],
        };
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(uniform("lone", sampler2d()));
        fs.add_global(uniform("s", Type::array(s.into(), 2)));
        let (table, diagnostics) = link(&[&fs], &LinkerConstants::default());
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        let index = |name: &str| table.find(name).unwrap().opaque[ShaderStage::Fragment.index()];
        assert_eq!(index("lone").index, 0);
        assert_eq!(index("s[0].t").index, 1);
        assert_eq!(index("s[1].t").index, 2);
        assert_eq!(index("s[0].u").index, 3);
        assert_eq!(index("s[1].u").index, 4);
        assert!(index("s[1].u").active);
        assert!(!table.find("s[1].u").unwrap().opaque[0].active);
        assert_eq!(table.num_samplers[ShaderStage::Fragment.index()], 5);
        assert_eq!(table.find("s[1].scale").unwrap().storage_offset, 1);
        assert_eq!(table.num_storage_slots, 2);
    }

    #[test]
    fn test_sampler_limit() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        fs.add_global(uniform("textures", Type::array(sampler2d(), 33)));
        let (_, diagnostics) = link(&[&fs], &LinkerConstants::default());
        assert_eq!(
            diagnostics.info_log(),
            "error: too many fragment shader samplers (33 > 32)\n"
        );
    }

    #[test]
    fn test_hidden_and_builtin_uniforms() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let mut lowered = uniform("lowered", Type::vec(4));
        lowered.data.how_declared = DeclarationKind::Hidden;
        vs.add_global(lowered);
        vs.add_global(uniform("gl_DepthRange.near", Type::float()));
        vs.add_global(uniform("v", Type::vec(2)));
        let (table, diagnostics) = link(&[&vs], &LinkerConstants::default());
        assert!(diagnostics.link_status());
        let names: Vec<_> = table.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["gl_DepthRange.near", "v", "lowered"]);
        assert_eq!(table.find("gl_DepthRange.near").unwrap().remap_location, None);
        assert_eq!(table.find("v").unwrap().remap_location, Some(0));
        let lowered = table.find("lowered").unwrap();
        assert_eq!(lowered.remap_location, None);
        assert_eq!(lowered.storage_offset, 3);
    }

    #[test]
    fn test_block_members() {
        let interface = InterfaceType {
            name: "Block".into(),
            fields: vec![
                StructField::new("a", Type::float()),
                StructField::new("b", Type::array(Type::vec(2), 3)),
            ],
            packing: InterfacePacking::Std140,
            row_major: false,
        };
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        vs.add_global(
            Variable::new("blk", interface.clone().into(), VariableMode::Uniform)
                .with_interface(interface),
        );
        vs.add_global(uniform("plain", Type::float()));
        let mut diagnostics = Diagnostics::new();
        let constants = LinkerConstants::default();
        let (ubos, ssbos) =
            compute_stage_blocks(&vs, &constants, &LinkerOptions::default(), &mut diagnostics);
        let table = link_uniforms(&[&vs], &ubos, &ssbos, &constants, &mut diagnostics);
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        let b = table.find("Block.b").unwrap();
        assert_eq!(b.block_index, 0);
        assert_eq!((b.offset, b.array_stride, b.array_elements), (16, 16, 3));
        assert_eq!(b.remap_location, None);
        assert_eq!(table.find("plain").unwrap().remap_location, Some(0));
        assert!(table.find("blk").is_none());
    }
}
