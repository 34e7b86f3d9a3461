// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! matching the outputs of one stage to the inputs of the next, and assigning the
//! matched pairs their locations
//!
//! Generic varyings occupy `max_varyings` vec4 slots of four components each. Patch
//! varyings are numbered in a space of their own; the reservation mask places that
//! space right after the generic one.

use crate::diagnostics::Diagnostics;
use crate::errors::{
    InsufficientVaryingLocations, MismatchedInterpolation, MismatchedVaryingQualifier,
    MismatchedVaryingType, TooManyVaryingComponents, UnmatchedInput, VaryingLocationConflict,
    VaryingLocationOutOfRange,
};
use crate::options::{LinkerConstants, LinkerOptions};
use fixedbitset::FixedBitSet;
use glsl_linker_ir::types::align_up;
use glsl_linker_ir::{
    Interpolation, ScalarKind, Shader, ShaderStage, Type, Variable, VariableId, VariableMode,
};
use hashbrown::{HashMap, HashSet};

/// order in which varyings of one packing class are placed
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum PackingOrder {
    /// multiples of four components
    Vec4,
    /// two components left over
    Vec2,
    /// one component left over
    Scalar,
    /// three components left over; placed last so they can pair with scalars
    Vec3,
}

impl PackingOrder {
    fn of(components: u32) -> Self {
        match components % 4 {
            0 => PackingOrder::Vec4,
            2 => PackingOrder::Vec2,
            3 => PackingOrder::Vec3,
            _ => PackingOrder::Scalar,
        }
    }
}

/// an output/input pair that has to carry a value
#[derive(Clone, Debug, PartialEq)]
pub struct VaryingMatch {
    /// the output of the producing stage; `None` for outward-facing inputs
    pub producer: Option<VariableId>,
    /// the input of the consuming stage; `None` for outward-facing or captured outputs
    pub consumer: Option<VariableId>,
    /// varyings sharing a slot must have the same packing class
    pub packing_class: u32,
    /// placement order within a packing class
    pub packing_order: PackingOrder,
    /// number of components taken
    pub num_components: u32,
    /// patch varying
    pub is_patch: bool,
    /// placed by an explicit `location` rather than packed
    pub explicit: bool,
    /// first component, counted from component 0 of slot 0 of the match's location space
    pub generic_location: u32,
}

impl VaryingMatch {
    /// the assigned location
    pub fn location(&self) -> u32 {
        self.generic_location / 4
    }
    /// the assigned first component
    pub fn location_frac(&self) -> u32 {
        self.generic_location % 4
    }
}

/// the varyings between two stages after location assignment
#[derive(Clone, Debug, Default)]
pub struct VaryingLayout {
    /// every pair that carries a value
    pub matches: Vec<VaryingMatch>,
    /// generic slots in use
    pub slots_used: u32,
    /// patch slots in use
    pub patch_slots_used: u32,
    /// slots whose variables can't use a native per-component layout and need pack and
    /// unpack code; patch slots are offset by `max_varyings`
    pub lowered_slots: FixedBitSet,
    /// outputs demoted to ordinary globals because nothing consumes them
    pub demoted_outputs: Vec<String>,
    /// inputs demoted to ordinary globals because nothing produces them
    pub demoted_inputs: Vec<String>,
}

fn direction(mode: VariableMode) -> &'static str {
    if mode == VariableMode::ShaderIn {
        "in"
    } else {
        "out"
    }
}

fn has_qualifier(value: bool) -> &'static str {
    if value {
        "has"
    } else {
        "lacks"
    }
}

/// the type of `variable` without the per-vertex array level of its stage
pub(crate) fn varying_type(variable: &Variable, stage: ShaderStage) -> &Type {
    let per_vertex = match variable.mode {
        VariableMode::ShaderIn => stage.has_per_vertex_inputs(),
        VariableMode::ShaderOut => stage.has_per_vertex_outputs(),
        _ => false,
    };
    match &variable.var_type {
        Type::Array { element, .. } if per_vertex && !variable.data.patch => element,
        var_type => var_type,
    }
}

fn generic_variables(shader: &Shader, mode: VariableMode) -> Vec<VariableId> {
    shader
        .globals()
        .filter(|&id| {
            let variable = &shader.variables[id];
            variable.mode == mode && !variable.is_builtin()
        })
        .collect()
}

/// block instances are matched by block name, everything else by variable name
fn match_name(variable: &Variable) -> &str {
    if variable.is_interface_instance() {
        variable.interface_name().unwrap_or(&variable.name)
    } else {
        &variable.name
    }
}

fn slot_count(t: &Type) -> u32 {
    t.count_vec4_slots(false, true).max(1)
}

/// components taken by one slot of `t`
fn components_per_slot(t: &Type) -> u32 {
    let leaf = t.without_array();
    let components = match leaf {
        Type::Struct(_) | Type::Interface(_) => 4,
        Type::Matrix { .. } => leaf.column_type().component_slots(),
        _ => leaf.component_slots(),
    };
    components.clamp(1, 4)
}

/// check the explicit locations of one stage interface and reserve their slots
fn reserve_explicit_locations(
    shader: &Shader,
    mode: VariableMode,
    max_varyings: u32,
    reserved: &mut FixedBitSet,
    diagnostics: &mut Diagnostics,
) {
    let mut assigned: HashMap<(bool, u32, u32), &str> = HashMap::new();
    for id in generic_variables(shader, mode) {
        let variable = &shader.variables[id];
        if !variable.data.explicit_location || variable.data.location < 0 {
            continue;
        }
        let var_type = varying_type(variable, shader.stage);
        let location = variable.data.location as u32;
        let slots = slot_count(var_type);
        if location + slots > max_varyings {
            diagnostics.error(VaryingLocationOutOfRange {
                stage: shader.stage.name(),
                direction: direction(mode),
                name: variable.name.clone(),
                location,
                max: max_varyings - 1,
            });
            continue;
        }
        let patch = variable.data.patch;
        let first_component = variable.data.location_frac;
        let last_component = (first_component + components_per_slot(var_type)).min(4);
        'slots: for slot in location..location + slots {
            for component in first_component..last_component {
                match assigned.insert((patch, slot, component), &variable.name) {
                    Some(previous) if previous != variable.name => {
                        diagnostics.error(VaryingLocationConflict {
                            stage: shader.stage.name(),
                            direction: direction(mode),
                            location: slot,
                            component,
                        });
                        break 'slots;
                    }
                    _ => {}
                }
            }
            let base = if patch { max_varyings } else { 0 };
            reserved.insert((base + slot) as usize);
        }
    }
}

fn varying_types_match(output: &Type, input: &Type) -> bool {
    match (output, input) {
        (
            Type::Array {
                element: output_element,
                length: output_length,
            },
            Type::Array {
                element: input_element,
                length: input_length,
            },
        ) => output_length == input_length && varying_types_match(output_element, input_element),
        (Type::Struct(_), Type::Struct(_)) | (Type::Interface(_), Type::Interface(_)) => {
            output.record_compare(input, false, true, false)
        }
        _ => output == input,
    }
}

fn effective_interpolation(variable: &Variable) -> Interpolation {
    match variable.data.interpolation {
        Interpolation::None => Interpolation::Smooth,
        interpolation => interpolation,
    }
}

/// type and qualifier checks of one matched pair
fn cross_validate_pair(
    producer: &Shader,
    output: &Variable,
    consumer: &Shader,
    input: &Variable,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) {
    let producer_stage = producer.stage.name();
    let consumer_stage = consumer.stage.name();
    let output_type = varying_type(output, producer.stage);
    let input_type = varying_type(input, consumer.stage);
    if !varying_types_match(output_type, input_type) {
        diagnostics.error(MismatchedVaryingType {
            producer_stage,
            name: output.name.clone(),
            producer_type: output_type.to_string(),
            consumer_stage,
            consumer_type: input_type.to_string(),
        });
        return;
    }
    let mut qualifiers = vec![
        ("sample", output.data.sample, input.data.sample),
        ("patch", output.data.patch, input.data.patch),
        (
            "invariant",
            output.data.explicit_invariant,
            input.data.explicit_invariant,
        ),
    ];
    if !consumer.is_version(430, 310) {
        qualifiers.push(("centroid", output.data.centroid, input.data.centroid));
    }
    for (qualifier, producer_has, consumer_has) in qualifiers {
        if producer_has != consumer_has {
            diagnostics.error(MismatchedVaryingQualifier {
                producer_stage,
                name: output.name.clone(),
                producer_has: has_qualifier(producer_has),
                qualifier,
                consumer_stage,
                consumer_has: has_qualifier(consumer_has),
            });
        }
    }
    let output_interpolation = effective_interpolation(output);
    let input_interpolation = effective_interpolation(input);
    if output_interpolation != input_interpolation && !consumer.is_version(440, 0) {
        diagnostics.error_or_warning(
            options.allow_relaxed_interpolation_mismatch,
            MismatchedInterpolation {
                producer_stage,
                name: output.name.clone(),
                producer_interpolation: output_interpolation.name(),
                consumer_stage,
                consumer_interpolation: input_interpolation.name(),
            },
        );
    }
}

/// `gl_Color` and `gl_SecondaryColor` read whichever of the front and back colors the
/// previous stage wrote
fn validate_builtin_colors(
    producer: &Shader,
    consumer: &Shader,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) {
    const COLORS: [(&str, &str, &str); 2] = [
        ("gl_Color", "gl_FrontColor", "gl_BackColor"),
        (
            "gl_SecondaryColor",
            "gl_FrontSecondaryColor",
            "gl_BackSecondaryColor",
        ),
    ];
    if consumer.stage != ShaderStage::Fragment {
        return;
    }
    for (input_name, front, back) in COLORS.iter() {
        let input = match consumer.variable(input_name) {
            Some(input) if input.mode == VariableMode::ShaderIn && input.data.used => input,
            _ => continue,
        };
        for output_name in [front, back] {
            if let Some(output) = producer.variable(output_name) {
                if output.mode == VariableMode::ShaderOut && output.data.assigned {
                    cross_validate_pair(producer, output, consumer, input, options, diagnostics);
                }
            }
        }
    }
}

/// pair the generic outputs of `producer` with the generic inputs of `consumer`
fn match_varyings(
    producer: &Shader,
    consumer: &Shader,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) -> Vec<(VariableId, VariableId)> {
    let mut by_name: HashMap<&str, VariableId> = HashMap::new();
    let mut by_location: HashMap<(bool, u32, u32), VariableId> = HashMap::new();
    for id in generic_variables(producer, VariableMode::ShaderOut) {
        let output = &producer.variables[id];
        if output.data.explicit_location && output.data.location >= 0 {
            let location = output.data.location as u32;
            let var_type = varying_type(output, producer.stage);
            for slot in location..location + slot_count(var_type) {
                by_location
                    .entry((output.data.patch, slot, output.data.location_frac))
                    .or_insert(id);
            }
        } else {
            by_name.entry(match_name(output)).or_insert(id);
        }
    }
    validate_builtin_colors(producer, consumer, options, diagnostics);
    let mut retval = Vec::new();
    for id in generic_variables(consumer, VariableMode::ShaderIn) {
        let input = &consumer.variables[id];
        let output = if input.data.explicit_location && input.data.location >= 0 {
            by_location
                .get(&(
                    input.data.patch,
                    input.data.location as u32,
                    input.data.location_frac,
                ))
                .copied()
        } else {
            by_name.get(match_name(input)).copied()
        };
        match output {
            Some(output_id) => {
                let output = &producer.variables[output_id];
                cross_validate_pair(producer, output, consumer, input, options, diagnostics);
                retval.push((output_id, id));
            }
            None => {
                if input.data.used && !input.data.explicit_location && !options.separable {
                    diagnostics.error(UnmatchedInput {
                        stage: consumer.stage.name(),
                        name: input.name.clone(),
                    });
                }
            }
        }
    }
    retval
}

fn packing_class(variable: &Variable) -> u32 {
    let data = &variable.data;
    let interpolation = match data.interpolation {
        Interpolation::None | Interpolation::Smooth => 0,
        Interpolation::Flat => 1,
        Interpolation::NoPerspective => 2,
    };
    let qualifiers = u32::from(data.centroid)
        | u32::from(data.sample) << 1
        | u32::from(data.patch) << 2
        | u32::from(data.must_be_shader_input) << 3;
    qualifiers << 2 | interpolation
}

/// place the non-explicit matches; on failure the index of the match that didn't fit
fn assign_locations(
    matches: &mut [VaryingMatch],
    reserved: &FixedBitSet,
    max_varyings: u32,
    vec3_packing_allowed: bool,
    disable_packing: bool,
) -> Result<(), usize> {
    matches.sort_by_key(|m| (m.packing_class, m.packing_order));
    let mut cursors = [0u32; 2];
    let mut previous_class: [Option<u32>; 2] = [None; 2];
    for (index, m) in matches.iter_mut().enumerate() {
        let space = usize::from(m.is_patch);
        let cursor = &mut cursors[space];
        if previous_class[space] != Some(m.packing_class)
            || disable_packing
            || (m.packing_order == PackingOrder::Vec3 && !vec3_packing_allowed)
        {
            *cursor = align_up(*cursor, 4);
        }
        previous_class[space] = Some(m.packing_class);
        let base = if m.is_patch { max_varyings } else { 0 };
        let num_components = m.num_components.max(1);
        loop {
            let end = *cursor + num_components;
            if end > max_varyings * 4 {
                return Err(index);
            }
            let first_slot = *cursor / 4;
            let last_slot = (end - 1) / 4;
            if (first_slot..=last_slot).all(|slot| !reserved.contains((base + slot) as usize)) {
                break;
            }
            *cursor = align_up(*cursor + 1, 4);
        }
        m.generic_location = *cursor;
        *cursor += num_components;
    }
    Ok(())
}

fn demote(shader: &mut Shader, id: VariableId) -> String {
    let variable = &mut shader.variables[id];
    tracing::trace!(stage = %shader.stage, name = %variable.name, "demoting varying");
    variable.mode = VariableMode::Auto;
    variable.data.location = -1;
    variable.data.location_frac = 0;
    variable.data.is_unmatched_generic_inout = true;
    variable.name.clone()
}

fn base_kind(t: &Type) -> Option<ScalarKind> {
    t.without_array().scalar_kind()
}

/// the type, stage and variable describing a match
fn match_variable<'a>(
    m: &VaryingMatch,
    producer: Option<&'a Shader>,
    consumer: Option<&'a Shader>,
) -> Option<(&'a Shader, &'a Variable)> {
    match (m.producer, producer, m.consumer, consumer) {
        (_, _, Some(id), Some(consumer)) => Some((consumer, &consumer.variables[id])),
        (Some(id), Some(producer), _, _) => Some((producer, &producer.variables[id])),
        _ => None,
    }
}

fn find_lowered_slots(
    matches: &[VaryingMatch],
    producer: Option<&Shader>,
    consumer: Option<&Shader>,
    max_varyings: u32,
    native_per_component: bool,
) -> FixedBitSet {
    let mut kinds: HashMap<u32, Vec<Option<ScalarKind>>> = HashMap::new();
    for m in matches {
        let (shader, variable) = match match_variable(m, producer, consumer) {
            Some(found) => found,
            None => continue,
        };
        let var_type = varying_type(variable, shader.stage);
        let kind = if var_type.is_array() || var_type.is_matrix() {
            None
        } else {
            base_kind(var_type)
        };
        let base = if m.is_patch { max_varyings } else { 0 };
        let end = m.generic_location + m.num_components.max(1);
        for slot in m.generic_location / 4..=(end - 1) / 4 {
            kinds.entry(base + slot).or_default().push(kind);
        }
    }
    let mut retval = FixedBitSet::with_capacity(2 * max_varyings as usize);
    for (slot, kinds) in kinds {
        if kinds.len() < 2 {
            continue;
        }
        let native = native_per_component
            && kinds[0].is_some()
            && kinds.iter().all(|kind| *kind == kinds[0]);
        if !native {
            retval.insert(slot as usize);
        }
    }
    retval
}

fn write_location(shader: Option<&mut Shader>, id: Option<VariableId>, m: &VaryingMatch) {
    if let (Some(shader), Some(id)) = (shader, id) {
        let data = &mut shader.variables[id].data;
        data.location = m.location() as i32;
        data.location_frac = m.location_frac();
    }
}

fn check_component_limit(
    shader: &Shader,
    mode: VariableMode,
    slots_used: u32,
    max: u32,
    diagnostics: &mut Diagnostics,
) {
    let count = slots_used * 4;
    if count > max {
        diagnostics.error(TooManyVaryingComponents {
            stage: shader.stage.name(),
            direction: direction(mode),
            count,
            max,
        });
    }
}

/// match, validate and place the varyings between `producer` and `consumer`. Either
/// side may be missing: the inputs of the first stage or the outputs of the last stage
/// of a separable program face outward and keep their interface. `xfb_captured` names
/// the outputs of `producer` captured by transform feedback, which stay active even
/// when `consumer` doesn't read them. `None` when the interface can't be linked.
pub fn assign_varying_locations(
    mut producer: Option<&mut Shader>,
    mut consumer: Option<&mut Shader>,
    xfb_captured: &HashSet<String>,
    vec3_packing_allowed: bool,
    constants: &LinkerConstants,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) -> Option<VaryingLayout> {
    let max_varyings = constants.max_varyings;
    let initial_error_count = diagnostics.error_count();
    let stage = producer.as_deref().or(consumer.as_deref()).map(|shader| shader.stage);
    let _span = tracing::debug_span!("assign_varying_locations", ?stage).entered();
    let mut reserved = FixedBitSet::with_capacity(2 * max_varyings as usize);
    if let Some(producer) = producer.as_deref() {
        reserve_explicit_locations(
            producer,
            VariableMode::ShaderOut,
            max_varyings,
            &mut reserved,
            diagnostics,
        );
    }
    if let Some(consumer) = consumer.as_deref() {
        reserve_explicit_locations(
            consumer,
            VariableMode::ShaderIn,
            max_varyings,
            &mut reserved,
            diagnostics,
        );
    }
    let mut pairs: Vec<(Option<VariableId>, Option<VariableId>)> = Vec::new();
    match (producer.as_deref(), consumer.as_deref()) {
        (Some(producer), Some(consumer)) => {
            let matched = match_varyings(producer, consumer, options, diagnostics);
            let matched_outputs: HashSet<VariableId> =
                matched.iter().map(|&(output, _)| output).collect();
            pairs.extend(matched.into_iter().map(|(output, input)| (Some(output), Some(input))));
            for id in generic_variables(producer, VariableMode::ShaderOut) {
                if !matched_outputs.contains(&id)
                    && xfb_captured.contains(&producer.variables[id].name)
                {
                    pairs.push((Some(id), None));
                }
            }
        }
        (Some(producer), None) => pairs.extend(
            generic_variables(producer, VariableMode::ShaderOut)
                .into_iter()
                .map(|id| (Some(id), None)),
        ),
        (None, Some(consumer)) => pairs.extend(
            generic_variables(consumer, VariableMode::ShaderIn)
                .into_iter()
                .map(|id| (None, Some(id))),
        ),
        (None, None) => return Some(VaryingLayout::default()),
    }
    if diagnostics.error_count() > initial_error_count {
        return None;
    }
    let mut packed = Vec::new();
    let mut explicit = Vec::new();
    for &(output, input) in &pairs {
        let output_variable = output
            .zip(producer.as_deref())
            .map(|(id, shader)| (shader, &shader.variables[id]));
        let input_variable = input
            .zip(consumer.as_deref())
            .map(|(id, shader)| (shader, &shader.variables[id]));
        let (shader, variable) = match input_variable.or(output_variable) {
            Some(found) => found,
            None => continue,
        };
        let var_type = varying_type(variable, shader.stage);
        let captured = output_variable
            .map_or(false, |(_, output)| xfb_captured.contains(&output.name));
        let num_components = if options.disable_varying_packing
            || (captured && options.disable_transform_feedback_packing)
        {
            slot_count(var_type) * 4
        } else {
            var_type.component_slots()
        };
        let explicit_source = [output_variable, input_variable]
            .into_iter()
            .flatten()
            .map(|(_, variable)| variable)
            .find(|variable| variable.data.explicit_location && variable.data.location >= 0);
        let mut m = VaryingMatch {
            producer: output,
            consumer: input,
            packing_class: packing_class(variable),
            packing_order: PackingOrder::of(num_components),
            num_components,
            is_patch: variable.data.patch,
            explicit: explicit_source.is_some(),
            generic_location: 0,
        };
        match explicit_source {
            Some(source) => {
                m.generic_location =
                    source.data.location as u32 * 4 + source.data.location_frac;
                explicit.push(m);
            }
            None => packed.push(m),
        }
    }
    if let Err(index) = assign_locations(
        &mut packed,
        &reserved,
        max_varyings,
        vec3_packing_allowed,
        options.disable_varying_packing,
    ) {
        let name = match_variable(&packed[index], producer.as_deref(), consumer.as_deref())
            .map_or_else(String::new, |(_, variable)| variable.name.clone());
        diagnostics.error(InsufficientVaryingLocations { name });
        return None;
    }
    let mut matches = packed;
    matches.extend(explicit);
    for m in &matches {
        write_location(producer.as_deref_mut(), m.producer, m);
        write_location(consumer.as_deref_mut(), m.consumer, m);
        if let (Some(producer), Some(id), None) = (producer.as_deref_mut(), m.producer, m.consumer)
        {
            if consumer.is_some() {
                producer.variables[id].data.is_xfb_only = true;
            }
        }
        tracing::trace!(
            location = m.location(),
            component = m.location_frac(),
            components = m.num_components,
            patch = m.is_patch,
            "assigned varying"
        );
    }
    let mut layout = VaryingLayout::default();
    let mut occupied = [
        FixedBitSet::with_capacity(max_varyings as usize),
        FixedBitSet::with_capacity(max_varyings as usize),
    ];
    for m in &matches {
        let end = (m.generic_location + m.num_components.max(1)).min(max_varyings * 4);
        let space = &mut occupied[usize::from(m.is_patch)];
        for slot in m.generic_location / 4..=(end - 1) / 4 {
            space.insert(slot as usize);
        }
    }
    layout.slots_used = occupied[0].count_ones(..) as u32;
    layout.patch_slots_used = occupied[1].count_ones(..) as u32;
    layout.lowered_slots = find_lowered_slots(
        &matches,
        producer.as_deref(),
        consumer.as_deref(),
        max_varyings,
        options.native_per_component_varyings,
    );
    let matched_outputs: HashSet<VariableId> = matches.iter().filter_map(|m| m.producer).collect();
    let matched_inputs: HashSet<VariableId> = matches.iter().filter_map(|m| m.consumer).collect();
    if let (Some(producer), true) = (producer.as_deref_mut(), consumer.is_some()) {
        for id in generic_variables(producer, VariableMode::ShaderOut) {
            if !matched_outputs.contains(&id) {
                layout.demoted_outputs.push(demote(producer, id));
            }
        }
    }
    if let (Some(consumer), true) = (consumer.as_deref_mut(), producer.is_some()) {
        for id in generic_variables(consumer, VariableMode::ShaderIn) {
            if !matched_inputs.contains(&id) {
                layout.demoted_inputs.push(demote(consumer, id));
            }
        }
    }
    if let Some(producer) = producer.as_deref() {
        check_component_limit(
            producer,
            VariableMode::ShaderOut,
            layout.slots_used,
            constants.stage(producer.stage).max_output_components,
            diagnostics,
        );
    }
    if let Some(consumer) = consumer.as_deref() {
        check_component_limit(
            consumer,
            VariableMode::ShaderIn,
            layout.slots_used,
            constants.stage(consumer.stage).max_input_components,
            diagnostics,
        );
    }
    tracing::debug!(
        matches = matches.len(),
        slots = layout.slots_used,
        patch_slots = layout.patch_slots_used,
        "varyings linked"
    );
    layout.matches = matches;
    Some(layout)
}
