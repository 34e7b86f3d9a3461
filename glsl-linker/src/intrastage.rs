// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! merging the compilation units of one stage into a single linked shader

use crate::array_sizing::{fixup_array_sizes, note_constant_array_accesses, size_stage_arrays};
use crate::block_layout::{compute_stage_blocks, UniformBlock};
use crate::call_graph::detect_recursion;
use crate::diagnostics::Diagnostics;
use crate::errors::{
    ConflictingLayoutQualifier, InvalidDerivativeGroup, LayoutQualifierOutOfRange,
    MissingLayoutQualifier, MissingMain, MultiplyDefinedFunction,
};
use crate::function_linking::{clone_from_unit, link_function_calls};
use crate::global_validation::cross_validate_globals;
use crate::interface_blocks::validate_intrastage_interface_blocks;
use crate::options::{LinkerConstants, LinkerOptions};
use glsl_linker_ir::shader::{DerivativeGroup, TessSpacing, VertexOrder};
use glsl_linker_ir::{
    Arena, Instruction, PrimitiveMode, RemapTable, Shader, ShaderLayout, ShaderStage,
    SignatureKey, Variable, VariableMode,
};
use hashbrown::HashMap;

/// the result of linking one stage
#[derive(Clone, Debug)]
pub struct LinkedShader {
    /// the linked IR; owns clones of everything taken from the compilation units
    pub shader: Shader,
    /// the stage's active uniform blocks
    pub uniform_blocks: Vec<UniformBlock>,
    /// the stage's active shader storage blocks
    pub shader_storage_blocks: Vec<UniformBlock>,
}

impl LinkedShader {
    /// the stage of the linked shader
    pub fn stage(&self) -> ShaderStage {
        self.shader.stage
    }
}

/// report functions defined in more than one compilation unit
fn check_duplicate_definitions(units: &[Shader], diagnostics: &mut Diagnostics) {
    let mut defined: HashMap<SignatureKey, usize> = HashMap::new();
    for (unit_index, unit) in units.iter().enumerate() {
        for function in &unit.functions {
            for signature in &function.signatures {
                if !signature.is_defined || signature.is_intrinsic {
                    continue;
                }
                let key = unit.signature_key(&function.name, signature);
                match defined.get(&key) {
                    Some(&other) if other != unit_index => {
                        diagnostics.error(MultiplyDefinedFunction {
                            signature: key.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        defined.insert(key, unit_index);
                    }
                }
            }
        }
    }
}

struct QualifierMerger<'a> {
    stage: &'static str,
    diagnostics: &'a mut Diagnostics,
}

impl QualifierMerger<'_> {
    fn merge<T: Copy + PartialEq>(
        &mut self,
        qualifier: &'static str,
        merged: &mut Option<T>,
        value: Option<T>,
        describe: impl Fn(T) -> String,
    ) {
        let value = match value {
            Some(value) => value,
            None => return,
        };
        match *merged {
            Some(existing) if existing != value => {
                self.diagnostics.error(ConflictingLayoutQualifier {
                    stage: self.stage,
                    qualifier,
                    first: describe(existing),
                    second: describe(value),
                });
            }
            Some(_) => {}
            None => *merged = Some(value),
        }
    }
    fn require<T>(&mut self, qualifier: &'static str, merged: &Option<T>) -> bool {
        if merged.is_none() {
            self.diagnostics.error(MissingLayoutQualifier {
                stage: self.stage,
                qualifier,
            });
            return false;
        }
        true
    }
    fn check_range(&mut self, qualifier: &'static str, value: u32, max: u32) {
        if value == 0 || value > max {
            self.diagnostics.error(LayoutQualifierOutOfRange {
                stage: self.stage,
                qualifier,
                value,
                max,
            });
        }
    }
}

fn primitive_name(primitive: PrimitiveMode) -> String {
    primitive.name().into()
}

fn spacing_name(spacing: TessSpacing) -> String {
    match spacing {
        TessSpacing::Equal => "equal_spacing",
        TessSpacing::FractionalOdd => "fractional_odd_spacing",
        TessSpacing::FractionalEven => "fractional_even_spacing",
    }
    .into()
}

fn vertex_order_name(order: VertexOrder) -> String {
    match order {
        VertexOrder::Ccw => "ccw",
        VertexOrder::Cw => "cw",
    }
    .into()
}

fn derivative_group_name(group: DerivativeGroup) -> &'static str {
    match group {
        DerivativeGroup::None => "no derivative group",
        DerivativeGroup::Quads => "derivative_group_quadsNV",
        DerivativeGroup::Linear => "derivative_group_linearNV",
    }
}

fn fragcoord_layout_name((origin_upper_left, pixel_center_integer): (bool, bool)) -> String {
    match (origin_upper_left, pixel_center_integer) {
        (false, false) => "no layout qualifiers".into(),
        (true, false) => "origin_upper_left".into(),
        (false, true) => "pixel_center_integer".into(),
        (true, true) => "origin_upper_left, pixel_center_integer".into(),
    }
}

fn link_fragment_layout(units: &[Shader], merger: &mut QualifierMerger, layout: &mut ShaderLayout) {
    let mut fragcoord = None;
    let mut used_without_redeclaration = false;
    for unit in units {
        let unit_layout = &unit.layout;
        if unit_layout.redeclares_gl_fragcoord {
            merger.merge(
                "gl_FragCoord layout qualifiers",
                &mut fragcoord,
                Some((unit_layout.origin_upper_left, unit_layout.pixel_center_integer)),
                fragcoord_layout_name,
            );
        } else if unit_layout.uses_gl_fragcoord {
            used_without_redeclaration = true;
        }
        layout.uses_gl_fragcoord |= unit_layout.uses_gl_fragcoord;
        layout.early_fragment_tests |= unit_layout.early_fragment_tests;
        layout.inner_coverage |= unit_layout.inner_coverage;
        layout.post_depth_coverage |= unit_layout.post_depth_coverage;
        layout.blend_support |= unit_layout.blend_support;
    }
    if let Some(redeclared) = fragcoord {
        // every unit using gl_FragCoord has to redeclare it once any unit does
        if used_without_redeclaration {
            merger.diagnostics.error(ConflictingLayoutQualifier {
                stage: merger.stage,
                qualifier: "gl_FragCoord layout qualifiers",
                first: fragcoord_layout_name(redeclared),
                second: "a use without redeclaration".into(),
            });
        }
        layout.redeclares_gl_fragcoord = true;
        layout.origin_upper_left = redeclared.0;
        layout.pixel_center_integer = redeclared.1;
    }
}

fn link_tess_control_layout(
    units: &[Shader],
    merger: &mut QualifierMerger,
    constants: &LinkerConstants,
    layout: &mut ShaderLayout,
) {
    for unit in units {
        merger.merge(
            "output vertex count",
            &mut layout.tcs_vertices_out,
            unit.layout.tcs_vertices_out,
            |v| v.to_string(),
        );
    }
    if merger.require("an output vertex count", &layout.tcs_vertices_out) {
        if let Some(vertices) = layout.tcs_vertices_out {
            merger.check_range("output vertex count", vertices, constants.max_patch_vertices);
        }
    }
}

fn link_tess_eval_layout(
    units: &[Shader],
    merger: &mut QualifierMerger,
    layout: &mut ShaderLayout,
) {
    for unit in units {
        let unit_layout = &unit.layout;
        merger.merge(
            "input primitive modes",
            &mut layout.tes_primitive_mode,
            unit_layout.tes_primitive_mode,
            primitive_name,
        );
        merger.merge(
            "vertex spacing",
            &mut layout.tes_spacing,
            unit_layout.tes_spacing,
            spacing_name,
        );
        merger.merge(
            "triangle winding order",
            &mut layout.tes_vertex_order,
            unit_layout.tes_vertex_order,
            vertex_order_name,
        );
        merger.merge(
            "point_mode",
            &mut layout.tes_point_mode,
            unit_layout.tes_point_mode,
            |v| v.to_string(),
        );
    }
    merger.require("input primitive modes", &layout.tes_primitive_mode);
    layout.tes_spacing.get_or_insert(TessSpacing::Equal);
    layout.tes_vertex_order.get_or_insert(VertexOrder::Ccw);
    layout.tes_point_mode.get_or_insert(false);
}

fn link_geometry_layout(
    units: &[Shader],
    merger: &mut QualifierMerger,
    constants: &LinkerConstants,
    layout: &mut ShaderLayout,
) {
    for unit in units {
        let unit_layout = &unit.layout;
        merger.merge(
            "input primitive type",
            &mut layout.gs_input_primitive,
            unit_layout.gs_input_primitive,
            primitive_name,
        );
        merger.merge(
            "output primitive type",
            &mut layout.gs_output_primitive,
            unit_layout.gs_output_primitive,
            primitive_name,
        );
        merger.merge(
            "max_vertices",
            &mut layout.gs_max_vertices,
            unit_layout.gs_max_vertices,
            |v| v.to_string(),
        );
        merger.merge(
            "invocations count",
            &mut layout.gs_invocations,
            unit_layout.gs_invocations,
            |v| v.to_string(),
        );
    }
    merger.require("an input primitive type", &layout.gs_input_primitive);
    merger.require("an output primitive type", &layout.gs_output_primitive);
    if merger.require("a maximum output vertex count", &layout.gs_max_vertices) {
        if let Some(max_vertices) = layout.gs_max_vertices {
            // max_vertices = 0 is legal
            if max_vertices > constants.max_geometry_output_vertices {
                merger.diagnostics.error(LayoutQualifierOutOfRange {
                    stage: merger.stage,
                    qualifier: "max_vertices",
                    value: max_vertices,
                    max: constants.max_geometry_output_vertices,
                });
            }
        }
    }
    let invocations = *layout.gs_invocations.get_or_insert(1);
    merger.check_range(
        "invocations count",
        invocations,
        constants.max_geometry_shader_invocations,
    );
}

fn link_compute_layout(
    units: &[Shader],
    merger: &mut QualifierMerger,
    constants: &LinkerConstants,
    layout: &mut ShaderLayout,
) {
    let mut derivative_group = None;
    for unit in units {
        let unit_layout = &unit.layout;
        merger.merge(
            "local group size",
            &mut layout.cs_local_size,
            unit_layout.cs_local_size,
            |[x, y, z]| format!("{}, {}, {}", x, y, z),
        );
        layout.cs_local_size_variable |= unit_layout.cs_local_size_variable;
        if unit_layout.cs_derivative_group != DerivativeGroup::None {
            merger.merge(
                "derivative group",
                &mut derivative_group,
                Some(unit_layout.cs_derivative_group),
                |group| derivative_group_name(group).into(),
            );
        }
    }
    if layout.cs_local_size_variable && layout.cs_local_size.is_some() {
        merger.diagnostics.error(ConflictingLayoutQualifier {
            stage: merger.stage,
            qualifier: "local group size",
            first: "fixed".into(),
            second: "variable".into(),
        });
        return;
    }
    if layout.cs_local_size_variable {
        return;
    }
    if !merger.require("a local group size", &layout.cs_local_size) {
        return;
    }
    let local_size = layout.cs_local_size.unwrap_or([1, 1, 1]);
    const DIMENSION_NAMES: [&str; 3] = ["local_size_x", "local_size_y", "local_size_z"];
    for ((&size, &max), &qualifier) in local_size
        .iter()
        .zip(constants.max_compute_work_group_size.iter())
        .zip(DIMENSION_NAMES.iter())
    {
        merger.check_range(qualifier, size, max);
    }
    let invocations = local_size.iter().fold(1u64, |product, &v| product * u64::from(v));
    if invocations > u64::from(constants.max_compute_work_group_invocations) {
        merger.diagnostics.error(LayoutQualifierOutOfRange {
            stage: merger.stage,
            qualifier: "local group invocation count",
            value: invocations.min(u64::from(u32::MAX)) as u32,
            max: constants.max_compute_work_group_invocations,
        });
    }
    match derivative_group {
        Some(DerivativeGroup::Quads) if local_size[0] % 2 != 0 || local_size[1] % 2 != 0 => {
            merger.diagnostics.error(InvalidDerivativeGroup {
                stage: merger.stage,
                group: derivative_group_name(DerivativeGroup::Quads),
                requirement: "a multiple of two in its first two dimensions",
            });
        }
        Some(DerivativeGroup::Linear) if invocations % 4 != 0 => {
            merger.diagnostics.error(InvalidDerivativeGroup {
                stage: merger.stage,
                group: derivative_group_name(DerivativeGroup::Linear),
                requirement: "a multiple of four in its invocation count",
            });
        }
        _ => {}
    }
    layout.cs_derivative_group = derivative_group.unwrap_or_default();
}

/// merge the stage layout qualifiers of all units, reporting conflicts and missing
/// mandatory qualifiers
pub fn link_layout_qualifiers(
    stage: ShaderStage,
    units: &[Shader],
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> ShaderLayout {
    let mut layout = ShaderLayout::default();
    for unit in units {
        for (merged, &stride) in layout.xfb_stride.iter_mut().zip(unit.layout.xfb_stride.iter()) {
            // conflicting strides are reported by transform feedback linking
            if merged.is_none() {
                *merged = stride;
            }
        }
    }
    let mut merger = QualifierMerger {
        stage: stage.name(),
        diagnostics,
    };
    match stage {
        ShaderStage::Vertex => {}
        ShaderStage::TessControl => {
            link_tess_control_layout(units, &mut merger, constants, &mut layout)
        }
        ShaderStage::TessEval => link_tess_eval_layout(units, &mut merger, &mut layout),
        ShaderStage::Geometry => link_geometry_layout(units, &mut merger, constants, &mut layout),
        ShaderStage::Fragment => link_fragment_layout(units, &mut merger, &mut layout),
        ShaderStage::Compute => link_compute_layout(units, &mut merger, constants, &mut layout),
    }
    layout
}

fn is_moved_to_main(instruction: &Instruction, variables: &Arena<Variable>) -> bool {
    match instruction {
        Instruction::Declare(id) => variables[*id].mode == VariableMode::Temporary,
        _ => true,
    }
}

/// take the global statements out of `linked` and clone those of the other units;
/// the result runs at the start of `main`, in unit order
fn collect_global_statements(
    linked: &mut Shader,
    units: &[Shader],
    main_unit: usize,
) -> Vec<Instruction> {
    let (moved, kept): (Vec<_>, Vec<_>) = linked
        .instructions
        .drain(..)
        .partition(|instruction| is_moved_to_main(instruction, &linked.variables));
    linked.instructions = kept;
    for instruction in &moved {
        if let Instruction::Declare(id) = *instruction {
            let name = &linked.variables[id].name;
            if linked.symbols.get_variable(name) == Some(id) {
                linked.symbols.remove_variable(name);
            }
        }
    }
    let mut retval = moved;
    for (unit_index, unit) in units.iter().enumerate() {
        if unit_index == main_unit {
            continue;
        }
        let statements: Vec<Instruction> = unit
            .instructions
            .iter()
            .filter(|instruction| is_moved_to_main(instruction, &unit.variables))
            .cloned()
            .collect();
        if statements.is_empty() {
            continue;
        }
        let mut remap = RemapTable::new();
        retval.extend(clone_from_unit(linked, unit, &mut remap, |cloner| {
            cloner.instructions(&statements)
        }));
    }
    retval
}

fn prepend_to_main(linked: &mut Shader, statements: Vec<Instruction>) {
    if statements.is_empty() {
        return;
    }
    let main = linked.function_mut("main").and_then(|function| {
        function
            .signatures
            .iter_mut()
            .find(|signature| signature.is_defined && signature.parameters.is_empty())
    });
    match main {
        Some(main) => {
            main.body.splice(0..0, statements);
        }
        None => linked.add_main(statements),
    }
}

fn subroutine_roots(units: &[Shader]) -> Vec<SignatureKey> {
    let mut retval = Vec::new();
    for unit in units {
        for function in &unit.functions {
            if function.subroutine_types.is_empty() {
                continue;
            }
            for signature in &function.signatures {
                if signature.is_defined {
                    retval.push(unit.signature_key(&function.name, signature));
                }
            }
        }
    }
    retval
}

/// link the compilation units of `stage`. The units are not modified; `None` when the
/// stage could not be linked, with the reasons in `diagnostics`.
pub fn link_intrastage_shaders(
    stage: ShaderStage,
    units: &[Shader],
    constants: &LinkerConstants,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) -> Option<LinkedShader> {
    let _span = tracing::debug_span!("link_intrastage_shaders", %stage, units = units.len())
        .entered();
    let initial_error_count = diagnostics.error_count();
    let has_new_errors =
        |diagnostics: &Diagnostics| diagnostics.error_count() > initial_error_count;
    let mut units = units.to_vec();
    {
        let mut unit_refs: Vec<&mut Shader> = units.iter_mut().collect();
        cross_validate_globals(&mut unit_refs, false, diagnostics);
    }
    if has_new_errors(diagnostics) {
        return None;
    }
    validate_intrastage_interface_blocks(&units, diagnostics);
    if has_new_errors(diagnostics) {
        return None;
    }
    check_duplicate_definitions(&units, diagnostics);
    if has_new_errors(diagnostics) {
        return None;
    }
    let main_unit = match units.iter().position(Shader::has_main) {
        Some(index) => index,
        None if options.allow_bodyless_link && !units.is_empty() => 0,
        None => {
            diagnostics.error(MissingMain {
                stage: stage.name(),
            });
            return None;
        }
    };
    let layout = link_layout_qualifiers(stage, &units, constants, diagnostics);
    if has_new_errors(diagnostics) {
        return None;
    }
    let mut linked = units[main_unit].clone();
    linked.name = format!("{} shader", stage);
    linked.version = units.iter().map(|unit| unit.version).max().unwrap_or(linked.version);
    linked.layout = layout;
    let statements = collect_global_statements(&mut linked, &units, main_unit);
    prepend_to_main(&mut linked, statements);
    if link_function_calls(&mut linked, &units, &subroutine_roots(&units), diagnostics).is_err() {
        return None;
    }
    detect_recursion(&linked, diagnostics);
    note_constant_array_accesses(&mut linked);
    size_stage_arrays(&mut linked, constants, diagnostics);
    fixup_array_sizes(&mut linked);
    let (uniform_blocks, shader_storage_blocks) =
        compute_stage_blocks(&linked, constants, options, diagnostics);
    tracing::debug!(
        globals = linked.globals().count(),
        functions = linked.functions.len(),
        "linked stage"
    );
    Some(LinkedShader {
        shader: linked,
        uniform_blocks,
        shader_storage_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LinkError;
    use glsl_linker_ir::{Constant, Expression, Signature, Type};

    fn call(name: &str) -> Instruction {
        Instruction::call(SignatureKey::new(name, Vec::new()), Vec::new())
    }

    fn link(stage: ShaderStage, units: &[Shader]) -> (Option<LinkedShader>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let linked = link_intrastage_shaders(
            stage,
            units,
            &LinkerConstants::default(),
            &LinkerOptions::default(),
            &mut diagnostics,
        );
        (linked, diagnostics)
    }

    #[test]
    fn test_link_two_units() {
        let mut a = Shader::new("a", ShaderStage::Vertex, 450, false);
        let position =
            a.add_global(Variable::new("gl_Position", Type::vec(4), VariableMode::ShaderOut));
        a.add_main(vec![call("compute_position")]);
        let tmp =
            a.add_global(Variable::new("init_tmp", Type::float(), VariableMode::Temporary));
        a.instructions.push(Instruction::assign(tmp, Constant::float(1.0)));
        let mut b = Shader::new("b", ShaderStage::Vertex, 450, false);
        let b_position =
            b.add_global(Variable::new("gl_Position", Type::vec(4), VariableMode::ShaderOut));
        let scale = b.add_global(Variable::new("scale", Type::float(), VariableMode::Auto));
        b.instructions.push(Instruction::assign(scale, Constant::float(2.0)));
        b.add_signature(
            "compute_position",
            Signature::new(
                Type::Void,
                Vec::new(),
                vec![Instruction::assign(
                    b_position,
                    Constant::vec(&[0.0, 0.0, 0.0, 1.0]),
                )],
            ),
        );
        let units = vec![a, b];
        let (linked, diagnostics) = link(ShaderStage::Vertex, &units);
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        let linked = linked.unwrap().shader;
        assert_eq!(linked.get_variable("gl_Position"), Some(position));
        assert!(linked.get_variable("scale").is_some());
        assert!(linked.get_variable("init_tmp").is_none());
        assert!(linked
            .instructions
            .iter()
            .all(|instruction| matches!(instruction, Instruction::Declare(_))));
        let main = linked.main_signature().unwrap();
        assert_eq!(main.body.len(), 4);
        assert!(matches!(main.body[0], Instruction::Declare(_)));
        assert_eq!(main.body[3], call("compute_position"));
        assert!(linked.function("compute_position").is_some());
        assert_eq!(units[0].functions.len(), 1);
    }

    #[test]
    fn test_multiply_defined_and_missing_main() {
        let mut a = Shader::new("a", ShaderStage::Fragment, 450, false);
        a.add_main(Vec::new());
        a.add_signature("f", Signature::new(Type::Void, Vec::new(), Vec::new()));
        let mut b = a.clone();
        b.name = "b".into();
        let (linked, diagnostics) = link(ShaderStage::Fragment, &[a, b]);
        assert!(linked.is_none());
        assert_eq!(
            diagnostics.info_log(),
            "error: function `main()' is multiply defined\n\
             error: function `f()' is multiply defined\n"
        );

        let mut c = Shader::new("c", ShaderStage::Fragment, 450, false);
        c.add_signature("f", Signature::new(Type::Void, Vec::new(), Vec::new()));
        let (linked, diagnostics) = link(ShaderStage::Fragment, &[c]);
        assert!(linked.is_none());
        assert_eq!(
            diagnostics.errors(),
            &[LinkError::from(MissingMain { stage: "fragment" })]
        );
    }

    #[test]
    fn test_geometry_layout_qualifiers() {
        let mut a = Shader::new("a", ShaderStage::Geometry, 450, false);
        a.layout.gs_input_primitive = Some(PrimitiveMode::Triangles);
        a.layout.gs_max_vertices = Some(3);
        a.add_main(Vec::new());
        let mut b = Shader::new("b", ShaderStage::Geometry, 450, false);
        b.layout.gs_input_primitive = Some(PrimitiveMode::Lines);
        let mut diagnostics = Diagnostics::new();
        let layout = link_layout_qualifiers(
            ShaderStage::Geometry,
            &[a, b],
            &LinkerConstants::default(),
            &mut diagnostics,
        );
        assert_eq!(
            diagnostics.info_log(),
            "error: geometry shader defined with conflicting input primitive type \
             (triangles and lines)\n\
             error: geometry shader didn't declare an output primitive type\n"
        );
        assert_eq!(layout.gs_invocations, Some(1));
    }

    #[test]
    fn test_compute_local_size() {
        let mut a = Shader::new("a", ShaderStage::Compute, 450, false);
        a.layout.cs_local_size = Some([2048, 1, 1]);
        let mut diagnostics = Diagnostics::new();
        link_layout_qualifiers(
            ShaderStage::Compute,
            &[a.clone()],
            &LinkerConstants::default(),
            &mut diagnostics,
        );
        assert_eq!(
            diagnostics.info_log(),
            "error: compute shader has an invalid local_size_x of 2048 (maximum 1024)\n\
             error: compute shader has an invalid local group invocation count of 2048 \
             (maximum 1024)\n"
        );

        a.layout.cs_local_size = Some([3, 2, 1]);
        a.layout.cs_derivative_group = DerivativeGroup::Quads;
        let mut diagnostics = Diagnostics::new();
        let layout = link_layout_qualifiers(
            ShaderStage::Compute,
            &[a],
            &LinkerConstants::default(),
            &mut diagnostics,
        );
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(layout.cs_derivative_group, DerivativeGroup::Quads);

        let mut diagnostics = Diagnostics::new();
        link_layout_qualifiers(
            ShaderStage::Compute,
            &[Shader::new("empty", ShaderStage::Compute, 450, false)],
            &LinkerConstants::default(),
            &mut diagnostics,
        );
        assert_eq!(
            diagnostics.info_log(),
            "error: compute shader didn't declare a local group size\n"
        );
    }

    #[test]
    fn test_fragcoord_redeclaration() {
        let mut a = Shader::new("a", ShaderStage::Fragment, 450, false);
        a.layout.redeclares_gl_fragcoord = true;
        a.layout.uses_gl_fragcoord = true;
        a.layout.origin_upper_left = true;
        let mut b = Shader::new("b", ShaderStage::Fragment, 450, false);
        b.layout.uses_gl_fragcoord = true;
        b.layout.early_fragment_tests = true;
        let mut diagnostics = Diagnostics::new();
        let layout = link_layout_qualifiers(
            ShaderStage::Fragment,
            &[a, b],
            &LinkerConstants::default(),
            &mut diagnostics,
        );
        assert_eq!(diagnostics.error_count(), 1);
        assert!(layout.origin_upper_left);
        assert!(layout.early_fragment_tests);
    }

    #[test]
    fn test_tess_defaults_and_range() {
        let mut tes = Shader::new("tes", ShaderStage::TessEval, 450, false);
        tes.layout.tes_primitive_mode = Some(PrimitiveMode::Triangles);
        let mut diagnostics = Diagnostics::new();
        let layout = link_layout_qualifiers(
            ShaderStage::TessEval,
            &[tes],
            &LinkerConstants::default(),
            &mut diagnostics,
        );
        assert!(diagnostics.link_status());
        assert_eq!(layout.tes_spacing, Some(TessSpacing::Equal));
        assert_eq!(layout.tes_vertex_order, Some(VertexOrder::Ccw));
        assert_eq!(layout.tes_point_mode, Some(false));

        let mut tcs = Shader::new("tcs", ShaderStage::TessControl, 450, false);
        tcs.layout.tcs_vertices_out = Some(40);
        let mut diagnostics = Diagnostics::new();
        link_layout_qualifiers(
            ShaderStage::TessControl,
            &[tcs],
            &LinkerConstants::default(),
            &mut diagnostics,
        );
        assert_eq!(
            diagnostics.info_log(),
            "error: tessellation control shader has an invalid output vertex count of 40 \
             (maximum 32)\n"
        );
    }

    #[test]
    fn test_bodyless_link() {
        let mut unit = Shader::new("a", ShaderStage::Vertex, 450, false);
        let x = unit.add_global(Variable::new("x", Type::float(), VariableMode::Auto));
        unit.instructions
            .push(Instruction::assign(x, Expression::from(Constant::float(1.0))));
        let mut diagnostics = Diagnostics::new();
        let options = LinkerOptions {
            allow_bodyless_link: true,
            ..LinkerOptions::default()
        };
        let linked = link_intrastage_shaders(
            ShaderStage::Vertex,
            &[unit],
            &LinkerConstants::default(),
            &options,
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(linked.shader.main_signature().unwrap().body.len(), 1);
    }
}
