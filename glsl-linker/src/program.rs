// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! whole-program linking
//!
//! Every stage is linked on its own first, then the stages are checked against each
//! other, their interfaces get locations and finally the program-wide resources are
//! allocated. A step that fails skips every step depending on it; the reasons end up in
//! [`LinkedProgram::info_log`].

use crate::atomics::{link_atomic_counters, AtomicBuffer};
use crate::block_layout::{check_combined_block_limits, merge_stage_blocks, UniformBlock};
use crate::diagnostics::Diagnostics;
use crate::global_validation::cross_validate_globals;
use crate::interface_blocks::{
    validate_interstage_inout_blocks, validate_interstage_uniform_blocks,
};
use crate::intrastage::{link_intrastage_shaders, LinkedShader};
use crate::locations::assign_attribute_or_color_locations;
use crate::options::{LinkerConstants, LinkerOptions, ProgramBindings, TransformFeedbackBufferMode};
use crate::subroutines::{link_subroutines, StageSubroutines};
use crate::uniforms::{link_uniforms, ResourceTable};
use crate::validate::{
    validate_clip_and_cull_distances, validate_fragment_shader, validate_invariant_builtins,
    validate_program_stages, validate_vertex_shader,
};
use crate::varyings::{assign_varying_locations, VaryingLayout};
use crate::xfb::{
    captured_variables, declarations_from_qualifiers, has_xfb_qualifiers, parse_declarations,
    resolve_declarations, store_transform_feedback_info, TransformFeedbackInfo, XfbDeclaration,
};
use glsl_linker_ir::{Shader, ShaderStage};
use hashbrown::HashSet;

/// one linked stage of a program
#[derive(Clone, Debug)]
pub struct ProgramStage {
    /// the stage's linked IR and its own blocks
    pub linked: LinkedShader,
    /// program-wide index of each of `linked.uniform_blocks`
    pub uniform_block_indexes: Vec<Option<usize>>,
    /// program-wide index of each of `linked.shader_storage_blocks`
    pub shader_storage_block_indexes: Vec<Option<usize>>,
    /// subroutine functions and uniforms
    pub subroutines: StageSubroutines,
}

impl ProgramStage {
    fn new(linked: LinkedShader) -> Self {
        Self {
            linked,
            uniform_block_indexes: Vec::new(),
            shader_storage_block_indexes: Vec::new(),
            subroutines: StageSubroutines::default(),
        }
    }
    pub fn stage(&self) -> ShaderStage {
        self.linked.stage()
    }
    pub fn shader(&self) -> &Shader {
        &self.linked.shader
    }
}

/// the varyings crossing one stage boundary; a missing side is the outside of a
/// separable program
#[derive(Clone, Debug)]
pub struct StageInterface {
    pub producer: Option<ShaderStage>,
    pub consumer: Option<ShaderStage>,
    pub layout: VaryingLayout,
}

/// the result of [`link_program`]
#[derive(Clone, Debug, Default)]
pub struct LinkedProgram {
    /// linked stages in pipeline order
    pub stages: Vec<ProgramStage>,
    /// varying layouts in pipeline order
    pub interfaces: Vec<StageInterface>,
    /// set when transform feedback captures anything
    pub transform_feedback: Option<TransformFeedbackInfo>,
    /// program-wide uniform blocks
    pub uniform_blocks: Vec<UniformBlock>,
    /// program-wide shader storage blocks
    pub shader_storage_blocks: Vec<UniformBlock>,
    pub uniforms: ResourceTable,
    pub atomic_buffers: Vec<AtomicBuffer>,
    pub diagnostics: Diagnostics,
}

impl LinkedProgram {
    /// `true` when the program linked without errors
    pub fn link_status(&self) -> bool {
        self.diagnostics.link_status()
    }
    pub fn info_log(&self) -> &str {
        self.diagnostics.info_log()
    }
    pub fn stage(&self, stage: ShaderStage) -> Option<&ProgramStage> {
        self.stages.iter().find(|linked| linked.stage() == stage)
    }
    pub fn shader(&self, stage: ShaderStage) -> Option<&Shader> {
        self.stage(stage).map(ProgramStage::shader)
    }
}

/// the resolved transform feedback request
struct XfbRequest {
    stage_index: usize,
    declarations: Vec<XfbDeclaration>,
    buffer_mode: TransformFeedbackBufferMode,
    explicit: bool,
}

/// the stages whose outputs transform feedback can capture
fn is_last_vertex_processing_candidate(stage: ShaderStage) -> bool {
    match stage {
        ShaderStage::Vertex | ShaderStage::TessEval | ShaderStage::Geometry => true,
        ShaderStage::TessControl | ShaderStage::Fragment | ShaderStage::Compute => false,
    }
}

fn continue_if_linked(diagnostics: &Diagnostics) -> Option<()> {
    diagnostics.link_status().then_some(())
}

fn validate_stage(shader: &Shader, constants: &LinkerConstants, diagnostics: &mut Diagnostics) {
    match shader.stage {
        ShaderStage::Vertex => validate_vertex_shader(shader, diagnostics),
        ShaderStage::Fragment => validate_fragment_shader(shader, diagnostics),
        _ => {}
    }
    validate_clip_and_cull_distances(shader, constants, diagnostics);
}

fn resolve_transform_feedback(
    stages: &[ProgramStage],
    bindings: &ProgramBindings,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> Option<Option<XfbRequest>> {
    let stage_index = match stages
        .iter()
        .rposition(|stage| is_last_vertex_processing_candidate(stage.stage()))
    {
        Some(stage_index) => stage_index,
        None => return Some(None),
    };
    let shader = stages[stage_index].shader();
    let explicit = has_xfb_qualifiers(shader);
    let (mut declarations, buffer_mode) = if explicit {
        (
            declarations_from_qualifiers(shader),
            TransformFeedbackBufferMode::Interleaved,
        )
    } else {
        (
            parse_declarations(&bindings.transform_feedback_varyings),
            bindings.transform_feedback_buffer_mode,
        )
    };
    if declarations.is_empty() {
        return Some(None);
    }
    if !resolve_declarations(&mut declarations, shader, buffer_mode, constants, diagnostics) {
        return None;
    }
    tracing::debug!(
        stage = %shader.stage.name(),
        declarations = declarations.len(),
        explicit,
        "transform feedback"
    );
    Some(Some(XfbRequest {
        stage_index,
        declarations,
        buffer_mode,
        explicit,
    }))
}

fn link_varyings(
    stages: &mut [ProgramStage],
    xfb: Option<&XfbRequest>,
    constants: &LinkerConstants,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<StageInterface>> {
    let captured = xfb.map_or_else(HashSet::new, |xfb| {
        captured_variables(&xfb.declarations, stages[xfb.stage_index].shader())
    });
    let not_captured = HashSet::new();
    let captured_by = |stage_index: usize| {
        if xfb.map_or(false, |xfb| xfb.stage_index == stage_index) {
            &captured
        } else {
            &not_captured
        }
    };
    let vec3_packing_allowed = !xfb.map_or(false, |xfb| {
        xfb.buffer_mode == TransformFeedbackBufferMode::Separate
            && xfb.declarations.iter().any(XfbDeclaration::is_varying)
    });
    let mut interfaces = Vec::with_capacity(stages.len() + 1);
    if options.separable {
        if let Some(first) = stages.first_mut() {
            if !matches!(first.stage(), ShaderStage::Vertex | ShaderStage::Compute) {
                let layout = assign_varying_locations(
                    None,
                    Some(&mut first.linked.shader),
                    &not_captured,
                    vec3_packing_allowed,
                    constants,
                    options,
                    diagnostics,
                )?;
                interfaces.push(StageInterface {
                    producer: None,
                    consumer: Some(first.stage()),
                    layout,
                });
            }
        }
    }
    for consumer_index in 1..stages.len() {
        let (head, tail) = stages.split_at_mut(consumer_index);
        let producer = &mut head[consumer_index - 1].linked.shader;
        let consumer = &mut tail[0].linked.shader;
        let producer_stage = producer.stage;
        let consumer_stage = consumer.stage;
        let layout = assign_varying_locations(
            Some(producer),
            Some(consumer),
            captured_by(consumer_index - 1),
            vec3_packing_allowed,
            constants,
            options,
            diagnostics,
        )?;
        interfaces.push(StageInterface {
            producer: Some(producer_stage),
            consumer: Some(consumer_stage),
            layout,
        });
    }
    let last_index = stages.len().saturating_sub(1);
    if let Some(last) = stages.last_mut() {
        if !matches!(last.stage(), ShaderStage::Fragment | ShaderStage::Compute) {
            let layout = assign_varying_locations(
                Some(&mut last.linked.shader),
                None,
                captured_by(last_index),
                vec3_packing_allowed,
                constants,
                options,
                diagnostics,
            )?;
            interfaces.push(StageInterface {
                producer: Some(last.stage()),
                consumer: None,
                layout,
            });
        }
    }
    Some(interfaces)
}

fn link_resources(
    program: &mut LinkedProgram,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) {
    for stage in &mut program.stages {
        stage.uniform_block_indexes = merge_stage_blocks(
            &mut program.uniform_blocks,
            &stage.linked.uniform_blocks,
            diagnostics,
        );
        stage.shader_storage_block_indexes = merge_stage_blocks(
            &mut program.shader_storage_blocks,
            &stage.linked.shader_storage_blocks,
            diagnostics,
        );
    }
    check_combined_block_limits(
        &program.uniform_blocks,
        &program.shader_storage_blocks,
        constants,
        diagnostics,
    );
    let shaders: Vec<&Shader> = program.stages.iter().map(ProgramStage::shader).collect();
    program.uniforms = link_uniforms(
        &shaders,
        &program.uniform_blocks,
        &program.shader_storage_blocks,
        constants,
        diagnostics,
    );
    program.atomic_buffers = link_atomic_counters(&mut program.uniforms, constants, diagnostics);
    for stage in &mut program.stages {
        stage.subroutines = link_subroutines(stage.shader(), constants, diagnostics);
    }
}

fn link(
    program: &mut LinkedProgram,
    units: &[Shader],
    bindings: &ProgramBindings,
    constants: &LinkerConstants,
    options: &LinkerOptions,
    diagnostics: &mut Diagnostics,
) -> Option<()> {
    let unit_refs: Vec<&Shader> = units.iter().collect();
    if !validate_program_stages(&unit_refs, options.separable, diagnostics) {
        return None;
    }
    for stage in ShaderStage::ALL {
        let stage_units: Vec<Shader> = units
            .iter()
            .filter(|unit| unit.stage == stage)
            .cloned()
            .collect();
        if stage_units.is_empty() {
            continue;
        }
        if let Some(linked) =
            link_intrastage_shaders(stage, &stage_units, constants, options, diagnostics)
        {
            validate_stage(&linked.shader, constants, diagnostics);
            program.stages.push(ProgramStage::new(linked));
        }
    }
    continue_if_linked(diagnostics)?;
    {
        let mut shaders: Vec<&mut Shader> = program
            .stages
            .iter_mut()
            .map(|stage| &mut stage.linked.shader)
            .collect();
        cross_validate_globals(&mut shaders, true, diagnostics);
    }
    let shaders: Vec<&Shader> = program.stages.iter().map(ProgramStage::shader).collect();
    validate_interstage_uniform_blocks(&shaders, diagnostics);
    for pair in shaders.windows(2) {
        let (producer, consumer) = (pair[0], pair[1]);
        validate_interstage_inout_blocks(producer, consumer, diagnostics);
        if consumer.stage == ShaderStage::Fragment {
            validate_invariant_builtins(Some(producer), consumer, diagnostics);
        }
    }
    if let Some(&first) = shaders.first() {
        if first.stage == ShaderStage::Fragment {
            validate_invariant_builtins(None, first, diagnostics);
        }
    }
    continue_if_linked(diagnostics)?;
    for stage in &mut program.stages {
        assign_attribute_or_color_locations(
            &mut stage.linked.shader,
            bindings,
            constants,
            diagnostics,
        );
    }
    let xfb = resolve_transform_feedback(&program.stages, bindings, constants, diagnostics)?;
    program.interfaces = link_varyings(
        &mut program.stages,
        xfb.as_ref(),
        constants,
        options,
        diagnostics,
    )?;
    if let Some(xfb) = &xfb {
        program.transform_feedback = Some(store_transform_feedback_info(
            &xfb.declarations,
            program.stages[xfb.stage_index].shader(),
            xfb.buffer_mode,
            xfb.explicit,
            constants,
            diagnostics,
        )?);
    }
    continue_if_linked(diagnostics)?;
    link_resources(program, constants, diagnostics);
    continue_if_linked(diagnostics)
}

/// link the compilation units of a program. Units of the same stage are linked together;
/// the stages present decide which interfaces are matched.
pub fn link_program(
    units: &[Shader],
    bindings: &ProgramBindings,
    constants: &LinkerConstants,
    options: &LinkerOptions,
) -> LinkedProgram {
    let _span = tracing::debug_span!("link_program", units = units.len()).entered();
    let mut program = LinkedProgram::default();
    let mut diagnostics = Diagnostics::new();
    let linked = link(
        &mut program,
        units,
        bindings,
        constants,
        options,
        &mut diagnostics,
    )
    .is_some();
    program.diagnostics = diagnostics;
    tracing::debug!(linked, stages = program.stages.len(), "linked program");
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{LinkError, NoShadersAttached};
    use glsl_linker_ir::{Constant, Instruction, Type, Variable, VariableMode};

    fn link_default(units: &[Shader]) -> LinkedProgram {
        link_program(
            units,
            &ProgramBindings::default(),
            &LinkerConstants::default(),
            &LinkerOptions::default(),
        )
    }

    fn vertex_shader(outputs: &[&str]) -> Shader {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let position =
            vs.add_global(Variable::new("gl_Position", Type::vec(4), VariableMode::ShaderOut));
        let mut body = vec![Instruction::assign(
            position,
            Constant::vec(&[0.0, 0.0, 0.0, 1.0]),
        )];
        for &name in outputs {
            let output = vs.add_global(Variable::new(name, Type::vec(4), VariableMode::ShaderOut));
            body.push(Instruction::assign(output, Constant::vec(&[1.0; 4])));
        }
        vs.add_main(body);
        vs
    }

    fn fragment_shader(inputs: &[&str]) -> Shader {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        let color = fs.add_global(Variable::new("color", Type::vec(4), VariableMode::ShaderOut));
        let mut body = Vec::new();
        for &name in inputs {
            let mut input = Variable::new(name, Type::vec(4), VariableMode::ShaderIn);
            input.data.used = true;
            let input = fs.add_global(input);
            body.push(Instruction::assign(color, input));
        }
        fs.add_main(body);
        fs
    }

    #[test]
    fn test_no_shaders() {
        let program = link_default(&[]);
        assert!(!program.link_status());
        assert_eq!(
            program.diagnostics.errors(),
            &[LinkError::from(NoShadersAttached)]
        );
        assert!(program.stages.is_empty());
    }

    #[test]
    fn test_vertex_fragment() {
        let program = link_default(&[fragment_shader(&["a"]), vertex_shader(&["a", "b"])]);
        assert!(program.link_status(), "{}", program.info_log());
        let stages: Vec<_> = program.stages.iter().map(ProgramStage::stage).collect();
        assert_eq!(stages, [ShaderStage::Vertex, ShaderStage::Fragment]);
        assert_eq!(program.interfaces.len(), 1);
        let layout = &program.interfaces[0].layout;
        assert_eq!(layout.demoted_outputs, ["b"]);
        let fs = program.shader(ShaderStage::Fragment).unwrap();
        assert_eq!(fs.variable("color").unwrap().data.location, 0);
        assert!(program.transform_feedback.is_none());
    }

    #[test]
    fn test_vertex_only_with_transform_feedback() {
        let mut bindings = ProgramBindings::default();
        bindings.transform_feedback_varyings = vec!["a".into(), "gl_Position".into()];
        let program = link_program(
            &[vertex_shader(&["a", "b"])],
            &bindings,
            &LinkerConstants::default(),
            &LinkerOptions::default(),
        );
        assert!(program.link_status(), "{}", program.info_log());
        let interface = &program.interfaces[0];
        assert_eq!(interface.producer, Some(ShaderStage::Vertex));
        assert_eq!(interface.consumer, None);
        assert_eq!(interface.layout.demoted_outputs, ["b"]);
        let info = program.transform_feedback.as_ref().unwrap();
        assert_eq!(info.varyings.len(), 2);
        assert_eq!(info.buffers[0].stride, 32);
    }

    #[test]
    fn test_unknown_transform_feedback_varying() {
        let mut bindings = ProgramBindings::default();
        bindings.transform_feedback_varyings = vec!["missing".into()];
        let program = link_program(
            &[vertex_shader(&[]), fragment_shader(&[])],
            &bindings,
            &LinkerConstants::default(),
            &LinkerOptions::default(),
        );
        assert!(!program.link_status());
        assert!(program.interfaces.is_empty());
        assert!(program.transform_feedback.is_none());
    }

    #[test]
    fn test_stage_failure_skips_later_steps() {
        let mut vs = vertex_shader(&[]);
        vs.functions.clear();
        let program = link_default(&[vs, fragment_shader(&[])]);
        assert!(!program.link_status());
        assert!(program.stages.iter().all(|stage| stage.stage() != ShaderStage::Vertex));
        assert!(program.interfaces.is_empty());
    }

    #[test]
    fn test_uniforms_across_stages() {
        let mut vs = vertex_shader(&[]);
        vs.add_global(Variable::new("scale", Type::float(), VariableMode::Uniform));
        let mut fs = fragment_shader(&[]);
        fs.add_global(Variable::new("scale", Type::float(), VariableMode::Uniform));
        fs.add_global(Variable::new("tint", Type::vec(4), VariableMode::Uniform));
        let program = link_default(&[vs, fs]);
        assert!(program.link_status(), "{}", program.info_log());
        let scale = program.uniforms.find("scale").unwrap();
        assert_eq!(scale.active_shader_mask, 0b10001);
        assert!(program.uniforms.find("tint").is_some());
        assert_eq!(program.uniforms.remap_table.len(), 2);
    }
}
