// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! checks on built-in variables and on the set of stages making up a program

use crate::diagnostics::Diagnostics;
use crate::errors::{
    ClipCullDistanceTooLarge, ClipVertexAndDistance, ComputeLinkedWithOtherStages,
    FragColorAndFragData, InvariantBuiltinMismatch, InvariantFrontFacing,
    MismatchedShadingLanguageVersion, NoShadersAttached, PositionNotWritten, ProgramLacksStage,
    StageRequiresStage,
};
use crate::options::LinkerConstants;
use glsl_linker_ir::visit::for_each_variable_access;
use glsl_linker_ir::{Instruction, Shader, ShaderStage};

/// `true` if anything in `shader` writes global `name`
pub(crate) fn is_written(shader: &Shader, name: &str) -> bool {
    let id = match shader.get_variable(name) {
        Some(id) => id,
        None => return false,
    };
    if shader.variables[id].data.assigned {
        return true;
    }
    let mut written = false;
    let mut visit = |instructions: &[Instruction]| {
        for_each_variable_access(instructions, |variable, access| {
            written |= variable == id && access.may_write();
        })
    };
    visit(&shader.instructions);
    for function in &shader.functions {
        for signature in &function.signatures {
            visit(&signature.body);
        }
    }
    written
}

fn is_invariant(shader: &Shader, name: &str) -> bool {
    shader
        .variable(name)
        .map_or(false, |variable| variable.data.invariant)
}

/// invariant fragment inputs need invariant producer outputs; `gl_FrontFacing` is never
/// invariant
pub fn validate_invariant_builtins(
    producer: Option<&Shader>,
    fragment: &Shader,
    diagnostics: &mut Diagnostics,
) {
    if is_invariant(fragment, "gl_FrontFacing") {
        diagnostics.error(InvariantFrontFacing);
    }
    let producer = match producer {
        Some(producer) => producer,
        None => return,
    };
    for &(input, output) in &[("gl_FragCoord", "gl_Position"), ("gl_PointCoord", "gl_PointSize")]
    {
        if is_invariant(fragment, input) && !is_invariant(producer, output) {
            diagnostics.error(InvariantBuiltinMismatch {
                stage: fragment.stage.name(),
                input,
                producer_stage: producer.stage.name(),
                output,
            });
        }
    }
}

/// `gl_ClipVertex` excludes `gl_ClipDistance` and `gl_CullDistance`, whose combined size is
/// limited
pub fn validate_clip_and_cull_distances(
    shader: &Shader,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) {
    match shader.stage {
        ShaderStage::Fragment | ShaderStage::Compute => return,
        _ => {}
    }
    if !shader.is_es && is_written(shader, "gl_ClipVertex") {
        for &other in &["gl_ClipDistance", "gl_CullDistance"] {
            if is_written(shader, other) {
                diagnostics.error(ClipVertexAndDistance {
                    stage: shader.stage.name(),
                    other,
                });
            }
        }
    }
    let array_size = |name: &str| {
        shader
            .variable(name)
            .filter(|_| is_written(shader, name))
            .map_or(0, |variable| {
                let t = if shader.stage.has_per_vertex_outputs() {
                    variable
                        .var_type
                        .element_type()
                        .unwrap_or(&variable.var_type)
                } else {
                    &variable.var_type
                };
                t.array_size().unwrap_or(0)
            })
    };
    let size = array_size("gl_ClipDistance") + array_size("gl_CullDistance");
    if size > constants.max_combined_clip_and_cull_distances {
        diagnostics.error(ClipCullDistanceTooLarge {
            stage: shader.stage.name(),
            size,
            max: constants.max_combined_clip_and_cull_distances,
        });
    }
}

/// a vertex shader has to write `gl_Position`; only a warning from GLSL 1.40 and GLSL ES
/// 3.00 on
pub fn validate_vertex_shader(shader: &Shader, diagnostics: &mut Diagnostics) {
    if shader.stage != ShaderStage::Vertex || is_written(shader, "gl_Position") {
        return;
    }
    let as_warning = shader.is_version(140, 300);
    if as_warning {
        tracing::warn!(shader = %shader.name, "vertex shader does not write gl_Position");
    }
    diagnostics.error_or_warning(
        as_warning,
        PositionNotWritten {
            stage: shader.stage.name(),
        },
    );
}

/// `gl_FragColor` and `gl_FragData` are exclusive
pub fn validate_fragment_shader(shader: &Shader, diagnostics: &mut Diagnostics) {
    if shader.stage == ShaderStage::Fragment
        && is_written(shader, "gl_FragColor")
        && is_written(shader, "gl_FragData")
    {
        diagnostics.error(FragColorAndFragData);
    }
}

fn version_string(shader: &Shader) -> String {
    if shader.is_es {
        format!("{} es", shader.version)
    } else {
        shader.version.to_string()
    }
}

/// checks on the compilation units handed to the linker before anything is linked:
/// GLSL ES can't be mixed with desktop GLSL and GLSL ES versions must be equal, compute
/// stands alone and some stages need others. `false` when the program can't be linked.
pub fn validate_program_stages(
    units: &[&Shader],
    separable: bool,
    diagnostics: &mut Diagnostics,
) -> bool {
    let first = match units.first() {
        Some(first) => first,
        None => {
            diagnostics.error(NoShadersAttached);
            return false;
        }
    };
    if let Some(other) = units.iter().find(|unit| {
        unit.is_es != first.is_es || (unit.is_es && unit.version != first.version)
    }) {
        diagnostics.error(MismatchedShadingLanguageVersion {
            first: version_string(first),
            second: version_string(other),
        });
        return false;
    }
    let is_es = first.is_es;
    let es_version = first.version;
    let mut present = [false; ShaderStage::COUNT];
    for unit in units {
        present[unit.stage.index()] = true;
    }
    let has = |stage: ShaderStage| present[stage.index()];
    let initial_error_count = diagnostics.error_count();
    if has(ShaderStage::Compute) {
        if present.iter().filter(|&&present| present).count() > 1 {
            diagnostics.error(ComputeLinkedWithOtherStages);
        }
        return diagnostics.error_count() == initial_error_count;
    }
    if !separable {
        if has(ShaderStage::TessControl) && !has(ShaderStage::TessEval) {
            diagnostics.error(StageRequiresStage {
                stage: ShaderStage::TessControl.name(),
                required: ShaderStage::TessEval.name(),
            });
        }
        if !has(ShaderStage::Vertex) && !(is_es && es_version >= 310) {
            for stage in [
                ShaderStage::TessControl,
                ShaderStage::TessEval,
                ShaderStage::Geometry,
            ] {
                if has(stage) {
                    diagnostics.error(StageRequiresStage {
                        stage: stage.name(),
                        required: ShaderStage::Vertex.name(),
                    });
                }
            }
        }
        if is_es {
            for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
                if !has(stage) {
                    diagnostics.error(ProgramLacksStage {
                        stage: stage.name(),
                    });
                }
            }
        }
    }
    diagnostics.error_count() == initial_error_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LinkError;
    use glsl_linker_ir::{Constant, Type, Variable, VariableMode};

    fn write_builtin(shader: &mut Shader, name: &str, t: Type) {
        let id = shader.add_global(Variable::new(name, t, VariableMode::ShaderOut));
        shader.add_main(vec![Instruction::assign(id, Constant::float(1.0))]);
    }

    #[test]
    fn test_position_not_written() {
        let old = Shader::new("vs", ShaderStage::Vertex, 130, false);
        let mut diagnostics = Diagnostics::new();
        validate_vertex_shader(&old, &mut diagnostics);
        assert_eq!(
            diagnostics.info_log(),
            "error: vertex shader does not write to `gl_Position'\n"
        );
        let new = Shader::new("vs", ShaderStage::Vertex, 300, true);
        let mut diagnostics = Diagnostics::new();
        validate_vertex_shader(&new, &mut diagnostics);
        assert!(diagnostics.link_status());
        assert_eq!(diagnostics.warnings().len(), 1);
        let mut written = Shader::new("vs", ShaderStage::Vertex, 130, false);
        write_builtin(&mut written, "gl_Position", Type::vec(4));
        let mut diagnostics = Diagnostics::new();
        validate_vertex_shader(&written, &mut diagnostics);
        assert!(diagnostics.link_status());
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_frag_color_and_frag_data() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 120, false);
        let color = fs.add_global(Variable::new(
            "gl_FragColor",
            Type::vec(4),
            VariableMode::ShaderOut,
        ));
        let mut data =
            Variable::new("gl_FragData", Type::array(Type::vec(4), 8), VariableMode::ShaderOut);
        data.data.assigned = true;
        fs.add_global(data);
        fs.add_main(vec![Instruction::assign(color, Constant::vec(&[0.0; 4]))]);
        let mut diagnostics = Diagnostics::new();
        validate_fragment_shader(&fs, &mut diagnostics);
        assert_eq!(diagnostics.errors(), &[LinkError::from(FragColorAndFragData)]);
    }

    #[test]
    fn test_clip_vertex_and_distances() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        for (name, t) in [
            ("gl_ClipVertex", Type::vec(4)),
            ("gl_ClipDistance", Type::array(Type::float(), 6)),
            ("gl_CullDistance", Type::array(Type::float(), 4)),
        ] {
            let mut variable = Variable::new(name, t, VariableMode::ShaderOut);
            variable.data.assigned = true;
            vs.add_global(variable);
        }
        let mut diagnostics = Diagnostics::new();
        validate_clip_and_cull_distances(&vs, &LinkerConstants::default(), &mut diagnostics);
        assert_eq!(
            diagnostics.info_log(),
            "error: vertex shader writes to both `gl_ClipVertex' and `gl_ClipDistance'\n\
             error: vertex shader writes to both `gl_ClipVertex' and `gl_CullDistance'\n\
             error: vertex shader: the combined size of `gl_ClipDistance' and \
             `gl_CullDistance' size cannot be larger than gl_MaxCombinedClipAndCullDistances \
             (10 > 8)\n"
        );
    }

    #[test]
    fn test_invariant_builtins() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 100, true);
        vs.add_global(Variable::new("gl_Position", Type::vec(4), VariableMode::ShaderOut));
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 100, true);
        for name in ["gl_FragCoord", "gl_FrontFacing"] {
            let mut variable = Variable::new(name, Type::vec(4), VariableMode::ShaderIn);
            variable.data.invariant = true;
            fs.add_global(variable);
        }
        let mut diagnostics = Diagnostics::new();
        validate_invariant_builtins(Some(&vs), &fs, &mut diagnostics);
        assert_eq!(
            diagnostics.errors(),
            &[
                LinkError::from(InvariantFrontFacing),
                InvariantBuiltinMismatch {
                    stage: "fragment",
                    input: "gl_FragCoord",
                    producer_stage: "vertex",
                    output: "gl_Position",
                }
                .into(),
            ]
        );
    }

    fn stages(stages: &[(ShaderStage, u32, bool)], separable: bool) -> Diagnostics {
        let units: Vec<Shader> = stages
            .iter()
            .map(|&(stage, version, is_es)| Shader::new("unit", stage, version, is_es))
            .collect();
        let units: Vec<&Shader> = units.iter().collect();
        let mut diagnostics = Diagnostics::new();
        validate_program_stages(&units, separable, &mut diagnostics);
        diagnostics
    }

    #[test]
    fn test_program_stages() {
        use ShaderStage::*;
        assert_eq!(
            stages(&[], false).info_log(),
            "error: no shaders attached to the program\n"
        );
        assert_eq!(
            stages(&[(Vertex, 300, true), (Fragment, 450, false)], false).info_log(),
            "error: all shaders must use same shading language version (300 es and 450)\n"
        );
        assert_eq!(
            stages(&[(Compute, 450, false), (Vertex, 450, false)], false).info_log(),
            "error: compute shaders may not be linked with any other type of shader\n"
        );
        assert_eq!(
            stages(&[(TessControl, 450, false), (Fragment, 450, false)], false).info_log(),
            "error: tessellation control shader must be linked with tessellation evaluation \
             shader\n\
             error: tessellation control shader must be linked with vertex shader\n"
        );
        assert!(stages(&[(TessEval, 450, false)], true).link_status());
        assert!(stages(&[(Vertex, 450, false), (TessEval, 450, false)], false).link_status());
        assert_eq!(
            stages(&[(Vertex, 300, true)], false).info_log(),
            "error: program lacks a fragment shader\n"
        );
        assert!(stages(&[(Vertex, 300, true)], true).link_status());
    }
}
