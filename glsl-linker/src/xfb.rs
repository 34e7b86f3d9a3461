// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! transform feedback: the capture list, its resolution against the outputs of the last
//! stage before rasterization, and the buffer layout of the captured values
//!
//! Offsets inside varyings and buffers are counted in 32-bit components ("floats") unless
//! a name says bytes.

use crate::diagnostics::Diagnostics;
use crate::errors::{
    TransformFeedbackAliasing, TransformFeedbackBuffersExceeded,
    TransformFeedbackIndexOutOfBounds, TransformFeedbackInterleavedComponentsExceeded,
    TransformFeedbackInvalidInSeparateMode, TransformFeedbackMixedStreams,
    TransformFeedbackOffsetOverflowsStride, TransformFeedbackSeparateComponentsExceeded,
    TransformFeedbackStrideMisaligned, TransformFeedbackStrideTooLarge,
    TransformFeedbackSubscriptOnNonArray, TransformFeedbackVaryingDuplicated,
    TransformFeedbackVaryingUndefined,
};
use crate::options::{LinkerConstants, TransformFeedbackBufferMode};
use fixedbitset::FixedBitSet;
use glsl_linker_ir::{Shader, Type, VariableId, VariableMode, MAX_FEEDBACK_BUFFERS};
use hashbrown::{HashMap, HashSet};
use std::cmp::Ordering;

/// a capturable leaf of an output variable
#[derive(Clone, Debug, PartialEq)]
pub struct XfbCandidate {
    /// the output variable
    pub variable: VariableId,
    /// the leaf type; arrays of non-aggregates stay whole
    pub var_type: Type,
    /// offset from the start of the variable
    pub offset: u32,
    /// buffer from `xfb_buffer`
    pub xfb_buffer: u32,
    /// byte offset from `xfb_offset`
    pub xfb_offset: Option<u32>,
}

/// what a declaration asks for
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum XfbDeclarationKind {
    /// capture a varying
    Varying,
    /// `gl_NextBuffer`
    NextBuffer,
    /// `gl_SkipComponentsN`
    SkipComponents(u32),
}

/// one requested capture
#[derive(Clone, Debug, PartialEq)]
pub struct XfbDeclaration {
    /// the name as requested
    pub orig_name: String,
    /// the name without the trailing subscript
    pub var_name: String,
    /// the trailing `[index]`
    pub array_subscript: Option<u32>,
    /// what is asked for
    pub kind: XfbDeclarationKind,
    /// the candidate the name resolved to
    pub matched: Option<XfbCandidate>,
    /// captured components
    pub num_components: u32,
    /// captured array elements, 1 for non-arrays
    pub size: u32,
    /// the captured type, the element type for arrays
    pub element_type: Type,
    /// offset of the first captured component inside the variable
    pub offset_in_variable: u32,
    /// buffer given by `xfb_buffer`
    pub buffer: u32,
    /// byte offset given by `xfb_offset`
    pub explicit_offset: Option<u32>,
    /// vertex stream of the captured variable
    pub stream: u32,
}

impl XfbDeclaration {
    /// parse one entry of the capture list
    pub fn parse(name: &str) -> Self {
        let kind = if name == "gl_NextBuffer" {
            XfbDeclarationKind::NextBuffer
        } else {
            match name
                .strip_prefix("gl_SkipComponents")
                .and_then(|count| count.parse::<u32>().ok())
            {
                Some(count @ 1..=4) => XfbDeclarationKind::SkipComponents(count),
                _ => XfbDeclarationKind::Varying,
            }
        };
        let (var_name, array_subscript) = match parse_subscript(name) {
            Some((base, index)) => (base.to_string(), Some(index)),
            None => (name.to_string(), None),
        };
        Self {
            orig_name: name.to_string(),
            var_name,
            array_subscript,
            kind,
            matched: None,
            num_components: 0,
            size: 0,
            element_type: Type::Void,
            offset_in_variable: 0,
            buffer: 0,
            explicit_offset: None,
            stream: 0,
        }
    }
    pub fn is_varying(&self) -> bool {
        self.kind == XfbDeclarationKind::Varying
    }
}

/// split `name[index]`
fn parse_subscript(name: &str) -> Option<(&str, u32)> {
    let inner = name.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let index = inner[open + 1..].parse().ok()?;
    Some((&inner[..open], index))
}

/// parse the capture list given through the API
pub fn parse_declarations(names: &[String]) -> Vec<XfbDeclaration> {
    names.iter().map(|name| XfbDeclaration::parse(name)).collect()
}

struct CandidateBuilder<'a> {
    candidates: &'a mut HashMap<String, XfbCandidate>,
    variable: VariableId,
    offset: u32,
}

impl CandidateBuilder<'_> {
    fn add(&mut self, name: String, t: &Type, xfb_buffer: u32, xfb_offset: Option<u32>) {
        let start = self.offset;
        let derived = |offset: u32| xfb_offset.map(|base| base + (offset - start) * 4);
        match t {
            Type::Struct(struct_type) => {
                for field in &struct_type.fields {
                    let field_offset = derived(self.offset);
                    self.add(
                        format!("{}.{}", name, field.name),
                        &field.field_type,
                        xfb_buffer,
                        field_offset,
                    );
                }
            }
            Type::Interface(interface_type) => {
                for field in &interface_type.fields {
                    let field_offset = field.xfb_offset.or_else(|| derived(self.offset));
                    self.add(
                        format!("{}.{}", name, field.name),
                        &field.field_type,
                        field.xfb_buffer.unwrap_or(xfb_buffer),
                        field_offset,
                    );
                }
            }
            Type::Array { element, length }
                if element.without_array().is_record()
                    || element.without_array().is_interface() =>
            {
                for index in 0..length.unwrap_or(0) {
                    let element_offset = derived(self.offset);
                    self.add(
                        format!("{}[{}]", name, index),
                        element,
                        xfb_buffer,
                        element_offset,
                    );
                }
            }
            _ => {
                self.candidates.insert(
                    name,
                    XfbCandidate {
                        variable: self.variable,
                        var_type: t.clone(),
                        offset: self.offset,
                        xfb_buffer,
                        xfb_offset,
                    },
                );
                self.offset += t.component_slots();
            }
        }
    }
}

/// every capturable name of the outputs of `shader`
pub fn build_candidates(shader: &Shader) -> HashMap<String, XfbCandidate> {
    let mut candidates = HashMap::new();
    for id in shader.globals() {
        let variable = &shader.variables[id];
        if variable.mode != VariableMode::ShaderOut {
            continue;
        }
        let name = if variable.is_interface_instance() {
            variable.interface_name().unwrap_or(variable.name.as_str())
        } else {
            &variable.name
        };
        let xfb_offset = if variable.data.explicit_xfb_offset {
            Some(variable.data.xfb_offset)
        } else {
            None
        };
        CandidateBuilder {
            candidates: &mut candidates,
            variable: id,
            offset: 0,
        }
        .add(
            name.to_string(),
            &variable.var_type,
            variable.data.xfb_buffer,
            xfb_offset,
        );
    }
    candidates
}

/// `true` when the outputs of `shader` carry `xfb_*` layout qualifiers; those take the
/// place of the capture list given through the API
pub fn has_xfb_qualifiers(shader: &Shader) -> bool {
    shader.layout.xfb_stride.iter().any(Option::is_some)
        || shader.globals().any(|id| {
            let variable = &shader.variables[id];
            variable.mode == VariableMode::ShaderOut
                && (variable.data.explicit_xfb_buffer
                    || variable.data.explicit_xfb_offset
                    || variable.data.explicit_xfb_stride
                    || variable.interface_type.as_ref().map_or(false, |interface| {
                        interface
                            .fields
                            .iter()
                            .any(|field| field.xfb_offset.is_some())
                    }))
        })
}

/// the declarations implied by `xfb_offset` qualifiers, by buffer then offset
pub fn declarations_from_qualifiers(shader: &Shader) -> Vec<XfbDeclaration> {
    let candidates = build_candidates(shader);
    let mut explicit: Vec<(&String, &XfbCandidate)> = candidates
        .iter()
        .filter(|(_, candidate)| candidate.xfb_offset.is_some())
        .collect();
    explicit.sort_by(|(a_name, a), (b_name, b)| {
        match (a.xfb_buffer, a.xfb_offset).cmp(&(b.xfb_buffer, b.xfb_offset)) {
            Ordering::Equal => a_name.cmp(b_name),
            ordering => ordering,
        }
    });
    explicit
        .into_iter()
        .map(|(name, _)| XfbDeclaration::parse(name))
        .collect()
}

/// resolve every declaration against the outputs of `shader`; `false` when any couldn't
/// be resolved
pub fn resolve_declarations(
    declarations: &mut [XfbDeclaration],
    shader: &Shader,
    buffer_mode: TransformFeedbackBufferMode,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> bool {
    let initial_error_count = diagnostics.error_count();
    let candidates = build_candidates(shader);
    let separate = buffer_mode == TransformFeedbackBufferMode::Separate;
    let mut seen = HashSet::new();
    for declaration in declarations.iter_mut() {
        if !declaration.is_varying() {
            if separate {
                diagnostics.error(TransformFeedbackInvalidInSeparateMode {
                    name: declaration.orig_name.clone(),
                });
            }
            continue;
        }
        if !seen.insert(declaration.orig_name.clone()) {
            diagnostics.error(TransformFeedbackVaryingDuplicated {
                name: declaration.orig_name.clone(),
            });
            continue;
        }
        let candidate = match candidates.get(&declaration.var_name) {
            Some(candidate) => candidate,
            None => {
                diagnostics.error(TransformFeedbackVaryingUndefined {
                    name: declaration.orig_name.clone(),
                });
                continue;
            }
        };
        let (element_type, size, num_components, element_offset) =
            match (declaration.array_subscript, &candidate.var_type) {
                (Some(index), Type::Array { element, length }) => {
                    let length = length.unwrap_or(0);
                    if index >= length {
                        diagnostics.error(TransformFeedbackIndexOutOfBounds {
                            name: declaration.orig_name.clone(),
                            index,
                            size: length,
                        });
                        continue;
                    }
                    let components = element.component_slots();
                    ((**element).clone(), 1, components, index * components)
                }
                (Some(_), _) => {
                    diagnostics.error(TransformFeedbackSubscriptOnNonArray {
                        name: declaration.orig_name.clone(),
                        base: declaration.var_name.clone(),
                    });
                    continue;
                }
                (None, Type::Array { element, length }) => {
                    let length = length.unwrap_or(0);
                    (
                        (**element).clone(),
                        length,
                        element.component_slots() * length,
                        0,
                    )
                }
                (None, var_type) => (var_type.clone(), 1, var_type.component_slots(), 0),
            };
        if separate && num_components > constants.max_transform_feedback_separate_components {
            diagnostics.error(TransformFeedbackSeparateComponentsExceeded {
                name: declaration.orig_name.clone(),
                count: num_components,
                max: constants.max_transform_feedback_separate_components,
            });
            continue;
        }
        declaration.element_type = element_type;
        declaration.size = size;
        declaration.num_components = num_components;
        declaration.offset_in_variable = candidate.offset + element_offset;
        declaration.buffer = candidate.xfb_buffer;
        declaration.explicit_offset = candidate
            .xfb_offset
            .map(|offset| offset + element_offset * 4);
        declaration.stream = shader.variables[candidate.variable].data.stream;
        declaration.matched = Some(candidate.clone());
    }
    diagnostics.error_count() == initial_error_count
}

/// names of the output variables the declarations capture
pub fn captured_variables(declarations: &[XfbDeclaration], shader: &Shader) -> HashSet<String> {
    declarations
        .iter()
        .filter_map(|declaration| declaration.matched.as_ref())
        .map(|candidate| shader.variables[candidate.variable].name.clone())
        .collect()
}

/// one contiguous run of captured components inside one output slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XfbOutput {
    /// the captured output variable
    pub varying: String,
    /// built-in outputs are addressed by name; `register` counts slots inside them
    pub builtin: bool,
    /// the output slot
    pub register: u32,
    /// first component inside the slot
    pub component_offset: u32,
    /// components written
    pub num_components: u32,
    /// vertex stream
    pub stream: u32,
    /// destination buffer
    pub buffer: u32,
    /// destination offset inside one vertex of the buffer
    pub dst_offset: u32,
}

/// an entry of the capture list as reported to the API
#[derive(Clone, Debug, PartialEq)]
pub struct XfbVarying {
    /// the requested name
    pub name: String,
    /// captured type, `void` for `gl_SkipComponents` and `gl_NextBuffer`
    pub var_type: Type,
    /// array elements captured, or skipped components
    pub size: u32,
    /// destination buffer, `None` for `gl_NextBuffer`
    pub buffer: Option<u32>,
    /// byte offset inside one vertex of the buffer
    pub offset: u32,
}

/// per-buffer layout
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct XfbBuffer {
    /// bytes per vertex
    pub stride: u32,
    /// vertex stream written to the buffer
    pub stream: u32,
    /// captured varyings
    pub num_varyings: u32,
}

/// the transform feedback layout of a program
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformFeedbackInfo {
    /// captured component runs in capture order
    pub outputs: Vec<XfbOutput>,
    /// the capture list
    pub varyings: Vec<XfbVarying>,
    /// per-buffer layout
    pub buffers: [XfbBuffer; MAX_FEEDBACK_BUFFERS],
    /// bit `n` set when buffer `n` is written
    pub active_buffers: u32,
}

fn push_outputs(
    info: &mut TransformFeedbackInfo,
    shader: &Shader,
    declaration: &XfbDeclaration,
    candidate: &XfbCandidate,
    buffer: u32,
    dst_offset: u32,
) {
    let variable = &shader.variables[candidate.variable];
    let builtin = variable.is_builtin() || variable.data.location < 0;
    let base = if builtin {
        0
    } else {
        variable.data.location as u32 * 4 + variable.data.location_frac
    };
    let mut component = base + declaration.offset_in_variable;
    let mut dst_offset = dst_offset;
    let mut remaining = declaration.num_components;
    while remaining > 0 {
        let component_offset = component % 4;
        let num_components = remaining.min(4 - component_offset);
        info.outputs.push(XfbOutput {
            varying: variable.name.clone(),
            builtin,
            register: component / 4,
            component_offset,
            num_components,
            stream: declaration.stream,
            buffer,
            dst_offset,
        });
        component += num_components;
        dst_offset += num_components;
        remaining -= num_components;
    }
}

#[derive(Default)]
struct BufferState {
    used: FixedBitSet,
    end: u32,
    last_offset: u32,
    stream: Option<u32>,
    has_double: bool,
    num_varyings: u32,
}

/// lay the resolved declarations out in their buffers. Runs after varying locations are
/// assigned; `explicit` selects `xfb_buffer`/`xfb_offset` placement.
pub fn store_transform_feedback_info(
    declarations: &[XfbDeclaration],
    shader: &Shader,
    buffer_mode: TransformFeedbackBufferMode,
    explicit: bool,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> Option<TransformFeedbackInfo> {
    let initial_error_count = diagnostics.error_count();
    let separate = buffer_mode == TransformFeedbackBufferMode::Separate;
    let max_buffers = constants
        .max_transform_feedback_buffers
        .min(MAX_FEEDBACK_BUFFERS as u32);
    let mut info = TransformFeedbackInfo::default();
    let mut states: [BufferState; MAX_FEEDBACK_BUFFERS] = Default::default();
    let mut buffer = 0u32;
    let mut varying_index = 0u32;
    for declaration in declarations {
        if separate && declaration.is_varying() {
            buffer = varying_index;
        } else if explicit {
            buffer = declaration.buffer;
        }
        if buffer >= max_buffers {
            diagnostics.error(TransformFeedbackBuffersExceeded {
                count: buffer + 1,
                max: constants.max_transform_feedback_buffers,
            });
            return None;
        }
        let state = &mut states[buffer as usize];
        match declaration.kind {
            XfbDeclarationKind::NextBuffer => {
                info.varyings.push(XfbVarying {
                    name: declaration.orig_name.clone(),
                    var_type: Type::Void,
                    size: 0,
                    buffer: None,
                    offset: 0,
                });
                buffer += 1;
                continue;
            }
            XfbDeclarationKind::SkipComponents(count) => {
                info.varyings.push(XfbVarying {
                    name: declaration.orig_name.clone(),
                    var_type: Type::Void,
                    size: count,
                    buffer: Some(buffer),
                    offset: state.end * 4,
                });
                state.end += count;
                continue;
            }
            XfbDeclarationKind::Varying => {}
        }
        varying_index += 1;
        let candidate = match &declaration.matched {
            Some(candidate) => candidate,
            None => continue,
        };
        let offset = match (explicit, declaration.explicit_offset) {
            (true, Some(bytes)) => bytes / 4,
            _ => state.end,
        };
        let end = offset + declaration.num_components;
        state.used.grow(end as usize);
        if (offset..end).any(|component| state.used.contains(component as usize)) {
            diagnostics.error(TransformFeedbackAliasing {
                name: declaration.orig_name.clone(),
                offset: offset * 4,
                buffer,
            });
        }
        state.used.insert_range(offset as usize..end as usize);
        match state.stream {
            Some(stream) if stream != declaration.stream => {
                diagnostics.error(TransformFeedbackMixedStreams {
                    name: declaration.orig_name.clone(),
                    buffer,
                    stream: declaration.stream,
                    other_stream: stream,
                });
            }
            Some(_) => {}
            None => state.stream = Some(declaration.stream),
        }
        state.has_double |= declaration.element_type.contains_double();
        state.num_varyings += 1;
        if end >= state.end {
            state.end = end;
            state.last_offset = offset;
        }
        push_outputs(&mut info, shader, declaration, candidate, buffer, offset);
        info.varyings.push(XfbVarying {
            name: declaration.orig_name.clone(),
            var_type: declaration.element_type.clone(),
            size: declaration.size,
            buffer: Some(buffer),
            offset: offset * 4,
        });
    }
    let max_interleaved = constants.max_transform_feedback_interleaved_components;
    for (index, state) in states.iter().enumerate() {
        let buffer = index as u32;
        let explicit_stride = shader.layout.xfb_stride[index];
        if state.num_varyings == 0 && explicit_stride.is_none() {
            continue;
        }
        if !separate && state.end > max_interleaved {
            diagnostics.error(TransformFeedbackInterleavedComponentsExceeded {
                count: state.end,
                max: max_interleaved,
            });
        }
        let stride = match explicit_stride {
            Some(stride) => {
                let multiple = if state.has_double { 8 } else { 4 };
                if stride % multiple != 0 {
                    diagnostics.error(TransformFeedbackStrideMisaligned {
                        buffer,
                        stride,
                        multiple,
                    });
                } else if stride / 4 > max_interleaved {
                    diagnostics.error(TransformFeedbackStrideTooLarge {
                        buffer,
                        stride,
                        max: max_interleaved,
                    });
                } else if state.end * 4 > stride {
                    diagnostics.error(TransformFeedbackOffsetOverflowsStride {
                        offset: state.last_offset * 4,
                        stride,
                        buffer,
                    });
                }
                stride
            }
            None => state.end * 4,
        };
        info.buffers[index] = XfbBuffer {
            stride,
            stream: state.stream.unwrap_or(0),
            num_varyings: state.num_varyings,
        };
        info.active_buffers |= 1 << index;
    }
    if diagnostics.error_count() > initial_error_count {
        return None;
    }
    tracing::debug!(
        outputs = info.outputs.len(),
        active_buffers = info.active_buffers,
        "transform feedback laid out"
    );
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LinkError;
    use glsl_linker_ir::{ShaderStage, StructField, StructType, Variable};

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn vertex_shader(variables: Vec<Variable>) -> Shader {
        let mut shader = Shader::new("vs", ShaderStage::Vertex, 450, false);
        for (location, variable) in variables.into_iter().enumerate() {
            let mut variable = variable;
            if !variable.is_builtin() {
                variable.data.location = location as i32;
            }
            shader.add_global(variable);
        }
        shader
    }

    fn link(
        shader: &Shader,
        declarations: &mut Vec<XfbDeclaration>,
        buffer_mode: TransformFeedbackBufferMode,
        explicit: bool,
    ) -> (Option<TransformFeedbackInfo>, Diagnostics) {
        let constants = LinkerConstants::default();
        let mut diagnostics = Diagnostics::new();
        if !resolve_declarations(declarations, shader, buffer_mode, &constants, &mut diagnostics)
        {
            return (None, diagnostics);
        }
        let info = store_transform_feedback_info(
            declarations,
            shader,
            buffer_mode,
            explicit,
            &constants,
            &mut diagnostics,
        );
        (info, diagnostics)
    }

    #[test]
    fn test_parse() {
        let declaration = XfbDeclaration::parse("colors[2]");
        assert_eq!(declaration.var_name, "colors");
        assert_eq!(declaration.array_subscript, Some(2));
        assert_eq!(declaration.kind, XfbDeclarationKind::Varying);
        assert_eq!(
            XfbDeclaration::parse("gl_SkipComponents3").kind,
            XfbDeclarationKind::SkipComponents(3)
        );
        assert_eq!(
            XfbDeclaration::parse("gl_NextBuffer").kind,
            XfbDeclarationKind::NextBuffer
        );
        assert_eq!(XfbDeclaration::parse("s.field").array_subscript, None);
    }

    #[test]
    fn test_candidates_of_structs() {
        let s = StructType {
            name: "S".into(),
            fields: vec![
                StructField::new("a", Type::vec(3)),
                StructField::new("b", Type::array(Type::float(), 2)),
            ],
        };
        let shader = vertex_shader(vec![Variable::new(
            "s",
            Type::array(s.into(), 2),
            VariableMode::ShaderOut,
        )]);
        let candidates = build_candidates(&shader);
        assert_eq!(candidates["s[0].a"].offset, 0);
        assert_eq!(candidates["s[0].b"].offset, 3);
        assert_eq!(candidates["s[1].a"].offset, 5);
        assert_eq!(candidates["s[1].b"].var_type, Type::array(Type::float(), 2));
    }

    #[test]
    fn test_interleaved_with_skip_and_next_buffer() {
        let shader = vertex_shader(vec![
            Variable::new("gl_Position", Type::vec(4), VariableMode::ShaderOut),
            Variable::new("a", Type::vec(2), VariableMode::ShaderOut),
            Variable::new("b", Type::float(), VariableMode::ShaderOut),
        ]);
        let mut declarations = parse_declarations(&names(&[
            "gl_Position",
            "gl_SkipComponents2",
            "a",
            "gl_NextBuffer",
            "b",
        ]));
        let (info, diagnostics) = link(
            &shader,
            &mut declarations,
            TransformFeedbackBufferMode::Interleaved,
            false,
        );
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        let info = info.unwrap();
        assert_eq!(info.active_buffers, 0b11);
        assert_eq!(info.buffers[0].stride, 32);
        assert_eq!(info.buffers[1].stride, 4);
        assert_eq!(info.varyings[2].offset, 24);
        assert_eq!(
            info.outputs[1],
            XfbOutput {
                varying: "a".into(),
                builtin: false,
                register: 1,
                component_offset: 0,
                num_components: 2,
                stream: 0,
                buffer: 0,
                dst_offset: 6,
            }
        );
        assert_eq!(info.outputs[2].buffer, 1);
    }

    #[test]
    fn test_separate_mode() {
        let shader = vertex_shader(vec![
            Variable::new("a", Type::vec(4), VariableMode::ShaderOut),
            Variable::new("b", Type::mat(4, 4), VariableMode::ShaderOut),
        ]);
        let mut declarations = parse_declarations(&names(&["a", "gl_NextBuffer", "b"]));
        let (info, diagnostics) = link(
            &shader,
            &mut declarations,
            TransformFeedbackBufferMode::Separate,
            false,
        );
        assert!(info.is_none());
        assert_eq!(
            diagnostics.info_log(),
            "error: transform feedback varying gl_NextBuffer is not valid in separate attribs \
             mode\n\
             error: transform feedback varying b exceeds \
             MAX_TRANSFORM_FEEDBACK_SEPARATE_COMPONENTS (16 > 4)\n"
        );
    }

    #[test]
    fn test_resolution_errors() {
        let shader = vertex_shader(vec![
            Variable::new("a", Type::vec(4), VariableMode::ShaderOut),
            Variable::new("arr", Type::array(Type::float(), 3), VariableMode::ShaderOut),
        ]);
        let mut declarations =
            parse_declarations(&names(&["a[1]", "arr[3]", "missing", "arr", "arr"]));
        let (info, diagnostics) = link(
            &shader,
            &mut declarations,
            TransformFeedbackBufferMode::Interleaved,
            false,
        );
        assert!(info.is_none());
        assert_eq!(
            diagnostics.errors(),
            &[
                LinkError::from(TransformFeedbackSubscriptOnNonArray {
                    name: "a[1]".into(),
                    base: "a".into(),
                }),
                TransformFeedbackIndexOutOfBounds {
                    name: "arr[3]".into(),
                    index: 3,
                    size: 3,
                }
                .into(),
                TransformFeedbackVaryingUndefined {
                    name: "missing".into(),
                }
                .into(),
                TransformFeedbackVaryingDuplicated { name: "arr".into() }.into(),
            ]
        );
    }

    fn explicit_output(name: &str, offset: u32) -> Variable {
        let mut variable = Variable::new(name, Type::vec(4), VariableMode::ShaderOut);
        variable.data.explicit_xfb_buffer = true;
        variable.data.explicit_xfb_offset = true;
        variable.data.xfb_offset = offset;
        variable
    }

    fn link_explicit(shader: &Shader) -> (Option<TransformFeedbackInfo>, Diagnostics) {
        assert!(has_xfb_qualifiers(shader));
        let mut declarations = declarations_from_qualifiers(shader);
        link(
            shader,
            &mut declarations,
            TransformFeedbackBufferMode::Interleaved,
            true,
        )
    }

    #[test]
    fn test_explicit_offsets_disjoint() {
        let shader = vertex_shader(vec![explicit_output("b", 16), explicit_output("a", 0)]);
        let (info, diagnostics) = link_explicit(&shader);
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        let info = info.unwrap();
        assert_eq!(info.varyings[0].name, "a");
        assert_eq!(info.varyings[1].offset, 16);
        assert_eq!(info.buffers[0].stride, 32);
    }

    #[test]
    fn test_explicit_offsets_overlapping() {
        let shader = vertex_shader(vec![explicit_output("a", 0), explicit_output("b", 8)]);
        let (info, diagnostics) = link_explicit(&shader);
        assert!(info.is_none());
        assert_eq!(
            diagnostics.info_log(),
            "error: variable `b', xfb_offset (8) is causing aliasing in transform feedback \
             buffer 0\n"
        );
    }

    #[test]
    fn test_explicit_stride() {
        let mut shader = vertex_shader(vec![explicit_output("a", 0)]);
        shader.layout.xfb_stride[0] = Some(6);
        let (_, diagnostics) = link_explicit(&shader);
        assert_eq!(
            diagnostics.info_log(),
            "error: xfb_stride 6 for buffer 0 must be a multiple of 4\n"
        );
        shader.layout.xfb_stride[0] = Some(8);
        let (_, diagnostics) = link_explicit(&shader);
        assert_eq!(
            diagnostics.info_log(),
            "error: xfb_offset (0) overflows xfb_stride (8) for buffer (0)\n"
        );
        shader.layout.xfb_stride[0] = Some(64);
        let (info, diagnostics) = link_explicit(&shader);
        assert!(diagnostics.link_status());
        assert_eq!(info.unwrap().buffers[0].stride, 64);
    }

    #[test]
    fn test_mixed_streams() {
        let mut a = Variable::new("a", Type::float(), VariableMode::ShaderOut);
        a.data.stream = 1;
        let shader = vertex_shader(vec![
            a,
            Variable::new("b", Type::float(), VariableMode::ShaderOut),
        ]);
        let mut declarations = parse_declarations(&names(&["a", "b"]));
        let (info, diagnostics) = link(
            &shader,
            &mut declarations,
            TransformFeedbackBufferMode::Interleaved,
            false,
        );
        assert!(info.is_none());
        assert_eq!(
            diagnostics.errors(),
            &[LinkError::from(TransformFeedbackMixedStreams {
                name: "b".into(),
                buffer: 0,
                stream: 0,
                other_stream: 1,
            })]
        );
    }
}
