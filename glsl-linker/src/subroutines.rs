// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! subroutine function indexes and subroutine uniform locations of one stage

use crate::diagnostics::Diagnostics;
use crate::errors::{SubroutineIndexConflict, TooManyStageResources};
use crate::options::LinkerConstants;
use fixedbitset::FixedBitSet;
use glsl_linker_ir::{Shader, Type, VariableMode};
use hashbrown::HashMap;

/// a function implementing subroutine types
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutineFunction {
    /// function name
    pub name: String,
    /// index used to select the function through the API
    pub index: u32,
    /// implemented subroutine types
    pub types: Vec<String>,
}

/// a uniform of subroutine type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutineUniform {
    /// uniform name
    pub name: String,
    /// the subroutine type
    pub type_name: String,
    /// array length, 0 for non-arrays
    pub array_elements: u32,
    /// first subroutine uniform location
    pub location: u32,
    /// indexes of the functions that can be selected
    pub compatible: Vec<u32>,
}

/// the subroutine state of one stage
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageSubroutines {
    /// subroutine functions by index
    pub functions: Vec<SubroutineFunction>,
    /// subroutine uniforms by location
    pub uniforms: Vec<SubroutineUniform>,
    /// subroutine uniform locations used, including holes
    pub num_locations: u32,
}

fn assign_function_indexes(
    shader: &Shader,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> Vec<SubroutineFunction> {
    let implementations: Vec<_> = shader
        .functions
        .iter()
        .filter(|function| !function.subroutine_types.is_empty())
        .collect();
    let mut owners: HashMap<u32, &str> = HashMap::new();
    let mut retval = Vec::with_capacity(implementations.len());
    for function in &implementations {
        if let Some(index) = function.subroutine_index {
            if let Some(other) = owners.insert(index, &function.name) {
                diagnostics.error(SubroutineIndexConflict {
                    stage: shader.stage.name(),
                    name: other.to_string(),
                    other: function.name.clone(),
                    index,
                });
                continue;
            }
            retval.push(SubroutineFunction {
                name: function.name.clone(),
                index,
                types: function.subroutine_types.clone(),
            });
        }
    }
    let mut next = 0;
    for function in implementations {
        if function.subroutine_index.is_some() {
            continue;
        }
        while owners.contains_key(&next) {
            next += 1;
        }
        owners.insert(next, &function.name);
        retval.push(SubroutineFunction {
            name: function.name.clone(),
            index: next,
            types: function.subroutine_types.clone(),
        });
    }
    let count = retval.len() as u32;
    if count > constants.max_subroutines {
        diagnostics.error(TooManyStageResources {
            stage: shader.stage.name(),
            kind: "subroutine functions",
            count,
            max: constants.max_subroutines,
        });
    }
    retval.sort_by_key(|function| function.index);
    retval
}

/// index the subroutine functions of `shader` and place its subroutine uniforms
pub fn link_subroutines(
    shader: &Shader,
    constants: &LinkerConstants,
    diagnostics: &mut Diagnostics,
) -> StageSubroutines {
    let functions = assign_function_indexes(shader, constants, diagnostics);
    let mut used = FixedBitSet::new();
    let mut explicit = Vec::new();
    let mut implicit = Vec::new();
    for id in shader.globals() {
        let variable = &shader.variables[id];
        if variable.mode != VariableMode::Uniform {
            continue;
        }
        let type_name = match variable.var_type.without_array() {
            Type::Subroutine(type_name) => type_name.clone(),
            _ => continue,
        };
        let array_elements = variable.var_type.array_size().unwrap_or(0);
        let compatible = functions
            .iter()
            .filter(|function| function.types.contains(&type_name))
            .map(|function| function.index)
            .collect();
        let uniform = SubroutineUniform {
            name: variable.name.clone(),
            type_name,
            array_elements,
            location: 0,
            compatible,
        };
        if variable.data.explicit_location {
            explicit.push((variable.data.location.max(0) as u32, uniform));
        } else {
            implicit.push(uniform);
        }
    }
    let mut uniforms = Vec::with_capacity(explicit.len() + implicit.len());
    for (location, mut uniform) in explicit {
        let end = location + uniform.array_elements.max(1);
        used.grow(end as usize);
        used.insert_range(location as usize..end as usize);
        uniform.location = location;
        uniforms.push(uniform);
    }
    for mut uniform in implicit {
        let count = uniform.array_elements.max(1);
        let mut location = 0;
        while (location..location + count).any(|slot| used.contains(slot as usize)) {
            location += 1;
        }
        let end = location + count;
        used.grow(end as usize);
        used.insert_range(location as usize..end as usize);
        uniform.location = location;
        uniforms.push(uniform);
    }
    uniforms.sort_by_key(|uniform| uniform.location);
    let num_locations = used.len() as u32;
    if num_locations > constants.max_subroutine_uniform_locations {
        diagnostics.error(TooManyStageResources {
            stage: shader.stage.name(),
            kind: "subroutine uniform locations",
            count: num_locations,
            max: constants.max_subroutine_uniform_locations,
        });
    }
    tracing::debug!(
        stage = %shader.stage,
        functions = functions.len(),
        uniforms = uniforms.len(),
        "linked subroutines"
    );
    StageSubroutines {
        functions,
        uniforms,
        num_locations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LinkError;
    use glsl_linker_ir::{ShaderStage, Signature, Variable};

    fn add_implementation(shader: &mut Shader, name: &str, types: &[&str], index: Option<u32>) {
        shader.add_signature(name, Signature::new(Type::vec(4), Vec::new(), Vec::new()));
        let function = shader.function_mut(name).unwrap();
        function.subroutine_types = types.iter().map(|t| t.to_string()).collect();
        function.subroutine_index = index;
    }

    #[test]
    fn test_indexes_and_locations() {
        let mut fs = Shader::new("fs", ShaderStage::Fragment, 450, false);
        add_implementation(&mut fs, "red", &["Color"], None);
        add_implementation(&mut fs, "green", &["Color"], Some(0));
        add_implementation(&mut fs, "scale", &["Scale"], None);
        fs.add_global(
            Variable::new("color", Type::Subroutine("Color".into()), VariableMode::Uniform)
                .with_location(1),
        );
        fs.add_global(Variable::new(
            "scales",
            Type::array(Type::Subroutine("Scale".into()), 2),
            VariableMode::Uniform,
        ));
        fs.add_global(Variable::new(
            "last",
            Type::Subroutine("Color".into()),
            VariableMode::Uniform,
        ));
        let mut diagnostics = Diagnostics::new();
        let linked = link_subroutines(&fs, &LinkerConstants::default(), &mut diagnostics);
        assert!(diagnostics.link_status(), "{}", diagnostics.info_log());
        let indexes: Vec<_> = linked
            .functions
            .iter()
            .map(|function| (function.name.as_str(), function.index))
            .collect();
        assert_eq!(indexes, [("green", 0), ("red", 1), ("scale", 2)]);
        let locations: Vec<_> = linked
            .uniforms
            .iter()
            .map(|uniform| (uniform.name.as_str(), uniform.location))
            .collect();
        assert_eq!(locations, [("last", 0), ("color", 1), ("scales", 2)]);
        assert_eq!(linked.uniforms[1].compatible, [0, 1]);
        assert_eq!(linked.uniforms[2].compatible, [2]);
        assert_eq!(linked.num_locations, 4);
    }

    #[test]
    fn test_index_conflict() {
        let mut vs = Shader::new("vs", ShaderStage::Vertex, 450, false);
        add_implementation(&mut vs, "a", &["T"], Some(3));
        add_implementation(&mut vs, "b", &["T"], Some(3));
        let mut diagnostics = Diagnostics::new();
        link_subroutines(&vs, &LinkerConstants::default(), &mut diagnostics);
        assert_eq!(
            diagnostics.errors(),
            &[LinkError::from(SubroutineIndexConflict {
                stage: "vertex",
                name: "a".into(),
                other: "b".into(),
                index: 3,
            })]
        );
    }
}
