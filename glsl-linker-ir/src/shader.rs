// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! compilation units

use crate::arena::Arena;
use crate::function::Function;
use crate::function::Signature;
use crate::instructions::Instruction;
use crate::instructions::SignatureKey;
use crate::symbol_table::SymbolTable;
use crate::types::Type;
use crate::variable::Variable;
use crate::variable::VariableId;
use std::fmt;

/// maximum number of transform feedback buffers
pub const MAX_FEEDBACK_BUFFERS: usize = 4;

/// pipeline stage
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ShaderStage {
    /// vertex shader
    Vertex,
    /// tessellation control shader
    TessControl,
    /// tessellation evaluation shader
    TessEval,
    /// geometry shader
    Geometry,
    /// fragment shader
    Fragment,
    /// compute shader
    Compute,
}

impl ShaderStage {
    /// the number of stages
    pub const COUNT: usize = 6;
    /// all stages in pipeline order
    pub const ALL: [ShaderStage; Self::COUNT] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];
    /// index of the stage in `ALL`
    pub fn index(self) -> usize {
        self as usize
    }
    /// the stage name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::TessControl => "tessellation control",
            Self::TessEval => "tessellation evaluation",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }
    /// stages whose inputs are arrays indexed by vertex
    pub fn has_per_vertex_inputs(self) -> bool {
        match self {
            Self::TessControl | Self::TessEval | Self::Geometry => true,
            _ => false,
        }
    }
    /// stages whose outputs are arrays indexed by vertex
    pub fn has_per_vertex_outputs(self) -> bool {
        self == Self::TessControl
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

/// primitive types of geometry and tessellation layouts
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LinesAdjacency,
    LineStrip,
    Triangles,
    TrianglesAdjacency,
    TriangleStrip,
    Quads,
    Isolines,
}

impl PrimitiveMode {
    /// vertices per input primitive of a geometry shader
    pub fn vertices_per_primitive(self) -> u32 {
        match self {
            Self::Points => 1,
            Self::Lines | Self::LineStrip | Self::Isolines => 2,
            Self::LinesAdjacency | Self::Quads => 4,
            Self::Triangles | Self::TriangleStrip => 3,
            Self::TrianglesAdjacency => 6,
        }
    }
    /// the GLSL spelling
    pub fn name(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LinesAdjacency => "lines_adjacency",
            Self::LineStrip => "line_strip",
            Self::Triangles => "triangles",
            Self::TrianglesAdjacency => "triangles_adjacency",
            Self::TriangleStrip => "triangle_strip",
            Self::Quads => "quads",
            Self::Isolines => "isolines",
        }
    }
}

/// tessellation spacing
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum TessSpacing {
    Equal,
    FractionalOdd,
    FractionalEven,
}

/// tessellation vertex order
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum VertexOrder {
    Ccw,
    Cw,
}

/// compute shader derivative group
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum DerivativeGroup {
    None,
    Quads,
    Linear,
}

impl Default for DerivativeGroup {
    fn default() -> Self {
        DerivativeGroup::None
    }
}

/// stage layout qualifiers; `None` means not declared in this unit
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderLayout {
    /// tessellation control `layout(vertices)`
    pub tcs_vertices_out: Option<u32>,
    /// tessellation evaluation primitive mode
    pub tes_primitive_mode: Option<PrimitiveMode>,
    /// tessellation evaluation spacing
    pub tes_spacing: Option<TessSpacing>,
    /// tessellation evaluation vertex order
    pub tes_vertex_order: Option<VertexOrder>,
    /// tessellation evaluation `point_mode`
    pub tes_point_mode: Option<bool>,
    /// geometry input primitive
    pub gs_input_primitive: Option<PrimitiveMode>,
    /// geometry output primitive
    pub gs_output_primitive: Option<PrimitiveMode>,
    /// geometry `max_vertices`
    pub gs_max_vertices: Option<u32>,
    /// geometry `invocations`
    pub gs_invocations: Option<u32>,
    /// compute `local_size_{x,y,z}`
    pub cs_local_size: Option<[u32; 3]>,
    /// compute `local_size_variable`
    pub cs_local_size_variable: bool,
    /// compute derivative group
    pub cs_derivative_group: DerivativeGroup,
    /// fragment `gl_FragCoord` was redeclared
    pub redeclares_gl_fragcoord: bool,
    /// fragment `gl_FragCoord` is read
    pub uses_gl_fragcoord: bool,
    /// fragment `origin_upper_left`
    pub origin_upper_left: bool,
    /// fragment `pixel_center_integer`
    pub pixel_center_integer: bool,
    /// fragment `early_fragment_tests`
    pub early_fragment_tests: bool,
    /// fragment `inner_coverage`
    pub inner_coverage: bool,
    /// fragment `post_depth_coverage`
    pub post_depth_coverage: bool,
    /// fragment advanced blend equations
    pub blend_support: u32,
    /// `xfb_stride` per transform feedback buffer
    pub xfb_stride: [Option<u32>; MAX_FEEDBACK_BUFFERS],
}

/// one compilation unit, or the linked result of a stage
#[derive(Clone, Debug)]
pub struct Shader {
    /// label used in diagnostics
    pub name: String,
    /// pipeline stage
    pub stage: ShaderStage,
    /// GLSL version, such as 450
    pub version: u32,
    /// GLSL ES
    pub is_es: bool,
    /// all variables, globals, locals and parameters
    pub variables: Arena<Variable>,
    /// functions
    pub functions: Vec<Function>,
    /// top-level instructions: global declarations followed by other global statements
    pub instructions: Vec<Instruction>,
    /// global name lookup
    pub symbols: SymbolTable,
    /// stage layout qualifiers
    pub layout: ShaderLayout,
}

impl Shader {
    /// an empty compilation unit
    pub fn new(name: impl Into<String>, stage: ShaderStage, version: u32, is_es: bool) -> Self {
        Self {
            name: name.into(),
            stage,
            version,
            is_es,
            variables: Arena::new(),
            functions: Vec::new(),
            instructions: Vec::new(),
            symbols: SymbolTable::new(),
            layout: ShaderLayout::default(),
        }
    }
    /// declare a global variable
    pub fn add_global(&mut self, variable: Variable) -> VariableId {
        let name = variable.name.clone();
        let id = self.variables.alloc(variable);
        self.instructions.push(Instruction::Declare(id));
        self.symbols.add_variable(name, id);
        id
    }
    /// allocate a local or parameter; the caller places the declaration
    pub fn add_local(&mut self, variable: Variable) -> VariableId {
        self.variables.alloc(variable)
    }
    /// add a signature to function `name`, creating the function when needed
    pub fn add_signature(&mut self, name: &str, signature: Signature) {
        let index = self.get_or_add_function(name);
        self.functions[index].signatures.push(signature);
    }
    /// the index of function `name`, creating it when needed
    pub fn get_or_add_function(&mut self, name: &str) -> usize {
        if let Some(index) = self.symbols.get_function(name) {
            return index;
        }
        let index = self.functions.len();
        self.functions.push(Function::new(name));
        self.symbols.add_function(name, index);
        index
    }
    /// look up function `name`
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.symbols
            .get_function(name)
            .map(|index| &self.functions[index])
    }
    /// look up function `name` mutably
    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        let index = self.symbols.get_function(name)?;
        Some(&mut self.functions[index])
    }
    /// the signature identified by `key`
    pub fn find_signature(&self, key: &SignatureKey) -> Option<&Signature> {
        self.function(&key.name)?
            .exact_matching_signature(&key.parameter_types, &self.variables)
    }
    /// the position of the signature identified by `key`, as (function, signature) indexes
    pub fn find_signature_index(&self, key: &SignatureKey) -> Option<(usize, usize)> {
        let function_index = self.symbols.get_function(&key.name)?;
        let signature_index = self.functions[function_index]
            .signatures
            .iter()
            .position(|signature| {
                signature.matches_parameters(&key.parameter_types, &self.variables)
            })?;
        Some((function_index, signature_index))
    }
    /// the key for a signature of this shader
    pub fn signature_key(&self, name: &str, signature: &Signature) -> SignatureKey {
        signature.key(name, &self.variables)
    }
    /// the defined `void main()`
    pub fn main_signature(&self) -> Option<&Signature> {
        self.function("main")?
            .signatures
            .iter()
            .find(|signature| signature.is_defined && signature.parameters.is_empty())
    }
    /// `true` if `void main()` is defined
    pub fn has_main(&self) -> bool {
        self.main_signature().is_some()
    }
    /// global variables in declaration order
    pub fn globals(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.instructions.iter().filter_map(|instruction| match instruction {
            Instruction::Declare(id) => Some(*id),
            _ => None,
        })
    }
    /// look up a global variable by name
    pub fn get_variable(&self, name: &str) -> Option<VariableId> {
        self.symbols.get_variable(name)
    }
    /// look up a global variable by name and return it
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.get_variable(name).map(|id| &self.variables[id])
    }
    /// remove the declaration of global `id`; the variable stays in the arena
    pub fn remove_global(&mut self, id: VariableId) {
        self.instructions
            .retain(|instruction| *instruction != Instruction::Declare(id));
        let name = &self.variables[id].name;
        if self.symbols.get_variable(name) == Some(id) {
            self.symbols.remove_variable(name);
        }
    }
    /// `true` for desktop GLSL at least `desktop_version` or GLSL ES at least `es_version`
    pub fn is_version(&self, desktop_version: u32, es_version: u32) -> bool {
        if self.is_es {
            es_version != 0 && self.version >= es_version
        } else {
            desktop_version != 0 && self.version >= desktop_version
        }
    }
    /// declare `void main()` with `body`
    pub fn add_main(&mut self, body: Vec<Instruction>) {
        self.add_signature("main", Signature::new(Type::Void, Vec::new(), body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableMode;

    #[test]
    fn test_shader_globals_and_functions() {
        let mut shader = Shader::new("vs", ShaderStage::Vertex, 450, false);
        let position = shader.add_global(Variable::new(
            "gl_Position",
            Type::vec(4),
            VariableMode::ShaderOut,
        ));
        let x = shader.add_local(Variable::new("x", Type::float(), VariableMode::FunctionIn));
        shader.add_signature("f", Signature::new(Type::float(), vec![x], Vec::new()));
        shader.add_main(vec![Instruction::assign(
            position,
            crate::instructions::Constant::vec(&[0.0, 0.0, 0.0, 1.0]),
        )]);
        assert!(shader.has_main());
        assert_eq!(shader.globals().collect::<Vec<_>>(), vec![position]);
        let key = SignatureKey::new("f", vec![Type::float()]);
        assert!(shader.find_signature(&key).is_some());
        assert_eq!(shader.find_signature_index(&key), Some((0, 0)));
        assert!(shader
            .find_signature(&SignatureKey::new("f", vec![Type::int()]))
            .is_none());
        shader.remove_global(position);
        assert_eq!(shader.globals().count(), 0);
        assert_eq!(shader.get_variable("gl_Position"), None);
        assert!(shader.is_version(450, 0));
        assert!(!shader.is_version(460, 310));
    }
}
