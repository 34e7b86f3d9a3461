// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! variables and their qualifiers

use crate::arena::Id;
use crate::instructions::Constant;
use crate::types::InterfaceType;
use crate::types::Interpolation;
use crate::types::Precision;
use crate::types::Type;

/// id of a variable in a shader's variable arena
pub type VariableId = Id<Variable>;

/// storage mode of a variable
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum VariableMode {
    /// global without storage qualifier or local
    Auto,
    /// `uniform`
    Uniform,
    /// `buffer`
    ShaderStorage,
    /// compute `shared`
    ShaderShared,
    /// `in` at global scope
    ShaderIn,
    /// `out` at global scope
    ShaderOut,
    /// `in` parameter
    FunctionIn,
    /// `out` parameter
    FunctionOut,
    /// `inout` parameter
    FunctionInOut,
    /// `const in` parameter
    ConstIn,
    /// system value such as `gl_VertexID`
    SystemValue,
    /// compiler temporary
    Temporary,
}

impl VariableMode {
    /// the GLSL spelling of the storage qualifier, used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "global",
            Self::Uniform => "uniform",
            Self::ShaderStorage => "buffer",
            Self::ShaderShared => "shared",
            Self::ShaderIn => "shader input",
            Self::ShaderOut => "shader output",
            Self::FunctionIn => "function input",
            Self::FunctionOut => "function output",
            Self::FunctionInOut => "function inout",
            Self::ConstIn => "function const in",
            Self::SystemValue => "system value",
            Self::Temporary => "temporary",
        }
    }
    /// `true` for function parameter modes
    pub fn is_parameter(self) -> bool {
        match self {
            Self::FunctionIn | Self::FunctionOut | Self::FunctionInOut | Self::ConstIn => true,
            _ => false,
        }
    }
    /// `true` for uniforms and shader storage
    pub fn is_in_buffer_or_uniform(self) -> bool {
        self == Self::Uniform || self == Self::ShaderStorage
    }
}

/// how a variable came to exist
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclarationKind {
    /// declared normally in the shader text
    Normal,
    /// compiler temporary
    Temporary,
    /// hidden from the API, e.g. lowered state
    Hidden,
    /// built-in that was never redeclared
    ImplicitlyDeclared,
    /// built-in redeclared by the shader
    Redeclared,
}

impl Default for DeclarationKind {
    fn default() -> Self {
        DeclarationKind::Normal
    }
}

/// `layout(depth_*)` on `gl_FragDepth`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum DepthLayout {
    None,
    Any,
    Greater,
    Less,
    Unchanged,
}

impl Default for DepthLayout {
    fn default() -> Self {
        DepthLayout::None
    }
}

/// image `layout(format)`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum ImageFormat {
    None,
    Rgba32f,
    Rgba16f,
    R32f,
    Rgba8,
    Rgba32i,
    R32i,
    Rgba32ui,
    R32ui,
}

impl Default for ImageFormat {
    fn default() -> Self {
        ImageFormat::None
    }
}

/// qualifiers and linker state of a variable
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableData {
    /// `const` or otherwise not writable
    pub read_only: bool,
    /// `centroid`
    pub centroid: bool,
    /// `sample`
    pub sample: bool,
    /// `patch`
    pub patch: bool,
    /// `invariant`, explicit or implied
    pub invariant: bool,
    /// `invariant` written in the shader
    pub explicit_invariant: bool,
    /// `precise`
    pub precise: bool,
    /// precision qualifier
    pub precision: Precision,
    /// how the variable was declared
    pub how_declared: DeclarationKind,
    /// interpolation qualifier
    pub interpolation: Interpolation,
    /// `layout(location)` was given
    pub explicit_location: bool,
    /// `layout(index)` was given
    pub explicit_index: bool,
    /// `layout(binding)` was given
    pub explicit_binding: bool,
    /// `layout(component)` was given
    pub explicit_component: bool,
    /// `layout(offset)` was given
    pub explicit_offset: bool,
    /// `layout(xfb_buffer)` was given
    pub explicit_xfb_buffer: bool,
    /// `layout(xfb_offset)` was given
    pub explicit_xfb_offset: bool,
    /// `layout(xfb_stride)` was given
    pub explicit_xfb_stride: bool,
    /// location; explicit when `explicit_location`, otherwise assigned by the linker,
    /// -1 when unassigned
    pub location: i32,
    /// first component within the location
    pub location_frac: u32,
    /// dual-source blend index
    pub index: u32,
    /// binding point
    pub binding: u32,
    /// atomic counter offset
    pub offset: u32,
    /// vertex stream
    pub stream: u32,
    /// transform feedback buffer
    pub xfb_buffer: u32,
    /// transform feedback offset
    pub xfb_offset: u32,
    /// transform feedback stride
    pub xfb_stride: u32,
    /// image format
    pub image_format: ImageFormat,
    /// `readonly` image or buffer
    pub memory_read_only: bool,
    /// `writeonly` image or buffer
    pub memory_write_only: bool,
    /// `coherent`
    pub memory_coherent: bool,
    /// `volatile`
    pub memory_volatile: bool,
    /// `restrict`
    pub memory_restrict: bool,
    /// `bindless_sampler`/`bindless_image`
    pub bindless: bool,
    /// `bound_sampler`/`bound_image`
    pub bound: bool,
    /// assigned somewhere in the shader
    pub assigned: bool,
    /// read somewhere in the shader
    pub used: bool,
    /// must stay active even when unused
    pub always_active_io: bool,
    /// generic in/out that matched nothing in the neighboring stage
    pub is_unmatched_generic_inout: bool,
    /// fragment output read through framebuffer fetch
    pub fb_fetch_output: bool,
    /// `gl_FragDepth` layout
    pub depth_layout: DepthLayout,
    /// `gl_FragCoord` redeclared with `origin_upper_left`
    pub origin_upper_left: bool,
    /// `gl_FragCoord` redeclared with `pixel_center_integer`
    pub pixel_center_integer: bool,
    /// lowered variable that still must be a shader input
    pub must_be_shader_input: bool,
    /// only kept alive for transform feedback
    pub is_xfb_only: bool,
    /// member of a named interface block
    pub from_named_ifc_block: bool,
    /// a subroutine uniform's explicit `index`, or a subroutine function's index
    pub explicit_subroutine_index: Option<u32>,
}

/// a shader variable
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// name
    pub name: String,
    /// type
    pub var_type: Type,
    /// storage mode
    pub mode: VariableMode,
    /// the enclosing interface block for block instances and members of unnamed blocks
    pub interface_type: Option<InterfaceType>,
    /// qualifiers and linker state
    pub data: VariableData,
    /// compile-time value of constants
    pub constant_value: Option<Constant>,
    /// initializer of uniforms and globals
    pub constant_initializer: Option<Constant>,
    /// highest array index seen, -1 when none
    pub max_array_access: i32,
    /// highest index seen per member of an unnamed interface block array member
    pub max_ifc_array_access: Vec<i32>,
}

impl Variable {
    /// a variable without qualifiers
    pub fn new(name: impl Into<String>, var_type: Type, mode: VariableMode) -> Self {
        Self {
            name: name.into(),
            var_type,
            mode,
            interface_type: None,
            data: VariableData {
                location: -1,
                ..VariableData::default()
            },
            constant_value: None,
            constant_initializer: None,
            max_array_access: -1,
            max_ifc_array_access: Vec::new(),
        }
    }
    /// set an explicit location
    pub fn with_location(mut self, location: u32) -> Self {
        self.data.explicit_location = true;
        self.data.location = location as i32;
        self
    }
    /// set an explicit binding
    pub fn with_binding(mut self, binding: u32) -> Self {
        self.data.explicit_binding = true;
        self.data.binding = binding;
        self
    }
    /// set an explicit component
    pub fn with_component(mut self, component: u32) -> Self {
        self.data.explicit_component = true;
        self.data.location_frac = component;
        self
    }
    /// set the interface block this variable is part of
    pub fn with_interface(mut self, interface_type: InterfaceType) -> Self {
        self.interface_type = Some(interface_type);
        self
    }
    /// `gl_*` built-in
    pub fn is_builtin(&self) -> bool {
        self.name.starts_with("gl_")
    }
    /// the variable is the instance of an interface block, or an array of them
    pub fn is_interface_instance(&self) -> bool {
        self.var_type.without_array().is_interface()
    }
    /// member of an unnamed interface block
    pub fn is_in_unnamed_interface_block(&self) -> bool {
        self.interface_type.is_some() && !self.is_interface_instance()
    }
    /// member of a uniform or shader storage block
    pub fn is_in_buffer_block(&self) -> bool {
        self.mode.is_in_buffer_or_uniform() && self.interface_type.is_some()
    }
    /// member of a shader storage block
    pub fn is_in_shader_storage_block(&self) -> bool {
        self.mode == VariableMode::ShaderStorage && self.interface_type.is_some()
    }
    /// the variable's interface block name when it is part of one
    pub fn interface_name(&self) -> Option<&str> {
        self.interface_type.as_ref().map(|v| v.name.as_str())
    }
    /// record an access of array element `index`
    pub fn note_array_access(&mut self, index: i32) {
        self.max_array_access = self.max_array_access.max(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InterfacePacking;
    use crate::types::StructField;

    #[test]
    fn test_variable_builders() {
        let v = Variable::new("color", Type::vec(4), VariableMode::ShaderOut)
            .with_location(2)
            .with_component(0);
        assert!(v.data.explicit_location);
        assert_eq!(v.data.location, 2);
        assert!(!v.is_builtin());
        assert!(!v.is_interface_instance());
        let block = InterfaceType {
            name: "Block".into(),
            fields: vec![StructField::new("m", Type::float())],
            packing: InterfacePacking::Std140,
            row_major: false,
        };
        let member = Variable::new("m", Type::float(), VariableMode::Uniform)
            .with_interface(block.clone());
        assert!(member.is_in_unnamed_interface_block());
        assert!(member.is_in_buffer_block());
        let instance =
            Variable::new("b", Type::array(block.clone().into(), 2), VariableMode::Uniform)
                .with_interface(block);
        assert!(instance.is_interface_instance());
        assert!(!instance.is_in_unnamed_interface_block());
        assert_eq!(instance.interface_name(), Some("Block"));
    }
}
