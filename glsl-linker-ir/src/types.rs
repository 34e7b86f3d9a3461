// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! GLSL types and their layout rules

use std::fmt;

/// round `value` up to the next multiple of `alignment`
///
/// ```
/// # use glsl_linker_ir::types::align_up;
/// assert_eq!(align_up(13, 4), 16);
/// assert_eq!(align_up(16, 16), 16);
/// assert_eq!(align_up(5, 0), 5);
/// ```
pub const fn align_up(value: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        value
    } else {
        (value + alignment - 1) / alignment * alignment
    }
}

/// scalar component kinds
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScalarKind {
    /// `float`
    Float,
    /// `double`
    Double,
    /// `float16_t`
    Float16,
    /// `int`
    Int,
    /// `uint`
    Uint,
    /// `int64_t`
    Int64,
    /// `uint64_t`
    Uint64,
    /// `bool`
    Bool,
}

impl ScalarKind {
    /// the size of one component in bytes when stored in a buffer
    pub fn byte_size(self) -> u32 {
        match self {
            Self::Float16 => 2,
            Self::Float | Self::Int | Self::Uint | Self::Bool => 4,
            Self::Double | Self::Int64 | Self::Uint64 => 8,
        }
    }
    /// `true` for 64-bit kinds
    pub fn is_64bit(self) -> bool {
        self.byte_size() == 8
    }
    /// `true` for integer kinds
    pub fn is_integer(self) -> bool {
        match self {
            Self::Int | Self::Uint | Self::Int64 | Self::Uint64 => true,
            Self::Float | Self::Double | Self::Float16 | Self::Bool => false,
        }
    }
    /// `true` for floating-point kinds
    pub fn is_float(self) -> bool {
        match self {
            Self::Float | Self::Double | Self::Float16 => true,
            _ => false,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Double => "double",
            Self::Float16 => "float16_t",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Int64 => "int64_t",
            Self::Uint64 => "uint64_t",
            Self::Bool => "bool",
        }
    }
    fn vector_prefix(self) -> &'static str {
        match self {
            Self::Float => "",
            Self::Double => "d",
            Self::Float16 => "f16",
            Self::Int => "i",
            Self::Uint => "u",
            Self::Int64 => "i64",
            Self::Uint64 => "u64",
            Self::Bool => "b",
        }
    }
}

/// the base type of a type, ignoring its shape
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum BaseType {
    Float,
    Double,
    Float16,
    Int,
    Uint,
    Int64,
    Uint64,
    Bool,
    Sampler,
    Image,
    AtomicUint,
    Subroutine,
    Struct,
    Interface,
    Array,
    Void,
}

impl From<ScalarKind> for BaseType {
    fn from(v: ScalarKind) -> Self {
        match v {
            ScalarKind::Float => Self::Float,
            ScalarKind::Double => Self::Double,
            ScalarKind::Float16 => Self::Float16,
            ScalarKind::Int => Self::Int,
            ScalarKind::Uint => Self::Uint,
            ScalarKind::Int64 => Self::Int64,
            ScalarKind::Uint64 => Self::Uint64,
            ScalarKind::Bool => Self::Bool,
        }
    }
}

/// texture dimensionality of samplers and images
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum SamplerDim {
    Dim1D,
    Dim2D,
    Dim3D,
    Cube,
    Rect,
    Buffer,
    External,
    Ms,
    Subpass,
    SubpassMs,
}

impl SamplerDim {
    fn name(self) -> &'static str {
        match self {
            Self::Dim1D => "1D",
            Self::Dim2D => "2D",
            Self::Dim3D => "3D",
            Self::Cube => "Cube",
            Self::Rect => "2DRect",
            Self::Buffer => "Buffer",
            Self::External => "ExternalOES",
            Self::Ms => "2DMS",
            Self::Subpass => "Input",
            Self::SubpassMs => "InputMS",
        }
    }
}

/// a `sampler*` type
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SamplerType {
    /// dimensionality
    pub dim: SamplerDim,
    /// shadow comparison sampler
    pub shadow: bool,
    /// array sampler
    pub arrayed: bool,
    /// the type of the returned texels
    pub sampled: ScalarKind,
}

/// an `image*` type
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ImageType {
    /// dimensionality
    pub dim: SamplerDim,
    /// array image
    pub arrayed: bool,
    /// the type of the texels
    pub sampled: ScalarKind,
}

/// interpolation qualifier
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Interpolation {
    /// no qualifier given
    None,
    /// `smooth`
    Smooth,
    /// `flat`
    Flat,
    /// `noperspective`
    NoPerspective,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::None
    }
}

impl Interpolation {
    /// the GLSL spelling of the qualifier
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "no",
            Self::Smooth => "smooth",
            Self::Flat => "flat",
            Self::NoPerspective => "noperspective",
        }
    }
}

/// precision qualifier
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum Precision {
    None,
    High,
    Medium,
    Low,
}

impl Default for Precision {
    fn default() -> Self {
        Precision::None
    }
}

/// matrix layout qualifier of a block member
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum MatrixLayout {
    Inherited,
    ColumnMajor,
    RowMajor,
}

impl Default for MatrixLayout {
    fn default() -> Self {
        MatrixLayout::Inherited
    }
}

impl MatrixLayout {
    /// resolve the member's majorness given the enclosing majorness
    pub fn is_row_major(self, enclosing_row_major: bool) -> bool {
        match self {
            Self::Inherited => enclosing_row_major,
            Self::ColumnMajor => false,
            Self::RowMajor => true,
        }
    }
}

/// memory layout of an interface block
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum InterfacePacking {
    Std140,
    Shared,
    Packed,
    Std430,
}

impl InterfacePacking {
    /// the GLSL spelling of the qualifier
    pub fn name(self) -> &'static str {
        match self {
            Self::Std140 => "std140",
            Self::Shared => "shared",
            Self::Packed => "packed",
            Self::Std430 => "std430",
        }
    }
}

/// member of a struct or interface block
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StructField {
    /// member name
    pub name: String,
    /// member type
    pub field_type: Type,
    /// precision qualifier
    pub precision: Precision,
    /// explicit `location`
    pub location: Option<u32>,
    /// explicit `component`
    pub component: Option<u32>,
    /// explicit `offset`
    pub offset: Option<u32>,
    /// explicit `xfb_buffer`
    pub xfb_buffer: Option<u32>,
    /// explicit `xfb_offset`
    pub xfb_offset: Option<u32>,
    /// explicit `xfb_stride`
    pub xfb_stride: Option<u32>,
    /// interpolation qualifier
    pub interpolation: Interpolation,
    /// `centroid`
    pub centroid: bool,
    /// `sample`
    pub sample: bool,
    /// `patch`
    pub patch: bool,
    /// `row_major`/`column_major`
    pub matrix_layout: MatrixLayout,
    /// `readonly` buffer member
    pub memory_read_only: bool,
    /// `writeonly` buffer member
    pub memory_write_only: bool,
    /// `coherent` buffer member
    pub memory_coherent: bool,
    /// `volatile` buffer member
    pub memory_volatile: bool,
    /// `restrict` buffer member
    pub memory_restrict: bool,
    /// array declared without size and sized from its accesses
    pub implicit_sized_array: bool,
}

impl StructField {
    /// a member with no qualifiers
    pub fn new(name: impl Into<String>, field_type: Type) -> Self {
        Self {
            name: name.into(),
            field_type,
            precision: Precision::None,
            location: None,
            component: None,
            offset: None,
            xfb_buffer: None,
            xfb_offset: None,
            xfb_stride: None,
            interpolation: Interpolation::None,
            centroid: false,
            sample: false,
            patch: false,
            matrix_layout: MatrixLayout::Inherited,
            memory_read_only: false,
            memory_write_only: false,
            memory_coherent: false,
            memory_volatile: false,
            memory_restrict: false,
            implicit_sized_array: false,
        }
    }
    fn compare(&self, rhs: &Self, match_locations: bool, match_precision: bool) -> bool {
        self.name == rhs.name
            && self.field_type.compare(&rhs.field_type, match_precision)
            && self.matrix_layout == rhs.matrix_layout
            && (!match_locations || self.location == rhs.location)
            && self.component == rhs.component
            && self.offset == rhs.offset
            && self.interpolation == rhs.interpolation
            && self.centroid == rhs.centroid
            && self.sample == rhs.sample
            && self.patch == rhs.patch
            && self.memory_read_only == rhs.memory_read_only
            && self.memory_write_only == rhs.memory_write_only
            && self.memory_coherent == rhs.memory_coherent
            && self.memory_volatile == rhs.memory_volatile
            && self.memory_restrict == rhs.memory_restrict
            && (!match_precision || self.precision == rhs.precision)
            && self.xfb_buffer == rhs.xfb_buffer
            && self.xfb_offset == rhs.xfb_offset
    }
}

/// a `struct` type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StructType {
    /// type name
    pub name: String,
    /// members in declaration order
    pub fields: Vec<StructField>,
}

/// the type of an interface block
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct InterfaceType {
    /// block name
    pub name: String,
    /// members in declaration order
    pub fields: Vec<StructField>,
    /// memory layout
    pub packing: InterfacePacking,
    /// block-level `row_major`
    pub row_major: bool,
}

/// a GLSL type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    /// `void`
    Void,
    /// scalar
    Scalar(ScalarKind),
    /// vector of 2 to 4 components
    Vector {
        /// component kind
        kind: ScalarKind,
        /// component count
        components: u32,
    },
    /// matrix
    Matrix {
        /// component kind
        kind: ScalarKind,
        /// column count
        columns: u32,
        /// row count
        rows: u32,
    },
    /// sampler
    Sampler(SamplerType),
    /// image
    Image(ImageType),
    /// `atomic_uint`
    AtomicUint,
    /// subroutine type, by name
    Subroutine(String),
    /// struct
    Struct(StructType),
    /// interface block
    Interface(InterfaceType),
    /// array, unsized when `length` is `None`
    Array {
        /// element type
        element: Box<Type>,
        /// element count
        length: Option<u32>,
    },
}

impl Default for Type {
    fn default() -> Self {
        Type::Void
    }
}

impl From<ScalarKind> for Type {
    fn from(v: ScalarKind) -> Self {
        Type::Scalar(v)
    }
}

impl From<StructType> for Type {
    fn from(v: StructType) -> Self {
        Type::Struct(v)
    }
}

impl From<InterfaceType> for Type {
    fn from(v: InterfaceType) -> Self {
        Type::Interface(v)
    }
}

impl From<SamplerType> for Type {
    fn from(v: SamplerType) -> Self {
        Type::Sampler(v)
    }
}

impl From<ImageType> for Type {
    fn from(v: ImageType) -> Self {
        Type::Image(v)
    }
}

impl Type {
    /// `float`
    pub fn float() -> Self {
        Type::Scalar(ScalarKind::Float)
    }
    /// `double`
    pub fn double() -> Self {
        Type::Scalar(ScalarKind::Double)
    }
    /// `int`
    pub fn int() -> Self {
        Type::Scalar(ScalarKind::Int)
    }
    /// `uint`
    pub fn uint() -> Self {
        Type::Scalar(ScalarKind::Uint)
    }
    /// `bool`
    pub fn bool() -> Self {
        Type::Scalar(ScalarKind::Bool)
    }
    /// vector of `components` elements; a scalar when `components == 1`
    pub fn vector(kind: ScalarKind, components: u32) -> Self {
        assert!((1..=4).contains(&components), "invalid vector size");
        if components == 1 {
            Type::Scalar(kind)
        } else {
            Type::Vector { kind, components }
        }
    }
    /// `vecN`
    pub fn vec(components: u32) -> Self {
        Self::vector(ScalarKind::Float, components)
    }
    /// matrix; a vector when `columns == 1`
    pub fn matrix(kind: ScalarKind, columns: u32, rows: u32) -> Self {
        if columns == 1 {
            Self::vector(kind, rows)
        } else {
            Type::Matrix {
                kind,
                columns,
                rows,
            }
        }
    }
    /// `matCxR`
    pub fn mat(columns: u32, rows: u32) -> Self {
        Self::matrix(ScalarKind::Float, columns, rows)
    }
    /// `element[length]`
    pub fn array(element: Type, length: u32) -> Self {
        Type::Array {
            element: Box::new(element),
            length: Some(length),
        }
    }
    /// `element[]`
    pub fn unsized_array(element: Type) -> Self {
        Type::Array {
            element: Box::new(element),
            length: None,
        }
    }
    /// the base type
    pub fn base_type(&self) -> BaseType {
        match self {
            Type::Void => BaseType::Void,
            Type::Scalar(kind) | Type::Vector { kind, .. } | Type::Matrix { kind, .. } => {
                (*kind).into()
            }
            Type::Sampler(_) => BaseType::Sampler,
            Type::Image(_) => BaseType::Image,
            Type::AtomicUint => BaseType::AtomicUint,
            Type::Subroutine(_) => BaseType::Subroutine,
            Type::Struct(_) => BaseType::Struct,
            Type::Interface(_) => BaseType::Interface,
            Type::Array { .. } => BaseType::Array,
        }
    }
    /// the scalar kind of scalars, vectors and matrices
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(kind) | Type::Vector { kind, .. } | Type::Matrix { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }
    /// number of rows; 1 for scalars, 0 for non-numeric types
    pub fn vector_elements(&self) -> u32 {
        match self {
            Type::Scalar(_) => 1,
            Type::Vector { components, .. } => *components,
            Type::Matrix { rows, .. } => *rows,
            _ => 0,
        }
    }
    /// number of columns; 1 for scalars and vectors, 0 for non-numeric types
    pub fn matrix_columns(&self) -> u32 {
        match self {
            Type::Scalar(_) | Type::Vector { .. } => 1,
            Type::Matrix { columns, .. } => *columns,
            _ => 0,
        }
    }
    /// total number of scalar components of scalars, vectors and matrices
    pub fn components(&self) -> u32 {
        self.vector_elements() * self.matrix_columns()
    }
    /// the type of one column of a matrix, or `self` for vectors and scalars
    pub fn column_type(&self) -> Type {
        match *self {
            Type::Matrix { kind, rows, .. } => Type::vector(kind, rows),
            _ => self.clone(),
        }
    }
    #[allow(missing_docs)]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }
    #[allow(missing_docs)]
    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector { .. })
    }
    #[allow(missing_docs)]
    pub fn is_matrix(&self) -> bool {
        matches!(self, Type::Matrix { .. })
    }
    /// numeric scalars, vectors and matrices, excluding `bool`
    pub fn is_numeric(&self) -> bool {
        match self.scalar_kind() {
            Some(ScalarKind::Bool) | None => false,
            Some(_) => true,
        }
    }
    /// integer scalars and vectors
    pub fn is_integer(&self) -> bool {
        match self {
            Type::Scalar(kind) | Type::Vector { kind, .. } => kind.is_integer(),
            _ => false,
        }
    }
    /// boolean scalars and vectors
    pub fn is_boolean(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Bool)
    }
    /// 64-bit numeric types
    pub fn is_64bit(&self) -> bool {
        self.scalar_kind().map_or(false, ScalarKind::is_64bit)
    }
    /// 64-bit vectors or matrices with more than two rows, which take two slots per column
    pub fn is_dual_slot(&self) -> bool {
        self.is_64bit() && self.vector_elements() > 2
    }
    #[allow(missing_docs)]
    pub fn is_sampler(&self) -> bool {
        matches!(self, Type::Sampler(_))
    }
    #[allow(missing_docs)]
    pub fn is_image(&self) -> bool {
        matches!(self, Type::Image(_))
    }
    #[allow(missing_docs)]
    pub fn is_atomic_uint(&self) -> bool {
        matches!(self, Type::AtomicUint)
    }
    #[allow(missing_docs)]
    pub fn is_subroutine(&self) -> bool {
        matches!(self, Type::Subroutine(_))
    }
    /// samplers, images and atomic counters
    pub fn is_opaque(&self) -> bool {
        matches!(self, Type::Sampler(_) | Type::Image(_) | Type::AtomicUint)
    }
    #[allow(missing_docs)]
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }
    /// array whose outermost dimension has no size
    pub fn is_unsized_array(&self) -> bool {
        matches!(self, Type::Array { length: None, .. })
    }
    #[allow(missing_docs)]
    pub fn is_record(&self) -> bool {
        matches!(self, Type::Struct(_))
    }
    #[allow(missing_docs)]
    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface(_))
    }
    #[allow(missing_docs)]
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
    /// the element type of an array
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }
    /// strip all array dimensions
    pub fn without_array(&self) -> &Type {
        let mut retval = self;
        while let Type::Array { element, .. } = retval {
            retval = element;
        }
        retval
    }
    /// the size of the outermost array dimension; `None` for non-arrays and unsized arrays
    pub fn array_size(&self) -> Option<u32> {
        match self {
            Type::Array { length, .. } => *length,
            _ => None,
        }
    }
    /// product of all array dimensions; 0 for non-arrays and unsized arrays
    pub fn arrays_of_arrays_size(&self) -> u32 {
        if !self.is_array() {
            return 0;
        }
        let mut size = 1;
        let mut t = self;
        while let Type::Array { element, length } = t {
            size *= length.unwrap_or(0);
            t = element;
        }
        size
    }
    /// the members of structs and interface blocks
    pub fn fields(&self) -> Option<&[StructField]> {
        match self {
            Type::Struct(v) => Some(&v.fields),
            Type::Interface(v) => Some(&v.fields),
            _ => None,
        }
    }
    /// the member index of `name` in a struct or interface block
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields()?.iter().position(|field| field.name == name)
    }
    /// the type of member `name`
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields()?
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.field_type)
    }
    /// the interface block type, if any
    pub fn interface(&self) -> Option<&InterfaceType> {
        match self {
            Type::Interface(v) => Some(v),
            _ => None,
        }
    }
    /// rebuild this type with its innermost non-array type replaced
    pub fn with_innermost(&self, innermost: Type) -> Type {
        match self {
            Type::Array { element, length } => Type::Array {
                element: Box::new(element.with_innermost(innermost)),
                length: *length,
            },
            _ => innermost,
        }
    }
    fn contains(&self, predicate: &impl Fn(&Type) -> bool) -> bool {
        if predicate(self) {
            return true;
        }
        match self {
            Type::Array { element, .. } => element.contains(predicate),
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => {
                fields.iter().any(|field| field.field_type.contains(predicate))
            }
            _ => false,
        }
    }
    /// contains a sampler, image or atomic counter
    pub fn contains_opaque(&self) -> bool {
        self.contains(&Type::is_opaque)
    }
    #[allow(missing_docs)]
    pub fn contains_sampler(&self) -> bool {
        self.contains(&Type::is_sampler)
    }
    #[allow(missing_docs)]
    pub fn contains_image(&self) -> bool {
        self.contains(&Type::is_image)
    }
    #[allow(missing_docs)]
    pub fn contains_atomic(&self) -> bool {
        self.contains(&Type::is_atomic_uint)
    }
    #[allow(missing_docs)]
    pub fn contains_subroutine(&self) -> bool {
        self.contains(&Type::is_subroutine)
    }
    #[allow(missing_docs)]
    pub fn contains_double(&self) -> bool {
        self.contains(&|t: &Type| t.scalar_kind() == Some(ScalarKind::Double))
    }
    #[allow(missing_docs)]
    pub fn contains_64bit(&self) -> bool {
        self.contains(&Type::is_64bit)
    }
    /// contains integer or boolean components
    pub fn contains_integer(&self) -> bool {
        self.contains(&|t: &Type| {
            t.scalar_kind()
                .map_or(false, |kind| kind.is_integer() || kind == ScalarKind::Bool)
        })
    }
    #[allow(missing_docs)]
    pub fn contains_array(&self) -> bool {
        self.contains(&Type::is_array)
    }
    #[allow(missing_docs)]
    pub fn contains_record(&self) -> bool {
        self.contains(&Type::is_record)
    }
    /// number of vertex attribute or varying slots this type takes
    pub fn count_attribute_slots(&self, is_vertex_input: bool) -> u32 {
        match self {
            Type::Scalar(_) | Type::Vector { .. } | Type::Matrix { .. } => {
                if self.is_dual_slot() && !is_vertex_input {
                    self.matrix_columns() * 2
                } else {
                    self.matrix_columns()
                }
            }
            Type::Sampler(_) | Type::Image(_) | Type::Subroutine(_) => 1,
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => fields
                .iter()
                .map(|field| field.field_type.count_attribute_slots(is_vertex_input))
                .sum(),
            Type::Array { element, length } => {
                length.unwrap_or(0) * element.count_attribute_slots(is_vertex_input)
            }
            Type::AtomicUint | Type::Void => 0,
        }
    }
    /// number of vec4 slots this type takes; opaque types only take space when bindless
    pub fn count_vec4_slots(&self, is_vertex_input: bool, is_bindless: bool) -> u32 {
        match self {
            Type::Sampler(_) | Type::Image(_) => {
                if is_bindless {
                    1
                } else {
                    0
                }
            }
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => fields
                .iter()
                .map(|field| {
                    field
                        .field_type
                        .count_vec4_slots(is_vertex_input, is_bindless)
                })
                .sum(),
            Type::Array { element, length } => {
                length.unwrap_or(0) * element.count_vec4_slots(is_vertex_input, is_bindless)
            }
            _ => self.count_attribute_slots(is_vertex_input),
        }
    }
    /// number of 32-bit components this type takes in the default uniform block or as a
    /// varying
    pub fn component_slots(&self) -> u32 {
        match self {
            Type::Scalar(kind) | Type::Vector { kind, .. } | Type::Matrix { kind, .. } => {
                self.components() * if kind.is_64bit() { 2 } else { 1 }
            }
            Type::Sampler(_) | Type::Image(_) => 2,
            Type::Subroutine(_) => 1,
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => fields
                .iter()
                .map(|field| field.field_type.component_slots())
                .sum(),
            Type::Array { element, length } => length.unwrap_or(0) * element.component_slots(),
            Type::AtomicUint | Type::Void => 0,
        }
    }
    /// number of uniform locations this type takes
    pub fn uniform_locations(&self) -> u32 {
        match self {
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => fields
                .iter()
                .map(|field| field.field_type.uniform_locations())
                .sum(),
            Type::Array { element, length } => length.unwrap_or(0) * element.uniform_locations(),
            Type::Void => 0,
            _ => 1,
        }
    }
    /// std140 base alignment in bytes
    pub fn std140_base_alignment(&self, row_major: bool) -> u32 {
        match self {
            Type::Scalar(kind) | Type::Vector { kind, .. } => {
                let n = kind.byte_size();
                match self.vector_elements() {
                    1 => n,
                    2 => 2 * n,
                    _ => 4 * n,
                }
            }
            Type::Array { element, .. } => match **element {
                Type::Scalar(_) | Type::Vector { .. } | Type::Matrix { .. } => {
                    element.std140_base_alignment(row_major).max(16)
                }
                _ => element.std140_base_alignment(row_major),
            },
            Type::Matrix {
                kind,
                columns,
                rows,
            } => {
                let (vector_size, count) = if row_major {
                    (*columns, *rows)
                } else {
                    (*rows, *columns)
                };
                Type::array(Type::vector(*kind, vector_size), count).std140_base_alignment(false)
            }
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => {
                let mut base_alignment = 16;
                for field in fields {
                    let field_row_major = field.matrix_layout.is_row_major(row_major);
                    base_alignment = base_alignment
                        .max(field.field_type.std140_base_alignment(field_row_major));
                }
                base_alignment
            }
            Type::Sampler(_) | Type::Image(_) => 8,
            Type::AtomicUint | Type::Subroutine(_) | Type::Void => 4,
        }
    }
    /// std140 size in bytes; unsized array members of blocks don't contribute
    pub fn std140_size(&self, row_major: bool) -> u32 {
        if let Type::Matrix {
            kind,
            columns,
            rows,
        } = self.without_array()
        {
            let mut array_length = if self.is_array() {
                self.arrays_of_arrays_size()
            } else {
                1
            };
            let vector_type = if row_major {
                array_length *= rows;
                Type::vector(*kind, *columns)
            } else {
                array_length *= columns;
                Type::vector(*kind, *rows)
            };
            return Type::array(vector_type, array_length).std140_size(false);
        }
        match self {
            Type::Scalar(kind) | Type::Vector { kind, .. } => {
                self.vector_elements() * kind.byte_size()
            }
            Type::Array { .. } => {
                let element = self.without_array();
                let stride = if element.is_record() {
                    element.std140_size(row_major)
                } else {
                    element.std140_base_alignment(row_major).max(16)
                };
                self.arrays_of_arrays_size() * stride
            }
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => {
                let mut size = 0;
                let mut max_alignment = 0;
                for (index, field) in fields.iter().enumerate() {
                    let field_row_major = field.matrix_layout.is_row_major(row_major);
                    let field_type = &field.field_type;
                    let base_alignment = field_type.std140_base_alignment(field_row_major);
                    if field_type.is_unsized_array() {
                        continue;
                    }
                    size = align_up(size, base_alignment);
                    size += field_type.std140_size(field_row_major);
                    max_alignment = max_alignment.max(base_alignment);
                    if field_type.is_record() && index + 1 < fields.len() {
                        size = align_up(size, 16);
                    }
                }
                align_up(size, max_alignment.max(16))
            }
            Type::Sampler(_) | Type::Image(_) => 8,
            Type::Matrix { .. } => unreachable!("handled above"),
            Type::AtomicUint | Type::Subroutine(_) | Type::Void => 4,
        }
    }
    /// std430 base alignment in bytes
    pub fn std430_base_alignment(&self, row_major: bool) -> u32 {
        match self {
            Type::Scalar(kind) | Type::Vector { kind, .. } => {
                let n = kind.byte_size();
                match self.vector_elements() {
                    1 => n,
                    2 => 2 * n,
                    _ => 4 * n,
                }
            }
            Type::Array { element, .. } => element.std430_base_alignment(row_major),
            Type::Matrix {
                kind,
                columns,
                rows,
            } => {
                let vector_size = if row_major { *columns } else { *rows };
                Type::vector(*kind, vector_size).std430_base_alignment(false)
            }
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => {
                let mut base_alignment = 0;
                for field in fields {
                    let field_row_major = field.matrix_layout.is_row_major(row_major);
                    base_alignment = base_alignment
                        .max(field.field_type.std430_base_alignment(field_row_major));
                }
                base_alignment
            }
            Type::Sampler(_) | Type::Image(_) => 8,
            Type::AtomicUint | Type::Subroutine(_) | Type::Void => 4,
        }
    }
    /// std430 array stride of an array with elements of this type
    pub fn std430_array_stride(&self, row_major: bool) -> u32 {
        match self {
            Type::Vector {
                kind,
                components: 3,
            } => 4 * kind.byte_size(),
            _ => self.std430_size(row_major),
        }
    }
    /// std430 size in bytes; unsized array members of blocks don't contribute
    pub fn std430_size(&self, row_major: bool) -> u32 {
        if let Type::Matrix {
            kind,
            columns,
            rows,
        } = self.without_array()
        {
            let mut array_length = if self.is_array() {
                self.arrays_of_arrays_size()
            } else {
                1
            };
            let vector_type = if row_major {
                array_length *= rows;
                Type::vector(*kind, *columns)
            } else {
                array_length *= columns;
                Type::vector(*kind, *rows)
            };
            return Type::array(vector_type, array_length).std430_size(false);
        }
        match self {
            Type::Scalar(kind) | Type::Vector { kind, .. } => {
                self.vector_elements() * kind.byte_size()
            }
            Type::Array { .. } => {
                let element = self.without_array();
                let stride = if element.is_record() {
                    element.std430_size(row_major)
                } else {
                    element.std430_array_stride(row_major)
                };
                self.arrays_of_arrays_size() * stride
            }
            Type::Struct(StructType { fields, .. })
            | Type::Interface(InterfaceType { fields, .. }) => {
                let mut size = 0;
                let mut max_alignment = 0;
                for field in fields {
                    let field_row_major = field.matrix_layout.is_row_major(row_major);
                    let field_type = &field.field_type;
                    let base_alignment = field_type.std430_base_alignment(field_row_major);
                    if field_type.is_unsized_array() {
                        continue;
                    }
                    size = align_up(size, base_alignment);
                    size += field_type.std430_size(field_row_major);
                    max_alignment = max_alignment.max(base_alignment);
                }
                align_up(size, max_alignment)
            }
            Type::Sampler(_) | Type::Image(_) => 8,
            Type::Matrix { .. } => unreachable!("handled above"),
            Type::AtomicUint | Type::Subroutine(_) | Type::Void => 4,
        }
    }
    /// structural equality; precision qualifiers of members only matter when
    /// `match_precision` is set
    pub fn compare(&self, rhs: &Type, match_precision: bool) -> bool {
        match (self, rhs) {
            (Type::Struct(lhs), Type::Struct(rhs)) => lhs.name == rhs.name
                && fields_compare(&lhs.fields, &rhs.fields, true, match_precision),
            (Type::Interface(lhs), Type::Interface(rhs)) => {
                record_compare_interfaces(lhs, rhs, true, true, match_precision)
            }
            (
                Type::Array {
                    element: lhs_element,
                    length: lhs_length,
                },
                Type::Array {
                    element: rhs_element,
                    length: rhs_length,
                },
            ) => lhs_length == rhs_length && lhs_element.compare(rhs_element, match_precision),
            _ => self == rhs,
        }
    }
    /// compare two struct or interface types member-for-member
    pub fn record_compare(
        &self,
        rhs: &Type,
        match_name: bool,
        match_locations: bool,
        match_precision: bool,
    ) -> bool {
        match (self, rhs) {
            (Type::Struct(lhs), Type::Struct(rhs)) => {
                (!match_name || lhs.name == rhs.name)
                    && fields_compare(&lhs.fields, &rhs.fields, match_locations, match_precision)
            }
            (Type::Interface(lhs), Type::Interface(rhs)) => {
                record_compare_interfaces(lhs, rhs, match_name, match_locations, match_precision)
            }
            _ => false,
        }
    }
    /// the GLSL spelling of the type
    pub fn name(&self) -> String {
        self.to_string()
    }
}

fn fields_compare(
    lhs: &[StructField],
    rhs: &[StructField],
    match_locations: bool,
    match_precision: bool,
) -> bool {
    lhs.len() == rhs.len()
        && lhs
            .iter()
            .zip(rhs)
            .all(|(lhs, rhs)| lhs.compare(rhs, match_locations, match_precision))
}

fn record_compare_interfaces(
    lhs: &InterfaceType,
    rhs: &InterfaceType,
    match_name: bool,
    match_locations: bool,
    match_precision: bool,
) -> bool {
    lhs.packing == rhs.packing
        && lhs.row_major == rhs.row_major
        && (!match_name || lhs.name == rhs.name)
        && fields_compare(&lhs.fields, &rhs.fields, match_locations, match_precision)
}

impl InterfaceType {
    /// member-for-member equality of two block types
    pub fn compare(
        &self,
        rhs: &InterfaceType,
        match_name: bool,
        match_locations: bool,
        match_precision: bool,
    ) -> bool {
        record_compare_interfaces(self, rhs, match_name, match_locations, match_precision)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Scalar(kind) => write!(f, "{}", kind.name()),
            Type::Vector { kind, components } => {
                write!(f, "{}vec{}", kind.vector_prefix(), components)
            }
            Type::Matrix {
                kind,
                columns,
                rows,
            } => {
                let prefix = if *kind == ScalarKind::Double { "d" } else { "" };
                if columns == rows {
                    write!(f, "{}mat{}", prefix, columns)
                } else {
                    write!(f, "{}mat{}x{}", prefix, columns, rows)
                }
            }
            Type::Sampler(sampler) => {
                if let SamplerDim::Subpass | SamplerDim::SubpassMs = sampler.dim {
                    return write!(
                        f,
                        "{}subpass{}",
                        sampler.sampled.vector_prefix(),
                        sampler.dim.name()
                    );
                }
                write!(
                    f,
                    "{}sampler{}{}{}",
                    sampler.sampled.vector_prefix(),
                    sampler.dim.name(),
                    if sampler.arrayed { "Array" } else { "" },
                    if sampler.shadow { "Shadow" } else { "" }
                )
            }
            Type::Image(image) => write!(
                f,
                "{}image{}{}",
                image.sampled.vector_prefix(),
                image.dim.name(),
                if image.arrayed { "Array" } else { "" }
            ),
            Type::AtomicUint => write!(f, "atomic_uint"),
            Type::Subroutine(name) => write!(f, "{}", name),
            Type::Struct(v) => write!(f, "{}", v.name),
            Type::Interface(v) => write!(f, "{}", v.name),
            Type::Array { .. } => {
                write!(f, "{}", self.without_array())?;
                let mut t = self;
                while let Type::Array { element, length } = t {
                    match length {
                        Some(length) => write!(f, "[{}]", length)?,
                        None => write!(f, "[]")?,
                    }
                    t = element;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(fields: Vec<(&str, Type)>, packing: InterfacePacking) -> Type {
        Type::Interface(InterfaceType {
            name: "Block".into(),
            fields: fields
                .into_iter()
                .map(|(name, t)| StructField::new(name, t))
                .collect(),
            packing,
            row_major: false,
        })
    }

    #[test]
    fn test_names() {
        assert_eq!(Type::float().name(), "float");
        assert_eq!(Type::vec(3).name(), "vec3");
        assert_eq!(Type::vector(ScalarKind::Uint, 2).name(), "uvec2");
        assert_eq!(Type::mat(4, 4).name(), "mat4");
        assert_eq!(Type::mat(2, 3).name(), "mat2x3");
        assert_eq!(
            Type::array(Type::array(Type::float(), 3), 2).name(),
            "float[2][3]"
        );
        assert_eq!(Type::unsized_array(Type::vec(4)).name(), "vec4[]");
        assert_eq!(
            Type::Sampler(SamplerType {
                dim: SamplerDim::Dim2D,
                shadow: true,
                arrayed: true,
                sampled: ScalarKind::Float,
            })
            .name(),
            "sampler2DArrayShadow"
        );
    }

    #[test]
    fn test_slot_counts() {
        let dvec4 = Type::vector(ScalarKind::Double, 4);
        assert_eq!(dvec4.count_attribute_slots(false), 2);
        assert_eq!(dvec4.count_attribute_slots(true), 1);
        assert_eq!(Type::mat(3, 3).count_attribute_slots(false), 3);
        assert_eq!(Type::array(Type::vec(2), 5).count_attribute_slots(false), 5);
        assert_eq!(Type::mat(4, 4).component_slots(), 16);
        assert_eq!(dvec4.component_slots(), 8);
        assert_eq!(Type::array(Type::mat(4, 4), 2).uniform_locations(), 2);
        assert_eq!(Type::array(Type::array(Type::float(), 3), 2).arrays_of_arrays_size(), 6);
    }

    #[test]
    fn test_std140_layout() {
        let t = block(
            vec![("a", Type::float()), ("b", Type::vec(3)), ("c", Type::float())],
            InterfacePacking::Std140,
        );
        assert_eq!(t.std140_size(false), 32);
        assert_eq!(t.std140_base_alignment(false), 16);
        assert_eq!(Type::array(Type::float(), 4).std140_size(false), 64);
        assert_eq!(Type::mat(3, 3).std140_size(false), 48);
        assert_eq!(Type::mat(2, 2).std140_size(false), 32);
        assert_eq!(Type::mat(4, 2).std140_size(true), 32);
        assert_eq!(Type::vector(ScalarKind::Double, 3).std140_base_alignment(false), 32);
    }

    #[test]
    fn test_std430_layout() {
        let t = block(
            vec![("a", Type::float()), ("b", Type::vec(3)), ("c", Type::float())],
            InterfacePacking::Std430,
        );
        assert_eq!(t.std430_size(false), 32);
        assert_eq!(Type::vec(2).std430_array_stride(false), 8);
        assert_eq!(Type::vec(3).std430_array_stride(false), 16);
        assert_eq!(Type::array(Type::float(), 4).std430_size(false), 16);
        assert_eq!(Type::mat(2, 2).std430_size(false), 16);
        assert_eq!(Type::mat(3, 3).std430_size(false), 48);
    }

    #[test]
    fn test_record_compare_ignores_precision() {
        let mut lhs = StructField::new("x", Type::float());
        lhs.precision = Precision::High;
        let rhs = StructField::new("x", Type::float());
        let lhs = Type::Struct(StructType {
            name: "S".into(),
            fields: vec![lhs],
        });
        let rhs = Type::Struct(StructType {
            name: "S".into(),
            fields: vec![rhs],
        });
        assert_ne!(lhs, rhs);
        assert!(lhs.compare(&rhs, false));
        assert!(!lhs.compare(&rhs, true));
        assert!(lhs.record_compare(&rhs, true, true, false));
    }
}
