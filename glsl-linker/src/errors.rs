// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use std::error::Error;
use std::fmt;

macro_rules! impl_error {
    (
        $(#[doc = $doc:expr])*
        #[display = $display:literal]
        pub struct $name:ident {
            $(
                $(#[doc = $member_doc:expr])*
                pub $member_name:ident: $member_ty:ty,
            )*
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            $(
                $(#[doc = $member_doc])*
                pub $member_name: $member_ty,
            )*
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    f,
                    $display,
                    $($member_name = self.$member_name,)*
                )
            }
        }
    };
    (
        $(#[doc = $doc:expr])*
        #[display = $display:literal]
        pub struct $name:ident;
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name;

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, $display)
            }
        }
    };
}

impl_error! {
    #[display = "function `{function}' has static recursion"]
    pub struct StaticRecursion {
        pub function: String,
    }
}

impl_error! {
    #[display = "{mode} `{name}' declared as type `{first_type}' and type `{second_type}'"]
    pub struct MismatchedGlobalType {
        pub mode: &'static str,
        pub name: String,
        pub first_type: String,
        pub second_type: String,
    }
}

impl_error! {
    #[display = "explicit locations for {mode} `{name}' have differing values ({first} and {second})"]
    pub struct MismatchedExplicitLocation {
        pub mode: &'static str,
        pub name: String,
        pub first: i32,
        pub second: i32,
    }
}

impl_error! {
    #[display = "explicit bindings for {mode} `{name}' have differing values ({first} and {second})"]
    pub struct MismatchedExplicitBinding {
        pub mode: &'static str,
        pub name: String,
        pub first: u32,
        pub second: u32,
    }
}

impl_error! {
    #[display = "offset specifications for {mode} `{name}' have differing values ({first} and {second})"]
    pub struct MismatchedExplicitOffset {
        pub mode: &'static str,
        pub name: String,
        pub first: u32,
        pub second: u32,
    }
}

impl_error! {
    #[display = "initializers for {mode} `{name}' have differing values"]
    pub struct MismatchedInitializer {
        pub mode: &'static str,
        pub name: String,
    }
}

impl_error! {
    #[display = "declarations for {mode} `{name}' have mismatching {qualifier} qualifiers"]
    pub struct MismatchedGlobalQualifier {
        pub mode: &'static str,
        pub name: String,
        pub qualifier: &'static str,
    }
}

impl_error! {
    #[display = "declarations for {mode} `{name}' are in {first} and {second}"]
    pub struct MismatchedInterfaceMembership {
        pub mode: &'static str,
        pub name: String,
        pub first: String,
        pub second: String,
    }
}

impl_error! {
    #[display = "{mode} `{name}' declared with size {size}, but accessed at index {index}"]
    pub struct ArrayAccessOutOfBounds {
        pub mode: &'static str,
        pub name: String,
        pub size: u32,
        pub index: i32,
    }
}

impl_error! {
    #[display = "gl_FragDepth: depth layout is declared here as `{current}', but it was previously declared as `{previous}'"]
    pub struct MismatchedDepthLayout {
        pub current: String,
        pub previous: String,
    }
}

impl_error! {
    #[display = "definitions of interface block `{name}' do not match"]
    pub struct MismatchedInterfaceBlock {
        pub name: String,
    }
}

impl_error! {
    #[display = "input block `{name}' is not an output of the previous stage"]
    pub struct InputBlockNotOutput {
        pub name: String,
    }
}

impl_error! {
    #[display = "{kind} block `{name}' has mismatching definitions"]
    pub struct BlockMismatchingDefinitions {
        pub kind: &'static str,
        pub name: String,
    }
}

impl_error! {
    #[display = "function `{signature}' is multiply defined"]
    pub struct MultiplyDefinedFunction {
        pub signature: String,
    }
}

impl_error! {
    #[display = "{stage} shader lacks `main'"]
    pub struct MissingMain {
        pub stage: &'static str,
    }
}

impl_error! {
    #[display = "{stage} shader defined with conflicting {qualifier} ({first} and {second})"]
    pub struct ConflictingLayoutQualifier {
        pub stage: &'static str,
        pub qualifier: &'static str,
        pub first: String,
        pub second: String,
    }
}

impl_error! {
    #[display = "{stage} shader didn't declare {qualifier}"]
    pub struct MissingLayoutQualifier {
        pub stage: &'static str,
        pub qualifier: &'static str,
    }
}

impl_error! {
    #[display = "{stage} shader has an invalid {qualifier} of {value} (maximum {max})"]
    pub struct LayoutQualifierOutOfRange {
        pub stage: &'static str,
        pub qualifier: &'static str,
        pub value: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "{stage} shader uses {group} with a local work group size that is not {requirement}"]
    pub struct InvalidDerivativeGroup {
        pub stage: &'static str,
        pub group: &'static str,
        pub requirement: &'static str,
    }
}

impl_error! {
    #[display = "unresolved reference to function `{signature}'"]
    pub struct UnresolvedFunction {
        pub signature: String,
    }
}

impl_error! {
    #[display = "{stage} shader: size of array {name} declared as {declared}, but number of {what} is {expected}"]
    pub struct PerVertexArraySizeMismatch {
        pub stage: &'static str,
        pub name: String,
        pub declared: u32,
        pub what: &'static str,
        pub expected: u32,
    }
}

impl_error! {
    #[display = "{producer_stage} shader output `{name}' declared as type `{producer_type}', but {consumer_stage} shader input declared as type `{consumer_type}'"]
    pub struct MismatchedVaryingType {
        pub producer_stage: &'static str,
        pub name: String,
        pub producer_type: String,
        pub consumer_stage: &'static str,
        pub consumer_type: String,
    }
}

impl_error! {
    #[display = "{producer_stage} shader output `{name}' {producer_has} {qualifier} qualifier, but {consumer_stage} shader input {consumer_has} {qualifier} qualifier"]
    pub struct MismatchedVaryingQualifier {
        pub producer_stage: &'static str,
        pub name: String,
        pub producer_has: &'static str,
        pub qualifier: &'static str,
        pub consumer_stage: &'static str,
        pub consumer_has: &'static str,
    }
}

impl_error! {
    #[display = "{producer_stage} shader output `{name}' specifies {producer_interpolation} interpolation qualifier, but {consumer_stage} shader input specifies {consumer_interpolation} interpolation qualifier"]
    pub struct MismatchedInterpolation {
        pub producer_stage: &'static str,
        pub name: String,
        pub producer_interpolation: &'static str,
        pub consumer_stage: &'static str,
        pub consumer_interpolation: &'static str,
    }
}

impl_error! {
    #[display = "{stage} shader has multiple {direction}puts explicitly assigned to location {location} and component {component}"]
    pub struct VaryingLocationConflict {
        pub stage: &'static str,
        pub direction: &'static str,
        pub location: u32,
        pub component: u32,
    }
}

impl_error! {
    #[display = "{stage} shader {direction}put `{name}' has invalid location {location} (maximum {max})"]
    pub struct VaryingLocationOutOfRange {
        pub stage: &'static str,
        pub direction: &'static str,
        pub name: String,
        pub location: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "{stage} shader input `{name}' has no matching output in the previous stage"]
    pub struct UnmatchedInput {
        pub stage: &'static str,
        pub name: String,
    }
}

impl_error! {
    #[display = "insufficient contiguous locations available for {name} it is possible an array or struct could not be packed between varyings with explicit locations. Try using an explicit location for arrays and structs."]
    pub struct InsufficientVaryingLocations {
        pub name: String,
    }
}

impl_error! {
    #[display = "{stage} shader uses too many {direction}put components ({count} > {max})"]
    pub struct TooManyVaryingComponents {
        pub stage: &'static str,
        pub direction: &'static str,
        pub count: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "transform feedback varying {name} undefined"]
    pub struct TransformFeedbackVaryingUndefined {
        pub name: String,
    }
}

impl_error! {
    #[display = "transform feedback varying {name} specified more than once"]
    pub struct TransformFeedbackVaryingDuplicated {
        pub name: String,
    }
}

impl_error! {
    #[display = "transform feedback varying {name} requested, but {base} is not an array"]
    pub struct TransformFeedbackSubscriptOnNonArray {
        pub name: String,
        pub base: String,
    }
}

impl_error! {
    #[display = "transform feedback varying {name} has index {index}, but the array size is {size}"]
    pub struct TransformFeedbackIndexOutOfBounds {
        pub name: String,
        pub index: u32,
        pub size: u32,
    }
}

impl_error! {
    #[display = "transform feedback varying {name} is not valid in separate attribs mode"]
    pub struct TransformFeedbackInvalidInSeparateMode {
        pub name: String,
    }
}

impl_error! {
    #[display = "transform feedback varying {name} exceeds MAX_TRANSFORM_FEEDBACK_SEPARATE_COMPONENTS ({count} > {max})"]
    pub struct TransformFeedbackSeparateComponentsExceeded {
        pub name: String,
        pub count: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "the MAX_TRANSFORM_FEEDBACK_INTERLEAVED_COMPONENTS limit has been exceeded ({count} > {max})"]
    pub struct TransformFeedbackInterleavedComponentsExceeded {
        pub count: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "the MAX_TRANSFORM_FEEDBACK_BUFFERS limit has been exceeded ({count} > {max})"]
    pub struct TransformFeedbackBuffersExceeded {
        pub count: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "variable `{name}', xfb_offset ({offset}) is causing aliasing in transform feedback buffer {buffer}"]
    pub struct TransformFeedbackAliasing {
        pub name: String,
        pub offset: u32,
        pub buffer: u32,
    }
}

impl_error! {
    #[display = "transform feedback can't capture varyings belonging to different vertex streams in a single buffer. Varying {name} writes to buffer {buffer} from stream {stream}, other varyings in the same buffer write from stream {other_stream}"]
    pub struct TransformFeedbackMixedStreams {
        pub name: String,
        pub buffer: u32,
        pub stream: u32,
        pub other_stream: u32,
    }
}

impl_error! {
    #[display = "xfb_stride {stride} for buffer {buffer} must be a multiple of {multiple}"]
    pub struct TransformFeedbackStrideMisaligned {
        pub buffer: u32,
        pub stride: u32,
        pub multiple: u32,
    }
}

impl_error! {
    #[display = "xfb_stride {stride} for buffer {buffer} exceeds MAX_TRANSFORM_FEEDBACK_INTERLEAVED_COMPONENTS ({max} components)"]
    pub struct TransformFeedbackStrideTooLarge {
        pub buffer: u32,
        pub stride: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "xfb_offset ({offset}) overflows xfb_stride ({stride}) for buffer ({buffer})"]
    pub struct TransformFeedbackOffsetOverflowsStride {
        pub offset: u32,
        pub stride: u32,
        pub buffer: u32,
    }
}

impl_error! {
    #[display = "invalid explicit location {location} specified for {kind} `{name}'"]
    pub struct InvalidExplicitAttributeLocation {
        pub kind: &'static str,
        pub name: String,
        pub location: u32,
    }
}

impl_error! {
    #[display = "insufficient contiguous locations available for {kind} `{name}'"]
    pub struct InsufficientAttributeLocations {
        pub kind: &'static str,
        pub name: String,
    }
}

impl_error! {
    #[display = "{kind} `{first}' and {kind} `{second}' both assigned to location {location}"]
    pub struct AttributeLocationAliasing {
        pub kind: &'static str,
        pub first: String,
        pub second: String,
        pub location: u32,
    }
}

impl_error! {
    #[display = "location qualifier for uniform {name} overlaps previously used location"]
    pub struct UniformLocationOverlap {
        pub name: String,
    }
}

impl_error! {
    #[display = "count of uniform locations > MAX_UNIFORM_LOCATIONS ({count} > {max})"]
    pub struct TooManyUniformLocations {
        pub count: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "too many {stage} shader {kind} ({count} > {max})"]
    pub struct TooManyStageResources {
        pub stage: &'static str,
        pub kind: &'static str,
        pub count: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "too many combined {kind} ({count} > {max})"]
    pub struct TooManyCombinedResources {
        pub kind: &'static str,
        pub count: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "{kind} block `{name}' is too large ({size} > {max} bytes)"]
    pub struct BlockTooLarge {
        pub kind: &'static str,
        pub name: String,
        pub size: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "layout(binding = {binding}) for {kind} `{name}' exceeds the maximum binding ({max})"]
    pub struct BindingOutOfRange {
        pub kind: &'static str,
        pub name: String,
        pub binding: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "{stage} shader: each subroutine index qualifier in the shader must be unique; `{name}' and `{other}' both use index {index}"]
    pub struct SubroutineIndexConflict {
        pub stage: &'static str,
        pub name: String,
        pub other: String,
        pub index: u32,
    }
}

impl_error! {
    #[display = "atomic counter {name} declared at offset {offset} of binding {binding} which is already in use"]
    pub struct AtomicCounterOverlap {
        pub name: String,
        pub binding: u32,
        pub offset: u32,
    }
}

impl_error! {
    #[display = "{stage} shader input `{input}' has invariant qualifier, but {producer_stage} shader output `{output}' does not"]
    pub struct InvariantBuiltinMismatch {
        pub stage: &'static str,
        pub input: &'static str,
        pub producer_stage: &'static str,
        pub output: &'static str,
    }
}

impl_error! {
    #[display = "`gl_FrontFacing' cannot be declared invariant"]
    pub struct InvariantFrontFacing;
}

impl_error! {
    #[display = "{stage} shader writes to both `gl_ClipVertex' and `{other}'"]
    pub struct ClipVertexAndDistance {
        pub stage: &'static str,
        pub other: &'static str,
    }
}

impl_error! {
    #[display = "{stage} shader: the combined size of `gl_ClipDistance' and `gl_CullDistance' size cannot be larger than gl_MaxCombinedClipAndCullDistances ({size} > {max})"]
    pub struct ClipCullDistanceTooLarge {
        pub stage: &'static str,
        pub size: u32,
        pub max: u32,
    }
}

impl_error! {
    #[display = "{stage} shader does not write to `gl_Position'"]
    pub struct PositionNotWritten {
        pub stage: &'static str,
    }
}

impl_error! {
    #[display = "fragment shader writes to both `gl_FragColor' and `gl_FragData'"]
    pub struct FragColorAndFragData;
}

impl_error! {
    #[display = "no shaders attached to the program"]
    pub struct NoShadersAttached;
}

impl_error! {
    #[display = "compute shaders may not be linked with any other type of shader"]
    pub struct ComputeLinkedWithOtherStages;
}

impl_error! {
    #[display = "all shaders must use same shading language version ({first} and {second})"]
    pub struct MismatchedShadingLanguageVersion {
        pub first: String,
        pub second: String,
    }
}

impl_error! {
    #[display = "{stage} shader must be linked with {required} shader"]
    pub struct StageRequiresStage {
        pub stage: &'static str,
        pub required: &'static str,
    }
}

impl_error! {
    #[display = "program lacks a {stage} shader"]
    pub struct ProgramLacksStage {
        pub stage: &'static str,
    }
}

impl_error! {
    #[display = "internal linker error: {message}"]
    pub struct InternalError {
        pub message: String,
    }
}

macro_rules! impl_link_error {
    ($($error:ident($wrapped_error:ty),)+) => {
        $(
            impl From<$wrapped_error> for LinkError {
                fn from(v: $wrapped_error) -> Self {
                    LinkError::$error(v)
                }
            }
        )+

        /// any diagnostic the linker can produce
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum LinkError {
            $(
                $error($wrapped_error),
            )+
        }

        impl fmt::Display for LinkError {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match self {
                    $(
                        Self::$error(v) => fmt::Display::fmt(v, f),
                    )+
                }
            }
        }
    };
}

impl_link_error! {
    StaticRecursion(StaticRecursion),
    MismatchedGlobalType(MismatchedGlobalType),
    MismatchedExplicitLocation(MismatchedExplicitLocation),
    MismatchedExplicitBinding(MismatchedExplicitBinding),
    MismatchedExplicitOffset(MismatchedExplicitOffset),
    MismatchedInitializer(MismatchedInitializer),
    MismatchedGlobalQualifier(MismatchedGlobalQualifier),
    MismatchedInterfaceMembership(MismatchedInterfaceMembership),
    ArrayAccessOutOfBounds(ArrayAccessOutOfBounds),
    MismatchedDepthLayout(MismatchedDepthLayout),
    MismatchedInterfaceBlock(MismatchedInterfaceBlock),
    InputBlockNotOutput(InputBlockNotOutput),
    BlockMismatchingDefinitions(BlockMismatchingDefinitions),
    MultiplyDefinedFunction(MultiplyDefinedFunction),
    MissingMain(MissingMain),
    ConflictingLayoutQualifier(ConflictingLayoutQualifier),
    MissingLayoutQualifier(MissingLayoutQualifier),
    LayoutQualifierOutOfRange(LayoutQualifierOutOfRange),
    InvalidDerivativeGroup(InvalidDerivativeGroup),
    UnresolvedFunction(UnresolvedFunction),
    PerVertexArraySizeMismatch(PerVertexArraySizeMismatch),
    MismatchedVaryingType(MismatchedVaryingType),
    MismatchedVaryingQualifier(MismatchedVaryingQualifier),
    MismatchedInterpolation(MismatchedInterpolation),
    VaryingLocationConflict(VaryingLocationConflict),
    VaryingLocationOutOfRange(VaryingLocationOutOfRange),
    UnmatchedInput(UnmatchedInput),
    InsufficientVaryingLocations(InsufficientVaryingLocations),
    TooManyVaryingComponents(TooManyVaryingComponents),
    TransformFeedbackVaryingUndefined(TransformFeedbackVaryingUndefined),
    TransformFeedbackVaryingDuplicated(TransformFeedbackVaryingDuplicated),
    TransformFeedbackSubscriptOnNonArray(TransformFeedbackSubscriptOnNonArray),
    TransformFeedbackIndexOutOfBounds(TransformFeedbackIndexOutOfBounds),
    TransformFeedbackInvalidInSeparateMode(TransformFeedbackInvalidInSeparateMode),
    TransformFeedbackSeparateComponentsExceeded(TransformFeedbackSeparateComponentsExceeded),
    TransformFeedbackInterleavedComponentsExceeded(TransformFeedbackInterleavedComponentsExceeded),
    TransformFeedbackBuffersExceeded(TransformFeedbackBuffersExceeded),
    TransformFeedbackAliasing(TransformFeedbackAliasing),
    TransformFeedbackMixedStreams(TransformFeedbackMixedStreams),
    TransformFeedbackStrideMisaligned(TransformFeedbackStrideMisaligned),
    TransformFeedbackStrideTooLarge(TransformFeedbackStrideTooLarge),
    TransformFeedbackOffsetOverflowsStride(TransformFeedbackOffsetOverflowsStride),
    InvalidExplicitAttributeLocation(InvalidExplicitAttributeLocation),
    InsufficientAttributeLocations(InsufficientAttributeLocations),
    AttributeLocationAliasing(AttributeLocationAliasing),
    UniformLocationOverlap(UniformLocationOverlap),
    TooManyUniformLocations(TooManyUniformLocations),
    TooManyStageResources(TooManyStageResources),
    TooManyCombinedResources(TooManyCombinedResources),
    BlockTooLarge(BlockTooLarge),
    BindingOutOfRange(BindingOutOfRange),
    SubroutineIndexConflict(SubroutineIndexConflict),
    AtomicCounterOverlap(AtomicCounterOverlap),
    InvariantBuiltinMismatch(InvariantBuiltinMismatch),
    InvariantFrontFacing(InvariantFrontFacing),
    ClipVertexAndDistance(ClipVertexAndDistance),
    ClipCullDistanceTooLarge(ClipCullDistanceTooLarge),
    PositionNotWritten(PositionNotWritten),
    FragColorAndFragData(FragColorAndFragData),
    NoShadersAttached(NoShadersAttached),
    ComputeLinkedWithOtherStages(ComputeLinkedWithOtherStages),
    MismatchedShadingLanguageVersion(MismatchedShadingLanguageVersion),
    StageRequiresStage(StageRequiresStage),
    ProgramLacksStage(ProgramLacksStage),
    InternalError(InternalError),
}

impl Error for LinkError {}

pub(crate) type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error: LinkError = StaticRecursion {
            function: "f".into(),
        }
        .into();
        assert_eq!(error.to_string(), "function `f' has static recursion");
        let error: LinkError = MismatchedGlobalType {
            mode: "uniform",
            name: "x".into(),
            first_type: "float".into(),
            second_type: "int".into(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "uniform `x' declared as type `float' and type `int'"
        );
        assert_eq!(
            LinkError::from(FragColorAndFragData).to_string(),
            "fragment shader writes to both `gl_FragColor' and `gl_FragData'"
        );
    }
}
