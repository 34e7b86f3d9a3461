// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! instructions and expressions

use crate::types::Type;
use crate::variable::VariableId;
use std::fmt;

/// the value of a constant
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    /// `float`/`float16_t` components
    Float(Vec<f32>),
    /// `double` components
    Double(Vec<f64>),
    /// `int` components
    Int(Vec<i32>),
    /// `uint` components
    Uint(Vec<u32>),
    /// 64-bit integer components
    Int64(Vec<i64>),
    /// `bool` components
    Bool(Vec<bool>),
    /// struct members or array elements
    Aggregate(Vec<Constant>),
}

/// a typed constant
#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    /// type of the constant
    pub constant_type: Type,
    /// value
    pub value: ConstantValue,
}

impl Constant {
    /// a `float` constant
    pub fn float(value: f32) -> Self {
        Self {
            constant_type: Type::float(),
            value: ConstantValue::Float(vec![value]),
        }
    }
    /// an `int` constant
    pub fn int(value: i32) -> Self {
        Self {
            constant_type: Type::int(),
            value: ConstantValue::Int(vec![value]),
        }
    }
    /// a `uint` constant
    pub fn uint(value: u32) -> Self {
        Self {
            constant_type: Type::uint(),
            value: ConstantValue::Uint(vec![value]),
        }
    }
    /// a `bool` constant
    pub fn bool(value: bool) -> Self {
        Self {
            constant_type: Type::bool(),
            value: ConstantValue::Bool(vec![value]),
        }
    }
    /// a `vecN` constant
    pub fn vec(components: &[f32]) -> Self {
        Self {
            constant_type: Type::vec(components.len() as u32),
            value: ConstantValue::Float(components.to_vec()),
        }
    }
    /// the value as an integer index, for integer scalars
    pub fn as_index(&self) -> Option<i64> {
        match &self.value {
            ConstantValue::Int(v) if v.len() == 1 => Some(v[0].into()),
            ConstantValue::Uint(v) if v.len() == 1 => Some(v[0].into()),
            ConstantValue::Int64(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn list<T: fmt::Debug>(f: &mut fmt::Formatter, values: &[T]) -> fmt::Result {
            let mut first = true;
            for value in values {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write!(f, "{:?}", value)?;
            }
            Ok(())
        }
        write!(f, "({} (", self.constant_type)?;
        match &self.value {
            ConstantValue::Float(v) => list(f, v)?,
            ConstantValue::Double(v) => list(f, v)?,
            ConstantValue::Int(v) => list(f, v)?,
            ConstantValue::Uint(v) => list(f, v)?,
            ConstantValue::Int64(v) => list(f, v)?,
            ConstantValue::Bool(v) => list(f, v)?,
            ConstantValue::Aggregate(v) => {
                let mut first = true;
                for value in v {
                    if !first {
                        write!(f, " ")?;
                    }
                    first = false;
                    write!(f, "{}", value)?;
                }
            }
        }
        write!(f, "))")
    }
}

/// an l-value or r-value reference to storage
#[derive(Clone, Debug, PartialEq)]
pub enum Dereference {
    /// a whole variable
    Variable(VariableId),
    /// `array[index]`
    ArrayIndex {
        /// the array being indexed
        array: Box<Dereference>,
        /// the index
        index: Box<Expression>,
    },
    /// `record.field`
    Record {
        /// the struct or block instance
        record: Box<Dereference>,
        /// member name
        field: String,
    },
}

impl Dereference {
    /// the variable at the root of the dereference chain
    pub fn variable(&self) -> VariableId {
        match self {
            Dereference::Variable(v) => *v,
            Dereference::ArrayIndex { array, .. } => array.variable(),
            Dereference::Record { record, .. } => record.variable(),
        }
    }
    /// `self[index]` with a constant index
    pub fn index(self, index: i32) -> Self {
        Dereference::ArrayIndex {
            array: Box::new(self),
            index: Box::new(Expression::Constant(Constant::int(index))),
        }
    }
    /// `self.field`
    pub fn field(self, field: impl Into<String>) -> Self {
        Dereference::Record {
            record: Box::new(self),
            field: field.into(),
        }
    }
}

impl From<VariableId> for Dereference {
    fn from(v: VariableId) -> Self {
        Dereference::Variable(v)
    }
}

/// expression operators
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum Operator {
    Neg,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicAnd,
    LogicOr,
    LogicXor,
    Dot,
    Min,
    Max,
    Convert,
}

/// texture access kinds
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[allow(missing_docs)]
pub enum TextureOp {
    Sample,
    Lod,
    Fetch,
    Size,
}

/// an r-value
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// constant
    Constant(Constant),
    /// read of storage
    Dereference(Dereference),
    /// built-in operator application
    Operation {
        /// operator
        operator: Operator,
        /// operands
        operands: Vec<Expression>,
        /// result type
        result_type: Type,
    },
    /// component selection
    Swizzle {
        /// the vector
        value: Box<Expression>,
        /// selected component indexes
        components: Vec<u8>,
    },
    /// texture access
    Texture {
        /// access kind
        op: TextureOp,
        /// the sampler
        sampler: Dereference,
        /// texture coordinate
        coordinate: Box<Expression>,
        /// result type
        result_type: Type,
    },
}

impl From<Dereference> for Expression {
    fn from(v: Dereference) -> Self {
        Expression::Dereference(v)
    }
}

impl From<VariableId> for Expression {
    fn from(v: VariableId) -> Self {
        Expression::Dereference(v.into())
    }
}

impl From<Constant> for Expression {
    fn from(v: Constant) -> Self {
        Expression::Constant(v)
    }
}

/// identity of a signature: function name and exact parameter types
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SignatureKey {
    /// function name
    pub name: String,
    /// parameter types in order
    pub parameter_types: Vec<Type>,
}

impl SignatureKey {
    /// create a new `SignatureKey`
    pub fn new(name: impl Into<String>, parameter_types: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            parameter_types,
        }
    }
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        let mut first = true;
        for parameter_type in &self.parameter_types {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}", parameter_type)?;
        }
        write!(f, ")")
    }
}

/// a function call
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    /// the called signature
    pub callee: SignatureKey,
    /// arguments; `out`/`inout` arguments are dereferences
    pub arguments: Vec<Expression>,
    /// where the return value is stored
    pub return_target: Option<Dereference>,
}

/// an assignment
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    /// destination
    pub lhs: Dereference,
    /// value
    pub rhs: Expression,
    /// written components of a vector destination
    pub write_mask: u8,
}

/// a statement
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// variable declaration; the variable lives in the shader's arena
    Declare(VariableId),
    /// assignment
    Assign(Assignment),
    /// function call
    Call(Call),
    /// `return`
    Return(Option<Expression>),
    /// `discard`, optionally conditional
    Discard(Option<Expression>),
    /// `if`
    If {
        /// condition
        condition: Expression,
        /// taken when `condition` is true
        then_block: Vec<Instruction>,
        /// taken otherwise
        else_block: Vec<Instruction>,
    },
    /// infinite loop, exited with `Break`
    Loop {
        /// loop body
        body: Vec<Instruction>,
    },
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// expression evaluated for side effects
    Expression(Expression),
    /// `EmitStreamVertex`
    EmitVertex {
        /// vertex stream
        stream: u32,
    },
    /// `EndStreamPrimitive`
    EndPrimitive {
        /// vertex stream
        stream: u32,
    },
    /// `barrier()`
    Barrier,
}

impl Instruction {
    /// `lhs = rhs` writing all components
    pub fn assign(lhs: impl Into<Dereference>, rhs: impl Into<Expression>) -> Self {
        Instruction::Assign(Assignment {
            lhs: lhs.into(),
            rhs: rhs.into(),
            write_mask: 0xF,
        })
    }
    /// call `callee` discarding any return value
    pub fn call(callee: SignatureKey, arguments: Vec<Expression>) -> Self {
        Instruction::Call(Call {
            callee,
            arguments,
            return_target: None,
        })
    }
    /// `true` for `Declare`
    pub fn is_declaration(&self) -> bool {
        matches!(self, Instruction::Declare(_))
    }
}
