use std::fmt;
use std::str::FromStr;

use crate::error::MatrixError;

/// Supported element types for matrix storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit signed integer. Products wrap on overflow.
    I32,
    /// Boolean, multiplied over the (OR, AND) semiring.
    Bool,
    /// 64-bit floating point.
    F64,
}

impl DType {
    /// All supported dtypes, in declaration order.
    pub const ALL: [DType; 3] = [DType::I32, DType::Bool, DType::F64];

}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::I32 => write!(f, "int32"),
            DType::Bool => write!(f, "bool"),
            DType::F64 => write!(f, "float"),
        }
    }
}

impl FromStr for DType {
    type Err = MatrixError;

    /// Parses the benchmark's `--dtype` vocabulary. `float64` and `boolean`
    /// are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int32" | "i32" => Ok(DType::I32),
            "bool" | "boolean" => Ok(DType::Bool),
            "float" | "float64" | "f64" => Ok(DType::F64),
            _ => Err(MatrixError::UnknownDType(s.to_string())),
        }
    }
}
