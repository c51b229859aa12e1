use std::fmt;

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    pub literal: ScalarValue,
    /// Type of the literal.
    ///
    /// Stored alongside the value since struct literals and NULLs don't carry
    /// enough information to derive it.
    pub datatype: DataType,
}

impl fmt::Display for LiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literal)
    }
}
