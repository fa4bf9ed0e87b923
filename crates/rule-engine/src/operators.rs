//! 规则操作符定义
//!
//! 叶子条件使用固定的比较操作符集合，逻辑组使用内置组合操作符或注册表中的自定义操作符。

use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 条件操作符（不可扩展）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not")]
    Not,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::In,
        Self::Not,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::In => "in",
            Self::Not => "not",
        }
    }

    /// 是否要求规则值为数组
    pub fn expects_array(&self) -> bool {
        matches!(self, Self::In | Self::Not)
    }
}

impl FromStr for Operator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| RuleError::UnknownOperator {
                operator: s.to_string(),
            })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 内置逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
    Nand,
    Nor,
}

impl LogicalOperator {
    pub const ALL: [LogicalOperator; 5] = [Self::And, Self::Or, Self::Xor, Self::Nand, Self::Nor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
        }
    }

    /// 按名称查找内置操作符（区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// 组合已求值的子节点结果
    ///
    /// 空列表时：AND 为 true，OR 为 false，XOR 为 false，NAND 为 false，NOR 为 true。
    pub fn combine(&self, results: &[bool]) -> bool {
        match self {
            Self::And => results.iter().all(|r| *r),
            Self::Or => results.iter().any(|r| *r),
            Self::Xor => results.iter().filter(|r| **r).count() == 1,
            Self::Nand => !results.iter().all(|r| *r),
            Self::Nor => !results.iter().any(|r| *r),
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| RuleError::UnknownOperator {
            operator: s.to_string(),
        })
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 逻辑组节点上的操作符：内置或按名称引用的自定义操作符
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupOperator {
    Builtin(LogicalOperator),
    Custom(String),
}

impl GroupOperator {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(op) => op.as_str(),
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for GroupOperator {
    fn from(name: String) -> Self {
        match LogicalOperator::from_name(&name) {
            Some(op) => Self::Builtin(op),
            None => Self::Custom(name),
        }
    }
}

impl From<GroupOperator> for String {
    fn from(op: GroupOperator) -> Self {
        match op {
            GroupOperator::Builtin(op) => op.as_str().to_string(),
            GroupOperator::Custom(name) => name,
        }
    }
}

impl From<LogicalOperator> for GroupOperator {
    fn from(op: LogicalOperator) -> Self {
        Self::Builtin(op)
    }
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trip_names() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operator() {
        let err = "~=".parse::<Operator>().unwrap_err();
        assert!(matches!(err, RuleError::UnknownOperator { operator } if operator == "~="));
    }

    #[test]
    fn test_operator_serde_symbols() {
        let op: Operator = serde_json::from_str(r#"">=""#).unwrap();
        assert_eq!(op, Operator::Gte);
        assert_eq!(serde_json::to_string(&Operator::Not).unwrap(), r#""not""#);
        assert!(serde_json::from_str::<Operator>(r#""contains""#).is_err());
    }

    #[test]
    fn test_combinator_laws() {
        use LogicalOperator::*;

        assert!(And.combine(&[true, true]));
        assert!(!And.combine(&[true, false]));
        assert!(!Or.combine(&[false, false]));
        assert!(Or.combine(&[false, true]));
        assert!(Xor.combine(&[true, false, false]));
        assert!(!Xor.combine(&[true, true, false]));
        assert!(!Xor.combine(&[false, false]));
        assert!(Nand.combine(&[true, false]));
        assert!(!Nand.combine(&[true, true]));
        assert!(Nor.combine(&[false, false]));
        assert!(!Nor.combine(&[false, true]));
    }

    #[test]
    fn test_combinator_empty_input() {
        use LogicalOperator::*;

        assert!(And.combine(&[]));
        assert!(!Or.combine(&[]));
        assert!(!Xor.combine(&[]));
        assert!(!Nand.combine(&[]));
        assert!(Nor.combine(&[]));
    }

    #[test]
    fn test_group_operator_from_name() {
        assert_eq!(
            GroupOperator::from("XOR".to_string()),
            GroupOperator::Builtin(LogicalOperator::Xor)
        );
        assert_eq!(
            GroupOperator::from("and".to_string()),
            GroupOperator::Custom("and".to_string())
        );

        let op: GroupOperator = serde_json::from_str(r#""MAJORITY""#).unwrap();
        assert_eq!(op.name(), "MAJORITY");
        assert_eq!(serde_json::to_string(&op).unwrap(), r#""MAJORITY""#);
    }
}
