//! 值比较器
//!
//! 实现叶子条件的比较逻辑。相等判断不做类型转换，大小比较只接受两个数字或两个字符串。

use crate::error::{Result, RuleError};
use crate::operators::Operator;
use serde_json::Value;
use std::cmp::Ordering;

/// 值比较器
pub struct ValueComparator;

impl ValueComparator {
    /// 比较上下文值与规则值
    ///
    /// # Arguments
    /// * `context_value` - 从上下文中取到的字段值，字段不存在时为 `None`
    /// * `operator` - 比较操作符
    /// * `rule_value` - 规则中定义的值
    pub fn compare(
        operator: Operator,
        context_value: Option<&Value>,
        rule_value: &Value,
    ) -> Result<bool> {
        match operator {
            Operator::Eq => Ok(Self::eq_opt(context_value, rule_value)),
            Operator::Neq => Ok(!Self::eq_opt(context_value, rule_value)),
            Operator::Gt => Self::order(operator, context_value, rule_value, Ordering::is_gt),
            Operator::Lt => Self::order(operator, context_value, rule_value, Ordering::is_lt),
            Operator::Gte => Self::order(operator, context_value, rule_value, Ordering::is_ge),
            Operator::Lte => Self::order(operator, context_value, rule_value, Ordering::is_le),
            Operator::In => Self::in_list(operator, context_value, rule_value),
            Operator::Not => Self::in_list(operator, context_value, rule_value).map(|r| !r),
        }
    }

    /// 严格相等
    ///
    /// 数字之间按数值比较（100 与 100.0 相等），其余类型必须完全一致。
    pub fn strict_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
            (Value::Array(x), Value::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(a, b)| Self::strict_eq(a, b))
            }
            (Value::Object(x), Value::Object(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .all(|(k, v)| y.get(k).is_some_and(|w| Self::strict_eq(v, w)))
            }
            _ => a == b,
        }
    }

    fn eq_opt(context_value: Option<&Value>, rule_value: &Value) -> bool {
        context_value.is_some_and(|v| Self::strict_eq(v, rule_value))
    }

    /// 大小比较
    fn order<F>(
        operator: Operator,
        context_value: Option<&Value>,
        rule_value: &Value,
        accept: F,
    ) -> Result<bool>
    where
        F: Fn(Ordering) -> bool,
    {
        // 字段不存在时不匹配
        let Some(field) = context_value else {
            return Ok(false);
        };

        let ordering = match (field, rule_value) {
            (Value::Number(a), Value::Number(b)) => {
                let a = Self::as_f64(operator, field, a)?;
                let b = Self::as_f64(operator, rule_value, b)?;
                a.partial_cmp(&b)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => {
                return Err(RuleError::TypeMismatch {
                    operator: operator.to_string(),
                    expected: "两侧同为 number 或同为 string".to_string(),
                    actual: format!(
                        "{} {} {}",
                        Self::type_name(field),
                        operator,
                        Self::type_name(rule_value)
                    ),
                });
            }
        };

        Ok(ordering.is_some_and(accept))
    }

    /// 列表成员检查
    fn in_list(
        operator: Operator,
        context_value: Option<&Value>,
        rule_value: &Value,
    ) -> Result<bool> {
        let items = rule_value.as_array().ok_or_else(|| RuleError::TypeMismatch {
            operator: operator.to_string(),
            expected: "array".to_string(),
            actual: Self::type_name(rule_value).to_string(),
        })?;

        let Some(field) = context_value else {
            return Ok(false);
        };

        Ok(items.iter().any(|item| Self::strict_eq(field, item)))
    }

    fn as_f64(operator: Operator, value: &Value, n: &serde_json::Number) -> Result<f64> {
        n.as_f64().ok_or_else(|| RuleError::TypeMismatch {
            operator: operator.to_string(),
            expected: "number".to_string(),
            actual: value.to_string(),
        })
    }

    /// 获取值的类型名称
    pub fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}
