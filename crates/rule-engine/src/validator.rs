//! 规则结构校验器
//!
//! 在规则进入执行器之前，对未类型化的 JSON 做结构校验。所有问题一次性收集，
//! 每条错误带字段路径（如 `condition.conditions[1].operator`），便于上层逐字段提示。

use crate::evaluator::DEFAULT_MAX_DEPTH;
use crate::models::Rule;
use crate::operators::{LogicalOperator, Operator};
use crate::registry::OperatorRegistry;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

/// 结构错误：字段路径 + 描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{path}: {message}")]
pub struct ShapeError {
    pub path: String,
    pub message: String,
}

impl ShapeError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult = std::result::Result<Rule, Vec<ShapeError>>;

/// 规则结构校验器
#[derive(Debug, Clone)]
pub struct RuleValidator {
    /// 用于识别自定义逻辑操作符；为空时只接受内置操作符
    registry: Option<OperatorRegistry>,
    max_depth: usize,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self {
            registry: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 校验任意 JSON 值，成功时返回类型化的规则
    #[instrument(skip_all)]
    pub fn validate(&self, candidate: &Value) -> ValidationResult {
        let mut errors = Vec::new();

        let Some(obj) = candidate.as_object() else {
            return Err(vec![ShapeError::new("$", "规则必须是 JSON 对象")]);
        };

        self.validate_optional_string(obj, "id", &mut errors);
        self.validate_optional_string(obj, "name", &mut errors);

        if let Some(priority) = obj.get("priority") {
            if !priority.is_number() {
                errors.push(ShapeError::new("priority", "priority 必须是数字"));
            }
        }

        match obj.get("condition") {
            None => errors.push(ShapeError::new("condition", "缺少必填字段 condition")),
            Some(Value::Object(node))
                if node.contains_key("field") && !node.contains_key("conditions") =>
            {
                errors.push(ShapeError::new(
                    "condition",
                    "顶层条件必须是逻辑组（包含 operator 与 conditions）",
                ));
            }
            Some(condition) => self.validate_group(condition, "condition", 1, &mut errors),
        }

        match obj.get("actions") {
            None => errors.push(ShapeError::new("actions", "缺少必填字段 actions")),
            Some(Value::Array(actions)) => {
                for (i, action) in actions.iter().enumerate() {
                    self.validate_action(action, &format!("actions[{}]", i), &mut errors);
                }
            }
            Some(_) => errors.push(ShapeError::new("actions", "actions 必须是数组")),
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "规则结构校验未通过");
            return Err(errors);
        }

        serde_json::from_value(candidate.clone())
            .map_err(|e| vec![ShapeError::new("$", e.to_string())])
    }

    /// 校验 JSON 字符串
    pub fn validate_json(&self, json: &str) -> ValidationResult {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| vec![ShapeError::new("$", format!("JSON 解析失败: {}", e))])?;
        self.validate(&value)
    }

    /// 批量校验，按输入顺序返回每条规则的结果
    pub fn validate_batch(&self, candidates: &[Value]) -> Vec<ValidationResult> {
        candidates.iter().map(|c| self.validate(c)).collect()
    }

    /// 复核已类型化的规则（如在代码中直接构造的规则）
    pub fn validate_rule(&self, rule: &Rule) -> std::result::Result<(), Vec<ShapeError>> {
        let value = serde_json::to_value(rule)
            .map_err(|e| vec![ShapeError::new("$", e.to_string())])?;
        self.validate(&value).map(|_| ())
    }

    fn validate_optional_string(
        &self,
        obj: &Map<String, Value>,
        key: &str,
        errors: &mut Vec<ShapeError>,
    ) {
        if let Some(value) = obj.get(key) {
            if !value.is_string() {
                errors.push(ShapeError::new(key, format!("{} 必须是字符串", key)));
            }
        }
    }

    /// 按形状分派：带 field 的是条件，否则按逻辑组校验
    fn validate_node(&self, node: &Value, path: &str, depth: usize, errors: &mut Vec<ShapeError>) {
        match node {
            Value::Object(obj) if obj.contains_key("field") => {
                self.validate_condition(obj, path, errors)
            }
            Value::Object(obj) if obj.contains_key("conditions") || obj.contains_key("operator") => {
                self.validate_group(node, path, depth, errors)
            }
            _ => errors.push(ShapeError::new(
                path,
                "节点必须是条件（field/operator/value）或逻辑组（operator/conditions）",
            )),
        }
    }

    /// 校验逻辑组
    fn validate_group(
        &self,
        node: &Value,
        path: &str,
        depth: usize,
        errors: &mut Vec<ShapeError>,
    ) {
        let Some(obj) = node.as_object() else {
            errors.push(ShapeError::new(path, "逻辑组必须是对象"));
            return;
        };

        if depth > self.max_depth {
            errors.push(ShapeError::new(
                path,
                format!("条件树嵌套超过最大深度 {}", self.max_depth),
            ));
            return;
        }

        let operator_path = format!("{}.operator", path);
        match obj.get("operator") {
            None => errors.push(ShapeError::new(operator_path, "缺少逻辑操作符")),
            Some(Value::String(name)) => {
                if !self.is_group_operator(name) {
                    errors.push(ShapeError::new(
                        operator_path,
                        format!("未知的逻辑操作符 '{}'", name),
                    ));
                }
            }
            Some(_) => errors.push(ShapeError::new(operator_path, "逻辑操作符必须是字符串")),
        }

        let conditions_path = format!("{}.conditions", path);
        match obj.get("conditions") {
            None => errors.push(ShapeError::new(conditions_path, "缺少 conditions 数组")),
            Some(Value::Array(children)) if children.is_empty() => {
                errors.push(ShapeError::new(conditions_path, "逻辑组不能为空"));
            }
            Some(Value::Array(children)) => {
                for (i, child) in children.iter().enumerate() {
                    let child_path = format!("{}[{}]", conditions_path, i);
                    self.validate_node(child, &child_path, depth + 1, errors);
                }
            }
            Some(_) => errors.push(ShapeError::new(conditions_path, "conditions 必须是数组")),
        }
    }

    /// 校验叶子条件
    fn validate_condition(
        &self,
        obj: &Map<String, Value>,
        path: &str,
        errors: &mut Vec<ShapeError>,
    ) {
        match obj.get("field") {
            Some(Value::String(field)) if !field.is_empty() => {}
            Some(Value::String(_)) => {
                errors.push(ShapeError::new(format!("{}.field", path), "字段名不能为空"));
            }
            _ => errors.push(ShapeError::new(format!("{}.field", path), "字段名必须是字符串")),
        }

        let operator = match obj.get("operator") {
            None => {
                errors.push(ShapeError::new(format!("{}.operator", path), "缺少比较操作符"));
                None
            }
            Some(Value::String(s)) => match s.parse::<Operator>() {
                Ok(op) => Some(op),
                Err(_) => {
                    errors.push(ShapeError::new(
                        format!("{}.operator", path),
                        format!("未知的比较操作符 '{}'", s),
                    ));
                    None
                }
            },
            Some(_) => {
                errors.push(ShapeError::new(
                    format!("{}.operator", path),
                    "比较操作符必须是字符串",
                ));
                None
            }
        };

        match obj.get("value") {
            None => errors.push(ShapeError::new(format!("{}.value", path), "缺少比较值")),
            Some(value) => {
                if let Some(op) = operator.filter(Operator::expects_array) {
                    if !value.is_array() {
                        errors.push(ShapeError::new(
                            format!("{}.value", path),
                            format!("{} 操作符需要数组值", op),
                        ));
                    }
                }
            }
        }
    }

    /// 校验动作
    fn validate_action(&self, action: &Value, path: &str, errors: &mut Vec<ShapeError>) {
        let Some(obj) = action.as_object() else {
            errors.push(ShapeError::new(path, "动作必须是对象"));
            return;
        };

        for key in ["type", "target"] {
            if !obj.get(key).is_some_and(Value::is_string) {
                errors.push(ShapeError::new(
                    format!("{}.{}", path, key),
                    format!("{} 必须是字符串", key),
                ));
            }
        }
    }

    fn is_group_operator(&self, name: &str) -> bool {
        LogicalOperator::from_name(name).is_some()
            || self
                .registry
                .as_ref()
                .is_some_and(|registry| registry.contains(name))
    }
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new()
    }
}
