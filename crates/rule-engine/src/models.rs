//! 规则引擎领域模型

use crate::error::Result;
use crate::operators::{GroupOperator, LogicalOperator, Operator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// 规则定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: f64,
    pub condition: ConditionGroup,
    pub actions: Vec<Action>,
}

impl Rule {
    /// 创建规则，自动分配 ID，优先级为 0
    pub fn new(name: impl Into<String>, condition: ConditionGroup) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            name: Some(name.into()),
            priority: 0.0,
            condition,
            actions: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<f64>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// 用于日志和报告的规则标识：优先使用 ID，其次名称
    pub fn label(&self) -> String {
        self.id
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<anonymous>")
            .to_string()
    }

    /// 条件树的最大嵌套深度（顶层组为 1）
    pub fn depth(&self) -> usize {
        self.condition.depth()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.priority)?;
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        write!(f, "IF {} THEN ", self.condition)?;

        if self.actions.is_empty() {
            return f.write_str("(no actions)");
        }
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", action)?;
        }
        Ok(())
    }
}

/// 条件树节点（条件或逻辑组）
///
/// JSON 中按形状区分：带 `field` 的是条件，带 `conditions` 的是逻辑组。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Condition(Condition),
    Group(ConditionGroup),
}

impl ConditionNode {
    fn depth(&self) -> usize {
        match self {
            Self::Condition(_) => 0,
            Self::Group(group) => group.depth(),
        }
    }
}

impl From<Condition> for ConditionNode {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        Self::Group(group)
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Condition(cond) => write!(f, "{}", cond),
            Self::Group(group) => write!(f, "{}", group),
        }
    }
}

/// 条件节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: GroupOperator,
    pub conditions: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn new(operator: impl Into<GroupOperator>, conditions: Vec<ConditionNode>) -> Self {
        Self {
            operator: operator.into(),
            conditions,
        }
    }

    pub fn and(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::And, conditions)
    }

    pub fn or(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Or, conditions)
    }

    pub fn xor(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Xor, conditions)
    }

    pub fn nand(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Nand, conditions)
    }

    pub fn nor(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Nor, conditions)
    }

    pub fn depth(&self) -> usize {
        1 + self
            .conditions
            .iter()
            .map(ConditionNode::depth)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match &self.operator {
            GroupOperator::Builtin(op) => format!(" {} ", op),
            GroupOperator::Custom(_) => ", ".to_string(),
        };

        match &self.operator {
            GroupOperator::Builtin(LogicalOperator::And | LogicalOperator::Or) => {
                f.write_str("(")?
            }
            other => write!(f, "{}(", other)?,
        }

        for (i, node) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(&separator)?;
            }
            write!(f, "{}", node)?;
        }
        f.write_str(")")
    }
}

/// 规则命中后产生的动作，`action_type` 与 `payload` 对引擎不透明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Action {
    pub fn new(action_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            target: target.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.action_type, self.target)?;
        if let Some(payload) = &self.payload {
            write!(f, " {}", payload)?;
        }
        Ok(())
    }
}

/// 结果表中的动作条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl From<&Action> for ActionOutcome {
    fn from(action: &Action) -> Self {
        Self {
            action_type: action.action_type.clone(),
            payload: action.payload.clone(),
        }
    }
}

/// 执行结果表：target -> 最终生效的动作
pub type ActionMap = BTreeMap<String, ActionOutcome>;

/// 评估上下文 - 调用方提供的数据记录，引擎只读
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    data: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// 从 JSON 值创建，非对象值视为空记录
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(data) => Self { data },
            _ => Self::default(),
        }
    }

    /// 从 JSON 对象字符串创建
    pub fn from_json(json: &str) -> Result<Self> {
        let data: Map<String, Value> = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 按平铺键获取字段值，不解析路径表达式
    pub fn get_field(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(field.into(), value.into());
    }

    /// 获取底层数据
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl From<Value> for EvaluationContext {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// 导出规则集为格式化 JSON
pub fn export_rules_json(rules: &[Rule]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}
