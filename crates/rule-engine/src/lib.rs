//! krule 规则决策引擎
//!
//! 提供规则的核心决策能力，支持：
//! - JSON 规则结构校验（一次收集全部字段级错误）
//! - 条件树递归评估（比较操作符 + 逻辑组合器）
//! - 按实例隔离的自定义逻辑操作符
//! - 多规则按优先级合并动作结果
//! - 测试场景批量验证

pub mod cli;
pub mod comparator;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod registry;
pub mod scenario;
pub mod validator;

pub use comparator::ValueComparator;
pub use engine::{EngineOptions, RuleEngine};
pub use error::{Result, RuleError};
pub use evaluator::{ConditionEvaluator, DEFAULT_MAX_DEPTH};
pub use executor::{ErrorPolicy, ExecutionReport, RuleExecutor, SkippedRule};
pub use models::{
    export_rules_json, Action, ActionMap, ActionOutcome, Condition, ConditionGroup, ConditionNode,
    EvaluationContext, Rule,
};
pub use operators::{GroupOperator, LogicalOperator, Operator};
pub use registry::{Combinator, OperatorRegistry};
pub use scenario::{run_scenarios, ScenarioOutcome, ScenarioReport, TestScenario};
pub use validator::{RuleValidator, ShapeError, ValidationResult};
