use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// 交给外部执行的动作描述，具体字段由调用方约定
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub name: String,
    pub extras: Map<String, Value>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extras: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn get_int_extra(&self, key: &str) -> Option<i64> {
        self.extras.get(key).and_then(Value::as_i64)
    }

    pub fn get_str_extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(Value::as_str)
    }
}

/// 一个候选匹配：置信度、名称、原始转写、动作
///
/// 排序只看 score，score 相同即视为相等。
#[derive(Debug, Clone, Serialize)]
pub struct IntentMatcherResult {
    pub score: f64,
    pub name: String,
    pub utterance: String,
    pub action: Action,
}

impl IntentMatcherResult {
    /// score 会被限制在 [0, 1]
    pub fn new(
        score: f64,
        name: impl Into<String>,
        utterance: impl Into<String>,
        action: Action,
    ) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            score,
            name: name.into(),
            utterance: utterance.into(),
            action,
        }
    }
}

impl Ord for IntentMatcherResult {
    fn cmp(&self, other: &Self) -> Ordering {
        // score 在 [0, 1] 内，差值不会溢出
        let diff = self.score - other.score;
        if diff > 0.0 {
            Ordering::Greater
        } else if diff < 0.0 {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl PartialOrd for IntentMatcherResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IntentMatcherResult {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IntentMatcherResult {}

/// 意图匹配策略。不适用时返回空列表，而不是错误。
pub trait IntentMatcher {
    fn match_transcript(&self, transcript: &str) -> Vec<IntentMatcherResult>;
}

/// 按 score 从高到低排序
pub fn rank(mut results: Vec<IntentMatcherResult>) -> Vec<IntentMatcherResult> {
    results.sort_by(|a, b| b.cmp(a));
    results
}
