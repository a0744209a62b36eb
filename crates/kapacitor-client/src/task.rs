use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::script::normalize_intervals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Stream,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enabled,
    Disabled,
}

/// Database / retention policy pair a task reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbRp {
    pub db: String,
    pub rp: String,
}

impl DbRp {
    pub fn new(db: impl Into<String>, rp: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            rp: rp.into(),
        }
    }
}

/// A task definition as posted to `/kapacitor/v1/tasks`.
///
/// The definition is an opaque JSON object and is sent exactly as built. The
/// builder methods only cover the common keys; anything else goes through
/// [`TaskDefinition::insert`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskDefinition(Map<String, Value>);

impl TaskDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let mut definition = Self::default();
        definition.insert("id", Value::String(id.into()));
        definition
    }

    pub fn task_type(self, task_type: TaskType) -> Self {
        self.with("type", task_type)
    }

    pub fn dbrp(mut self, dbrp: DbRp) -> Self {
        let entry = serde_json::to_value(dbrp).unwrap_or(Value::Null);
        match self.0.get_mut("dbrps") {
            Some(Value::Array(dbrps)) => dbrps.push(entry),
            _ => {
                self.0.insert("dbrps".to_string(), Value::Array(vec![entry]));
            }
        }
        self
    }

    pub fn script(self, script: impl Into<String>) -> Self {
        self.with("script", script.into())
    }

    pub fn status(self, status: TaskStatus) -> Self {
        self.with("status", status)
    }

    fn with<V: Serialize>(mut self, key: &str, value: V) -> Self {
        self.insert(key, serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn script_text(&self) -> Option<&str> {
        self.0.get("script").and_then(Value::as_str)
    }

    /// Rewrite every `.every(...)` directive of the script to `.every(1s)`.
    ///
    /// Does nothing when the definition has no string `script`.
    pub fn normalize_intervals(&mut self) {
        if let Some(Value::String(script)) = self.0.get_mut("script") {
            *script = normalize_intervals(script);
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for TaskDefinition {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Response body of `GET /kapacitor/v1/alerts/topics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub collected: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_produces_wire_shape() {
        let definition = TaskDefinition::new("id")
            .task_type(TaskType::Batch)
            .dbrp(DbRp::new("db", "rp"))
            .script("script")
            .status(TaskStatus::Enabled);

        assert_eq!(
            serde_json::to_value(&definition).unwrap(),
            json!({
                "id": "id",
                "type": "batch",
                "dbrps": [{ "db": "db", "rp": "rp" }],
                "script": "script",
                "status": "enabled"
            })
        );
        assert_eq!(definition.id(), Some("id"));
    }

    #[test]
    fn test_dbrp_appends() {
        let definition = TaskDefinition::new("id")
            .dbrp(DbRp::new("a", "autogen"))
            .dbrp(DbRp::new("b", "autogen"));

        assert_eq!(
            definition.get("dbrps"),
            Some(&json!([{ "db": "a", "rp": "autogen" }, { "db": "b", "rp": "autogen" }]))
        );
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let raw = json!({
            "id": "cpu_alert",
            "type": "stream",
            "template-id": "tmpl",
            "vars": { "crit": { "type": "float", "value": 90.0 } }
        });
        let definition: TaskDefinition = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(serde_json::to_value(&definition).unwrap(), raw);
    }

    #[test]
    fn test_normalize_intervals_rewrites_script() {
        let mut definition = TaskDefinition::new("id")
            .script("batch|query('SELECT 1').period(5m).every(5m)");
        definition.normalize_intervals();

        assert_eq!(
            definition.script_text(),
            Some("batch|query('SELECT 1').period(5m).every(1s)")
        );
    }

    #[test]
    fn test_normalize_intervals_without_script_is_noop() {
        let mut definition = TaskDefinition::new("id");
        definition.insert("script", json!(42));
        let before = definition.clone();
        definition.normalize_intervals();

        assert_eq!(definition, before);
    }

    #[test]
    fn test_topic_list_tolerates_missing_fields() {
        let list: TopicList = serde_json::from_value(json!({
            "link": { "rel": "self", "href": "/kapacitor/v1/alerts/topics" },
            "topics": [
                { "id": "main:cpu:alert2", "level": "CRITICAL", "collected": 5 },
                { "id": "system" }
            ]
        }))
        .unwrap();

        assert_eq!(list.topics.len(), 2);
        assert_eq!(list.topics[0].level, "CRITICAL");
        assert_eq!(list.topics[1].collected, 0);

        let empty: TopicList = serde_json::from_value(json!({})).unwrap();
        assert!(empty.topics.is_empty());
    }
}
