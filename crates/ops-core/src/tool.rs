//! Tool System
//!
//! Tools are named callable operations the agent may invoke mid-reasoning.
//! They are discovered from tool sources and merged into a [`ToolSet`],
//! which keeps discovery order and drops later tools whose name was
//! already seen.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call request from the LLM
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    #[serde(alias = "tool")]
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            id: None,
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    /// String argument lookup, empty strings treated as absent
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,

    /// Structured data (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: "string".into(),
            description: description.into(),
            required: false,
            enum_values: None,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| json!(v)).collect());
        self
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool identifier; may be empty when a source does not advertise one
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,
}

impl ToolSchema {
    /// Render the parameters as a JSON Schema object
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if let Some(values) = &param.enum_values {
                prop["enum"] = Value::Array(values.clone());
            }
            properties.insert(param.name.clone(), prop);
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Build a schema from a JSON Schema object as advertised by a tool source
    pub fn from_input_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: &Value,
    ) -> Self {
        let required: HashSet<&str> = input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let parameters = input_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| ParameterSchema {
                        name: name.clone(),
                        param_type: prop
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or("string")
                            .to_string(),
                        description: prop
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        required: required.contains(name.as_str()),
                        enum_values: prop.get("enum").and_then(Value::as_array).cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            category: None,
        }
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Fallback identity used when the schema carries no name
    fn label(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Validate arguments before execution (optional)
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Resolve the name a tool is known by.
///
/// The advertised schema name wins; a tool without one falls back to its
/// [`Tool::label`].
pub fn resolve_name(tool: &dyn Tool) -> String {
    let name = tool.schema().name;
    if name.trim().is_empty() {
        tool.label()
    } else {
        name
    }
}

/// Ordered, name-deduplicated set of tools.
///
/// Insertion order is discovery order. A tool whose resolved name was
/// already inserted is dropped silently.
#[derive(Clone, Default)]
pub struct ToolSet {
    entries: Vec<(String, Arc<dyn Tool>)>,
    seen: HashSet<String>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge tool lists in order, first-seen name wins
    pub fn aggregate<I, L>(lists: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = Arc<dyn Tool>>,
    {
        let mut set = Self::new();
        for list in lists {
            set.extend(list);
        }
        set
    }

    /// Insert a tool; returns `false` if its name was already present
    pub fn insert(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = resolve_name(tool.as_ref());
        if !self.seen.insert(name.clone()) {
            tracing::trace!(tool = %name, "Dropping duplicate tool");
            return false;
        }
        self.entries.push((name, tool));
        true
    }

    /// Register a concrete tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> bool {
        self.insert(Arc::new(tool))
    }

    pub fn extend(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            self.insert(tool);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| Arc::clone(t))
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tool.validate(call)?;
        tool.execute(call).await
    }

    /// Tools in discovery order
    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.entries.iter().map(|(_, t)| t)
    }

    /// All tool schemas, in discovery order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.entries.iter().map(|(_, t)| t.schema()).collect()
    }

    /// Resolved tool names, in discovery order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Generate system prompt section describing available tools
    pub fn generate_prompt_section(&self) -> String {
        use std::fmt::Write;

        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
        prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");

        for (name, tool) in &self.entries {
            let schema = tool.schema();
            let _ = writeln!(prompt, "### {name}");
            let _ = writeln!(prompt, "{}", schema.description);

            if !schema.parameters.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for param in &schema.parameters {
                    let required = if param.required { " (required)" } else { "" };
                    let _ = writeln!(
                        prompt,
                        "- `{}` ({}){}: {}",
                        param.name, param.param_type, required, param.description
                    );
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolSet {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Tool>>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        origin: &'static str,
    }

    #[async_trait]
    impl Tool for Named {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name.into(),
                description: format!("from {}", self.origin),
                parameters: vec![ParameterSchema::string("id", "identifier").required()],
                category: None,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success(&call.name, self.origin))
        }
    }

    struct Anonymous;

    #[async_trait]
    impl Tool for Anonymous {
        fn schema(&self) -> ToolSchema {
            ToolSchema::default()
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success(&call.name, "anonymous"))
        }
    }

    fn tool(name: &'static str, origin: &'static str) -> Arc<dyn Tool> {
        Arc::new(Named { name, origin })
    }

    fn origins(set: &ToolSet) -> Vec<String> {
        set.schemas().into_iter().map(|s| s.description).collect()
    }

    #[test]
    fn test_aggregate_first_seen_wins() {
        let set = ToolSet::aggregate([
            vec![tool("a", "s1"), tool("b", "s1")],
            vec![tool("b", "s2"), tool("c", "s2")],
            vec![tool("a", "s3"), tool("d", "s3"), tool("c", "s3")],
        ]);

        assert_eq!(set.names(), vec!["a", "b", "c", "d"]);
        assert_eq!(origins(&set), vec!["from s1", "from s1", "from s2", "from s3"]);
    }

    #[test]
    fn test_duplicates_within_one_list() {
        let set = ToolSet::aggregate([vec![tool("x", "first"), tool("x", "second")]]);
        assert_eq!(set.len(), 1);
        assert_eq!(origins(&set), vec!["from first"]);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let set = ToolSet::aggregate([
            vec![tool("a", "s1"), tool("b", "s1")],
            vec![tool("a", "s2"), tool("c", "s2")],
        ]);
        let again = ToolSet::aggregate([set.tools().cloned().collect::<Vec<_>>()]);

        assert_eq!(again.names(), set.names());
        assert_eq!(origins(&again), origins(&set));
    }

    #[test]
    fn test_empty_sources() {
        let set = ToolSet::aggregate(Vec::<Vec<Arc<dyn Tool>>>::new());
        assert!(set.is_empty());
    }

    #[test]
    fn test_name_falls_back_to_label() {
        let anon = Anonymous;
        let name = resolve_name(&anon);
        assert!(name.ends_with("Anonymous"));

        let mut set = ToolSet::new();
        assert!(set.register(Anonymous));
        assert!(!set.register(Anonymous));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_validates_required_params() {
        let set = ToolSet::aggregate([vec![tool("lookup", "s1")]]);

        let err = set.execute(&ToolCall::new("lookup")).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));

        let ok = set
            .execute(&ToolCall::new("lookup").with_argument("id", json!("7")))
            .await
            .unwrap();
        assert!(ok.success);

        let missing = set.execute(&ToolCall::new("nope")).await.unwrap_err();
        assert!(matches!(missing, AgentError::ToolNotFound(_)));
    }

    #[test]
    fn test_input_schema_round_trip() {
        let schema = ToolSchema {
            name: "get_work_orders".into(),
            description: "List work orders".into(),
            parameters: vec![
                ParameterSchema::string("status", "Filter").one_of(&["open", "closed"]),
                ParameterSchema::string("equipment_id", "Equipment").required(),
            ],
            category: None,
        };

        let parsed = ToolSchema::from_input_schema(
            &schema.name,
            &schema.description,
            &schema.input_schema(),
        );

        assert_eq!(parsed.parameters.len(), 2);
        let equipment = parsed
            .parameters
            .iter()
            .find(|p| p.name == "equipment_id")
            .unwrap();
        assert!(equipment.required);
        let status = parsed.parameters.iter().find(|p| p.name == "status").unwrap();
        assert!(!status.required);
        assert_eq!(status.enum_values.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_prompt_section_lists_tools_in_order() {
        let set = ToolSet::aggregate([vec![tool("first", "s1"), tool("second", "s1")]]);
        let prompt = set.generate_prompt_section();
        let first = prompt.find("### first").unwrap();
        let second = prompt.find("### second").unwrap();
        assert!(first < second);
        assert!(prompt.contains("`id` (string) (required)"));
    }
}
