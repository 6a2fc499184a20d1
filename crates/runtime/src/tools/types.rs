//! Tool-related types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool advertised by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

/// Accepted arguments of a tool, flattened from its JSON Schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    /// JSON Schema type, `a|b` for unions, `any` when undeclared.
    pub kind: String,
    pub required: bool,
}

impl InputSchema {
    /// Read `properties` and `required` from an object schema.
    ///
    /// Anything that is not an object schema yields no fields.
    pub fn from_json_schema(schema: &Value) -> Self {
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Self::default();
        };
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let fields = properties
            .iter()
            .map(|(name, property)| SchemaField {
                name: name.clone(),
                kind: schema_type(property),
                required: required.contains(&name.as_str()),
            })
            .collect();
        Self { fields }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn schema_type(property: &Value) -> String {
    match property.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("|"),
        _ => "any".to_string(),
    }
}

impl From<mcp::Tool> for ToolDescriptor {
    fn from(tool: mcp::Tool) -> Self {
        Self {
            input_schema: InputSchema::from_json_schema(&tool.input_schema),
            description: tool.description.unwrap_or_default(),
            name: tool.name,
        }
    }
}

/// A tool invocation extracted from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// One block of tool output. Only text is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    Other { kind: String },
}

/// Ordered content returned by a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
}

impl ToolCallResult {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(value.into())],
        }
    }

    /// Deterministic display form: one line group per block, in order.
    pub fn render(&self) -> String {
        if self.content.is_empty() {
            return "(no content)".to_string();
        }
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text(text) => text.clone(),
                ContentBlock::Other { kind } => format!("[{kind} content omitted]"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<mcp::CallToolResult> for ToolCallResult {
    fn from(result: mcp::CallToolResult) -> Self {
        let content = result
            .content
            .into_iter()
            .map(|block| match block {
                mcp::ToolContent::Text { text } => ContentBlock::Text(text),
                other => ContentBlock::Other {
                    kind: other.kind().to_string(),
                },
            })
            .collect();
        Self { content }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_fields_keep_declaration_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "email": {"type": "string", "format": "email"},
                "age": {"type": ["integer", "null"]},
                "notes": {}
            },
            "required": ["name", "email"]
        });
        let parsed = InputSchema::from_json_schema(&schema);
        assert_eq!(parsed.field_names(), ["name", "email", "age", "notes"]);
        assert!(parsed.fields[0].required);
        assert!(!parsed.fields[2].required);
        assert_eq!(parsed.fields[2].kind, "integer|null");
        assert_eq!(parsed.fields[3].kind, "any");
    }

    #[test]
    fn non_object_schema_has_no_fields() {
        assert!(InputSchema::from_json_schema(&Value::Null).is_empty());
        assert!(InputSchema::from_json_schema(&json!({"type": "object"})).is_empty());
    }

    #[test]
    fn descriptor_from_mcp_tool() {
        let tool: mcp::Tool = serde_json::from_value(json!({
            "name": "get_user",
            "inputSchema": {"type": "object", "properties": {"id": {"type": "number"}}, "required": ["id"]}
        }))
        .unwrap();
        let descriptor = ToolDescriptor::from(tool);
        assert_eq!(descriptor.name, "get_user");
        assert_eq!(descriptor.description, "");
        assert_eq!(descriptor.input_schema.field_names(), ["id"]);
    }

    #[test]
    fn render_keeps_block_order() {
        let result = ToolCallResult {
            content: vec![
                ContentBlock::Text("first".into()),
                ContentBlock::Other {
                    kind: "image".into(),
                },
                ContentBlock::Text("second".into()),
            ],
        };
        assert_eq!(result.render(), "first\n[image content omitted]\nsecond");
        assert_eq!(ToolCallResult::default().render(), "(no content)");
    }

    #[test]
    fn result_from_mcp_content() {
        let raw: mcp::CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "Echo: hi"}, {"type": "resource", "resource": {"uri": "x"}}]
        }))
        .unwrap();
        let result = ToolCallResult::from(raw);
        assert_eq!(result.render(), "Echo: hi\n[resource content omitted]");
    }
}
