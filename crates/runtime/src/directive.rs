//! Detection of tool-call directives embedded in model output.
//!
//! Grammar: `TOOLCALL:` followed by optional whitespace and one JSON object
//! holding a string `name` and an object `arguments`:
//!
//! ```text
//! TOOLCALL: {"name": "create_user", "arguments": {"name": "Jane"}}
//! ```
//!
//! Only the first directive in an output counts. Anything malformed is
//! treated as plain text.

use serde_json::Value;

use crate::tools::ToolCallRequest;

/// Literal prefix of a tool-call directive.
pub const DIRECTIVE_MARKER: &str = "TOOLCALL:";

/// Byte span of the first directive and the request it encodes.
struct Directive {
    start: usize,
    end: usize,
    request: Option<ToolCallRequest>,
}

/// Extract the tool call requested by `output`, if any.
///
/// Never fails: a missing marker, invalid JSON or the wrong shape all
/// return `None`.
pub fn parse(output: &str) -> Option<ToolCallRequest> {
    locate(output)?.request
}

/// `output` with the first well-formed directive removed.
///
/// Text from a second marker onward is dropped as well, since that call is
/// never executed. Output without a well-formed directive is returned
/// unchanged.
pub fn strip_directive(output: &str) -> String {
    let Some(directive) = locate(output).filter(|d| d.request.is_some()) else {
        return output.to_string();
    };

    let before = output[..directive.start].trim();
    let mut after = &output[directive.end..];
    if let Some(next) = after.find(DIRECTIVE_MARKER) {
        tracing::debug!("ignoring additional tool call directive");
        after = &after[..next];
    }
    let after = after.trim();

    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{before}\n{after}"),
    }
}

fn locate(output: &str) -> Option<Directive> {
    let start = output.find(DIRECTIVE_MARKER)?;
    let after_marker = &output[start + DIRECTIVE_MARKER.len()..];
    let body = after_marker.trim_start();
    let body_start = start + DIRECTIVE_MARKER.len() + (after_marker.len() - body.len());

    let mut values = serde_json::Deserializer::from_str(body).into_iter::<Value>();
    let value = match values.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "malformed tool call directive");
            return Some(Directive {
                start,
                end: start + DIRECTIVE_MARKER.len(),
                request: None,
            });
        }
        None => return None,
    };
    let end = body_start + values.byte_offset();

    let request = into_request(value);
    if request.is_none() {
        tracing::warn!("tool call directive lacks a string `name` or object `arguments`");
    }
    Some(Directive {
        start,
        end,
        request,
    })
}

fn into_request(value: Value) -> Option<ToolCallRequest> {
    let Value::Object(mut object) = value else {
        return None;
    };
    let Some(Value::String(name)) = object.remove("name") else {
        return None;
    };
    let Some(Value::Object(arguments)) = object.remove("arguments") else {
        return None;
    };
    Some(ToolCallRequest { name, arguments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_create_user_call() {
        let out = r#"TOOLCALL: {"name": "create_user", "arguments": {"name": "Jane", "email": "jane@x.com"}}"#;
        let call = parse(out).unwrap();
        assert_eq!(call.name, "create_user");
        assert_eq!(call.arguments["email"], json!("jane@x.com"));
    }

    #[test]
    fn whitespace_after_colon_is_optional() {
        assert!(parse(r#"TOOLCALL:{"name":"echo","arguments":{}}"#).is_some());
        assert!(parse("TOOLCALL:\n  {\"name\":\"echo\",\"arguments\":{}}").is_some());
    }

    #[test]
    fn rejects_wrong_shapes() {
        for out in [
            "",
            "hi there",
            "TOOLCALL:",
            "TOOLCALL: not json",
            r#"TOOLCALL: {"name": "echo""#,
            r#"TOOLCALL: {"name": "echo"}"#,
            r#"TOOLCALL: {"arguments": {}}"#,
            r#"TOOLCALL: {"name": 3, "arguments": {}}"#,
            r#"TOOLCALL: {"name": "echo", "arguments": "text=hi"}"#,
            r#"TOOLCALL: {"name": "echo", "arguments": null}"#,
            r#"TOOLCALL: ["echo", {}]"#,
            r#"TOOLCALL "name": "echo""#,
            r#"TOOL_CALL: {"name": "echo", "arguments": {}}"#,
        ] {
            assert!(parse(out).is_none(), "should not parse: {out:?}");
        }
    }

    #[test]
    fn parse_is_total_over_odd_input() {
        let inputs = [
            "TOOLCALL: \u{0}\u{1}\u{7f}",
            "TOOLCALL: {{{{{{{{",
            "TOOLCALL: }",
            "ñandú TOOLCALL: 🦙",
            "TOOLCALL: 1e999999",
            "TOOLCALLTOOLCALL:TOOLCALL:",
        ];
        for input in inputs {
            assert!(parse(input).is_none());
        }
        let bytes: Vec<u8> = (0u8..=255).collect();
        assert!(parse(&String::from_utf8_lossy(&bytes)).is_none());
    }

    #[test]
    fn extra_keys_are_tolerated() {
        let call = parse(r#"TOOLCALL: {"name": "echo", "arguments": {}, "id": 7}"#).unwrap();
        assert_eq!(call.name, "echo");
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn first_directive_wins() {
        let out = concat!(
            r#"TOOLCALL: {"name": "get_users", "arguments": {}}"#,
            "\n",
            r#"TOOLCALL: {"name": "delete_user", "arguments": {"id": 1}}"#
        );
        assert_eq!(parse(out).unwrap().name, "get_users");
    }

    #[test]
    fn malformed_first_directive_hides_later_ones() {
        let out = concat!(
            r#"TOOLCALL: {"name": "broken""#,
            "\n",
            r#"TOOLCALL: {"name": "echo", "arguments": {}}"#
        );
        assert!(parse(out).is_none());
    }

    #[test]
    fn strip_keeps_narration() {
        let out = "Let me look that up.\nTOOLCALL: {\"name\": \"get_users\", \"arguments\": {}}\nOne moment.";
        assert_eq!(strip_directive(out), "Let me look that up.\nOne moment.");
    }

    #[test]
    fn strip_of_bare_directive_is_empty() {
        let out = r#"TOOLCALL: {"name":"echo","arguments":{"text":"hi"}}"#;
        assert_eq!(strip_directive(out), "");
    }

    #[test]
    fn strip_drops_second_directive_and_after() {
        let out = concat!(
            "Sure.\n",
            r#"TOOLCALL: {"name": "get_users", "arguments": {}}"#,
            " then ",
            r#"TOOLCALL: {"name": "get_meals", "arguments": {}}"#,
            " trailing"
        );
        assert_eq!(strip_directive(out), "Sure.\nthen");
    }

    #[test]
    fn strip_leaves_malformed_output_alone() {
        let out = r#"Trying TOOLCALL: {"name": "echo", "#;
        assert_eq!(strip_directive(out), out);
    }
}
