//! Building ask requests.

use super::reply::CallReply;
use crate::config::InterpreterConfig;
use crate::model::{FunctionDef, ObjectDef, Program};
use claude::{Message, Request, ToolChoice};
use serde::Serialize;

/// One earlier request/reply pair for a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Payload text sent as the user message.
    pub request: String,
    /// Reply JSON sent back as the assistant message.
    pub reply: String,
}

/// A resolved argument as the service sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub type_hint: String,
    pub value: String,
    /// `literal` or `memory <name>`.
    pub source: String,
}

/// The JSON body of an ask request. Field order is the wire order.
#[derive(Debug, Serialize)]
struct CallPayload<'a> {
    helper: &'a str,
    returns: &'a str,
    prompt: &'a str,
    arguments: &'a [ArgumentPayload],
    objects: Vec<&'a ObjectDef>,
    memory: &'a str,
}

/// Render the payload for one ask call.
pub fn render_payload(
    program: &Program,
    function: &FunctionDef,
    arguments: &[ArgumentPayload],
    memory_summary: &str,
) -> Result<String, serde_json::Error> {
    let payload = CallPayload {
        helper: &function.name,
        returns: &function.return_type,
        prompt: &function.prompt,
        arguments,
        objects: program.objects.values().collect(),
        memory: memory_summary,
    };
    serde_json::to_string_pretty(&payload)
}

/// Assemble the request: prior exchanges for this helper, then the new payload.
pub fn build_request(config: &InterpreterConfig, history: &[Exchange], payload: &str) -> Request {
    let mut messages = Vec::with_capacity(history.len() * 2 + 1);
    for exchange in history {
        messages.push(Message::user(exchange.request.clone()));
        messages.push(Message::assistant(exchange.reply.clone()));
    }
    messages.push(Message::user(payload));

    config.apply(
        Request::new(messages)
            .with_system(config.helper_instructions.clone())
            .with_tools(vec![CallReply::as_tool()])
            .with_tool_choice(ToolChoice::Tool {
                name: CallReply::tool_name().to_string(),
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use claude::Role;

    #[test]
    fn test_payload_key_order() {
        let program = parse_program(
            "object Pet:\n  has name(Text)\nhelper greet returns Text:\n  needs who(Text)\n  prompt:\n<<<\nSay hi.\n>>>\n",
        )
        .unwrap();
        let function = &program.functions["greet"];
        let arguments = vec![ArgumentPayload {
            name: "who".into(),
            type_hint: "Text".into(),
            value: "Milo".into(),
            source: "literal".into(),
        }];

        let payload = render_payload(&program, function, &arguments, "(memory is empty)").unwrap();
        let positions: Vec<_> = [
            "\"helper\"",
            "\"returns\"",
            "\"prompt\"",
            "\"arguments\"",
            "\"objects\"",
            "\"memory\"",
        ]
        .iter()
        .map(|key| payload.find(key).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["helper"], "greet");
        assert_eq!(value["arguments"][0]["type"], "Text");
        assert_eq!(value["objects"][0]["fields"][0]["type"], "Text");
        assert!(value["objects"][0]["fields"][0].get("description").is_none());
        assert_eq!(value["memory"], "(memory is empty)");
    }

    #[test]
    fn test_request_replays_history() {
        let history = vec![Exchange {
            request: "first".into(),
            reply: "{\"result\":{\"value\":\"a\"}}".into(),
        }];
        let request = build_request(&InterpreterConfig::default(), &history, "second");

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.messages[0].text(), "first");
        assert_eq!(request.messages[1].role, Role::Assistant);
        assert_eq!(request.last_user_text().as_deref(), Some("second"));
        assert_eq!(
            request.tool_choice,
            Some(ToolChoice::Tool {
                name: "record_result".into()
            })
        );
        assert_eq!(request.max_tokens, 2048);
    }
}
