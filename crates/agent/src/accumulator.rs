//! Chunk accumulator: folds raw model fragments into one assistant turn.
//!
//! The fold is `accumulate(turn, fragment) -> turn`: text concatenates in
//! arrival order, and tool-call fragments are merged by identity. A fragment
//! that carries an id joins the call with that id (or claims an id-less call
//! at the same index); an id-less fragment continues the latest call at its
//! index. Argument text is only parsed once the turn is finished.

use cocochat_core::message::Message;
use cocochat_core::provider::{StreamFragment, ToolCallFragment, Usage};
use cocochat_core::tool::ToolCall;

/// A tool call still being assembled from fragments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingToolCall {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

/// The turn as accumulated so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<PendingToolCall>,
    /// Last usage report seen in the stream
    pub usage: Option<Usage>,
    /// Number of fragments folded in
    pub fragments: usize,
}

/// Fold one fragment into the turn.
pub fn accumulate(mut turn: AssistantTurn, fragment: StreamFragment) -> AssistantTurn {
    turn.fragments += 1;

    if let Some(text) = fragment.content {
        turn.content.push_str(&text);
    }

    for delta in fragment.tool_calls {
        merge_tool_call(&mut turn.tool_calls, delta);
    }

    if fragment.usage.is_some() {
        turn.usage = fragment.usage;
    }

    turn
}

fn merge_tool_call(calls: &mut Vec<PendingToolCall>, mut delta: ToolCallFragment) {
    // Some endpoints send `"id": ""` on continuation deltas.
    delta.id = delta.id.filter(|id| !id.is_empty());
    delta.name = delta.name.filter(|name| !name.is_empty());

    let slot = match &delta.id {
        Some(id) => calls
            .iter()
            .position(|c| c.id.as_deref() == Some(id.as_str()))
            .or_else(|| {
                calls
                    .iter()
                    .position(|c| c.index == delta.index && c.id.is_none())
            }),
        None => calls.iter().rposition(|c| c.index == delta.index),
    };

    match slot {
        Some(i) => {
            let call = &mut calls[i];
            if call.id.is_none() {
                call.id = delta.id;
            }
            if call.name.is_none() {
                call.name = delta.name;
            }
            call.arguments.push_str(&delta.arguments);
        }
        None => calls.push(PendingToolCall {
            index: delta.index,
            id: delta.id,
            name: delta.name,
            arguments: delta.arguments,
        }),
    }
}

/// A turn whose fragment stream has ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
}

impl AssistantTurn {
    /// Close the turn, parsing each call's concatenated argument text.
    ///
    /// Empty argument text becomes `{}`. Text that is not valid JSON is kept
    /// as a JSON string so the invoker can reject it as invalid arguments.
    /// A call the model sent without an id gets a positional one.
    pub fn finish(self) -> FinishedTurn {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(position, pending)| {
                let raw = pending.arguments.trim();
                let arguments = if raw.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(raw)
                        .unwrap_or_else(|_| serde_json::Value::String(pending.arguments.clone()))
                };
                ToolCall {
                    id: pending.id.unwrap_or_else(|| {
                        format!("call_{}_{}", position, uuid::Uuid::new_v4().simple())
                    }),
                    name: pending.name.unwrap_or_default(),
                    arguments,
                }
            })
            .collect();

        FinishedTurn {
            content: self.content,
            tool_calls,
            usage: self.usage,
        }
    }
}

impl FinishedTurn {
    /// A turn with no text and no tool calls.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.tool_calls.is_empty()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The assistant message recording this turn in the log.
    pub fn to_message(&self) -> Message {
        Message::assistant_with_tool_calls(self.content.clone(), self.tool_calls.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fold(fragments: Vec<StreamFragment>) -> AssistantTurn {
        fragments.into_iter().fold(AssistantTurn::default(), accumulate)
    }

    fn call_fragment(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> StreamFragment {
        StreamFragment::tool_call(ToolCallFragment {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: args.into(),
        })
    }

    #[test]
    fn text_concatenates_in_order() {
        let turn = fold(vec![
            StreamFragment::text("hi"),
            StreamFragment::text(" "),
            StreamFragment::text("there"),
        ]);
        assert_eq!(turn.content, "hi there");
        assert_eq!(turn.fragments, 3);
        assert!(turn.finish().tool_calls.is_empty());
    }

    #[test]
    fn empty_stream_is_empty_turn() {
        let finished = fold(vec![]).finish();
        assert!(finished.is_empty());
        assert!(!finished.has_tool_calls());
    }

    #[test]
    fn split_tool_call_merges_by_index() {
        let finished = fold(vec![
            call_fragment(0, Some("call_1"), Some("item_search"), ""),
            call_fragment(0, None, None, "{\"name\":"),
            call_fragment(0, None, None, "\"jeans\"}"),
        ])
        .finish();

        assert_eq!(finished.tool_calls.len(), 1);
        let call = &finished.tool_calls[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "item_search");
        assert_eq!(call.arguments, json!({"name": "jeans"}));
    }

    #[test]
    fn interleaved_calls_keep_first_appearance_order() {
        let finished = fold(vec![
            call_fragment(0, Some("a"), Some("item_search"), "{\"name\":"),
            call_fragment(1, Some("b"), Some("item_search"), "{\"name\":"),
            call_fragment(1, None, None, "\"shirt\"}"),
            call_fragment(0, None, None, "\"jeans\"}"),
        ])
        .finish();

        let ids: Vec<&str> = finished.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(finished.tool_calls[0].arguments["name"], "jeans");
        assert_eq!(finished.tool_calls[1].arguments["name"], "shirt");
    }

    #[test]
    fn distinct_ids_at_same_index_are_distinct_calls() {
        let finished = fold(vec![
            call_fragment(0, Some("a"), Some("item_search"), "{}"),
            call_fragment(0, Some("b"), Some("item_search"), "{}"),
        ])
        .finish();
        assert_eq!(finished.tool_calls.len(), 2);
    }

    #[test]
    fn late_id_claims_idless_call() {
        let finished = fold(vec![
            call_fragment(0, None, Some("item_search"), "{\"name\":\"x\""),
            call_fragment(0, Some("call_late"), None, "}"),
        ])
        .finish();
        assert_eq!(finished.tool_calls.len(), 1);
        assert_eq!(finished.tool_calls[0].id, "call_late");
        assert_eq!(finished.tool_calls[0].arguments, json!({"name": "x"}));
    }

    #[test]
    fn empty_id_continues_current_call() {
        let finished = fold(vec![
            call_fragment(0, Some("call_1"), Some("item_search"), "{\"name\":"),
            call_fragment(0, Some(""), None, "\"jeans\","),
            call_fragment(0, Some(""), Some(""), "\"category\":\"pants\"}"),
        ])
        .finish();

        assert_eq!(finished.tool_calls.len(), 1);
        let call = &finished.tool_calls[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "item_search");
        assert_eq!(call.arguments, json!({"name": "jeans", "category": "pants"}));
    }

    #[test]
    fn text_and_tool_calls_in_one_turn() {
        let finished = fold(vec![
            StreamFragment::text("Let me look. "),
            call_fragment(0, Some("c"), Some("item_search"), "{}"),
            StreamFragment::text("One moment."),
        ])
        .finish();
        assert_eq!(finished.content, "Let me look. One moment.");
        assert!(finished.has_tool_calls());

        let msg = finished.to_message();
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.text(), "Let me look. One moment.");
    }

    #[test]
    fn empty_arguments_become_empty_object() {
        let finished = fold(vec![call_fragment(0, Some("c"), Some("item_search"), "")]).finish();
        assert_eq!(finished.tool_calls[0].arguments, json!({}));
    }

    #[test]
    fn malformed_arguments_are_kept_as_text() {
        let finished =
            fold(vec![call_fragment(0, Some("c"), Some("item_search"), "{\"name\": jea")]).finish();
        assert_eq!(
            finished.tool_calls[0].arguments,
            serde_json::Value::String("{\"name\": jea".into())
        );
    }

    #[test]
    fn missing_id_gets_positional_id() {
        let finished = fold(vec![call_fragment(3, None, Some("item_search"), "{}")]).finish();
        assert!(finished.tool_calls[0].id.starts_with("call_0_"));
    }

    #[test]
    fn last_usage_wins() {
        let usage = |total| Usage {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: total,
        };
        let turn = fold(vec![
            StreamFragment {
                usage: Some(usage(5)),
                ..StreamFragment::default()
            },
            StreamFragment::text("x"),
            StreamFragment {
                usage: Some(usage(9)),
                ..StreamFragment::default()
            },
        ]);
        assert_eq!(turn.usage.map(|u| u.total_tokens), Some(9));
    }
}
