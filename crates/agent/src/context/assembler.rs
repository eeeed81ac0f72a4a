//! Prompt assembly.
//!
//! Builds the single prompt string sent to the generation backend from
//! four sections, in this order:
//!
//! 1. **System instructions**: fixed text plus the available tool list
//! 2. **Knowledge base**: retrieved excerpts in rank order, each tagged with its source
//! 3. **Plugin results**: the tool output, only when the tool succeeded
//! 4. **Conversation history**: recent messages, oldest first, prefixed by role
//!
//! The prompt ends with `Assistant:`. Assembly is deterministic: identical
//! inputs always produce identical prompts.

use ragline_core::chunk::SearchResult;
use ragline_core::message::Message;
use ragline_core::tool::ToolResult;
use serde::Serialize;

use crate::context::token;

const PREAMBLE: &str = "You are an intelligent AI assistant with access to a knowledge base and various plugins. Your capabilities include:

1. **Knowledge Base Access**: You can search through stored documents and use relevant information to answer questions.
2. **Plugin Execution**: You can use plugins for specific tasks like weather information and mathematical calculations.
3. **Conversation Memory**: You remember the context of ongoing conversations.

**Instructions:**
- Always be helpful, accurate, and concise in your responses
- When using information from the knowledge base, cite the source
- When using plugins, clearly indicate what information you're providing
- Maintain conversation context and refer to previous messages when relevant
- If you don't know something, say so rather than making up information";

const RESPONSE_FORMAT: &str = "**Response Format:**
- Provide clear, well-structured responses
- If using plugins, explain what you found
- If using knowledge base content, mention the source
- Keep responses conversational and natural";

/// A tool output to include in the prompt.
pub struct ToolOutput<'a> {
    pub tool_name: &'a str,
    pub result: &'a ToolResult,
}

/// Everything the assembler needs for one turn.
pub struct AssemblyInput<'a> {
    /// Search hits, best first.
    pub excerpts: &'a [SearchResult],
    pub tool_output: Option<ToolOutput<'a>>,
    /// Recent messages, oldest first. Includes the current user message.
    pub history: &'a [Message],
}

/// Size accounting for one assembled prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblyMetadata {
    pub excerpts: usize,
    pub tool_included: bool,
    pub history_messages: usize,
    pub estimated_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub text: String,
    pub metadata: AssemblyMetadata,
}

/// The prompt assembler. Stateless apart from its system instructions.
pub struct ContextAssembler {
    system_instructions: String,
}

impl ContextAssembler {
    /// Build an assembler advertising `tools` as `(name, description)` pairs.
    pub fn new<'a>(tools: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let listing: Vec<String> = tools
            .into_iter()
            .map(|(name, description)| format!("- {name}: {description}"))
            .collect();

        let mut system_instructions = PREAMBLE.to_string();
        if !listing.is_empty() {
            system_instructions.push_str("\n\n**Available Plugins:**\n");
            system_instructions.push_str(&listing.join("\n"));
        }
        system_instructions.push_str("\n\n");
        system_instructions.push_str(RESPONSE_FORMAT);

        Self {
            system_instructions,
        }
    }

    pub fn system_instructions(&self) -> &str {
        &self.system_instructions
    }

    pub fn assemble(&self, input: &AssemblyInput<'_>) -> AssembledPrompt {
        let mut prompt = String::with_capacity(self.system_instructions.len() + 1024);
        prompt.push_str(&self.system_instructions);
        prompt.push_str("\n\n");

        if !input.excerpts.is_empty() {
            let context = input
                .excerpts
                .iter()
                .map(|r| format!("Source: {}\nContent: {}", r.chunk.source, r.chunk.content))
                .collect::<Vec<_>>()
                .join("\n\n");
            prompt.push_str("Context from knowledge base:\n");
            prompt.push_str(&context);
            prompt.push_str("\n\n");
        }

        let tool_section = input.tool_output.as_ref().and_then(render_tool_output);
        if let Some(section) = &tool_section {
            prompt.push_str("Plugin results:\n");
            prompt.push_str(section);
            prompt.push_str("\n\n");
        }

        prompt.push_str("Conversation history:\n");
        for message in input.history {
            prompt.push_str(&format!("{}: {}\n", message.role, message.content));
        }
        prompt.push_str("\nAssistant:");

        let metadata = AssemblyMetadata {
            excerpts: input.excerpts.len(),
            tool_included: tool_section.is_some(),
            history_messages: input.history.len(),
            estimated_tokens: token::estimate_tokens(&prompt),
        };

        AssembledPrompt {
            text: prompt,
            metadata,
        }
    }
}

/// `Plugin: <name>\nResult: <pretty JSON>`, or `None` for a failed tool.
fn render_tool_output(output: &ToolOutput<'_>) -> Option<String> {
    if !output.result.success {
        return None;
    }
    let data = output
        .result
        .data
        .as_ref()
        .map(|d| serde_json::to_string_pretty(d).unwrap_or_else(|_| d.to_string()))
        .unwrap_or_else(|| "null".into());
    Some(format!("Plugin: {}\nResult: {}", output.tool_name, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::chunk::{Chunk, EmbeddingMode};
    use std::sync::Arc;

    fn hit(source: &str, content: &str) -> SearchResult {
        SearchResult {
            chunk: Arc::new(Chunk {
                id: format!("chunk_{source}"),
                content: content.into(),
                source: source.into(),
                embedding: vec![1.0],
                embedding_mode: EmbeddingMode::Semantic,
                metadata: serde_json::Map::new(),
            }),
            similarity: 0.9,
        }
    }

    fn assembler() -> ContextAssembler {
        ContextAssembler::new([("math", "Evaluate mathematical expressions")])
    }

    #[test]
    fn system_instructions_list_tools() {
        let a = assembler();
        assert!(a.system_instructions().contains("**Available Plugins:**"));
        assert!(a.system_instructions().contains("- math: Evaluate mathematical expressions"));
        assert!(!ContextAssembler::new(Vec::<(&str, &str)>::new()).system_instructions().contains("Available Plugins"));
    }

    #[test]
    fn sections_appear_in_order() {
        let excerpts = vec![hit("a.md", "Alpha text"), hit("b.md", "Beta text")];
        let result = ToolResult::ok(serde_json::json!({ "result": 12 }));
        let history = vec![Message::user("earlier"), Message::user("2 + 2 * 5")];

        let prompt = assembler().assemble(&AssemblyInput {
            excerpts: &excerpts,
            tool_output: Some(ToolOutput {
                tool_name: "math",
                result: &result,
            }),
            history: &history,
        });

        let text = &prompt.text;
        let kb = text.find("Context from knowledge base:\nSource: a.md\nContent: Alpha text\n\nSource: b.md").unwrap();
        let plugin = text.find("Plugin results:\nPlugin: math\nResult: {\n  \"result\": 12\n}").unwrap();
        let history_at = text.find("Conversation history:\nuser: earlier\nuser: 2 + 2 * 5\n").unwrap();
        assert!(kb < plugin && plugin < history_at);
        assert!(text.ends_with("\nAssistant:"));

        assert_eq!(
            prompt.metadata,
            AssemblyMetadata {
                excerpts: 2,
                tool_included: true,
                history_messages: 2,
                estimated_tokens: token::estimate_tokens(text),
            }
        );
    }

    #[test]
    fn failed_tool_and_empty_retrieval_are_omitted() {
        let result = ToolResult::failure("No mathematical expression found");
        let history = vec![Message::user("calculate something")];
        let prompt = assembler().assemble(&AssemblyInput {
            excerpts: &[],
            tool_output: Some(ToolOutput {
                tool_name: "math",
                result: &result,
            }),
            history: &history,
        });
        assert!(!prompt.text.contains("Context from knowledge base:"));
        assert!(!prompt.text.contains("Plugin results:"));
        assert!(!prompt.metadata.tool_included);
        assert!(prompt.text.contains("user: calculate something"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let excerpts = vec![hit("a.md", "Alpha")];
        let history = vec![Message::user("q")];
        let input = AssemblyInput {
            excerpts: &excerpts,
            tool_output: None,
            history: &history,
        };
        let a = assembler();
        assert_eq!(a.assemble(&input).text, a.assemble(&input).text);
    }
}
