//! Block Kit builders for approval prompts.

use verifydesk_core::Decision;

use super::types::{ActionElement, Block, ButtonStyle, PlainText, Text};
use crate::notify::Prompt;

/// Slack rejects section text longer than this.
const MAX_SECTION_LEN: usize = 3000;

/// Build the blocks for a prompt: header, fields, footer, then one button
/// per decision. Buttons carry the decision as `action_id` and the
/// application ID as `value`.
#[must_use]
pub fn build_prompt_blocks(prompt: &Prompt) -> Vec<Block> {
    let fields = prompt
        .fields
        .iter()
        .map(|field| format!("*{}:* `{}`", field.label, field.value))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        Block::Header {
            text: PlainText::new(prompt.title.clone()),
        },
        Block::Section {
            text: Text::mrkdwn(truncate(&fields)),
        },
        Block::Context {
            elements: vec![Text::mrkdwn(prompt.footer.clone())],
        },
        Block::Divider,
        Block::Actions {
            block_id: format!("{}:{}", prompt.stage, prompt.application_id),
            elements: prompt
                .actions
                .iter()
                .map(|decision| button(*decision, prompt))
                .collect(),
        },
    ]
}

/// A single text section, used for outcomes and command replies.
#[must_use]
pub fn build_text_blocks(text: &str) -> Vec<Block> {
    vec![Block::Section {
        text: Text::mrkdwn(truncate(text)),
    }]
}

fn button(decision: Decision, prompt: &Prompt) -> ActionElement {
    ActionElement::Button {
        text: PlainText::new(decision.label()),
        action_id: decision.action_name(),
        value: prompt.application_id.to_string(),
        style: button_style(decision),
    }
}

const fn button_style(decision: Decision) -> Option<ButtonStyle> {
    use verifydesk_core::{CodeDecision, PinDecision};
    match decision {
        Decision::Pin(PinDecision::Approve) | Decision::Code(CodeDecision::Approve) => {
            Some(ButtonStyle::Primary)
        }
        Decision::Pin(PinDecision::Deny) => Some(ButtonStyle::Danger),
        Decision::Code(_) => None,
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_SECTION_LEN {
        return text.to_string();
    }
    let mut end = MAX_SECTION_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", text.get(..end).unwrap_or_default())
}
