//! Response normalization
//!
//! Turns the backend's loosely-typed reply payload into a single [`Message`]
//! the view layer can render uniformly. The wire shapes are decoded once at
//! this boundary into tagged variants; nothing downstream re-inspects raw
//! JSON.

use crate::messages::types::{
    AccordionSection, Card, CardKind, CardLine, Message, RichContent, WARM_UP_SENTINEL,
};
use crate::session::ConversationSession;
use crate::{ParleyError, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Apology shown when the very first turn of a session fails
pub const FIRST_TURN_APOLOGY: &str =
    "Sorry, I'm having trouble getting our conversation started. Please try again.";

/// Apology shown when a later turn fails
pub const APOLOGY: &str = "Sorry, something went wrong on my end. Please try again.";

/// Bootstrap chip offered when there is no remembered quick-reply set
pub const BOOTSTRAP_QUICK_REPLY: &str = "Try again";

/// Raw backend reply for one conversational turn.
///
/// `messages_json` is an ordered sequence of independently encoded JSON
/// fragments. The transcript field is spelled `original_reqeust` on the
/// wire; both spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default, alias = "original_reqeust")]
    pub original_request: String,
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub messages_json: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Fragment {
    #[serde(default)]
    text: Option<TextBlock>,
    #[serde(default)]
    payload: Option<RichPayload>,
}

#[derive(Debug, Deserialize)]
struct TextBlock {
    #[serde(default)]
    text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RichPayload {
    #[serde(rename = "richContent", default)]
    rich_content: Vec<Vec<Value>>,
}

/// Tagged rich-content entry as the backend encodes it
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireEntry {
    Description {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        text: Vec<String>,
    },
    Info {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        subtitle: Option<String>,
        #[serde(default, rename = "actionLink")]
        action_link: Option<String>,
    },
    Accordion {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        subtitle: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    List {
        title: String,
        event: WireEvent,
    },
    Chips {
        #[serde(default)]
        options: Vec<WireChip>,
    },
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireChip {
    text: String,
}

/// Entries with an unknown tag (or a known tag with a broken body) decode
/// to `None` and are skipped, never failing the turn.
fn decode_entry(value: &Value) -> Option<WireEntry> {
    serde_json::from_value(value.clone()).ok()
}

/// Map a tapped quick reply to the text actually submitted: the retry chip
/// primes the session with the warm-up sentinel instead of echoing its
/// label.
pub fn quick_reply_query(label: &str) -> &str {
    if label.eq_ignore_ascii_case(BOOTSTRAP_QUICK_REPLY) {
        WARM_UP_SENTINEL
    } else {
        label
    }
}

/// Normalize one backend reply into a message, updating the session's
/// quick-reply cache. A malformed payload degrades into the apology path;
/// the session counts as started either way.
pub fn normalize(res: &QueryResponse, session: &mut ConversationSession) -> Message {
    match build_bot_message(res) {
        Ok(msg) => {
            session.set_last_quick_replies(msg.quick_replies.clone());
            session.mark_started();
            msg
        }
        Err(e) => {
            warn!("Failed to normalize response: {}", e);
            failure_message(session)
        }
    }
}

/// Synthesize the bot message for a failed turn: a fixed apology plus the
/// remembered quick replies, or the bootstrap chip when nothing is cached.
/// Also used directly for transport-level failures.
pub fn failure_message(session: &mut ConversationSession) -> Message {
    let content = if session.started() {
        APOLOGY
    } else {
        FIRST_TURN_APOLOGY
    };

    let quick_replies = if session.started() && !session.last_quick_replies().is_empty() {
        session.last_quick_replies().to_vec()
    } else {
        vec![BOOTSTRAP_QUICK_REPLY.to_string()]
    };

    session.mark_started();

    let mut msg = Message::bot_shell("");
    msg.content = content.to_string();
    msg.quick_replies = quick_replies;
    msg
}

fn build_bot_message(res: &QueryResponse) -> Result<Message> {
    let groups = collect_rich_groups(&res.messages_json)?;

    let mut msg = Message::bot_shell(res.response_id.clone());
    msg.audio_url = res
        .audio
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(|a| format!("data:audio/wav;base64,{}", a));

    match groups {
        Some(groups) => {
            msg.quick_replies = extract_quick_replies(&groups);
            msg.rich = classify_rich_groups(&groups);

            match &msg.rich {
                Some(RichContent::AccordionSections(sections)) => {
                    // accordions render through a separate path, not as a
                    // normal message bubble
                    debug!("Normalized accordion with {} sections", sections.len());
                    msg.is_accordion = true;
                    msg.displayable = false;
                }
                Some(RichContent::Description(card)) => {
                    msg.has_list = card
                        .lines
                        .first()
                        .map(|line| line.title().is_some())
                        .unwrap_or(false);
                }
                _ => {}
            }
        }
        None => msg.content = res.text.clone(),
    }

    if msg.content.is_empty() && msg.rich.is_none() {
        msg.displayable = false;
    }
    if msg.content == WARM_UP_SENTINEL {
        msg.displayable = false;
    }

    Ok(msg)
}

/// Parse every fragment, returning the structured rich-content groups with
/// any plain-text fragment prepended as a synthetic description node. `None`
/// when no fragment carried a structured payload.
fn collect_rich_groups(messages_json: &[String]) -> Result<Option<Vec<Vec<Value>>>> {
    let mut text_node: Option<String> = None;
    let mut payload: Option<RichPayload> = None;

    for raw in messages_json {
        let fragment: Fragment = serde_json::from_str(raw)
            .map_err(|e| ParleyError::MalformedPayload(e.to_string()))?;

        if let Some(block) = fragment.text {
            if let Some(first) = block.text.into_iter().next() {
                text_node = Some(first);
            }
            continue;
        }
        if let Some(p) = fragment.payload {
            // last one wins; multiple payloads are not expected in practice
            payload = Some(p);
        }
    }

    Ok(payload.map(|mut p| {
        if let Some(text) = text_node {
            // ordinary text rendered via the rich channel stays above any
            // attached card or list
            p.rich_content.insert(
                0,
                vec![serde_json::json!({ "type": "description", "title": text })],
            );
        }
        p.rich_content
    }))
}

/// Walk the groups in order and pick the primary rich payload: the first
/// description or info card wins; accordion groups accumulate into a flat
/// section list used only when no card was found.
fn classify_rich_groups(groups: &[Vec<Value>]) -> Option<RichContent> {
    let mut card: Option<Card> = None;
    let mut sections: Vec<AccordionSection> = Vec::new();

    for group in groups {
        let Some(first) = group.first() else {
            continue;
        };
        match decode_entry(first) {
            Some(WireEntry::Description { title, text }) => {
                if card.is_some() {
                    continue;
                }
                let mut lines: Vec<CardLine> = text.into_iter().map(CardLine::Text).collect();
                for sibling in &group[1..] {
                    if let Some(WireEntry::List { title, event }) = decode_entry(sibling) {
                        lines.push(CardLine::Action {
                            title,
                            event: event.name,
                        });
                    }
                }
                card = Some(Card {
                    kind: CardKind::Description,
                    title,
                    subtitle: None,
                    action_link: None,
                    lines,
                });
            }
            Some(WireEntry::Info {
                title,
                subtitle,
                action_link,
            }) => {
                if card.is_some() {
                    continue;
                }
                card = Some(Card {
                    kind: CardKind::Info,
                    title,
                    subtitle,
                    action_link,
                    lines: Vec::new(),
                });
            }
            Some(WireEntry::Accordion { .. }) => {
                for sibling in group {
                    if let Some(WireEntry::Accordion {
                        title,
                        subtitle,
                        text,
                    }) = decode_entry(sibling)
                    {
                        sections.push(AccordionSection {
                            title,
                            subtitle,
                            body: text,
                        });
                    }
                }
            }
            // chips are extracted separately; unknown entries skip silently
            Some(WireEntry::Chips { .. }) | Some(WireEntry::List { .. }) | None => {}
        }
    }

    if let Some(card) = card {
        Some(match card.kind {
            CardKind::Description => RichContent::Description(card),
            CardKind::Info => RichContent::Info(card),
        })
    } else if !sections.is_empty() {
        Some(RichContent::AccordionSections(sections))
    } else {
        None
    }
}

/// Quick replies follow a shape-dependent rule: with exactly two groups only
/// the group led by a chips entry contributes; with exactly one group its
/// members are scanned directly.
fn extract_quick_replies(groups: &[Vec<Value>]) -> Vec<String> {
    let mut replies = Vec::new();

    match groups.len() {
        2 => {
            for group in groups {
                if let Some(Some(WireEntry::Chips { options })) =
                    group.first().map(decode_entry)
                {
                    replies.extend(options.into_iter().map(|chip| chip.text));
                }
            }
        }
        1 => {
            for value in &groups[0] {
                if let Some(WireEntry::Chips { options }) = decode_entry(value) {
                    replies.extend(options.into_iter().map(|chip| chip.text));
                }
            }
        }
        _ => {}
    }

    replies
}
