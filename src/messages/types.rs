use serde::{Deserialize, Serialize};

/// Internal sentinel sent to prime a session without showing a greeting
/// echo; messages carrying it are never displayable.
pub const WARM_UP_SENTINEL: &str = "default hello";

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    User,
    Bot,
}

/// How the content was produced. Relevant mainly for outbound messages,
/// informational on inbound ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryMethod {
    Text,
    Audio,
    Event,
}

/// A named backend event behind a tappable list entry or quick reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogEvent {
    pub title: String,
    pub event: String,
}

/// One line of a card body: plain text or a tappable event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardLine {
    Text(String),
    Action { title: String, event: String },
}

impl CardLine {
    /// Title of an action line; plain text lines have none
    pub fn title(&self) -> Option<&str> {
        match self {
            CardLine::Action { title, .. } => Some(title),
            CardLine::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardKind {
    Description,
    Info,
}

/// A single structured card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub kind: CardKind,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub action_link: Option<String>,
    pub lines: Vec<CardLine>,
}

/// One collapsible section of an accordion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccordionSection {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
}

/// Structured payload attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RichContent {
    Description(Card),
    Info(Card),
    AccordionSections(Vec<AccordionSection>),
}

impl RichContent {
    pub fn is_accordion(&self) -> bool {
        matches!(self, RichContent::AccordionSections(_))
    }
}

/// A discriminated unit of conversation.
///
/// At most one of {non-empty `content`, `rich`} carries the substantive
/// payload; `displayable` is false whenever both are empty, and always
/// false for the warm-up sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub origin: Origin,
    pub query_method: QueryMethod,
    pub content: String,
    /// Backend-issued correlation id, empty for user-originated messages
    pub response_id: String,
    /// Playable audio reference (data URL), if the backend spoke the reply
    pub audio_url: Option<String>,
    pub quick_replies: Vec<String>,
    pub rich: Option<RichContent>,
    pub displayable: bool,
    pub is_accordion: bool,
    /// The rich payload carries a list-with-events sub-structure, which
    /// switches the rendering role from "bot" to "list"
    pub has_list: bool,
}

impl Message {
    /// An outbound user message
    pub fn user(query_method: QueryMethod, content: impl Into<String>) -> Self {
        let content = content.into();
        let displayable = !content.is_empty() && content != WARM_UP_SENTINEL;
        Self {
            origin: Origin::User,
            query_method,
            content,
            response_id: String::new(),
            audio_url: None,
            quick_replies: Vec::new(),
            rich: None,
            displayable,
            is_accordion: false,
            has_list: false,
        }
    }

    /// An empty inbound shell the normalizer fills in
    pub(crate) fn bot_shell(response_id: impl Into<String>) -> Self {
        Self {
            origin: Origin::Bot,
            query_method: QueryMethod::Text,
            content: String::new(),
            response_id: response_id.into(),
            audio_url: None,
            quick_replies: Vec::new(),
            rich: None,
            displayable: true,
            is_accordion: false,
            has_list: false,
        }
    }

    /// Role the view should render this message under. Presentation only:
    /// list-bearing bot messages render as "list".
    pub fn render_role(&self) -> &'static str {
        match self.origin {
            Origin::User => "user",
            Origin::Bot if self.has_list => "list",
            Origin::Bot => "bot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_displayable() {
        let msg = Message::user(QueryMethod::Text, "hello there");
        assert!(msg.displayable);
        assert_eq!(msg.origin, Origin::User);
        assert!(msg.response_id.is_empty());
    }

    #[test]
    fn test_empty_user_message_hidden() {
        let msg = Message::user(QueryMethod::Text, "");
        assert!(!msg.displayable);
    }

    #[test]
    fn test_warm_up_sentinel_hidden() {
        let msg = Message::user(QueryMethod::Text, WARM_UP_SENTINEL);
        assert!(!msg.displayable);
    }

    #[test]
    fn test_render_role() {
        let user = Message::user(QueryMethod::Audio, "hi");
        assert_eq!(user.render_role(), "user");

        let mut bot = Message::bot_shell("r1");
        assert_eq!(bot.render_role(), "bot");
        bot.has_list = true;
        assert_eq!(bot.render_role(), "list");
    }

    #[test]
    fn test_card_line_title() {
        let plain = CardLine::Text("just text".into());
        assert_eq!(plain.title(), None);

        let action = CardLine::Action {
            title: "Opening hours".into(),
            event: "hours".into(),
        };
        assert_eq!(action.title(), Some("Opening hours"));
    }
}
