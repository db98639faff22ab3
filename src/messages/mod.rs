pub mod normalizer;
pub mod store;
pub mod types;

pub use normalizer::QueryResponse;
pub use store::ConversationStore;
pub use types::{
    AccordionSection, Card, CardKind, CardLine, DialogEvent, Message, Origin, QueryMethod,
    RichContent, WARM_UP_SENTINEL,
};
