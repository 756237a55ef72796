pub mod property;
pub mod support_case;
pub mod user;

pub use property::Property;
pub use support_case::{
    ActorRole, CaseStatus, ConversationMessage, MessageAuthor, SeenTrack, SupportCase,
};
pub use user::User;
