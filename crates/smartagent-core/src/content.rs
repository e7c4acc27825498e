//! Conversation history to provider input.

use crate::message::{Conversation, Role};
use crate::provider::{Content, ContentRole};

/// Map each persisted turn onto a provider-input entry: user turns keep the
/// `user` role, assistant replies become `model` turns.
pub fn build_contents(history: &Conversation) -> Vec<Content> {
    history
        .turns()
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => ContentRole::User,
                Role::Assistant => ContentRole::Model,
            };
            Content::text(role, turn.content.clone())
        })
        .collect()
}
