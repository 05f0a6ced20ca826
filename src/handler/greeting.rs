//! Default catch-all greeting handler.
//!
//! Registered at [`super::CATCH_ALL_PRIORITY`] so any purpose-built
//! handler outranks it. Answers private messages directly; in group
//! chats it only speaks when the bot was @-mentioned.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{MessageHandler, Outcome};
use crate::api::{LarkClient, ReceiveIdType};
use crate::card::{ButtonElement, Card, HeaderTemplate, TextElement};
use crate::event::MessageEvent;

/// Catch-all handler replying with a canned greeting card.
pub struct GreetingHandler {
    client: Arc<LarkClient>,
    docs_url: String,
}

impl GreetingHandler {
    /// Greeting handler pointing its help button at `docs_url`.
    pub fn new(client: Arc<LarkClient>, docs_url: impl Into<String>) -> Self {
        Self {
            client,
            docs_url: docs_url.into(),
        }
    }

    fn greeting_card(&self, private: bool) -> Card {
        let text = if private {
            "Hi! I didn't recognise that as a command. Here is what I can help with."
        } else {
            "Hi! You mentioned me but I didn't recognise a command. Here is what I can help with."
        };
        Card::new()
            .header("Larkgate", HeaderTemplate::Blue)
            .element(TextElement::new(text))
            .element(
                ButtonElement::new("Open the guide")
                    .primary()
                    .url(self.docs_url.clone()),
            )
    }
}

#[async_trait]
impl MessageHandler for GreetingHandler {
    fn supports(&self, _message: &MessageEvent) -> bool {
        true
    }

    async fn handle(&self, message: &MessageEvent) -> anyhow::Result<Outcome> {
        let private = message.is_private();
        if !private && !message.mentions_bot() {
            // Group chatter not addressed to the bot: stay silent.
            debug!(chat_id = %message.message.chat_id, "ignoring unaddressed group message");
            return Ok(Outcome::Stop);
        }

        let card = self.greeting_card(private);
        self.client
            .send_card(ReceiveIdType::ChatId, &message.message.chat_id, &card)
            .await?;
        Ok(Outcome::Stop)
    }

    fn name(&self) -> &str {
        "greeting"
    }
}
