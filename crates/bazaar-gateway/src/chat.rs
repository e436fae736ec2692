use tracing::debug;
use uuid::Uuid;

use bazaar_db::Database;
use bazaar_db::models::parse_timestamp;
use bazaar_types::error::{MarketError, MarketResult};
use bazaar_types::events::ChatEvent;
use bazaar_types::models::ChatMessage;

use crate::dispatcher::Dispatcher;

/// Full conversation for a product, oldest first.
pub fn history(db: &Database, product_id: Uuid) -> MarketResult<Vec<ChatMessage>> {
    let rows = db.chat_history(&product_id.to_string())?;
    let messages = rows
        .into_iter()
        .map(|row| row.into_message())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(messages)
}

/// Store a message from the holder of `token` and hand it to the dispatcher.
///
/// The session is resolved again for every message, so a logout elsewhere
/// stops a socket that is still open.
pub fn post(
    db: &Database,
    dispatcher: &Dispatcher,
    token: &str,
    product_id: Uuid,
    text: &str,
) -> MarketResult<ChatMessage> {
    let sender = bazaar_auth::session::resolve(db, token)?;

    let text = text.trim();
    if text.is_empty() {
        return Err(MarketError::InvalidInput("empty message".into()));
    }

    let pid = product_id.to_string();
    if !db.product_exists(&pid)? {
        return Err(MarketError::NotFound);
    }

    let message_id = Uuid::new_v4();
    let created_at = db.insert_chat_message(&message_id.to_string(), &pid, &sender.username, text)?;

    let message = ChatMessage {
        id: message_id,
        product_id,
        username: sender.username,
        message: text.to_string(),
        created_at: parse_timestamp(&created_at)?,
    };

    let delivered = dispatcher.publish(&ChatEvent::Message {
        message_id: message.id,
        product_id,
        username: message.username.clone(),
        message: message.message.clone(),
        timestamp: message.created_at,
    });
    debug!("Chat message {} on {} handed to {} connections", message.id, product_id, delivered);

    Ok(message)
}
