//! Messaging transport seam.
//!
//! The core never talks to a bot API directly; the hosting application
//! implements [`ChatTransport`]. The one recovery the core owns lives here:
//! replying to a message that no longer exists degrades to a fresh,
//! non-reply send instead of surfacing an error.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Errors from the messaging transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target message no longer exists (deleted or never delivered).
    #[error("target message no longer exists")]
    MessageNotFound,

    /// The chat is unknown or the bot was removed from it.
    #[error("chat not reachable: {0}")]
    ChatUnreachable(i64),

    /// Any other send/edit failure.
    #[error("transport failure: {0}")]
    Failed(String),
}

/// Options for an outbound send.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Message id to reply to, if any.
    pub reply_to: Option<i64>,
    /// Display tag prepended by the host (e.g. the routing icon).
    pub tag: Option<String>,
}

impl SendOptions {
    /// Options for a reply to an existing message.
    pub fn reply(message_id: i64) -> Self {
        Self {
            reply_to: Some(message_id),
            tag: None,
        }
    }
}

/// Abstract messaging transport (Telegram-style bot API).
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message to a chat. Returns the new message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        opts: &SendOptions,
    ) -> std::result::Result<i64, TransportError>;

    /// Edit an existing message in place.
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> std::result::Result<(), TransportError>;
}

/// Send preferring a threaded reply, degrading to a fresh send when the
/// target message is gone.
pub async fn send_with_reply_fallback(
    transport: &dyn ChatTransport,
    chat_id: i64,
    text: &str,
    reply_to: Option<i64>,
) -> std::result::Result<i64, TransportError> {
    let opts = SendOptions {
        reply_to,
        tag: None,
    };
    match transport.send_message(chat_id, text, &opts).await {
        Ok(message_id) => Ok(message_id),
        Err(TransportError::MessageNotFound) if reply_to.is_some() => {
            warn!(
                chat_id,
                reply_to = reply_to.unwrap_or_default(),
                "Reply target gone, sending as fresh message"
            );
            transport
                .send_message(chat_id, text, &SendOptions::default())
                .await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Transport that rejects replies to ids it does not know about.
    struct StrictTransport {
        known_messages: Vec<i64>,
        sent: Mutex<Vec<(i64, String, Option<i64>)>>,
        next_id: Mutex<i64>,
    }

    impl StrictTransport {
        fn new(known_messages: Vec<i64>) -> Self {
            Self {
                known_messages,
                sent: Mutex::new(Vec::new()),
                next_id: Mutex::new(100),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for StrictTransport {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            opts: &SendOptions,
        ) -> std::result::Result<i64, TransportError> {
            if let Some(reply_to) = opts.reply_to {
                if !self.known_messages.contains(&reply_to) {
                    return Err(TransportError::MessageNotFound);
                }
            }
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            self.sent
                .lock()
                .unwrap()
                .push((chat_id, text.to_string(), opts.reply_to));
            Ok(*next)
        }

        async fn edit_message(
            &self,
            _chat_id: i64,
            message_id: i64,
            _text: &str,
        ) -> std::result::Result<(), TransportError> {
            if !self.known_messages.contains(&message_id) {
                return Err(TransportError::MessageNotFound);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reply_to_live_message_threads() {
        let transport = StrictTransport::new(vec![7]);
        let id = send_with_reply_fallback(&transport, 1, "hi", Some(7))
            .await
            .unwrap();
        assert!(id > 100);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].2, Some(7));
    }

    #[tokio::test]
    async fn test_reply_to_deleted_message_degrades_to_fresh_send() {
        let transport = StrictTransport::new(vec![]);
        send_with_reply_fallback(&transport, 1, "hi", Some(99))
            .await
            .unwrap();
        let sent = transport.sent.lock().unwrap();
        // Only the successful fresh send is recorded, with no reply target.
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].2, None);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        struct DownTransport;

        #[async_trait]
        impl ChatTransport for DownTransport {
            async fn send_message(
                &self,
                _chat_id: i64,
                _text: &str,
                _opts: &SendOptions,
            ) -> std::result::Result<i64, TransportError> {
                Err(TransportError::Failed("network down".into()))
            }

            async fn edit_message(
                &self,
                _chat_id: i64,
                _message_id: i64,
                _text: &str,
            ) -> std::result::Result<(), TransportError> {
                Err(TransportError::Failed("network down".into()))
            }
        }

        let err = send_with_reply_fallback(&DownTransport, 1, "hi", Some(7))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Failed(_)));
    }
}
