use shared::domain::SessionStatus;
use transport::InboundMessage;

// Replies go only to messages that originated elsewhere, and only while the
// session is connected. Every qualifying message gets exactly one reply; there
// is no deduplication or conversation memory.
pub fn should_reply(message: &InboundMessage, status: SessionStatus) -> bool {
    !message.from_me && status.is_connected()
}
