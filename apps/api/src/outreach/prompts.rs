// Prompt constants for outreach generation.

use crate::models::outreach::MessageType;

pub fn system_prompt(message_type: MessageType) -> String {
    let guidance = match message_type {
        MessageType::ConnectionRequest => {
            "Draft a LinkedIn connection request note. \
             Be specific about the role. Be genuine and concise. No fluff."
        }
        MessageType::FollowUp => {
            "Draft a brief follow-up message for someone who accepted your connection \
             request but has not responded. Be respectful of their time. Reference the \
             specific role."
        }
        MessageType::Inmail => {
            "Draft a LinkedIn InMail message. Open with something specific about the \
             company or role. Connect your experience to what they need. Close with a \
             clear but low-pressure ask."
        }
    };
    format!(
        "{guidance} Hard limit: {} characters including spaces. \
         Return only the message text, with no subject line, quotes, or commentary.",
        message_type.ceiling()
    )
}
