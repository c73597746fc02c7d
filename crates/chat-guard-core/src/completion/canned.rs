/// One row of the fallback reply table: any keyword match selects `reply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CannedReply {
    pub keywords: &'static [&'static str],
    pub reply: &'static str,
}

impl CannedReply {
    /// `lowered` must already be lower-cased.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Evaluated top to bottom; the first matching row wins.
pub const CANNED_REPLIES: &[CannedReply] = &[
    CannedReply {
        keywords: &["email", "contact"],
        reply: "I'd be happy to help! Could you please provide your email address so I can assist you better?",
    },
    CannedReply {
        keywords: &["account"],
        reply: "I can help you with your account. What specific issue are you experiencing?",
    },
    CannedReply {
        keywords: &["payment", "card"],
        reply: "I can help you update your payment information. What would you like to change?",
    },
    CannedReply {
        keywords: &["appointment", "schedule"],
        reply: "I can help you schedule an appointment. What type of service do you need?",
    },
    CannedReply {
        keywords: &["help"],
        reply: "I'm here to help! What can I assist you with today?",
    },
];

/// Reply when no row matches.
pub const GENERIC_REPLY: &str = "Thank you for your message. How can I help you today?";

pub fn canned_reply(message: &str) -> &'static str {
    let lowered = message.to_lowercase();
    CANNED_REPLIES
        .iter()
        .find(|row| row.matches(&lowered))
        .map(|row| row.reply)
        .unwrap_or(GENERIC_REPLY)
}
