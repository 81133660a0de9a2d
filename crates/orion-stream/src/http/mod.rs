mod client;

pub use client::{parse_quota_limit, HttpChatTransport};
