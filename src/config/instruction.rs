//! Built-in instruction text

/// Preamble that conditions the model on every outbound request
pub const DEFAULT: &str = "You are an AI chatbot assistant. Your job is to be helpful.";
