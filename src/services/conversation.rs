/// Characters of the first user message kept in a derived title.
pub const TITLE_CHARS: usize = 30;
pub const TITLE_ELLIPSIS: &str = "...";

/// Title for a conversation promoted from its first message: the first
/// `TITLE_CHARS` characters followed by an ellipsis.
pub fn derive_title(text: &str) -> String {
    let head: String = text.trim().chars().take(TITLE_CHARS).collect();
    format!("{}{}", head, TITLE_ELLIPSIS)
}
