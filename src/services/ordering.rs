use std::cmp::Ordering;

use crate::models::Conversation;

/// Pinned conversations first, then most recently updated first.
pub fn compare(a: &Conversation, b: &Conversation) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}

/// Stable sort by [`compare`]; ties keep their incoming order.
pub fn sort_conversations(conversations: &mut [Conversation]) {
    conversations.sort_by(compare);
}

/// Where a conversation belongs without resorting: pinned ones go to the very top,
/// unpinned ones to the head of the unpinned group.
pub fn insertion_index(conversations: &[Conversation], pinned: bool) -> usize {
    if pinned {
        0
    } else {
        conversations
            .iter()
            .position(|c| !c.pinned)
            .unwrap_or(conversations.len())
    }
}

#[cfg(test)]
pub fn is_sorted(conversations: &[Conversation]) -> bool {
    conversations
        .windows(2)
        .all(|pair| compare(&pair[0], &pair[1]) != Ordering::Greater)
}
