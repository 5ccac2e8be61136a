use serenity::model::id::{ChannelId, UserId};
use unicode_segmentation::UnicodeSegmentation;

/// How much of a misplaced message is quoted back.
const PREVIEW_GRAPHEMES: usize = 150;
const ATTACHMENT_PLACEHOLDER: &str = "[attachment]";

/// Shortened copy of a message for quoting, cut on grapheme boundaries so
/// emoji and accents survive. Attachments are summarized as a placeholder.
pub fn preview(content: &str, attachment_count: usize) -> String {
    let content = content.trim();
    let mut text = if content.graphemes(true).count() > PREVIEW_GRAPHEMES {
        let cut: String = content.graphemes(true).take(PREVIEW_GRAPHEMES).collect();
        format!("{}...", cut.trim_end())
    } else {
        content.to_string()
    };

    if attachment_count > 0 {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(ATTACHMENT_PLACEHOLDER);
    }
    text
}

/// Notice posted where a member wrote outside their tier's thread.
pub fn correction_notice(
    author: UserId,
    thread: ChannelId,
    thread_name: &str,
    content: &str,
    attachment_count: usize,
) -> String {
    let quoted = preview(content, attachment_count)
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "<@{author}> your tier posts in <#{thread}> (**{thread_name}**), please repost there. Your message:\n{quoted}"
    )
}
