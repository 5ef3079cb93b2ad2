//! Resource operations. Every function here takes the request's transaction and the
//! acting [`Principal`](crate::auth::Principal); none of them open connections.

pub mod comments;
pub mod graph;
pub mod images;
pub mod invites;
pub mod likes;
pub mod posts;
pub mod reports;
pub mod users;

pub const USERNAME_MAX_LEN: usize = 20;
pub const DISPLAY_NAME_MAX_LEN: usize = 32;
pub const BIO_MAX_LEN: usize = 256;
pub const POST_MAX_LEN: usize = 512;
pub const COMMENT_MAX_LEN: usize = 256;
pub const TAG_MAX_LEN: usize = 256;
pub const REPORT_SUPPLEMENTARY_INFO_MAX_LEN: usize = 256;

/// Single-line form of user-submitted text: line breaks removed, outer whitespace trimmed.
pub fn normalize_text(text: &str) -> String {
    text.replace(['\n', '\r'], "").trim().to_string()
}

/// Length in characters, which is what every limit counts.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_removes_newlines_then_trims() {
        assert_eq!(normalize_text("  hello\nworld \n"), "helloworld");
        assert_eq!(normalize_text("\n\n   \r\n"), "");
        assert_eq!(normalize_text("a b"), "a b");
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(char_len("👋"), 1);
    }
}
