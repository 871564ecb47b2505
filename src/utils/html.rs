use ammonia;

/// Escapes user-supplied text for embedding in an HTML email body.
///
/// Candidate names, roles, answers and transcripts are plain text, so every
/// markup-significant character is entity-encoded instead of sanitized.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}
