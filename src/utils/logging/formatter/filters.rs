//! Drops tool chatter that reaches the log through forwarded messages.

const NOISE_PATTERNS: &[&str] = &[
    "Invalid Block Addition value",
    "Could not find codec parameters for stream",
    "Consider increasing the value for the 'analyzeduration'",
    "x265 [info]: HEVC encoder version",
    "x265 [info]: build info",
    "x265 [info]: using cpu capabilities",
    "x265 [info]: Thread pool created",
    "x265 [info]: frame threads",
    "x265 [info]: Lookahead",
    "x265 [info]: tools:",
    "matroska,webm",
    "Last message repeated",
];

/// False for messages matching a known noise pattern.
pub fn should_show_message(message: &str) -> bool {
    !NOISE_PATTERNS.iter().any(|pattern| message.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_messages_pass() {
        assert!(should_show_message("Processing file: Movie.mkv"));
        assert!(should_show_message("x265 [warning]: VBV underflow"));
    }

    #[test]
    fn test_encoder_banner_is_dropped() {
        assert!(!should_show_message("  x265 [info]: HEVC encoder version 3.6"));
        assert!(!should_show_message("[matroska,webm @ 0x55d] Could not find codec parameters for stream 3"));
    }
}
