use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LumenError {
    /// Invalid caller input or malformed primitive value.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Parse failure on a textual primitive.
    #[error("parse error: {0}")]
    Parse(&'static str),
}

#[cfg(test)]
mod tests {
    use super::LumenError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            LumenError::InvalidInput("name too long").to_string(),
            "invalid input: name too long"
        );
        assert_eq!(
            LumenError::Parse("bad mac").to_string(),
            "parse error: bad mac"
        );
    }
}
