//! Shared wording for user-facing errors and warnings.

/// Prefix an error message so it reads the same wherever it is raised.
pub fn error_message(msg: impl AsRef<str>) -> String {
    format!("relgraph: {}", msg.as_ref())
}

/// Emit a non-fatal warning through the tracing subscriber.
pub fn warn(msg: impl AsRef<str>) {
    tracing::warn!(target: "relgraph", "{}", msg.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_message_is_prefixed() {
        assert_eq!(error_message("boom"), "relgraph: boom");
    }
}
