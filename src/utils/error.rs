/// Collapse an error chain into one bounded log line. Response-body tails and
/// backtraces are elided so operator logs stay grep-able.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let mut raw = message.to_string();
    if let Some((prefix, _)) = raw.split_once(" body: ") {
        raw = format!("{prefix} body=<omitted>");
    }
    if let Some((prefix, _)) = raw.split_once("Stack backtrace:") {
        raw = prefix.to_string();
    }

    let mut compact = String::with_capacity(raw.len().min(max_len.saturating_add(16)));
    let mut prev_ws = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !prev_ws && !compact.is_empty() {
                compact.push(' ');
            }
            prev_ws = true;
            continue;
        }
        compact.push(ch);
        prev_ws = false;
        if compact.len() > max_len {
            break;
        }
    }
    if compact.len() <= max_len {
        compact
    } else {
        compact.truncate(max_len);
        compact.push_str("...(truncated)");
        compact
    }
}

#[cfg(test)]
mod tests {
    use super::compact_error_message;

    #[test]
    fn test_compact_error_message_elides_body_and_backtrace() {
        let raw = "claim failed: status 500 body: {\"huge\":\"payload\"}\nStack backtrace:\n 0: frame";
        let compact = compact_error_message(raw, 200);
        assert!(compact.contains("body=<omitted>"));
        assert!(!compact.contains("Stack backtrace"));
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_compact_error_message_truncates_long_lines() {
        let raw = "x".repeat(500);
        let compact = compact_error_message(&raw, 100);
        assert!(compact.ends_with("...(truncated)"));
        assert!(compact.len() <= 100 + "...(truncated)".len());
    }
}
