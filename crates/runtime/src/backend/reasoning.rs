//! Removal of model "thinking" blocks from completions.

pub const REASONING_OPEN: &str = "<think>";
pub const REASONING_CLOSE: &str = "</think>";

/// Strip reasoning blocks and trim the result.
///
/// - `<think>…</think>` blocks are removed wherever they appear.
/// - An unterminated `<think>` drops everything after it.
/// - A `</think>` with no opener before it drops everything before it
///   (some servers swallow the opening tag).
pub fn strip_reasoning(text: &str) -> String {
    let mut rest = text;

    if let Some(close) = rest.find(REASONING_CLOSE) {
        let opened_before = rest.find(REASONING_OPEN).is_some_and(|open| open < close);
        if !opened_before {
            rest = &rest[close + REASONING_CLOSE.len()..];
        }
    }

    let mut out = String::with_capacity(rest.len());
    while let Some(start) = rest.find(REASONING_OPEN) {
        out.push_str(&rest[..start]);
        let inside = &rest[start + REASONING_OPEN.len()..];
        match inside.find(REASONING_CLOSE) {
            Some(end) => rest = &inside[end + REASONING_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_only_trimmed() {
        assert_eq!(strip_reasoning("  hi there \n"), "hi there");
    }

    #[test]
    fn leading_block_removed() {
        let raw = "<think>\nThe user greets me.\n</think>\n\nHello!";
        assert_eq!(strip_reasoning(raw), "Hello!");
    }

    #[test]
    fn multiple_blocks_removed() {
        let raw = "<think>a</think>One. <think>b</think>Two.";
        assert_eq!(strip_reasoning(raw), "One. Two.");
    }

    #[test]
    fn unterminated_block_drops_remainder() {
        assert_eq!(strip_reasoning("Answer first. <think>still going"), "Answer first.");
    }

    #[test]
    fn orphan_close_drops_prefix() {
        assert_eq!(strip_reasoning("pondering...</think> Done."), "Done.");
    }

    #[test]
    fn directive_survives() {
        let raw = "<think>need a tool</think>TOOLCALL: {\"name\":\"echo\",\"arguments\":{}}";
        assert_eq!(
            strip_reasoning(raw),
            "TOOLCALL: {\"name\":\"echo\",\"arguments\":{}}"
        );
    }
}
