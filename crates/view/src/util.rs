/// Truncates `text` to at most `max_chars` characters, replacing the tail
/// with a single ellipsis when anything was cut.
pub(crate) fn ellipsize(text: &str, max_chars: usize) -> String {
    debug_assert!(max_chars >= 1);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::ellipsize;
    use rstest::rstest;

    #[rstest]
    #[case("short", 10, "short")]
    #[case("exactly-ten", 11, "exactly-ten")]
    #[case("a much longer description", 10, "a much lo…")]
    #[case("ääääää", 4, "äää…")]
    fn test_ellipsize(#[case] input: &str, #[case] max: usize, #[case] expected: &str) {
        assert_eq!(ellipsize(input, max), expected);
    }
}
