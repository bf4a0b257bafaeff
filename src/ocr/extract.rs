use regex::Regex;
use std::sync::OnceLock;

/// Level caps at which weapons and characters ascend.
pub const ASCENSION_LEVELS: [u32; 7] = [20, 40, 50, 60, 70, 80, 90];

/// Pattern for `"current/max"` pairs such as grid counters and level labels.
const PAIR_PATTERN: &str = r"(\d+)\s*/\s*(\d+)";

fn pair_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PAIR_PATTERN).ok()).as_ref()
}

fn digits_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()
}

/// Parses `"N/M"` into `(N, M)`.
pub fn parse_pair(text: &str) -> Option<(u32, u32)> {
    let caps = pair_regex()?.captures(text)?;
    let first = caps.get(1)?.as_str().parse().ok()?;
    let second = caps.get(2)?.as_str().parse().ok()?;
    Some((first, second))
}

/// Item count from a grid counter `"N/M"`. A bare number is accepted too.
pub fn parse_counter(text: &str) -> Option<u32> {
    if let Some((count, _)) = parse_pair(text) {
        return Some(count);
    }
    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse().ok();
    }
    None
}

/// Parses a string of digits, ignoring surrounding whitespace.
pub fn parse_int(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Owned quantity from an `"Owned 123"` label: the text after the first
/// space, defaulting to 1 when missing or unparsable.
pub fn parse_owned(text: &str) -> u32 {
    text.trim()
        .split_once(' ')
        .and_then(|(_, rest)| rest.trim().replace(',', "").parse().ok())
        .unwrap_or(1)
}

/// Index of `max_level` in [`ASCENSION_LEVELS`].
pub fn ascension_index(max_level: u32) -> Option<u32> {
    ASCENSION_LEVELS
        .iter()
        .position(|&cap| cap == max_level)
        .map(|i| i as u32)
}

/// Parses a `"level/max"` label into `(level, ascension)`.
pub fn parse_level(text: &str) -> Option<(u32, u32)> {
    let (level, max) = parse_pair(text)?;
    Some((level, ascension_index(max)?))
}

/// All digit runs in `text`, in order.
pub fn numbers(text: &str) -> Vec<u32> {
    let Some(re) = digits_regex() else {
        return Vec::new();
    };
    re.find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("47/2000"), Some(47));
        assert_eq!(parse_counter(" 12 / 3000 "), Some(12));
        assert_eq!(parse_counter("47"), Some(47));
        assert_eq!(parse_counter("abc"), None);
        assert_eq!(parse_counter(""), None);
    }

    #[test]
    fn test_parse_owned() {
        assert_eq!(parse_owned("Owned 123"), 123);
        assert_eq!(parse_owned("Owned 1,500"), 1500);
        assert_eq!(parse_owned("Owned"), 1);
        assert_eq!(parse_owned("Owned lots"), 1);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("80/90"), Some((80, 6)));
        assert_eq!(parse_level("1/20"), Some((1, 0)));
        assert_eq!(parse_level("55/65"), None);
        assert_eq!(parse_level("Lv."), None);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(numbers("Lv. 25 +3"), vec![25, 3]);
        assert!(numbers("none").is_empty());
    }
}
