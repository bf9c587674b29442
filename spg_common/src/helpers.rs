/// Parses a non-negative whole number of seconds, e.g. `"900"`. Returns `None` for anything else.
pub fn parse_seconds(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
