use std::time::Duration;

// Parse an interval string like "90s", "10m", "1h", "2d" or bare seconds.
// Returns None for zero, negative or unparseable input.
pub fn parse_duration_str(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() { return None; }

    let (digits, unit_secs) = match s.char_indices().last() {
        Some((idx, 's')) => (&s[..idx], 1),
        Some((idx, 'm')) => (&s[..idx], 60),
        Some((idx, 'h')) => (&s[..idx], 60 * 60),
        Some((idx, 'd')) => (&s[..idx], 24 * 60 * 60),
        _ => (s, 1),
    };

    let n = digits.trim().parse::<u64>().ok()?;
    if n == 0 { return None; }
    n.checked_mul(unit_secs).map(Duration::from_secs)
}

// Convert a std duration into a chrono one for timestamp arithmetic.
pub fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}
