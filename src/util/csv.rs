// Split a comma separated list, trimming entries and dropping blanks.
pub fn parse_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_drops_blanks() {
        assert_eq!(parse_csv(" rust, ,go ,,"), vec!["rust".to_string(), "go".to_string()]);
        assert!(parse_csv("").is_empty());
    }
}
