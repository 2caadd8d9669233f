//! Length limits for ledger columns.

/// Longest description stored in the ledger.
pub const MAX_DESCRIPTION_LENGTH: usize = 200;

/// Longest script name stored in the ledger.
pub const MAX_SCRIPT_LENGTH: usize = 1000;

const ELLIPSIS: &str = "...";

/// Cut descriptions over the limit, keeping the start and marking the cut.
pub fn abbreviate_description(description: &str) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_LENGTH {
        return description.to_string();
    }
    let keep = MAX_DESCRIPTION_LENGTH - ELLIPSIS.len();
    let mut out: String = description.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Cut scripts over the limit, keeping the end (the file name) and marking
/// the cut.
pub fn abbreviate_script(script: &str) -> String {
    let len = script.chars().count();
    if len <= MAX_SCRIPT_LENGTH {
        return script.to_string();
    }
    let keep = MAX_SCRIPT_LENGTH - ELLIPSIS.len();
    let mut out = String::from(ELLIPSIS);
    out.extend(script.chars().skip(len - keep));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_values_untouched() {
        assert_eq!(abbreviate_description("init"), "init");
        assert_eq!(abbreviate_script("V1__init.sql"), "V1__init.sql");
        let exact = "d".repeat(MAX_DESCRIPTION_LENGTH);
        assert_eq!(abbreviate_description(&exact), exact);
    }

    #[test]
    fn test_long_description_keeps_start() {
        let long = format!("start{}", "x".repeat(300));
        let short = abbreviate_description(&long);
        assert_eq!(short.chars().count(), MAX_DESCRIPTION_LENGTH);
        assert!(short.starts_with("start"));
        assert!(short.ends_with("..."));
    }

    #[test]
    fn test_long_script_keeps_end() {
        let long = format!("{}/V1__init.sql", "dir".repeat(400));
        let short = abbreviate_script(&long);
        assert_eq!(short.chars().count(), MAX_SCRIPT_LENGTH);
        assert!(short.starts_with("..."));
        assert!(short.ends_with("/V1__init.sql"));
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let long = "é".repeat(250);
        let short = abbreviate_description(&long);
        assert_eq!(short.chars().count(), MAX_DESCRIPTION_LENGTH);
    }
}
