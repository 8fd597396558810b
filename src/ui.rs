use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a remedy hint to stderr
pub fn hint(msg: &str) {
    eprintln!("{} {}", "→".cyan(), msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Pad `text` to `width` columns; longer text is kept whole.
pub fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// Mask a secret for display
pub fn mask(secret: &str) -> &'static str {
    if secret.is_empty() { "(none)" } else { "********" }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(""), "(none)");
        assert_eq!(mask("hunter2"), "********");
    }
}
