use std::sync::OnceLock;

use regex::Regex;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email regex")
    })
}

/// Unique email addresses in `text`, in order of first appearance.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in email_pattern().find_iter(text) {
        let email = m.as_str().trim_end_matches('.');
        if !found.iter().any(|f| f.eq_ignore_ascii_case(email)) {
            found.push(email.to_string());
        }
    }
    found
}
