/// Maximum number of characters of user input echoed in messages.
pub const DISPLAY_LIMIT: usize = 120;

const REDACTIONS: &[(&str, &str)] = &[
    (r"sk-[A-Za-z0-9_-]{10,}", "***API_KEY***"),
    (r"(?i)OPENAI_API_KEY[=\s:]+\S+", "OPENAI_API_KEY=***MASKED***"),
    (r"/Users/[^/\s]+", "/Users/***USER***"),
    (r"/home/[^/\s]+", "/home/***USER***"),
    (r"(?i)password[=\s:]+\S+", "password=***MASKED***"),
    (r"(?i)token[=\s:]+\S+", "token=***MASKED***"),
    (r"(?i)secret[=\s:]+\S+", "secret=***MASKED***"),
];

/// Render untrusted text for display: control characters escaped, length capped.
#[must_use]
pub fn display_safe(text: &str) -> String {
    let mut out = String::new();
    for (count, ch) in text.chars().enumerate() {
        if count >= DISPLAY_LIMIT {
            out.push_str("...");
            break;
        }
        if ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Mask credentials and user names in a message bound for users or logs.
#[must_use]
pub fn sanitize_message(message: &str) -> String {
    let mut sanitized = message.to_string();
    for (pattern, replacement) in REDACTIONS {
        if let Ok(re) = regex::Regex::new(pattern) {
            sanitized = re.replace_all(&sanitized, *replacement).into_owned();
        }
    }
    sanitized
}

/// Show only the first and last three characters of a secret.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return "***NO_KEY***".to_string();
    }
    if chars.len() <= 8 {
        return "***SHORT_KEY***".to_string();
    }
    let head: String = chars.iter().take(3).collect();
    let tail: String = chars.iter().skip(chars.len() - 3).collect();
    format!("{head}***{tail}")
}
