use regex::Regex;
use std::sync::OnceLock;

/// Sanitization patterns for removing sensitive data from logs
///
/// User identifiers in this system are frequently email addresses, and
/// host applications routinely log directory errors verbatim, so log
/// lines are scrubbed before they leave the process.
pub struct SanitizationPatterns {
    email: Regex,
    api_key: Regex,
    bearer_token: Regex,
    password_field: Regex,
    ipv4_address: Regex,
}

static PATTERNS: OnceLock<SanitizationPatterns> = OnceLock::new();

fn get_patterns() -> &'static SanitizationPatterns {
    PATTERNS.get_or_init(|| SanitizationPatterns {
        // Email addresses - keep domain visible
        email: Regex::new(r"\b([a-zA-Z0-9._%+-]+)@([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})\b").unwrap(),

        // API keys - common prefixes
        api_key: Regex::new(r"\b(sk_|pk_|api_|key_)[a-zA-Z0-9_]{15,}\b").unwrap(),

        // Bearer tokens
        bearer_token: Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.]+").unwrap(),

        // Password fields in various formats
        password_field: Regex::new(r"(?i)(password|passwd|pwd)\s*[:=]\s*\S+").unwrap(),

        // IPv4 addresses - show subnet only
        ipv4_address: Regex::new(r"\b(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})\b").unwrap(),
    })
}

/// Sanitize a log message by redacting sensitive data
///
/// Applies, in order: email addresses (shows `***@domain`), API keys and
/// bearer tokens (`[REDACTED]`), password fields (`field=[REDACTED]`),
/// and IPv4 addresses (subnet only, like `192.168.x.x`).
pub fn sanitize_log_message(message: &str) -> String {
    let patterns = get_patterns();
    let mut result = message.to_string();

    result = patterns.email.replace_all(&result, "***@$2").to_string();
    result = patterns.api_key.replace_all(&result, "[REDACTED]").to_string();
    result = patterns
        .bearer_token
        .replace_all(&result, "Bearer [REDACTED]")
        .to_string();
    result = patterns
        .password_field
        .replace_all(&result, "$1=[REDACTED]")
        .to_string();
    result = patterns
        .ipv4_address
        .replace_all(&result, "$1.$2.x.x")
        .to_string();

    result
}
