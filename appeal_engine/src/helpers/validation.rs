use std::sync::OnceLock;

use regex::Regex;

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok()).as_ref()
}

/// A deliberately loose check: something, an `@`, a domain with at least one dot, and no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().map(|re| re.is_match(email.trim())).unwrap_or(false)
}

/// Rate limiting treats a missing, blank or `unknown` client address as "no address".
pub fn normalize_ip(ip: Option<&str>) -> Option<&str> {
    ip.map(str::trim).filter(|ip| !ip.is_empty() && !ip.eq_ignore_ascii_case("unknown"))
}
