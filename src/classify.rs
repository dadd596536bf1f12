//! Content classification for cell text.
//!
//! Every check works on the trimmed value and the first matching rule wins:
//! empty, email, LinkedIn profile, website, plain text. The website rule is
//! intentionally loose and will accept strings such as `1.2.3.com`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Anchored email pattern: local part, `@`, domain, alphabetic TLD.
#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Loose `[scheme][www.]host.tld[.tld][/path]` pattern.
#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static WEBSITE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?[a-zA-Z0-9-]+\.[a-zA-Z]{2,}(?:\.[a-zA-Z]{2,})?(?:/\S*)?$")
        .unwrap()
});

/// Domain suffixes that mark a value as a website anywhere in the text.
const COMMON_DOMAINS: &[&str] = &[
    ".com", ".org", ".net", ".edu", ".gov", ".io", ".co", ".info", ".in", ".us", ".uk", ".ca",
    ".au", ".de", ".fr", ".jp", ".cn", ".br", ".ru", ".mx", ".es", ".it", ".nl", ".se", ".no",
    ".dk", ".fi", ".pl", ".ch",
];

const LINKEDIN_HOST: &str = "linkedin.com";

/// Classification label for a cell's text value.
///
/// The declaration order doubles as the priority used to break ties when a
/// column sample has equal votes for several types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentType {
    /// Empty or whitespace-only value.
    Empty,
    /// Email address.
    Email,
    /// LinkedIn profile or company URL.
    LinkedIn,
    /// Any other website URL.
    Website,
    /// Plain text.
    Text,
}

impl ContentType {
    /// Returns true for the types that are turned into hyperlinks.
    pub fn is_linkable(self) -> bool {
        matches!(
            self,
            ContentType::Email | ContentType::LinkedIn | ContentType::Website
        )
    }

    /// Returns the lowercase label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Empty => "empty",
            ContentType::Email => "email",
            ContentType::LinkedIn => "linkedin",
            ContentType::Website => "website",
            ContentType::Text => "text",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks whether the text is an email address.
pub fn is_email(text: &str) -> bool {
    EMAIL_PATTERN.is_match(text.trim())
}

/// Checks whether the text mentions a LinkedIn URL.
pub fn is_linkedin(text: &str) -> bool {
    text.trim().to_lowercase().contains(LINKEDIN_HOST)
}

/// Checks whether the text looks like a website address.
pub fn is_website(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    if text.is_empty() || !text.contains('.') {
        return false;
    }

    WEBSITE_PATTERN.is_match(&text) || COMMON_DOMAINS.iter().any(|ext| text.contains(ext))
}

/// Classifies a cell value.
pub fn classify(text: &str) -> ContentType {
    let text = text.trim();

    if text.is_empty() {
        ContentType::Empty
    } else if is_email(text) {
        ContentType::Email
    } else if is_linkedin(text) {
        ContentType::LinkedIn
    } else if is_website(text) {
        ContentType::Website
    } else {
        ContentType::Text
    }
}

/// Prefixes `https://` unless the value already carries an http(s) scheme.
pub fn format_url(text: &str) -> String {
    let url = text.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Returns the hyperlink target for a classified value, if it gets one.
pub fn hyperlink_target(text: &str, content_type: ContentType) -> Option<String> {
    match content_type {
        ContentType::Email => Some(format!("mailto:{}", text.trim())),
        ContentType::LinkedIn | ContentType::Website => Some(format_url(text)),
        ContentType::Empty | ContentType::Text => None,
    }
}
