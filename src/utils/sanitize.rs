use regex::Regex;
use std::sync::LazyLock;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SCRIPT_SCHEME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(javascript|vbscript|data)\s*:").unwrap());
static EVENT_HANDLER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon\w+\s*=").unwrap());
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Membersihkan teks bebas dari pengguna (nama, keterangan, dll).
pub fn sanitize_input(raw: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(raw, "");
    let without_schemes = SCRIPT_SCHEME_REGEX.replace_all(&without_tags, "");
    let without_handlers = EVENT_HANDLER_REGEX.replace_all(&without_schemes, "");
    let cleaned: String = without_handlers
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    WHITESPACE_REGEX.replace_all(cleaned.trim(), " ").into_owned()
}

pub fn sanitize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(sanitize_input).filter(|s| !s.is_empty())
}

/// NIS hanya angka; karakter lain dibuang.
pub fn sanitize_nis(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("  Setoran   <b>mingguan</b> "), "Setoran mingguan");
        assert_eq!(
            sanitize_input("<script>alert(1)</script>uang saku"),
            "alert(1)uang saku"
        );
        assert_eq!(sanitize_input("klik javascript:void(0)"), "klik void(0)");
        assert_eq!(sanitize_input("x onclick=run()"), "x run()");
    }

    #[test]
    fn test_sanitize_optional_and_nis() {
        assert_eq!(sanitize_optional(Some("   ")), None);
        assert_eq!(sanitize_optional(None), None);
        assert_eq!(sanitize_nis(" 12-34 5 "), "12345");
    }
}
