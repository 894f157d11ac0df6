//! Filename derivation: `Content-Disposition` header or `cifra.<format>`.
//!
//! The service names its documents after the song (`Title_Artist.pdf`) and
//! sends that name as an attachment filename. Anything we cannot read from
//! the header falls back to `cifra.<format>`. Names coming off the wire are
//! sanitized before they touch the filesystem: a header saying
//! `filename="../../.bashrc"` must not escape the output directory.

use crate::config::OutputFormat;
use crate::output::FilenameSource;
use once_cell::sync::Lazy;
use regex::Regex;

/// Linux NAME_MAX.
pub(crate) const NAME_MAX: usize = 255;

/// Bytes left free for a ` (N)` suffix when the name is already taken.
const NUMBER_SUFFIX_ROOM: usize = 8;

/// Longest extension (dot included) kept whole when a name is shortened.
const MAX_EXT_LEN: usize = 16;

/// `filename*=charset'lang'value` (RFC 5987 extended parameter).
static RE_FILENAME_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(?:^|;)\s*filename\*\s*=\s*"?([^";]*)"?"#).unwrap());

/// `filename="quoted"` (unterminated quote tolerated) or `filename=token`.
static RE_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"((?:[^"\\]|\\.)*)"?|([^;]*))"#).unwrap()
});

/// The name used when the response does not suggest one.
pub fn fallback_filename(format: OutputFormat) -> String {
    format!("cifra.{}", format.as_str())
}

/// Pick the local filename for a downloaded document.
///
/// Prefers the header's filename when it survives sanitization, otherwise
/// returns the fallback for `format`.
pub fn derive_filename(
    content_disposition: Option<&str>,
    format: OutputFormat,
) -> (String, FilenameSource) {
    content_disposition
        .and_then(parse_content_disposition_filename)
        .map(|raw| sanitize_filename(&raw))
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .map(|name| (name, FilenameSource::Header))
        .unwrap_or_else(|| (fallback_filename(format), FilenameSource::Fallback))
}

/// Extract the filename from a raw `Content-Disposition` value.
///
/// Supports `filename="value"` (backslash escapes removed), `filename=value`
/// and `filename*=UTF-8''percent%20encoded`. When both forms are present
/// `filename*` wins. Parameter names are case-insensitive.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    if let Some(caps) = RE_FILENAME_EXT.captures(header_value) {
        if let Some(decoded) = decode_ext_value(caps[1].trim()) {
            if !decoded.is_empty() {
                return Some(decoded);
            }
        }
    }

    let caps = RE_FILENAME.captures(header_value)?;
    let value = match (caps.get(1), caps.get(2)) {
        (Some(quoted), _) => unescape_quoted(quoted.as_str()),
        (None, Some(token)) => token.as_str().trim().to_string(),
        (None, None) => return None,
    };
    (!value.is_empty()).then_some(value)
}

/// Make a header-supplied name safe to create inside the output directory.
///
/// - Path separators, NUL, control characters and `<>:"|?*` become `_`
/// - Leading/trailing whitespace and dots are trimmed
/// - Length is capped below 255 bytes by shortening the stem, so the
///   extension survives and ` (N)` still fits
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    fit_filename(trimmed, NAME_MAX - NUMBER_SUFFIX_ROOM)
}

/// Split `name` into stem and extension (dot included).
///
/// Dotfiles and overlong "extensions" count as all stem.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 && name.len() - i <= MAX_EXT_LEN => name.split_at(i),
        _ => (name, ""),
    }
}

/// Shorten `name` to at most `max` bytes, cutting the stem only.
pub(crate) fn fit_filename(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    let stem = truncate_at_char_boundary(stem, max.saturating_sub(ext.len()))
        .trim_end_matches(|c: char| c.is_whitespace() || c == '.');
    format!("{stem}{ext}")
}

pub(crate) fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}

fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode `charset'lang'value`. Only UTF-8 and ISO-8859-1 are understood.
fn decode_ext_value(raw: &str) -> Option<String> {
    let mut parts = raw.splitn(3, '\'');
    let charset = parts.next()?;
    let _lang = parts.next()?;
    let value = parts.next()?;
    let bytes = percent_decode(value);

    if charset.eq_ignore_ascii_case("utf-8") {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

/// Percent-decode; malformed escapes are kept verbatim.
fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted() {
        let r = parse_content_disposition_filename("attachment; filename=\"song.pdf\"");
        assert_eq!(r.as_deref(), Some("song.pdf"));
    }

    #[test]
    fn parse_token() {
        let r = parse_content_disposition_filename("attachment; filename=song.pdf");
        assert_eq!(r.as_deref(), Some("song.pdf"));
    }

    #[test]
    fn parse_token_stops_at_semicolon() {
        let r = parse_content_disposition_filename("attachment; filename=song.pdf; size=10");
        assert_eq!(r.as_deref(), Some("song.pdf"));
    }

    #[test]
    fn parse_quoted_with_escapes_and_spaces() {
        let r = parse_content_disposition_filename(
            r#"attachment; filename="Bondade de Deus \"ao vivo\".pdf""#,
        );
        assert_eq!(r.as_deref(), Some("Bondade de Deus \"ao vivo\".pdf"));
    }

    #[test]
    fn parse_case_insensitive_name() {
        let r = parse_content_disposition_filename("attachment; FileName=\"x.docx\"");
        assert_eq!(r.as_deref(), Some("x.docx"));
    }

    #[test]
    fn parse_filename_star_utf8() {
        let r = parse_content_disposition_filename(
            "attachment; filename*=UTF-8''Cora%C3%A7%C3%A3o_Valente.pdf",
        );
        assert_eq!(r.as_deref(), Some("Coração_Valente.pdf"));
    }

    #[test]
    fn parse_filename_star_precedence() {
        let r = parse_content_disposition_filename(
            "attachment; filename=\"fallback.pdf\"; filename*=UTF-8''real%20name.pdf",
        );
        assert_eq!(r.as_deref(), Some("real name.pdf"));
    }

    #[test]
    fn parse_filename_star_latin1() {
        let r = parse_content_disposition_filename("attachment; filename*=iso-8859-1'pt'can%E7%E3o.pdf");
        assert_eq!(r.as_deref(), Some("canção.pdf"));
    }

    #[test]
    fn unknown_charset_falls_back_to_plain_filename() {
        let r = parse_content_disposition_filename(
            "attachment; filename*=koi8-r''x.pdf; filename=plain.pdf",
        );
        assert_eq!(r.as_deref(), Some("plain.pdf"));
    }

    #[test]
    fn malformed_percent_escape_is_kept() {
        assert_eq!(percent_decode("100%"), b"100%".to_vec());
        assert_eq!(percent_decode("a%zzb"), b"a%zzb".to_vec());
        assert_eq!(percent_decode("%41"), b"A".to_vec());
    }

    #[test]
    fn missing_or_empty_filename() {
        assert_eq!(parse_content_disposition_filename("attachment"), None);
        assert_eq!(parse_content_disposition_filename("attachment; filename=\"\""), None);
        assert_eq!(parse_content_disposition_filename(""), None);
    }

    #[test]
    fn derive_prefers_header() {
        let (name, src) = derive_filename(
            Some("attachment; filename=\"Bondade_de_Deus_Isaias_Saad.pdf\""),
            OutputFormat::Pdf,
        );
        assert_eq!(name, "Bondade_de_Deus_Isaias_Saad.pdf");
        assert_eq!(src, FilenameSource::Header);
    }

    #[test]
    fn derive_falls_back_per_format() {
        assert_eq!(
            derive_filename(None, OutputFormat::Docx),
            ("cifra.docx".to_string(), FilenameSource::Fallback)
        );
        assert_eq!(
            derive_filename(Some("inline"), OutputFormat::Pdf),
            ("cifra.pdf".to_string(), FilenameSource::Fallback)
        );
    }

    #[test]
    fn derive_rejects_dot_names() {
        let (name, src) = derive_filename(Some("attachment; filename=\"..\""), OutputFormat::Pdf);
        assert_eq!(name, "cifra.pdf");
        assert_eq!(src, FilenameSource::Fallback);
    }

    #[test]
    fn sanitize_blocks_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("a\\b:c?.pdf"), "a_b_c_.pdf");
        assert_eq!(sanitize_filename("  .hidden.pdf. "), "hidden.pdf");
        assert_eq!(sanitize_filename("x\u{0}y.pdf"), "x_y.pdf");
    }

    #[test]
    fn sanitize_caps_length_on_char_boundary() {
        let long = "ç".repeat(200);
        let out = sanitize_filename(&long);
        assert!(out.len() <= NAME_MAX);
        assert!(out.chars().all(|c| c == 'ç'));
    }

    #[test]
    fn long_header_name_keeps_extension() {
        let header = format!("attachment; filename=\"{}.pdf\"", "a".repeat(300));
        let (name, src) = derive_filename(Some(&header), OutputFormat::Pdf);
        assert_eq!(src, FilenameSource::Header);
        assert!(name.ends_with(".pdf"));
        assert!(name.len() + NUMBER_SUFFIX_ROOM <= NAME_MAX);
    }

    #[test]
    fn split_extension_cases() {
        assert_eq!(split_extension("song.pdf"), ("song", ".pdf"));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
        assert_eq!(split_extension("README"), ("README", ""));
        let odd = format!("x.{}", "y".repeat(40));
        assert_eq!(split_extension(&odd), (odd.as_str(), ""));
    }
}
