//! NMDC control-character escaping.
//!
//! Three bytes can never appear literally inside chat or description
//! text because they delimit the protocol itself: `$` (0x24), `|`
//! (0x7C), and the SOH-like control byte some clients also escape,
//! 0x05. Two on-wire spellings exist for the same escape and the
//! choice is call-site specific (see [`EscapeStyle`]) rather than a
//! single global flag — some clients only understand the numeric
//! entity form, others emit and expect the `/%DCNnnn%/` form.

/// Which textual form an escape is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStyle {
    /// `&#36;`, `&#124;`, `&#5;`
    Entity,
    /// `/%DCN036%/`, `/%DCN124%/`, `/%DCN005%/`
    WithDcn,
}

const ESCAPED_BYTES: [u8; 3] = [b'$', b'|', 0x05];
const ESCAPED_CHARS: [char; 3] = ['$', '|', '\u{5}'];

/// Escape `$`, `|`, and 0x05 in `s` using the given style. These three
/// code points are always single-byte ASCII in both CP1252 and UTF-8,
/// so per-`char` iteration is safe even though the wire encoding may
/// not be UTF-8.
pub fn escape(s: &str, style: EscapeStyle) -> String {
    if !s.contains(ESCAPED_CHARS.as_slice()) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        if ESCAPED_CHARS.contains(&c) {
            let b = c as u8;
            match style {
                EscapeStyle::Entity => out.push_str(&format!("&#{};", b)),
                EscapeStyle::WithDcn => out.push_str(&format!("/%DCN{:03}%/", b)),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape`], accepting either style (and a mix of both) in
/// the same string, since a relayed frame may carry fragments that
/// originated from peers using different styles.
pub fn unescape(s: &str) -> String {
    if !s.contains("&#") && !s.contains("/%DCN") {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        let rest = &s.as_bytes()[i..];
        if let Some((byte, consumed)) = try_parse_entity(rest) {
            out.push(byte as char);
            i += consumed;
        } else if let Some((byte, consumed)) = try_parse_dcn(rest) {
            out.push(byte as char);
            i += consumed;
        } else {
            // `i` is always on a char boundary: the escape prefixes we
            // probe for are pure ASCII and can't appear mid-sequence of
            // a multi-byte UTF-8 char, so failing both probes means the
            // char at `i` is unescaped and passes through whole.
            let c = s[i..].chars().next().expect("i < s.len()");
            out.push(c);
            i += c.len_utf8();
        }
    }
    out
}

fn try_parse_entity(rest: &[u8]) -> Option<(u8, usize)> {
    if !rest.starts_with(b"&#") {
        return None;
    }
    let after = &rest[2..];
    let digits_end = after.iter().position(|b| !b.is_ascii_digit())?;
    if digits_end == 0 || after.get(digits_end) != Some(&b';') {
        return None;
    }
    let num: u32 = std::str::from_utf8(&after[..digits_end]).ok()?.parse().ok()?;
    let byte = u8::try_from(num).ok()?;
    if !ESCAPED_BYTES.contains(&byte) {
        return None;
    }
    Some((byte, 2 + digits_end + 1))
}

fn try_parse_dcn(rest: &[u8]) -> Option<(u8, usize)> {
    const PREFIX: &[u8] = b"/%DCN";
    const SUFFIX: &[u8] = b"%/";
    if !rest.starts_with(PREFIX) {
        return None;
    }
    let after = &rest[PREFIX.len()..];
    if after.len() < 3 + SUFFIX.len() {
        return None;
    }
    let digits = &after[..3];
    if !digits.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if &after[3..3 + SUFFIX.len()] != SUFFIX {
        return None;
    }
    let num: u32 = std::str::from_utf8(digits).ok()?.parse().ok()?;
    let byte = u8::try_from(num).ok()?;
    if !ESCAPED_BYTES.contains(&byte) {
        return None;
    }
    Some((byte, PREFIX.len() + 3 + SUFFIX.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_entity_style() {
        let s = "price: $5|done";
        let escaped = escape(s, EscapeStyle::Entity);
        assert_eq!(escaped, "price: &#36;5&#124;done");
        assert_eq!(unescape(&escaped), s);
    }

    #[test]
    fn roundtrip_dcn_style() {
        let s = "a$b|c\x05d";
        let escaped = escape(s, EscapeStyle::WithDcn);
        assert_eq!(unescape(&escaped), s);
    }

    #[test]
    fn unescape_is_noop_on_plain_text() {
        assert_eq!(unescape("just plain text"), "just plain text");
    }

    #[test]
    fn unescape_handles_mixed_styles() {
        let mixed = "a&#36;b/%DCN124%/c";
        assert_eq!(unescape(mixed), "a$b|c");
    }
}
