//! Parsing the `<tag>` suffix of a `$MyINFO` description.
//!
//! Example: `desc<++ V:0.785,M:A,H:5/2/1,S:4,L:256>` parses to client id
//! `"++"`, version `"0.785"`, mode active, hubs `(5, 2, 1)`, slots `4`,
//! limiter `256` kbps.

use regex::Regex;
use std::sync::OnceLock;

/// Client connectivity mode, the `M:` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Active,
    Passive,
    Socks,
}

/// The upload limiter field, one of three wire spellings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limiter {
    /// `L:<kbps>`
    Kbps(f64),
    /// `B:<kbps>`
    BytesKbps(f64),
    /// `F:<numerator>/<denominator>` — a fractional limiter some
    /// clients use to express a throttle relative to line speed.
    Fraction(f64, f64),
}

impl Limiter {
    /// Normalised kbps value used for `min_limit` comparisons.
    pub fn as_kbps(&self) -> f64 {
        match *self {
            Limiter::Kbps(v) | Limiter::BytesKbps(v) => v,
            Limiter::Fraction(num, den) if den != 0.0 => num / den,
            Limiter::Fraction(..) => 0.0,
        }
    }
}

/// A fully parsed MyINFO tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub client_id: String,
    pub version: String,
    pub mode: Mode,
    pub hubs_normal: u32,
    pub hubs_reg: u32,
    pub hubs_op: u32,
    pub slots: u32,
    pub limiter: Option<Limiter>,
}

impl Tag {
    /// Sum of the three hub counts, used against a configured maximum.
    pub fn hubs_total(&self) -> u32 {
        self.hubs_normal + self.hubs_reg + self.hubs_op
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("no <tag> found in description")]
    NoTag,
    #[error("tag contents did not match the expected grammar")]
    Malformed,
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<([^ >]+) V:([^,>]+),M:([AP5]),H:(\d+)/(\d+)/(\d+),S:(\d+)(?:,(L|B|F):([0-9./]+))?[^>]*>")
            .expect("static tag regex is valid")
    })
}

impl Tag {
    /// Extract and parse the first `<...>` tag in `description`.
    pub fn parse(description: &str) -> Result<Tag, TagError> {
        let caps = tag_regex().captures(description).ok_or(TagError::NoTag)?;
        let mode = match &caps[3] {
            "A" => Mode::Active,
            "P" => Mode::Passive,
            "5" => Mode::Socks,
            _ => return Err(TagError::Malformed),
        };
        let hubs_normal = caps[4].parse().map_err(|_| TagError::Malformed)?;
        let hubs_reg = caps[5].parse().map_err(|_| TagError::Malformed)?;
        let hubs_op = caps[6].parse().map_err(|_| TagError::Malformed)?;
        let slots = caps[7].parse().map_err(|_| TagError::Malformed)?;

        let limiter = match (caps.get(8), caps.get(9)) {
            (Some(kind), Some(val)) => Some(match kind.as_str() {
                "L" => Limiter::Kbps(val.as_str().parse().map_err(|_| TagError::Malformed)?),
                "B" => Limiter::BytesKbps(val.as_str().parse().map_err(|_| TagError::Malformed)?),
                "F" => {
                    let mut parts = val.as_str().splitn(2, '/');
                    let num: f64 = parts.next().unwrap_or("0").parse().map_err(|_| TagError::Malformed)?;
                    let den: f64 = parts.next().unwrap_or("1").parse().map_err(|_| TagError::Malformed)?;
                    Limiter::Fraction(num, den)
                }
                _ => return Err(TagError::Malformed),
            }),
            _ => None,
        };

        Ok(Tag {
            client_id: caps[1].to_string(),
            version: caps[2].to_string(),
            mode,
            hubs_normal,
            hubs_reg,
            hubs_op,
            slots,
            limiter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typical_tag() {
        let tag = Tag::parse("some desc<++ V:0.785,M:A,H:5/2/1,S:4,L:256>").unwrap();
        assert_eq!(tag.client_id, "++");
        assert_eq!(tag.version, "0.785");
        assert_eq!(tag.mode, Mode::Active);
        assert_eq!((tag.hubs_normal, tag.hubs_reg, tag.hubs_op), (5, 2, 1));
        assert_eq!(tag.slots, 4);
        assert_eq!(tag.limiter, Some(Limiter::Kbps(256.0)));
        assert_eq!(tag.hubs_total(), 8);
    }

    #[test]
    fn parses_passive_without_limiter() {
        let tag = Tag::parse("<ApexDC V:1.0,M:P,H:1/0/0,S:1>").unwrap();
        assert_eq!(tag.mode, Mode::Passive);
        assert!(tag.limiter.is_none());
    }

    #[test]
    fn missing_tag_errors() {
        assert_eq!(Tag::parse("no tag here"), Err(TagError::NoTag));
    }

    #[test]
    fn fraction_limiter_normalises() {
        let tag = Tag::parse("<X V:1,M:A,H:1/0/0,S:1,F:1/2>").unwrap();
        assert_eq!(tag.limiter.unwrap().as_kbps(), 0.5);
    }
}
