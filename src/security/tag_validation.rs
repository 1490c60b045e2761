//! Cross-checking a parsed `MyINFO` tag against `client_list`/`conn_types`
//! and the configured bounds (spec §4.7).

use crate::config::TagValidationConfig;
use crate::db::models::{ClientRow, ConnTypeRow};
use thiserror::Error;
use verlihub_proto::Tag;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TagValidationError {
    #[error("client '{0}' is banned from this hub")]
    ClientBanned(String),
    #[error("client '{0}' is not enabled on this hub")]
    ClientDisabled(String),
    #[error("client version {version} outside allowed range [{min}, {max}]")]
    VersionOutOfRange { version: f64, min: f64, max: f64 },
    #[error("slot count {slots} outside allowed range [{min}, {max}]")]
    SlotsOutOfRange { slots: u32, min: u32, max: u32 },
    #[error("upload limiter {kbps} kbps below minimum {min}")]
    LimiterTooLow { kbps: f64, min: f64 },
    #[error("upload-per-slot ratio {ratio} below minimum {min}")]
    LsRatioTooLow { ratio: f64, min: f64 },
    #[error("hub count {total} exceeds configured maximum {max}")]
    TooManyHubs { total: u32, max: u32 },
}

/// Validate `tag` against the client's registered bounds (if the client
/// id is known) and the connection-type bounds (if a matching
/// `conn_types` row was supplied), plus hub-wide caps from config.
pub fn validate_tag(
    tag: &Tag,
    client: Option<&ClientRow>,
    conn_type: Option<&ConnTypeRow>,
    config: &TagValidationConfig,
) -> Result<(), TagValidationError> {
    if let Some(client) = client {
        if client.ban != 0 {
            return Err(TagValidationError::ClientBanned(client.name.clone()));
        }
        if client.enable == 0 {
            return Err(TagValidationError::ClientDisabled(client.name.clone()));
        }
        let version: f64 = tag.version.parse().unwrap_or(0.0);
        if version < client.min_version || version > client.max_version {
            return Err(TagValidationError::VersionOutOfRange {
                version,
                min: client.min_version,
                max: client.max_version,
            });
        }
    }

    if let Some(ct) = conn_type {
        let min_slots = ct.tag_min_slots.max(0) as u32;
        let max_slots = ct.tag_max_slots.max(0) as u32;
        if tag.slots < min_slots || (max_slots > 0 && tag.slots > max_slots) {
            return Err(TagValidationError::SlotsOutOfRange { slots: tag.slots, min: min_slots, max: max_slots });
        }

        let kbps = tag.limiter.as_ref().map(|l| l.as_kbps()).unwrap_or(0.0);
        if kbps < ct.tag_min_limit {
            return Err(TagValidationError::LimiterTooLow { kbps, min: ct.tag_min_limit });
        }

        if ct.tag_min_ls_ratio > 0.0 && tag.slots > 0 {
            let ratio = kbps / tag.slots as f64;
            if ratio < ct.tag_min_ls_ratio {
                return Err(TagValidationError::LsRatioTooLow { ratio, min: ct.tag_min_ls_ratio });
            }
        }
    }

    let total = tag.hubs_total();
    if total > config.max_hubs {
        return Err(TagValidationError::TooManyHubs { total, max: config.max_hubs });
    }

    let kbps = tag.limiter.as_ref().map(|l| l.as_kbps()).unwrap_or(0.0);
    if kbps < config.min_limit_kbps {
        return Err(TagValidationError::LimiterTooLow { kbps, min: config.min_limit_kbps });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use verlihub_proto::Tag;

    fn parse(desc: &str) -> Tag {
        Tag::parse(desc).unwrap()
    }

    #[test]
    fn banned_client_is_rejected() {
        let tag = parse("<++ V:1.0,M:A,H:1/0/0,S:1,L:100>");
        let client = ClientRow {
            name: "DC++".into(),
            tag_id: "++".into(),
            min_version: 0.0,
            max_version: 9.0,
            min_ver_use: 0.0,
            ban: 1,
            enable: 1,
        };
        let config = TagValidationConfig { max_hubs: 3, min_limit_kbps: 0.0, min_ls_ratio: 0.0 };
        assert!(matches!(validate_tag(&tag, Some(&client), None, &config), Err(TagValidationError::ClientBanned(_))));
    }

    #[test]
    fn excess_hub_count_is_rejected() {
        let tag = parse("<++ V:1.0,M:A,H:5/5/5,S:1,L:100>");
        let config = TagValidationConfig { max_hubs: 3, min_limit_kbps: 0.0, min_ls_ratio: 0.0 };
        assert!(matches!(validate_tag(&tag, None, None, &config), Err(TagValidationError::TooManyHubs { .. })));
    }

    #[test]
    fn within_bounds_tag_is_accepted() {
        let tag = parse("<++ V:1.0,M:A,H:1/0/0,S:4,L:256>");
        let conn_type = ConnTypeRow {
            identifier: "dsl".into(),
            description: "DSL".into(),
            tag_min_slots: 1,
            tag_max_slots: 10,
            tag_min_limit: 10.0,
            tag_min_ls_ratio: 0.0,
        };
        let config = TagValidationConfig { max_hubs: 3, min_limit_kbps: 0.0, min_ls_ratio: 0.0 };
        assert!(validate_tag(&tag, None, Some(&conn_type), &config).is_ok());
    }
}
