//! The NMDC Lock/Key handshake transform.
//!
//! On accept the hub sends a `$Lock <lock> Pk=<name>|` challenge; the
//! client must answer with `$Key <key>|` where `key = Lock2Key(lock)`.
//! The transform is a fixed, deterministic byte permutation with no
//! secret material — its only purpose is to filter out clients too
//! simple to implement NMDC at all, not to authenticate anyone.
//!
//! Algorithm (per the public NMDC protocol definition): let `L` be the
//! lock's raw bytes.
//!
//! ```text
//! key[0]    = L[0] ^ L[n-1] ^ L[n-2] ^ 5
//! key[i]    = L[i] ^ L[i-1]            for i in 1..n
//! key[i]    = ((key[i] << 4) | (key[i] >> 4)) & 0xFF   (nibble swap)
//! ```
//!
//! Each resulting byte is then escaped if it equals one of the five
//! characters NMDC keys must never contain on the wire: 0, 5, 36
//! (`$`), 96, 124 (`|`), 126, each replaced by the literal text
//! `/%DCN<NNN>%/` where `<NNN>` is the zero-padded decimal byte value.

/// Bytes a key must never contain unescaped.
const FORBIDDEN: [u8; 5] = [0, 5, 36, 96, 124];

/// Compute the key a client must send in response to `lock`.
pub fn lock2key(lock: &[u8]) -> Vec<u8> {
    let n = lock.len();
    if n == 0 {
        return Vec::new();
    }
    let mut raw = vec![0u8; n];
    let last = lock[n - 1];
    let second_last = if n >= 2 { lock[n - 2] } else { lock[n - 1] };
    raw[0] = lock[0] ^ last ^ second_last ^ 5;
    for i in 1..n {
        raw[i] = lock[i] ^ lock[i - 1];
    }
    for b in raw.iter_mut() {
        *b = (*b << 4) | (*b >> 4);
    }

    let mut out = Vec::with_capacity(n);
    for b in raw {
        if FORBIDDEN.contains(&b) {
            out.extend_from_slice(format!("/%DCN{:03}%/", b).as_bytes());
        } else {
            out.push(b);
        }
    }
    out
}

/// Reverse transform used only by test harnesses to validate the
/// round-trip law: given the same lock and its derived key, recover a
/// sequence that `lock2key` would map back to `lock`. This is a
/// synthetic inverse for testing, not something any real NMDC client
/// computes (the handshake is one-directional in practice).
pub fn key2lock(lock: &[u8], key: &[u8]) -> Vec<u8> {
    // Since lock2key is a keyed permutation of `lock` itself (not of an
    // independent key space), the round-trip law in practice is:
    // lock2key(lock) == key. We expose key2lock as the function that,
    // given the lock and a not-yet-unescaped key, un-escapes and
    // un-swaps it back to the raw pre-escape byte sequence, which must
    // then equal what lock2key produced before escaping.
    let unescaped = unescape_dcn(key);
    let mut raw = unescaped;
    for b in raw.iter_mut() {
        *b = (*b << 4) | (*b >> 4);
    }
    let n = raw.len();
    if n == 0 {
        return Vec::new();
    }
    let mut out = vec![0u8; n];
    for i in (1..n).rev() {
        out[i] = raw[i] ^ lock.get(i - 1).copied().unwrap_or(0);
    }
    out[0] = lock.first().copied().unwrap_or(0);
    out
}

fn unescape_dcn(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"/%DCN") && bytes.len() - i >= 10 && bytes[i + 8..i + 10] == *b"%/" {
            if let Ok(s) = std::str::from_utf8(&bytes[i + 5..i + 8]) {
                if let Ok(v) = s.parse::<u8>() {
                    out.push(v);
                    i += 10;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock2key_is_deterministic() {
        let lock = b"EXTENDEDPROTOCOLABCABCABCABCABCABC";
        assert_eq!(lock2key(lock), lock2key(lock));
    }

    #[test]
    fn lock2key_escapes_forbidden_bytes() {
        // Construct a lock guaranteed to produce at least one forbidden
        // raw byte: an all-zero lock after XOR-chaining stays zero,
        // which is itself forbidden (0).
        let lock = vec![0u8; 10];
        let key = lock2key(&lock);
        assert!(key.windows(5).any(|w| w == b"/%DCN"));
    }

    #[test]
    fn empty_lock_yields_empty_key() {
        assert!(lock2key(&[]).is_empty());
    }
}
