use std::path::Path;

/// Name tag for an anonymous scope: a stable function of the unit's
/// canonical path and the scope's ordinal position in that unit, so
/// recompiling identical input reproduces the same names byte for byte.
pub(crate) fn scope_tag(path: &Path, ordinal: usize) -> String {
    let hash = fnv1a64(format!("{}:{ordinal}", path.display()).as_bytes());
    format!("VJPS{hash:016X}")
}

/// Name tag for a wrapped `init:` block, keyed by the enclosing scope name
/// and the block's ordinal inside it.
pub(crate) fn init_tag(scope_name: &str, ordinal: usize) -> String {
    let hash = fnv1a64(format!("{scope_name}:{ordinal}").as_bytes());
    format!("VJPI{hash:016X}")
}

// 64-bit FNV-1a. The std hashers are randomly seeded per process, which
// would break reproducible output.
fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b5);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn tags_are_deterministic() {
        let path = PathBuf::from("/work/map/main.jp");
        assert_eq!(scope_tag(&path, 0), scope_tag(&path, 0));
        assert_eq!(init_tag("Foo", 1), init_tag("Foo", 1));
    }

    #[test]
    fn tags_differ_by_ordinal_and_origin() {
        let path = PathBuf::from("/work/map/main.jp");
        let other = PathBuf::from("/work/map/other.jp");
        assert_ne!(scope_tag(&path, 0), scope_tag(&path, 1));
        assert_ne!(scope_tag(&path, 0), scope_tag(&other, 0));
        assert_ne!(init_tag("Foo", 0), init_tag("Bar", 0));
    }

    #[test]
    fn tags_are_sixteen_hex_digits() {
        let tag = scope_tag(&PathBuf::from("x.jp"), 3);
        assert_eq!(tag.len(), 4 + 16);
        assert!(tag.starts_with("VJPS"));
        assert!(tag[4..].chars().all(|c| c.is_ascii_hexdigit()));

        let tag = init_tag("VJPS0011223344556677", 0);
        assert!(tag.starts_with("VJPI"));
        assert_eq!(tag.len(), 4 + 16);
    }
}
