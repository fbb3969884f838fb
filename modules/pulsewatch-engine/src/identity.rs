//! Alert identity: short, stable, url-safe ids derived from scope and
//! signal rather than from randomness, so re-runs over the same feed
//! produce the same ids.

use chrono::{DateTime, Utc};

use pulsewatch_common::{Scope, SignalType};

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over the UTF-8 bytes of `input`.
pub(crate) fn fnv1a32(input: &str) -> u32 {
    let mut hash = FNV_OFFSET;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Lowercase base-36 rendering, no padding.
pub(crate) fn base36(mut value: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Identity that survives across evaluations of the same scope. Storage
/// keys persisted human state (ack, ownership) by this.
pub fn stable_id(scope: &Scope) -> String {
    format!("al_{}", base36(fnv1a32(&scope.identity_key())))
}

/// Identity of one alert episode: same scope, but rotates when the leading
/// signal changes or the conversation rolls into a new UTC day.
pub fn instance_id(scope: &Scope, primary: SignalType, latest: DateTime<Utc>) -> String {
    let day_key = latest.format("%Y-%m-%d");
    let key = format!("{}:{}:{}", scope.identity_key(), primary, day_key);
    format!("ai_{}", base36(fnv1a32(&key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    // --- hash primitive tests ---

    #[test]
    fn fnv1a32_matches_reference_vectors() {
        assert_eq!(fnv1a32(""), 0x811c_9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c_292c);
        assert_eq!(fnv1a32("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn base36_uses_lowercase_digits() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(u32::MAX), "1z141z3");
    }

    // --- id derivation tests ---

    #[test]
    fn stable_id_depends_only_on_scope() {
        let scope = Scope::Cluster("movilidad".to_string());
        assert_eq!(stable_id(&scope), stable_id(&scope));
        assert!(stable_id(&scope).starts_with("al_"));
        assert_ne!(
            stable_id(&scope),
            stable_id(&Scope::Cluster("seguridad".to_string()))
        );
        // Same identifier under a different scope type is a different alert.
        assert_ne!(
            stable_id(&scope),
            stable_id(&Scope::City("movilidad".to_string()))
        );
    }

    #[test]
    fn instance_id_rotates_with_signal_and_day() {
        let scope = Scope::Platform("twitter".to_string());
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();

        let base = instance_id(&scope, SignalType::Volume, ts);
        assert!(base.starts_with("ai_"));
        // Same day, same signal: identical.
        assert_eq!(base, instance_id(&scope, SignalType::Volume, ts + Duration::hours(2)));
        // Different leading signal: new instance.
        assert_ne!(base, instance_id(&scope, SignalType::Negativity, ts));
        // Next UTC day: new instance.
        assert_ne!(base, instance_id(&scope, SignalType::Volume, ts + Duration::days(1)));
    }
}
