use rand::Rng;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
pub fn snowflake_id() -> i64 {
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Length of a public appointment code
pub const APPOINTMENT_CODE_LEN: usize = 8;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a public appointment code (uppercase letters and digits).
///
/// Uniqueness is enforced by the database; callers retry on collision.
pub fn appointment_code() -> String {
    let mut rng = rand::thread_rng();
    (0..APPOINTMENT_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Normalize a user-supplied appointment code for lookup
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_ids_are_positive_and_distinct() {
        let a = snowflake_id();
        let b = snowflake_id();
        assert!(a > 0);
        assert!(b > 0);
        // 12 random bits: a collision inside the same millisecond is possible but rare
        let ids: std::collections::HashSet<i64> = (0..50).map(|_| snowflake_id()).collect();
        assert!(ids.len() > 40);
    }

    #[test]
    fn test_appointment_code_shape() {
        for _ in 0..100 {
            let code = appointment_code();
            assert_eq!(code.len(), APPOINTMENT_CODE_LEN);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" ab12cd34 "), "AB12CD34");
    }
}
