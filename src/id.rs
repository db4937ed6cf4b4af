//! Record identifiers: hex timestamp followed by 16 random hex digits.

use rand::Rng;

const RANDOM_DIGITS: usize = 16;

/// Returns `custom_id` verbatim when it is non-empty; otherwise generates a new id.
///
/// Generated ids are not cryptographically strong. Collisions are possible but
/// negligible at scaffold scale, and overwrite on insert.
pub fn create_id(custom_id: Option<&str>) -> String {
    match custom_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate(),
    }
}

fn generate() -> String {
    let secs = chrono::Utc::now().timestamp().max(0);
    let mut id = format!("{:x}", secs);
    let mut rng = rand::thread_rng();
    for _ in 0..RANDOM_DIGITS {
        let digit: u32 = rng.gen_range(0..16);
        // digit < 16 always has a hex char
        id.push(char::from_digit(digit, 16).unwrap_or('0'));
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn generated_ids_are_lower_hex() {
        let re = Regex::new(r"^[0-9a-f]{17,}$").unwrap();
        for _ in 0..100 {
            let id = create_id(None);
            assert!(re.is_match(&id), "bad id {}", id);
        }
    }

    #[test]
    fn generated_id_starts_with_timestamp() {
        let before = chrono::Utc::now().timestamp();
        let id = create_id(None);
        let prefix = &id[..id.len() - RANDOM_DIGITS];
        let ts = i64::from_str_radix(prefix, 16).unwrap();
        assert!(ts >= before && ts <= before + 2);
    }

    #[test]
    fn custom_id_passes_through() {
        assert_eq!(create_id(Some("beerme!")), "beerme!");
    }

    #[test]
    fn empty_custom_id_is_ignored() {
        assert_ne!(create_id(Some("")), "");
    }
}
