use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Id lokal untuk entri antrian offline: `offline_<timestamp_ms>_<random>`.
pub fn generate_offline_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("offline_{}_{}", now.timestamp_millis(), suffix)
}

/// Token sesi siswa, 48 karakter hex.
pub fn generate_session_token() -> String {
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| format!("{:02x}", rng.gen_range(0..=255u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_offline_id() {
        let now = Utc::now();
        let id = generate_offline_id(now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "offline");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(generate_offline_id(now), id);
    }

    #[test]
    fn test_generate_session_token() {
        let token = generate_session_token();
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
