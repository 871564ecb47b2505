//! Signed capability links for recording downloads.
//!
//! A link authorizes exactly one (session, file, expiry) tuple via
//! HMAC-SHA256 over `"{session_id}|{file}|{expires}"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 signature for a download grant. `expires` is epoch millis.
pub fn sign_recording_grant(session_id: &str, file: &str, expires: i64, secret: &str) -> String {
    hex::encode(grant_mac(session_id, file, expires, secret).finalize().into_bytes())
}

/// Checks a download grant at time `now` (epoch millis).
///
/// Elapsed expiry and a bad signature yield the same `Forbidden` error.
pub fn verify_recording_grant(
    session_id: &str,
    file: &str,
    expires: i64,
    signature_hex: &str,
    secret: &str,
    now: i64,
) -> Result<(), AppError> {
    let denied = || AppError::Forbidden("Invalid or expired download link".to_string());

    if now > expires {
        return Err(denied());
    }

    let signature = hex::decode(signature_hex).map_err(|_| denied())?;
    grant_mac(session_id, file, expires, secret)
        .verify_slice(&signature)
        .map_err(|_| denied())
}

/// Builds the absolute download URL for a grant.
pub fn recording_download_url(
    base_url: &str,
    session_id: &str,
    file: &str,
    expires: i64,
    secret: &str,
) -> Result<String, AppError> {
    let sig = sign_recording_grant(session_id, file, expires, secret);

    let mut url = Url::parse(base_url)
        .map_err(|e| AppError::InternalServerError(format!("Invalid APP_URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::InternalServerError("APP_URL cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(["api", "interview", "recording", session_id]);
    url.query_pairs_mut()
        .append_pair("file", file)
        .append_pair("expires", &expires.to_string())
        .append_pair("sig", &sig);

    Ok(url.into())
}

fn grant_mac(session_id: &str, file: &str, expires: i64, secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length.
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(format!("{}|{}|{}", session_id, file, expires).as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "download-secret";
    const T: i64 = 1_700_000_000_000;

    #[test]
    fn valid_grant_before_expiry() {
        let sig = sign_recording_grant("S1", "r.webm", T, SECRET);
        assert!(verify_recording_grant("S1", "r.webm", T, &sig, SECRET, T - 1).is_ok());
        assert!(verify_recording_grant("S1", "r.webm", T, &sig, SECRET, T).is_ok());
    }

    #[test]
    fn grant_rejected_after_expiry() {
        let sig = sign_recording_grant("S1", "r.webm", T, SECRET);
        let err = verify_recording_grant("S1", "r.webm", T, &sig, SECRET, T + 1).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn grant_rejected_when_any_component_changes() {
        let sig = sign_recording_grant("S1", "r.webm", T, SECRET);
        let now = T - 1000;

        assert!(verify_recording_grant("S2", "r.webm", T, &sig, SECRET, now).is_err());
        assert!(verify_recording_grant("S1", "x.webm", T, &sig, SECRET, now).is_err());
        assert!(verify_recording_grant("S1", "r.webm", T + 1, &sig, SECRET, now).is_err());
        assert!(verify_recording_grant("S1", "r.webm", T, &sig, "other", now).is_err());
        assert!(verify_recording_grant("S1", "r.webm", T, "zz-not-hex", SECRET, now).is_err());
    }

    #[test]
    fn download_url_carries_the_grant() {
        let url =
            recording_download_url("https://hire.example.com/", "S 1", "r.webm", T, SECRET)
                .unwrap();
        let parsed = Url::parse(&url).unwrap();

        assert_eq!(parsed.path(), "/api/interview/recording/S%201");
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("file".to_string(), "r.webm".to_string()));
        assert_eq!(pairs[1], ("expires".to_string(), T.to_string()));
        assert_eq!(pairs[2].1, sign_recording_grant("S 1", "r.webm", T, SECRET));
    }
}
