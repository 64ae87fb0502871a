//! TOTP (RFC 6238) enrolment and verification.

use std::io::Cursor;

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use rand::{rngs::OsRng, RngCore};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

use service_core::error::{AppError, UNAUTHORIZED_MESSAGE};

pub const SECRET_BYTES: usize = 32;
pub const DIGITS: usize = 6;
pub const PERIOD_SECONDS: i64 = 30;
/// Steps of clock drift accepted either side of the current one.
const SKEW_STEPS: i64 = 1;

#[derive(Debug, Error)]
pub enum MfaError {
    #[error("code must be exactly 6 digits")]
    MalformedCode,

    #[error("invalid code")]
    InvalidCode,

    #[error("MFA enrolment has not been started")]
    NoSecret,

    #[error("stored MFA secret is not valid base32")]
    CorruptSecret,

    #[error("QR rendering failed: {0}")]
    Render(#[source] anyhow::Error),
}

impl From<MfaError> for AppError {
    fn from(err: MfaError) -> Self {
        match err {
            MfaError::MalformedCode | MfaError::NoSecret => AppError::bad_request(err.to_string()),
            MfaError::InvalidCode => {
                tracing::debug!(error = %err, "MFA verification failed");
                AppError::unauthorized(UNAUTHORIZED_MESSAGE)
            }
            MfaError::CorruptSecret | MfaError::Render(_) => {
                AppError::InternalError(anyhow::anyhow!(err))
            }
        }
    }
}

/// Fresh 32-byte secret, base32 encoded without padding.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    BASE32_NOPAD.encode(&bytes)
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, MfaError> {
    BASE32_NOPAD
        .decode(secret.trim_end_matches('=').as_bytes())
        .map_err(|_| MfaError::CorruptSecret)
}

fn hotp(key: &[u8], counter: u64) -> Result<String, MfaError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| MfaError::CorruptSecret)?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(hash[offset] & 0x7f) << 24)
        | (u32::from(hash[offset + 1]) << 16)
        | (u32::from(hash[offset + 2]) << 8)
        | u32::from(hash[offset + 3]);

    Ok(format!("{:06}", binary % 1_000_000))
}

/// Code for the step containing `unix_seconds`.
pub fn totp_code(secret: &str, unix_seconds: i64) -> Result<String, MfaError> {
    let key = decode_secret(secret)?;
    hotp(&key, (unix_seconds.max(0) / PERIOD_SECONDS) as u64)
}

/// Checks `code` against the current step and its neighbours.
pub fn verify_code(secret: &str, code: &str, unix_seconds: i64) -> Result<(), MfaError> {
    if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MfaError::MalformedCode);
    }

    let key = decode_secret(secret)?;
    let step = unix_seconds.max(0) / PERIOD_SECONDS;

    let mut matched = subtle::Choice::from(0u8);
    for offset in -SKEW_STEPS..=SKEW_STEPS {
        let counter = step + offset;
        if counter < 0 {
            continue;
        }
        let candidate = hotp(&key, counter as u64)?;
        matched |= candidate.as_bytes().ct_eq(code.as_bytes());
    }

    if bool::from(matched) {
        Ok(())
    } else {
        Err(MfaError::InvalidCode)
    }
}

/// `otpauth://` URI understood by authenticator apps.
pub fn provisioning_uri(issuer: &str, account: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account),
        secret,
        urlencoding::encode(issuer),
        DIGITS,
        PERIOD_SECONDS,
    )
}

/// Renders `data` as a PNG QR code.
pub fn qr_png(data: &str) -> Result<Vec<u8>, MfaError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| MfaError::Render(anyhow::anyhow!(e)))?;
    let image = code.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut buffer, image::ImageOutputFormat::Png)
        .map_err(|e| MfaError::Render(anyhow::anyhow!(e)))?;

    Ok(buffer.into_inner())
}
