//! Entry text codec.
//!
//! Entry text is stored remotely in an opaque form. The coordinator applies a
//! [`TextCodec`] at the repository boundary: encode before every write, decode
//! after every read. Real deployments plug in on-device encryption; this
//! module ships a passthrough codec and a versioned base64 envelope.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::models::{Entry, RemoteEntry};

const ENVELOPE_PREFIX: &str = "dl1:";

/// Capability that turns plaintext into the stored form and back.
///
/// Implementations must satisfy `decrypt(encrypt(x)) == x` for every
/// non-empty `x`.
#[async_trait]
pub trait TextCodec: Send + Sync {
    async fn encrypt(&self, plaintext: &str) -> Result<String>;
    async fn decrypt(&self, stored: &str) -> Result<String>;
}

/// Stores text as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextCodec;

#[async_trait]
impl TextCodec for PlainTextCodec {
    async fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    async fn decrypt(&self, stored: &str) -> Result<String> {
        Ok(stored.to_string())
    }
}

/// Wraps text in a `dl1:` prefixed base64 envelope.
///
/// Decoding anything without the envelope fails, which is how rows written
/// before the codec was enabled show up.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

#[async_trait]
impl TextCodec for EnvelopeCodec {
    async fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(format!("{ENVELOPE_PREFIX}{}", STANDARD.encode(plaintext)))
    }

    async fn decrypt(&self, stored: &str) -> Result<String> {
        let payload = stored
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or_else(|| Error::Decode("missing envelope prefix".to_string()))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|error| Error::Decode(error.to_string()))?;
        String::from_utf8(bytes).map_err(|error| Error::Decode(error.to_string()))
    }
}

/// Decode a stored entry. A failure is isolated to this entry: it is returned
/// with its raw stored body instead of failing the surrounding page.
pub async fn open_entry(codec: &dyn TextCodec, remote: RemoteEntry) -> Entry {
    match codec.decrypt(&remote.body).await {
        Ok(text) => remote.with_text(text),
        Err(error) => {
            tracing::warn!("Failed to decode entry {}: {}", remote.id, error);
            let raw = remote.body.clone();
            remote.with_text(raw)
        }
    }
}

/// Decode a page of stored entries, preserving order.
pub async fn open_entries(codec: &dyn TextCodec, remote: Vec<RemoteEntry>) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(remote.len());
    for item in remote {
        entries.push(open_entry(codec, item).await);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryId, UserId};

    fn stored(body: &str) -> RemoteEntry {
        RemoteEntry {
            id: EntryId::new(),
            owner_id: UserId::new("user-1"),
            body: body.to_string(),
            is_favorite: false,
            created_at: 1_700_000_000_000,
            deleted_at: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_envelope_roundtrip_preserves_text() {
        let codec = EnvelopeCodec;
        for text in ["a", "Dear diary,\nToday was long.", "emoji \u{1f331} and accents é"] {
            let sealed = codec.encrypt(text).await.unwrap();
            assert_ne!(sealed, text);
            assert_eq!(codec.decrypt(&sealed).await.unwrap(), text);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_envelope_rejects_foreign_payloads() {
        let codec = EnvelopeCodec;
        assert!(matches!(
            codec.decrypt("plain text").await,
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            codec.decrypt("dl1:not base64!").await,
            Err(Error::Decode(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_undecodable_entry_falls_back_to_raw_body() {
        let sealed = EnvelopeCodec.encrypt("hello").await.unwrap();
        let entries = open_entries(&EnvelopeCodec, vec![stored(&sealed), stored("legacy row")]).await;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "hello");
        assert_eq!(entries[1].text, "legacy row");
    }
}
