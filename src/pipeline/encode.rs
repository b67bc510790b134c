//! Media encoding: raw input bytes → base64 inline part.
//!
//! The generation service takes media inline in the JSON request body, so
//! every input is base64-encoded once here and carried as a [`MediaPart`].
//! Bytes are sent as they are; photos are not re-compressed or resized.

use crate::pipeline::input::ResolvedMedia;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One inline input part, ready for the request body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPart {
    /// Base64 (standard alphabet, padded) of the raw file.
    pub data: String,
    pub mime_type: String,
}

impl MediaPart {
    /// The part in the shape `edgequake-llm` attaches to a chat message.
    ///
    /// The provider forwards `mime_type` untouched, so audio parts travel
    /// through the same field as images.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.data.clone(), self.mime_type.clone())
    }
}

impl std::fmt::Debug for MediaPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPart")
            .field("data", &format_args!("<{} base64 chars>", self.data.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Encode a resolved input as an inline part.
pub fn encode_media(media: &ResolvedMedia) -> MediaPart {
    let data = STANDARD.encode(&media.bytes);
    debug!(
        "Encoded input #{} ({}) → {} bytes base64",
        media.index,
        media.mime_type,
        data.len()
    );
    MediaPart {
        data,
        mime_type: media.mime_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(bytes: &[u8], mime: &str) -> ResolvedMedia {
        ResolvedMedia {
            index: 0,
            source: "pizarra.png".into(),
            bytes: bytes.to_vec(),
            mime_type: mime.into(),
        }
    }

    #[test]
    fn encodes_bytes_as_standard_base64() {
        let part = encode_media(&media(b"hola", "image/png"));
        assert_eq!(part.data, "aG9sYQ==");
        assert_eq!(part.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&part.data).unwrap(), b"hola");
    }

    #[test]
    fn image_data_carries_mime_type() {
        let part = encode_media(&media(b"ID3", "audio/mpeg"));
        let data = part.to_image_data();
        assert_eq!(data.mime_type, "audio/mpeg");
        assert_eq!(data.data, part.data);
    }

    #[test]
    fn debug_does_not_dump_payload() {
        let part = encode_media(&media(&[7u8; 300], "image/webp"));
        let dbg = format!("{part:?}");
        assert!(dbg.contains("base64 chars"));
        assert!(!dbg.contains(&part.data));
    }
}
