use rand::{Rng, distr::Alphanumeric};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Byte sequence separating the JSON metadata header of a binary frame from
/// the raw audio bytes that follow it.
pub const DELIMITER: &[u8] = b"<delimiter>";

/// Inbound text payload. `type` picks the route; unknown types are ignored.
#[derive(Debug, Deserialize)]
pub struct TextFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub previous_message_id: Option<Uuid>,
}

/// Metadata header of a binary frame. Any `type` other than `"audio"` is
/// routed as an audio reply.
#[derive(Debug, Deserialize)]
pub struct AudioMeta {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub previous_message_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct AudioFrame<'a> {
    pub metadata: AudioMeta,
    pub bytes: &'a [u8],
}

/// Splits a binary frame at the first delimiter and parses the metadata
/// header. Returns `None` for frames without a delimiter or with an
/// unparsable header; callers drop those silently.
pub fn split_audio_frame(raw: &[u8]) -> Option<AudioFrame<'_>> {
    let at = raw.windows(DELIMITER.len()).position(|window| window == DELIMITER)?;
    let metadata = serde_json::from_slice(&raw[..at]).ok()?;
    Some(AudioFrame { metadata, bytes: &raw[at + DELIMITER.len()..] })
}

/// Collision-resistant name for an audio upload: millisecond timestamp plus
/// a random suffix.
pub fn upload_filename() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{millis}_{suffix}.mp3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_metadata_from_audio_bytes() {
        let raw = [br#"{"type":"audio"}"#.as_slice(), DELIMITER, b"\x00\x01\x02".as_slice()].concat();
        let frame = split_audio_frame(&raw).unwrap();
        assert_eq!(frame.metadata.kind, "audio");
        assert_eq!(frame.metadata.previous_message_id, None);
        assert_eq!(frame.bytes, b"\x00\x01\x02".as_slice());
    }

    #[test]
    fn splits_at_first_delimiter_only() {
        let raw = [
            br#"{"type":"audio"}"#.as_slice(),
            DELIMITER,
            b"abc".as_slice(),
            DELIMITER,
            b"def".as_slice(),
        ]
        .concat();
        let frame = split_audio_frame(&raw).unwrap();
        assert_eq!(frame.bytes, [b"abc".as_slice(), DELIMITER, b"def".as_slice()].concat());
    }

    #[test]
    fn reply_metadata_carries_target_id() {
        let id = Uuid::now_v7();
        let raw = [
            format!(r#"{{"type":"reply","previous_message_id":"{id}"}}"#).as_bytes(),
            DELIMITER,
            b"audio".as_slice(),
        ]
        .concat();
        let frame = split_audio_frame(&raw).unwrap();
        assert_eq!(frame.metadata.kind, "reply");
        assert_eq!(frame.metadata.previous_message_id, Some(id));
    }

    #[test]
    fn frame_without_delimiter_is_rejected() {
        assert!(split_audio_frame(br#"{"type":"audio"}"#).is_none());
        assert!(split_audio_frame(b"").is_none());
    }

    #[test]
    fn frame_with_bad_metadata_is_rejected() {
        let raw = [b"not json".as_slice(), DELIMITER, b"audio".as_slice()].concat();
        assert!(split_audio_frame(&raw).is_none());
    }

    #[test]
    fn upload_filenames_do_not_collide() {
        let a = upload_filename();
        let b = upload_filename();
        assert!(a.ends_with(".mp3"));
        assert!(a.contains('_'));
        assert_ne!(a, b);
    }

    #[test]
    fn text_frame_tolerates_missing_fields() {
        let frame: TextFrame = serde_json::from_str(r#"{"type":"typing"}"#).unwrap();
        assert_eq!(frame.kind, "typing");
        assert_eq!(frame.message, "");
        assert_eq!(frame.previous_message_id, None);
    }
}
