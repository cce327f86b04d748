//! Reads page counts and track lengths out of downloaded media.

use std::io::Cursor;
use std::time::Duration;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use url::Url;

/// Media whose body is worth downloading during a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyKind {
    Pdf,
    Audio,
}

/// Decide from the content type, falling back to the URL's extension for
/// servers that answer `application/octet-stream`.
pub(crate) fn body_kind(content_type: Option<&str>, url: &Url) -> Option<BodyKind> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("application/pdf") => return Some(BodyKind::Pdf),
        Some(m) if m.starts_with("audio/") => return Some(BodyKind::Audio),
        _ => {}
    }
    match extension(url).as_deref() {
        Some("pdf") => Some(BodyKind::Pdf),
        Some("mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac") => Some(BodyKind::Audio),
        _ => None,
    }
}

pub(crate) fn extension(url: &Url) -> Option<String> {
    let name = url.path_segments()?.next_back()?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

pub(crate) fn pdf_page_count(bytes: &[u8]) -> Option<usize> {
    match lopdf::Document::load_mem(bytes) {
        Ok(doc) => Some(doc.get_pages().len()),
        Err(e) => {
            tracing::warn!(error = %e, "could not read PDF page count");
            None
        }
    }
}

/// Track length from the container headers. `None` when the format does
/// not record a frame count (e.g. MP3 without a Xing header).
pub(crate) fn audio_duration(bytes: Vec<u8>, extension: Option<&str>) -> Option<Duration> {
    let source = MediaSourceStream::new(
        Box::new(Cursor::new(bytes)),
        MediaSourceStreamOptions::default(),
    );
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, source, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| tracing::warn!(error = %e, "could not read audio header"))
        .ok()?;
    let params = &probed.format.default_track()?.codec_params;
    let time = params.time_base?.calc_time(params.n_frames?);
    Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
}
