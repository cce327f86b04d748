//! Media widgets: URL resolution and the Loading/Ready/Error load machine.

use std::time::Duration;

use url::Url;

use crate::error::MediaError;
use crate::navigator::Cursor;
use crate::traits::MediaLoader;

/// Query parameter appended on manual retry to bypass caches.
pub const RETRY_PARAM: &str = "retry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Pdf,
    Image,
}

/// What a successful probe learned about the resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// Playback length, when the loader can tell.
    pub duration: Option<Duration>,
    /// Page count, when the loader can tell.
    pub page_count: Option<usize>,
}

// ---------------------------------------------------------------------------
// URL resolution
// ---------------------------------------------------------------------------

/// Turns media references from test data into loadable URLs.
///
/// Absolute `http(s)` URLs are used as they are. Older test data also holds
/// Windows file paths and bare `uploads/` paths; those are rewritten against
/// the legacy media host when one is configured and rejected otherwise.
#[derive(Debug, Clone, Default)]
pub struct MediaResolver {
    legacy_host: Option<Url>,
}

impl MediaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_legacy_host(host: Url) -> Self {
        Self {
            legacy_host: Some(host),
        }
    }

    pub fn legacy_host(&self) -> Option<&Url> {
        self.legacy_host.as_ref()
    }

    pub fn resolve(&self, raw: &str) -> Result<Url, MediaError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MediaError::Empty);
        }

        // Checked before URL parsing: "F:\x.mp3" parses as scheme "f".
        if is_windows_path(raw) {
            return self.rewrite(raw, &["uploads", file_name(raw)]);
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            Ok(url) if url.scheme() == "file" => {
                let encoded = url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .unwrap_or_default();
                let name = urlencoding::decode(encoded)
                    .map_err(|e| MediaError::Invalid(format!("{raw}: {e}")))?;
                self.rewrite(raw, &["uploads", name.as_ref()])
            }
            Ok(url) => Err(MediaError::UnsupportedScheme(url.scheme().to_string())),
            Err(_) => {
                let path = raw.replace('\\', "/");
                let mut segments: Vec<&str> = path
                    .split('/')
                    .filter(|s| !s.is_empty() && *s != ".")
                    .collect();
                if segments.first() != Some(&"uploads") {
                    segments.insert(0, "uploads");
                }
                self.rewrite(raw, &segments)
            }
        }
    }

    /// Append `segments` to the legacy host's path. Each segment is
    /// percent-encoded, so `#` and `?` in file names stay in the path.
    fn rewrite(&self, raw: &str, segments: &[&str]) -> Result<Url, MediaError> {
        let mut resolved = self
            .legacy_host
            .clone()
            .ok_or_else(|| MediaError::Unresolvable(raw.to_string()))?;
        resolved.set_query(None);
        resolved.set_fragment(None);
        resolved
            .path_segments_mut()
            .map_err(|()| MediaError::Invalid(format!("{raw}: legacy host cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        tracing::debug!(%raw, %resolved, "rewrote legacy media reference");
        Ok(resolved)
    }
}

fn is_windows_path(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

fn file_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

// ---------------------------------------------------------------------------
// Load state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum MediaState {
    Loading { url: Url },
    Ready { url: Url, info: MediaInfo },
    Error { url: Url, message: String },
}

impl MediaState {
    pub fn url(&self) -> &Url {
        match self {
            MediaState::Loading { url }
            | MediaState::Ready { url, .. }
            | MediaState::Error { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Paused,
    Playing,
}

/// Transport controls of a loaded audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTransport {
    playback: Playback,
    position: Duration,
    duration: Option<Duration>,
}

impl AudioTransport {
    fn new(duration: Option<Duration>) -> Self {
        Self {
            playback: Playback::Paused,
            position: Duration::ZERO,
            duration,
        }
    }

    pub fn play(&mut self) {
        self.playback = Playback::Playing;
    }

    pub fn pause(&mut self) {
        self.playback = Playback::Paused;
    }

    /// Move the play head, clamped to the track length when known.
    pub fn seek(&mut self, to: Duration) {
        self.position = match self.duration {
            Some(len) => to.min(len),
            None => to,
        };
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

/// An audio player, PDF viewer or image for one section.
///
/// Loads happen one at a time (`load` takes `&mut self`); a failed load
/// stays failed until [`MediaWidget::retry`] is called.
#[derive(Debug, Clone)]
pub struct MediaWidget {
    kind: MediaKind,
    source: Url,
    retries: u32,
    state: MediaState,
    audio: Option<AudioTransport>,
    pages: Option<Cursor>,
}

impl MediaWidget {
    pub fn new(kind: MediaKind, source: Url) -> Self {
        Self {
            kind,
            state: MediaState::Loading {
                url: source.clone(),
            },
            source,
            retries: 0,
            audio: None,
            pages: None,
        }
    }

    /// Resolve a raw reference and build a widget for it.
    pub fn resolve(
        kind: MediaKind,
        raw: &str,
        resolver: &MediaResolver,
    ) -> Result<Self, MediaError> {
        Ok(Self::new(kind, resolver.resolve(raw)?))
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn state(&self) -> &MediaState {
        &self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, MediaState::Ready { .. })
    }

    /// Run the pending load. Does nothing unless the widget is loading.
    pub async fn load(&mut self, loader: &dyn MediaLoader) -> &MediaState {
        let url = match &self.state {
            MediaState::Loading { url } => url.clone(),
            _ => return &self.state,
        };

        self.state = match loader.probe(&url).await {
            Ok(info) => {
                tracing::debug!(%url, kind = ?self.kind, "media ready");
                match self.kind {
                    MediaKind::Audio => self.audio = Some(AudioTransport::new(info.duration)),
                    MediaKind::Pdf => self.pages = Some(Cursor::new(info.page_count.unwrap_or(1))),
                    MediaKind::Image => {}
                }
                MediaState::Ready { url, info }
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "media failed to load");
                MediaState::Error {
                    url,
                    message: e.to_string(),
                }
            }
        };
        &self.state
    }

    /// Go back to loading with a cache-busting URL. Only valid after a
    /// failed load.
    pub fn retry(&mut self) -> Result<&Url, MediaError> {
        if !matches!(self.state, MediaState::Error { .. }) {
            return Err(MediaError::NotFailed);
        }
        self.retries += 1;
        let mut url = self.source.clone();
        url.query_pairs_mut()
            .append_pair(RETRY_PARAM, &self.retries.to_string());
        self.audio = None;
        self.pages = None;
        self.state = MediaState::Loading { url };
        Ok(self.state.url())
    }

    /// Audio controls, available once an audio widget is ready.
    pub fn transport(&mut self) -> Option<&mut AudioTransport> {
        self.audio.as_mut()
    }

    /// Page navigation, available once a PDF widget is ready.
    pub fn pages(&mut self) -> Option<&mut Cursor> {
        self.pages.as_mut()
    }
}
