//! Client-side playback controller, modeled server-side so the lesson
//! lifecycle (media resolution, completion reporting, playlist advance) has
//! one tested definition. Pure state machine: no I/O happens here, the
//! embedding surface drives it with events.

/// Lifecycle of the active lesson's media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No lesson selected.
    Idle,
    /// A lesson is selected, media not yet playable.
    Loading,
    /// Enough data to start.
    Ready,
    Playing,
    Paused,
    /// Playback ran off the end. Distinct from `Paused`: seeking out of
    /// `Ended` goes back through `Ready`.
    Ended,
}

/// Where completion reports go. The HTTP client posting to the progress
/// endpoint implements this; tests observe it directly.
pub trait CompletionSink {
    fn lesson_completed(&mut self, course_id: &str, video_id: &str);
}

/// The media source the player should hand to the video element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// An already-public URL, used as-is.
    External(String),
    /// A proxy URL for a private key. Every range request re-presents the
    /// session token.
    Proxied(String),
}

impl MediaSource {
    pub fn url(&self) -> &str {
        match self {
            MediaSource::External(url) | MediaSource::Proxied(url) => url,
        }
    }
}

/// Maps a lesson's stored video reference to a playable source. External
/// URLs pass through untouched; private keys route through the streaming
/// proxy with the session token in the query string.
pub fn resolve_media(reference: &str, token: &str) -> MediaSource {
    if crate::services::signer::is_url(reference) {
        return MediaSource::External(reference.to_string());
    }

    MediaSource::Proxied(format!(
        "/api/stream?key={}&token={}",
        urlencode(reference),
        urlencode(token)
    ))
}

/// Minimal query-string escaping for keys and tokens. Both are generated
/// server-side from a narrow alphabet; only the separators need care.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("%26"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            '+' => out.push_str("%2B"),
            '=' => out.push_str("%3D"),
            ' ' => out.push_str("%20"),
            _ => out.push(c),
        }
    }
    out
}

/// One entry in the active course's flattened playlist.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub course_id: String,
    pub video_id: String,
    /// Storage key or external URL.
    pub video_ref: String,
}

/// Playback controller for one sitting.
///
/// Two preferences outlive lesson switches: volume and the preferred
/// playback rate. Everything else (position, buffering, the applied rate)
/// is per-lesson transient state and resets on switch.
pub struct Player<S: CompletionSink> {
    playlist: Vec<PlaylistEntry>,
    index: Option<usize>,
    state: PlaybackState,
    buffering: bool,
    position_secs: f64,
    volume: f64,
    rate: f64,
    preferred_rate: f64,
    completed: Vec<String>,
    sink: S,
}

impl<S: CompletionSink> Player<S> {
    pub fn new(playlist: Vec<PlaylistEntry>, sink: S) -> Self {
        Self {
            playlist,
            index: None,
            state: PlaybackState::Idle,
            buffering: false,
            position_secs: 0.0,
            volume: 1.0,
            rate: 1.0,
            preferred_rate: 1.0,
            completed: Vec::new(),
            sink,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn current(&self) -> Option<&PlaylistEntry> {
        self.index.and_then(|i| self.playlist.get(i))
    }

    /// Selects a lesson by playlist index and enters `Loading`.
    ///
    /// Per-lesson transients reset; the applied rate snaps back to the
    /// sitting's preferred rate. Volume is untouched.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.playlist.len() {
            return false;
        }

        self.index = Some(index);
        self.state = PlaybackState::Loading;
        self.buffering = false;
        self.position_secs = 0.0;
        self.rate = self.preferred_rate;
        true
    }

    /// Advances to the next lesson. The index only ever moves forward;
    /// going back is an explicit `select`.
    pub fn next(&mut self) -> bool {
        match self.index {
            Some(i) if i + 1 < self.playlist.len() => self.select(i + 1),
            _ => false,
        }
    }

    /// Media element reports enough data to start.
    pub fn on_can_play(&mut self) {
        if self.state == PlaybackState::Loading || self.state == PlaybackState::Ended {
            self.state = PlaybackState::Ready;
        }
    }

    pub fn play(&mut self) {
        if matches!(self.state, PlaybackState::Ready | PlaybackState::Paused) {
            self.state = PlaybackState::Playing;
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Network stall. Orthogonal to the play state: a stalled player is
    /// still `Playing`, it just shows a spinner.
    pub fn on_stall(&mut self) {
        self.buffering = true;
    }

    pub fn on_buffered(&mut self) {
        self.buffering = false;
    }

    pub fn on_time_update(&mut self, position_secs: f64) {
        self.position_secs = position_secs.max(0.0);
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Sets the playback rate and remembers it as the sitting's preference.
    pub fn set_rate(&mut self, rate: f64) {
        let rate = rate.clamp(0.25, 4.0);
        self.rate = rate;
        self.preferred_rate = rate;
    }

    /// Playback ran off the end. Completion is reported once per lesson no
    /// matter how many ended events the media element fires (replays,
    /// seeks to the end).
    pub fn on_ended(&mut self) {
        self.state = PlaybackState::Ended;
        self.buffering = false;

        let Some(entry) = self.current().cloned() else {
            return;
        };

        if self.completed.iter().any(|id| *id == entry.video_id) {
            return;
        }

        self.completed.push(entry.video_id.clone());
        self.sink.lesson_completed(&entry.course_id, &entry.video_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        reports: Vec<(String, String)>,
    }

    impl CompletionSink for RecordingSink {
        fn lesson_completed(&mut self, course_id: &str, video_id: &str) {
            self.reports.push((course_id.to_string(), video_id.to_string()));
        }
    }

    fn playlist() -> Vec<PlaylistEntry> {
        (1..=3)
            .map(|n| PlaylistEntry {
                course_id: "c1".to_string(),
                video_id: format!("v{}", n),
                video_ref: format!("videos/c1/v{}.mp4", n),
            })
            .collect()
    }

    fn player() -> Player<RecordingSink> {
        Player::new(playlist(), RecordingSink::default())
    }

    #[test]
    fn lifecycle_reaches_playing_through_loading_and_ready() {
        let mut p = player();
        assert_eq!(p.state(), PlaybackState::Idle);

        p.select(0);
        assert_eq!(p.state(), PlaybackState::Loading);

        p.on_can_play();
        assert_eq!(p.state(), PlaybackState::Ready);

        p.play();
        assert_eq!(p.state(), PlaybackState::Playing);

        p.pause();
        assert_eq!(p.state(), PlaybackState::Paused);

        p.play();
        assert_eq!(p.state(), PlaybackState::Playing);
    }

    #[test]
    fn buffering_is_orthogonal_to_play_state() {
        let mut p = player();
        p.select(0);
        p.on_can_play();
        p.play();

        p.on_stall();
        assert!(p.is_buffering());
        assert_eq!(p.state(), PlaybackState::Playing);

        p.on_buffered();
        assert!(!p.is_buffering());
    }

    #[test]
    fn completion_reports_exactly_once_per_lesson() {
        let mut p = player();
        p.select(0);
        p.on_can_play();
        p.play();

        p.on_ended();
        p.on_ended();
        p.on_can_play();
        p.play();
        p.on_ended();

        assert_eq!(p.sink.reports.len(), 1);
        assert_eq!(p.sink.reports[0], ("c1".to_string(), "v1".to_string()));

        // A different lesson reports separately.
        p.next();
        p.on_can_play();
        p.play();
        p.on_ended();
        assert_eq!(p.sink.reports.len(), 2);
    }

    #[test]
    fn switching_lessons_resets_transients_and_keeps_preferences() {
        let mut p = player();
        p.select(0);
        p.on_can_play();
        p.play();
        p.set_volume(0.4);
        p.set_rate(1.5);
        p.on_time_update(93.0);
        p.on_stall();

        p.next();

        assert_eq!(p.state(), PlaybackState::Loading);
        assert!(!p.is_buffering());
        assert_eq!(p.position_secs(), 0.0);
        assert_eq!(p.volume(), 0.4);
        assert_eq!(p.rate(), 1.5);
    }

    #[test]
    fn playlist_index_does_not_run_off_the_end() {
        let mut p = player();
        p.select(2);
        assert!(!p.next());
        assert_eq!(p.current().map(|e| e.video_id.as_str()), Some("v3"));

        assert!(!p.select(7));
    }

    #[test]
    fn external_urls_pass_through_and_keys_route_via_proxy() {
        let src = resolve_media("https://cdn.example.com/intro.mp4", "tok");
        assert_eq!(
            src,
            MediaSource::External("https://cdn.example.com/intro.mp4".to_string())
        );

        let src = resolve_media("videos/c1/v1.mp4", "abc.def.ghi");
        assert_eq!(
            src.url(),
            "/api/stream?key=videos/c1/v1.mp4&token=abc.def.ghi"
        );
        assert!(matches!(src, MediaSource::Proxied(_)));
    }
}
