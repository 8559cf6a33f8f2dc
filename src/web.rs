use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use log::{error, info, warn};
use tower_http::services::ServeDir;

use crate::{
    alarm::AlarmTime,
    error::PlaybackError,
    page::{self, HomeView},
    playback::PlaybackController,
    ringtone::RingtoneResolver,
    settings::{AlarmRecord, SettingsStore},
};

/// Shared with every handler; cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<SettingsStore>,
    pub resolver: Arc<RingtoneResolver>,
    pub controller: Arc<PlaybackController>,
    pub preview: Duration,
}

/// The alarm page and its actions, with anything else served as a file out
/// of `static_dir`.
pub fn router(state: AppState, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/save", get(save))
        .route("/stop", get(stop))
        .route("/test", get(test_play))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

/// first value of `key` in the query, later repeats are ignored
fn first<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

async fn home(State(state): State<AppState>) -> Html<String> {
    let catalog = state.resolver.catalog();
    Html(page::home(&HomeView {
        saved: state.store.load(),
        catalog: &catalog,
        music_dir: state.resolver.music_dir(),
        device_available: state.controller.device_available(),
    }))
}

async fn save(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, Html<String>) {
    let time = AlarmTime::normalize(
        first(&params, "hour").unwrap_or("07"),
        first(&params, "minute").unwrap_or("00"),
        first(&params, "ampm").unwrap_or("AM"),
    );
    let raw = first(&params, "ringtone").unwrap_or_default().to_string();

    // check the ringtone now rather than finding out when the alarm goes off
    let Some(ringtone) = state.resolver.resolve(&raw) else {
        warn!("not saving alarm, ringtone {raw:?} not found");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(page::ringtone_not_found(&raw, state.resolver.music_dir())),
        );
    };
    let record = AlarmRecord::new(time, ringtone);
    match state.store.save(&record) {
        Ok(()) => {
            info!("alarm set for {} with {}", record.time12, record.ringtone.display());
            (StatusCode::OK, Html(page::saved(&record)))
        }
        Err(e) => {
            error!("{e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page::save_failed(&e.to_string())),
            )
        }
    }
}

async fn stop(State(state): State<AppState>) -> Html<String> {
    state.controller.stop();
    Html(page::stopped())
}

async fn test_play(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    // only the ringtone is needed to preview, even if the rest of the alarm isn't set
    let Some(ringtone) = state
        .store
        .load_partial()
        .map(|record| record.ringtone)
        .filter(|ringtone| !ringtone.as_os_str().is_empty())
    else {
        return (StatusCode::CONFLICT, Html(page::no_ringtone()));
    };
    let controller = state.controller.clone();
    let preview = state.preview;
    let result =
        tokio::task::spawn_blocking(move || controller.play_preview(&ringtone, preview)).await;
    match result {
        Ok(Ok(())) => (StatusCode::OK, Html(page::test_ok())),
        Ok(Err(PlaybackError::DeviceUnavailable)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(page::device_unavailable()),
        ),
        Ok(Err(e)) => {
            warn!("test play failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page::test_failed(&e.to_string())),
            )
        }
        Err(e) => {
            error!("test play panicked: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page::test_failed(&e.to_string())),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::atomic::Ordering};

    use axum::{
        body::{self, Body},
        http::Request,
        response::Response,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::playback::testing::{controller, Call, FakeBackend};

    const PREVIEW: Duration = Duration::from_millis(5);

    struct Harness {
        dir: tempfile::TempDir,
        backend: Arc<FakeBackend>,
        state: AppState,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir_all(&music).unwrap();
        fs::write(music.join("rooster.mp3"), b"").unwrap();

        let (backend, controller) = controller();
        let state = AppState {
            store: Arc::new(SettingsStore::new(dir.path().join("alarm_settings.json"))),
            resolver: Arc::new(RingtoneResolver::with_dirs(music, dir.path().join("app"))),
            controller: Arc::new(controller),
            preview: PREVIEW,
        };
        Harness {
            dir,
            backend,
            state,
        }
    }

    impl Harness {
        fn tone(&self) -> PathBuf {
            self.dir.path().join("music").join("rooster.mp3")
        }

        async fn get(&self, uri: &str) -> Response {
            router(self.state.clone(), self.dir.path().join("static"))
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
        }
    }

    async fn text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn home_lists_ringtones() {
        let h = harness();
        let response = h.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = text(response).await;
        assert!(html.contains("rooster.mp3"));
        assert!(html.contains("Audio device ready."));
    }

    #[tokio::test]
    async fn save_normalizes_and_persists() {
        let h = harness();
        let response = h
            .get("/save?hour=19&minute=5&ampm=pm&ringtone=rooster.mp3")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains("12:05 PM"));

        let saved = h.state.store.load().unwrap();
        assert_eq!(saved.hour, "12");
        assert_eq!(saved.minute, "05");
        assert_eq!(saved.ampm, "PM");
        assert_eq!(saved.ringtone, h.tone());
    }

    #[tokio::test]
    async fn save_defaults_missing_fields() {
        let h = harness();
        let response = h.get("/save?ampm=noon&ringtone=rooster.mp3").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.state.store.load().unwrap().time12, "07:00 AM");
    }

    #[tokio::test]
    async fn save_takes_first_of_repeated_keys() {
        let h = harness();
        let response = h
            .get("/save?hour=7&hour=8&minute=0&ampm=AM&ampm=PM&ringtone=rooster.mp3")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("content-type")
            .is_some_and(|value| value.as_bytes().starts_with(b"text/html")));
        assert_eq!(h.state.store.load().unwrap().time12, "07:00 AM");
    }

    #[tokio::test]
    async fn save_clamps_overflowing_numbers() {
        let h = harness();
        let response = h
            .get("/save?hour=99999999999999999999&minute=99999999999999999999&ampm=AM&ringtone=rooster.mp3")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.state.store.load().unwrap().time12, "12:59 AM");
    }

    #[tokio::test]
    async fn save_rejects_unknown_ringtone() {
        let h = harness();
        let response = h.get("/save?hour=7&minute=0&ampm=AM&ringtone=missing.mp3").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(text(response).await.contains("missing.mp3"));
        assert_eq!(h.state.store.load(), None);
    }

    #[tokio::test]
    async fn save_reports_write_failure() {
        let mut h = harness();
        let blocker = h.dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        h.state.store = Arc::new(SettingsStore::new(blocker.join("alarm.json")));
        let response = h.get("/save?hour=7&minute=0&ampm=AM&ringtone=rooster.mp3").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn stop_is_always_ok() {
        let h = harness();
        for _ in 0..2 {
            let response = h.get("/stop").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(text(response).await.contains("Stopped"));
        }
        assert!(!h.state.controller.is_ringing());
        assert!(h.state.controller.suppressed_until().is_some());
    }

    #[tokio::test]
    async fn stop_silences_a_ringing_alarm() {
        let h = harness();
        h.state.controller.start_loop(&h.tone()).unwrap();
        h.get("/stop").await;
        assert!(!h.state.controller.is_ringing());
        assert_eq!(h.backend.calls().last(), Some(&Call::Stop));
    }

    #[tokio::test]
    async fn test_needs_a_saved_alarm() {
        let h = harness();
        let response = h.get("/test").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_previews_saved_ringtone() {
        let h = harness();
        h.get("/save?hour=7&minute=0&ampm=AM&ringtone=rooster.mp3").await;
        let response = h.get("/test").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.backend.calls(), vec![Call::Preview(h.tone(), PREVIEW)]);
        assert!(!h.state.controller.is_ringing());
    }

    #[tokio::test]
    async fn test_plays_ringtone_of_incomplete_alarm() {
        let h = harness();
        let record = serde_json::json!({ "ringtone": h.tone() });
        fs::write(h.state.store.path(), record.to_string()).unwrap();
        assert_eq!(h.state.store.load(), None);

        let response = h.get("/test").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.backend.calls(), vec![Call::Preview(h.tone(), PREVIEW)]);
    }

    #[tokio::test]
    async fn test_reports_playback_failure() {
        let h = harness();
        h.get("/save?hour=7&minute=0&ampm=AM&ringtone=rooster.mp3").await;
        h.backend.fail.store(true, Ordering::SeqCst);
        let response = h.get("/test").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text(response).await.contains("Test failed"));
    }

    #[tokio::test]
    async fn test_without_device() {
        let mut h = harness();
        h.get("/save?hour=7&minute=0&ampm=AM&ringtone=rooster.mp3").await;
        h.state.controller = Arc::new(PlaybackController::new(None));
        let response = h.get("/test").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let html = text(h.get("/").await).await;
        assert!(html.contains("Audio device not initialized"));
    }

    #[tokio::test]
    async fn other_paths_are_static_files() {
        let h = harness();
        let static_dir = h.dir.path().join("static");
        fs::create_dir_all(&static_dir).unwrap();
        fs::write(static_dir.join("hello.txt"), "hi there").unwrap();

        let response = h.get("/hello.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "hi there");

        assert_eq!(h.get("/nope.txt").await.status(), StatusCode::NOT_FOUND);
    }
}
