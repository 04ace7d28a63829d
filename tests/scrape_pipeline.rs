//! End-to-end pipeline tests against a mock content source.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use universe_dl::assets::AssetStore;
use universe_dl::assets::video::{StreamSelector, VideoHandler};
use universe_dl::error::{Error, Result};
use universe_dl::modules::ScraperModule;
use universe_dl::modules::universe::UniverseModule;
use universe_dl::types::Event;
use universe_dl::{Config, Phase};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes marker bytes instead of shelling out to yt-dlp/ffmpeg.
struct StubVideoHandler {
    fetches: AtomicUsize,
}

impl StubVideoHandler {
    fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VideoHandler for StubVideoHandler {
    async fn fetch_stream(&self, _url: &str, _selector: StreamSelector, dest: &Path) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(dest, b"stream").await?;
        Ok(())
    }

    async fn remux(&self, _video: &Path, _audio: &Path, dest: &Path) -> Result<()> {
        tokio::fs::write(dest, b"remuxed").await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

struct Fixture {
    server: MockServer,
    config: Config,
    _data_dir: tempfile::TempDir,
}

impl Fixture {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let data_dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.source.base_url = server.uri();
        config.download.data_dir = data_dir.path().to_path_buf();
        Self {
            server,
            config,
            _data_dir: data_dir,
        }
    }

    fn module(&self, handler: Arc<dyn VideoHandler>) -> (UniverseModule, broadcast::Receiver<Event>) {
        let (events, rx) = broadcast::channel(1024);
        let module = UniverseModule::with_video_handler(
            &self.config,
            events,
            CancellationToken::new(),
            handler,
        )
        .expect("module construction");
        (module, rx)
    }

    fn output_path(&self) -> std::path::PathBuf {
        self.config.download.output_path()
    }

    fn asset_path(&self, url: &str, ext: &str) -> std::path::PathBuf {
        self.config
            .download
            .asset_dir()
            .join(format!("{}.{ext}", AssetStore::content_id(url)))
    }

    async fn mount_json(&self, endpoint: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    async fn mount_bytes(&self, endpoint: &str, body: &[u8], expected_hits: u64) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(expected_hits)
            .mount(&self.server)
            .await;
    }
}

/// A small but complete universe: one faction, one champion, one story,
/// one shared image exercising cross-batch de-duplication, and one video.
async fn mount_universe(fixture: &Fixture) {
    let base = fixture.server.uri();
    let video_url = "https://www.youtube.com/watch?v=showcase";

    fixture
        .mount_json(
            "/en_us/search/index.json",
            serde_json::json!({
                "champions": [{"slug": "annie", "name": "Annie"}],
                "factions": [{"slug": "ionia", "name": "Ionia"}],
            }),
        )
        .await;
    fixture
        .mount_json(
            "/en_us/factions/ionia/index.json",
            serde_json::json!({
                "faction": {
                    "name": "Ionia",
                    "image": {"uri": format!("{base}/img/crest.png")},
                    "video": {"uri": video_url},
                },
                "modules": [
                    {"type": "image-gallery", "assets": [
                        {"uri": format!("{base}/img/shared.jpg")},
                        {"uri": format!("{base}/img/gallery.jpg")},
                    ]},
                    {"type": "story-preview", "story-slug": "the-tale"},
                ],
            }),
        )
        .await;
    fixture
        .mount_json(
            "/en_us/champions/annie/index.json",
            serde_json::json!({
                "champion": {
                    "name": "Annie",
                    "image": {"uri": format!("{base}/img/annie.png")},
                },
                "modules": [
                    {"type": "featured-video", "featured-image": {
                        "uri": format!("{base}/img/shared.jpg")
                    }, "video": {"uri": video_url}},
                ],
            }),
        )
        .await;
    fixture
        .mount_json(
            "/en_us/story/the-tale/index.json",
            serde_json::json!({
                "story": {
                    "title": "The Tale",
                    "story-sections": [{
                        "background-image": {"uri": format!("{base}/img/backdrop.jpg")},
                        "story-subsections": [
                            {"icon-image": {"uri": format!("{base}/img/icon.png")}},
                            {},
                        ],
                    }],
                },
            }),
        )
        .await;

    // The shared image appears in both the faction gallery and the champion
    // featured-video poster; it must be fetched exactly once.
    fixture.mount_bytes("/img/shared.jpg", b"shared", 1).await;
    fixture.mount_bytes("/img/crest.png", b"crest", 1).await;
    fixture.mount_bytes("/img/gallery.jpg", b"gallery", 1).await;
    fixture.mount_bytes("/img/annie.png", b"annie", 1).await;
    fixture.mount_bytes("/img/backdrop.jpg", b"backdrop", 1).await;
    fixture.mount_bytes("/img/icon.png", b"icon", 1).await;
}

#[tokio::test]
async fn full_pipeline_persists_dataset_and_assets() {
    let fixture = Fixture::new().await;
    mount_universe(&fixture).await;

    let handler = Arc::new(StubVideoHandler::new());
    let (module, _rx) = fixture.module(handler.clone());
    let report = module.scrape().await.expect("scrape");

    assert_eq!(report.factions, 1);
    assert_eq!(report.champions, 1);
    assert_eq!(report.stories, 1);
    // Six distinct images plus one video, shared image counted once.
    assert_eq!(report.assets, 7);

    // The aggregate is pretty-printed and carries the unmodeled fields.
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(fixture.output_path()).expect("raw.json"))
            .expect("valid json");
    assert_eq!(raw["factions"][0]["faction"]["name"], "Ionia");
    assert_eq!(raw["champions"][0]["champion"]["name"], "Annie");
    assert_eq!(raw["stories"][0]["story"]["title"], "The Tale");

    // Assets are materialized under their content identifiers.
    let base = fixture.server.uri();
    for (endpoint, ext, body) in [
        ("/img/crest.png", "png", b"crest".as_slice()),
        ("/img/shared.jpg", "jpg", b"shared".as_slice()),
        ("/img/backdrop.jpg", "jpg", b"backdrop".as_slice()),
    ] {
        let dest = fixture.asset_path(&format!("{base}{endpoint}"), ext);
        assert_eq!(std::fs::read(&dest).expect("asset file"), body);
    }

    // The video was remuxed once even though two entities reference it,
    // and its elementary-stream temps were cleaned up.
    let video_url = "https://www.youtube.com/watch?v=showcase";
    let video_dest = fixture.asset_path(video_url, "webm");
    assert_eq!(std::fs::read(&video_dest).expect("video file"), b"remuxed");
    assert_eq!(handler.fetches.load(Ordering::SeqCst), 2);
    let id = AssetStore::content_id(video_url);
    assert!(!fixture
        .config
        .download
        .asset_dir()
        .join(format!("{id}.video.webm"))
        .exists());
    assert!(!fixture
        .config
        .download
        .asset_dir()
        .join(format!("{id}.audio.webm"))
        .exists());
}

#[tokio::test]
async fn phases_are_sequential_and_terminate_in_done() {
    let fixture = Fixture::new().await;
    mount_universe(&fixture).await;

    let (module, mut rx) = fixture.module(Arc::new(StubVideoHandler::new()));
    module.scrape().await.expect("scrape");

    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::PhaseChanged { phase, .. } = event {
            phases.push(phase);
        }
    }
    assert_eq!(
        phases,
        vec![
            Phase::FetchingIndex,
            Phase::FetchingEntities,
            Phase::DerivingAssetUrls,
            Phase::DownloadingAssets,
            Phase::PersistingResult,
            Phase::Done,
        ]
    );
}

#[tokio::test]
async fn failed_entity_fetch_aborts_run_without_output() {
    let fixture = Fixture::new().await;
    fixture
        .mount_json(
            "/en_us/search/index.json",
            serde_json::json!({
                "champions": [],
                "factions": [{"slug": "ionia"}],
            }),
        )
        .await;
    Mock::given(method("GET"))
        .and(path("/en_us/factions/ionia/index.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&fixture.server)
        .await;

    let (module, mut rx) = fixture.module(Arc::new(StubVideoHandler::new()));
    let error = module.scrape().await.expect_err("scrape must fail");
    match error {
        Error::Batch { entity, item, .. } => {
            assert_eq!(entity, "factions");
            assert_eq!(item, "ionia");
        }
        other => panic!("expected batch error, got {other}"),
    }

    assert!(!fixture.output_path().exists());

    let mut saw_failed_phase = false;
    while let Ok(event) = rx.try_recv() {
        if let Event::PhaseChanged {
            phase: Phase::Failed,
            ..
        } = event
        {
            saw_failed_phase = true;
        }
    }
    assert!(saw_failed_phase);
}

#[tokio::test]
async fn unknown_content_module_kind_aborts_the_run() {
    let fixture = Fixture::new().await;
    fixture
        .mount_json(
            "/en_us/search/index.json",
            serde_json::json!({
                "champions": [],
                "factions": [{"slug": "ionia"}],
            }),
        )
        .await;
    fixture
        .mount_json(
            "/en_us/factions/ionia/index.json",
            serde_json::json!({
                "faction": {
                    "image": {"uri": "https://x.test/crest.png"},
                    "video": {"uri": "https://youtu.be/f"},
                },
                "modules": [{"type": "parallax-banner", "assets": []}],
            }),
        )
        .await;

    let (module, _rx) = fixture.module(Arc::new(StubVideoHandler::new()));
    let error = module.scrape().await.expect_err("scrape must fail");
    // The unknown kind surfaces as a typed decode failure inside the batch.
    assert!(error.to_string().contains("factions"));
    assert!(!fixture.output_path().exists());
}

#[tokio::test]
async fn missing_video_tools_fail_only_runs_with_video_assets() {
    let fixture = Fixture::new().await;
    let base = fixture.server.uri();
    fixture
        .mount_json(
            "/en_us/search/index.json",
            serde_json::json!({
                "champions": [{"slug": "annie"}],
                "factions": [],
            }),
        )
        .await;
    fixture
        .mount_json(
            "/en_us/champions/annie/index.json",
            serde_json::json!({
                "champion": {"image": {"uri": format!("{base}/img/annie.png")}},
                "modules": [],
            }),
        )
        .await;
    fixture.mount_bytes("/img/annie.png", b"annie", 1).await;

    // No video asset in the universe, so the unavailable handler is never hit.
    let (module, _rx) = fixture.module(Arc::new(universe_dl::assets::video::NoOpVideoHandler));
    let report = module.scrape().await.expect("scrape");
    assert_eq!(report.assets, 1);
}
