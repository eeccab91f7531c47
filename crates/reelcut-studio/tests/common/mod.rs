//! In-memory collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use reelcut_media::{BoundingBox, ClipEncoder, EncodeJob, FaceLocator, MediaError, MediaResult, SourceVideo};
use reelcut_models::Account;
use reelcut_studio::{
    AccountStore, InMemoryAccountStore, RenderPipeline, SegmentProposer, StudioConfig, StudioResult,
};

/// Encoder that writes a marker file instead of running ffmpeg.
#[derive(Default)]
pub struct FakeEncoder {
    pub jobs: Mutex<Vec<EncodeJob>>,
    /// Segment starts (whole seconds) whose encode fails
    pub fail_starts: HashSet<u64>,
    pub fail_all: bool,
}

impl FakeEncoder {
    pub fn failing_at(starts: impl IntoIterator<Item = u64>) -> Self {
        Self {
            fail_starts: starts.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipEncoder for FakeEncoder {
    async fn encode(&self, job: &EncodeJob) -> MediaResult<()> {
        self.jobs.lock().unwrap().push(job.clone());
        if self.fail_all || self.fail_starts.contains(&(job.start as u64)) {
            return Err(MediaError::ffmpeg_failed("encoder exploded", None, Some(1)));
        }
        let marker = format!("clip {:.3}+{:.3} crop {}@{}", job.start, job.duration, job.crop.width, job.crop.x1);
        tokio::fs::write(&job.output, marker).await?;
        Ok(())
    }
}

/// Face locator returning a fixed set of boxes.
#[derive(Default)]
pub struct FakeLocator {
    pub faces: Vec<BoundingBox>,
    pub calls: AtomicUsize,
    /// Behave like a locator built without a face detector
    pub unavailable: bool,
}

impl FakeLocator {
    pub fn with_faces(faces: Vec<BoundingBox>) -> Self {
        Self {
            faces,
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceLocator for FakeLocator {
    async fn locate_faces(&self, _source: &SourceVideo, _at_secs: f64) -> MediaResult<Vec<BoundingBox>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.faces.clone())
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}

/// Account store that counts lookups and decrements.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryAccountStore,
    pub finds: AtomicUsize,
    pub decrements: AtomicUsize,
}

impl CountingStore {
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            inner: InMemoryAccountStore::with_accounts(accounts),
            ..Default::default()
        }
    }

    pub fn decrements(&self) -> usize {
        self.decrements.load(Ordering::SeqCst)
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for CountingStore {
    async fn find(&self, email: &str) -> StudioResult<Option<Account>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(email).await
    }

    async fn decrement_credits(&self, email: &str) -> StudioResult<i64> {
        self.decrements.fetch_add(1, Ordering::SeqCst);
        self.inner.decrement_credits(email).await
    }

    async fn register(&self, email: &str, password: &str) -> StudioResult<Account> {
        self.inner.register(email, password).await
    }

    async fn set_premium(&self, email: &str, premium: bool) -> StudioResult<()> {
        self.inner.set_premium(email, premium).await
    }

    async fn list_premium(&self) -> StudioResult<Vec<String>> {
        self.inner.list_premium().await
    }
}

/// Proposer returning canned model text.
pub struct CannedProposer {
    pub text: String,
    pub calls: AtomicUsize,
}

impl CannedProposer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentProposer for CannedProposer {
    async fn propose(&self, _source: &SourceVideo) -> StudioResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// 90 second 1080p landscape source.
pub fn landscape_source() -> SourceVideo {
    SourceVideo::new("/videos/talk.mp4", 90.0, 1920, 1080, 30.0)
}

pub struct Harness {
    pub pipeline: RenderPipeline,
    pub encoder: Arc<FakeEncoder>,
    pub locator: Arc<FakeLocator>,
    pub store: Arc<CountingStore>,
    pub work_dir: tempfile::TempDir,
}

pub fn harness(encoder: FakeEncoder, locator: FakeLocator, store: CountingStore) -> Harness {
    harness_with_config(encoder, locator, store, StudioConfig::default())
}

pub fn harness_with_config(
    encoder: FakeEncoder,
    locator: FakeLocator,
    store: CountingStore,
    config: StudioConfig,
) -> Harness {
    let work_dir = tempfile::tempdir().unwrap();
    let encoder = Arc::new(encoder);
    let locator = Arc::new(locator);
    let store = Arc::new(store);
    let pipeline = RenderPipeline::new(
        encoder.clone(),
        locator.clone(),
        store.clone(),
        config.with_work_dir(work_dir.path()),
    );
    Harness {
        pipeline,
        encoder,
        locator,
        store,
        work_dir,
    }
}
