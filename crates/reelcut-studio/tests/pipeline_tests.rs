//! Render pipeline integration tests.

mod common;

use common::*;
use reelcut_media::BoundingBox;
use reelcut_models::{Account, FocalMode, RenderRequest, SegmentCandidate, SegmentSource};
use reelcut_studio::{AccountStore, RequestContext, StudioConfig, StudioError};

const USER: &str = "user@example.com";

#[tokio::test]
async fn test_heuristic_render_of_landscape_source() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );

    let batch = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &RenderRequest::default())
        .await
        .unwrap();

    assert_eq!(batch.clips.len(), 1);
    let clip = &batch.clips[0];
    assert_eq!((clip.segment.start, clip.segment.end), (30.0, 60.0));
    assert!(clip.filename.ends_with(".mp4"));
    assert!(!clip.bytes.is_empty());

    let jobs = h.encoder.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].crop.width, 606);
    assert_eq!(jobs[0].crop.height, 1080);
    assert_eq!(jobs[0].crop.x1, 657);
    assert!(!jobs[0].enhancement.enabled);
    assert_eq!(jobs[0].duration, 30.0);

    assert!(batch.credit_charged);
    assert_eq!(h.store.decrements(), 1);
    let account = h.store.inner.find(USER).await.unwrap().unwrap();
    assert_eq!(account.credits, 1);
}

#[tokio::test]
async fn test_candidates_with_one_degenerate() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let request = RenderRequest::default().with_segments(SegmentSource::Candidates {
        candidates: vec![
            SegmentCandidate::new(5.0, 20.0, "Opening"),
            SegmentCandidate::new(95.0, 110.0, "Past the end"),
            SegmentCandidate::new(70.0, 200.0, "Finale"),
        ],
    });

    let batch = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &request)
        .await
        .unwrap();

    let labels: Vec<_> = batch.clips.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Opening", "Finale"]);
    assert_eq!(batch.clips[1].segment.end, 90.0);

    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].index, 1);

    let names: std::collections::HashSet<_> = batch.clips.iter().map(|c| c.filename.as_str()).collect();
    assert_eq!(names.len(), 2, "filenames must be unique within a batch");

    assert_eq!(h.store.decrements(), 1);
}

#[tokio::test]
async fn test_access_denied_does_no_work() {
    let mut broke = Account::new_free(USER);
    broke.credits = 0;
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([broke]),
    );

    let err = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &RenderRequest::default())
        .await
        .unwrap_err();

    assert!(err.is_access_denied());
    assert!(h.encoder.jobs().is_empty());
    assert_eq!(h.store.decrements(), 0);
}

#[tokio::test]
async fn test_unknown_account_is_denied() {
    let h = harness(FakeEncoder::default(), FakeLocator::default(), CountingStore::default());

    let err = h
        .pipeline
        .render(&RequestContext::user("ghost@example.com"), &landscape_source(), &RenderRequest::default())
        .await
        .unwrap_err();

    assert!(err.is_access_denied());
    assert!(h.encoder.jobs().is_empty());
}

#[tokio::test]
async fn test_premium_is_not_charged() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_premium(USER)]),
    );

    let batch = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &RenderRequest::default())
        .await
        .unwrap();

    assert_eq!(batch.clips.len(), 1);
    assert!(!batch.credit_charged);
    assert_eq!(h.store.decrements(), 0);
}

#[tokio::test]
async fn test_admin_skips_store_and_charge() {
    let config = StudioConfig::default().with_admin_email("boss@example.com");
    let h = harness_with_config(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::default(),
        config.clone(),
    );

    let ctx = RequestContext::for_email("boss@example.com", &config);
    let batch = h
        .pipeline
        .render(&ctx, &landscape_source(), &RenderRequest::default())
        .await
        .unwrap();

    assert_eq!(batch.clips.len(), 1);
    assert!(!batch.credit_charged);
    assert_eq!(h.store.finds(), 0);
    assert_eq!(h.store.decrements(), 0);
}

#[tokio::test]
async fn test_all_encodes_failing_is_processing_failed() {
    let h = harness(
        FakeEncoder::failing_all(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let request = RenderRequest::default().with_segments(SegmentSource::Candidates {
        candidates: vec![
            SegmentCandidate::new(0.0, 10.0, "A"),
            SegmentCandidate::new(10.0, 20.0, "B"),
        ],
    });

    let err = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &request)
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::ProcessingFailed(_)));
    assert_eq!(h.encoder.jobs().len(), 2);
    assert_eq!(h.store.decrements(), 0);
}

#[tokio::test]
async fn test_failing_segment_does_not_stop_batch() {
    let h = harness(
        FakeEncoder::failing_at([10]),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let request = RenderRequest::default().with_segments(SegmentSource::Candidates {
        candidates: vec![
            SegmentCandidate::new(0.0, 10.0, "A"),
            SegmentCandidate::new(10.0, 20.0, "B"),
            SegmentCandidate::new(20.0, 30.0, "C"),
        ],
    });

    let batch = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &request)
        .await
        .unwrap();

    let labels: Vec<_> = batch.clips.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["A", "C"]);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].label, "B");
    assert_eq!(batch.skipped[0].index, 1);
    assert_eq!(h.store.decrements(), 1);
}

#[tokio::test]
async fn test_nothing_to_process() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let request = RenderRequest::default().with_segments(SegmentSource::Candidates {
        candidates: vec![SegmentCandidate::new(100.0, 120.0, "Too late")],
    });

    let err = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &request)
        .await
        .unwrap_err();

    assert!(err.is_nothing_to_process());
    assert!(h.encoder.jobs().is_empty());
    assert_eq!(h.store.decrements(), 0);
}

#[tokio::test]
async fn test_face_focus_moves_crop() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::with_faces(vec![
            BoundingBox::new(100.0, 50.0, 10.0, 10.0),
            BoundingBox::new(1500.0, 80.0, 100.0, 100.0),
        ]),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let request = RenderRequest::default().with_focal(FocalMode::FaceDetected);

    h.pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &request)
        .await
        .unwrap();

    assert_eq!(h.locator.calls(), 1);
    let crop = h.encoder.jobs()[0].crop;
    // Face center at 1550 of 1920 px
    let expected = (1550.0 / 1920.0 * (1920.0 - 606.0) as f64).round() as u32;
    assert_eq!(crop.x1, expected);
    assert!(crop.x1 + crop.width <= 1920);
}

#[tokio::test]
async fn test_face_focus_without_detector_is_refused() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::unavailable(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let request = RenderRequest::default().with_focal(FocalMode::FaceDetected);

    let err = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &request)
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::ConfigError(_)));
    assert_eq!(h.locator.calls(), 0);
    assert!(h.encoder.jobs().is_empty());
    assert_eq!(h.store.decrements(), 0);
}

#[tokio::test]
async fn test_center_focus_without_detector_still_renders() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::unavailable(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );

    let batch = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &RenderRequest::default())
        .await
        .unwrap();

    assert_eq!(batch.clips.len(), 1);
    assert_eq!(h.encoder.jobs()[0].crop.x1, 657);
}

#[tokio::test]
async fn test_explicit_focus_and_enhancement() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let request = RenderRequest::default()
        .with_focal(FocalMode::Explicit { percent: 0.0 })
        .with_enhancement(true)
        .with_segments(SegmentSource::ExplicitStart { start: 80.0 });

    let batch = h
        .pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &request)
        .await
        .unwrap();

    assert_eq!((batch.clips[0].segment.start, batch.clips[0].segment.end), (80.0, 90.0));
    let job = &h.encoder.jobs()[0];
    assert_eq!(job.crop.x1, 0);
    assert!(job.enhancement.enabled);
    assert_eq!(h.locator.calls(), 0);
}

#[tokio::test]
async fn test_intermediate_files_are_removed() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );

    h.pipeline
        .render(&RequestContext::user(USER), &landscape_source(), &RenderRequest::default())
        .await
        .unwrap();

    let leftovers = std::fs::read_dir(h.work_dir.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_analysis_then_render() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let proposer = CannedProposer::new(
        r#"Here you go: [{"start": 10, "end": 25, "title": "Hook"}, {"start": "01:00", "end": "01:20"}]"#,
    );

    let batch = h
        .pipeline
        .analyze_and_render(&RequestContext::user(USER), &landscape_source(), &proposer, RenderRequest::default())
        .await
        .unwrap();

    let labels: Vec<_> = batch.clips.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Hook", "Viral Clip 2"]);
    assert_eq!(batch.clips[1].segment.start, 60.0);
    assert_eq!(h.store.decrements(), 1);
}

#[tokio::test]
async fn test_analysis_not_called_without_access() {
    let mut broke = Account::new_free(USER);
    broke.credits = 0;
    let h = harness(FakeEncoder::default(), FakeLocator::default(), CountingStore::with_accounts([broke]));
    let proposer = CannedProposer::new("[]");

    let err = h
        .pipeline
        .analyze_and_render(&RequestContext::user(USER), &landscape_source(), &proposer, RenderRequest::default())
        .await
        .unwrap_err();

    assert!(err.is_access_denied());
    assert_eq!(proposer.calls(), 0);
}

#[tokio::test]
async fn test_face_focus_without_detector_skips_analysis() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::unavailable(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let proposer = CannedProposer::new(r#"[{"start": 10, "end": 25}]"#);
    let request = RenderRequest::default().with_focal(FocalMode::FaceDetected);

    let err = h
        .pipeline
        .analyze_and_render(&RequestContext::user(USER), &landscape_source(), &proposer, request)
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::ConfigError(_)));
    assert_eq!(proposer.calls(), 0);
}

#[tokio::test]
async fn test_empty_analysis_aborts_before_encoding() {
    let h = harness(
        FakeEncoder::default(),
        FakeLocator::default(),
        CountingStore::with_accounts([Account::new_free(USER)]),
    );
    let proposer = CannedProposer::new("Sorry, nothing stood out.");

    let err = h
        .pipeline
        .analyze_and_render(&RequestContext::user(USER), &landscape_source(), &proposer, RenderRequest::default())
        .await
        .unwrap_err();

    assert!(err.is_nothing_to_process());
    assert!(h.encoder.jobs().is_empty());
    assert_eq!(h.store.decrements(), 0);
}
