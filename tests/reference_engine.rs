//! End-to-end lifecycle tests with the reference engine: enrollment,
//! identification round trip, idempotent database construction, and the
//! degraded DetectError → IdentError path.

use std::sync::mpsc;

use tempfile::TempDir;

use iris_1n::{
    DatabaseEntry, Engine, Harness, HarnessConfig, IrisImage, PixelFormat, ReferenceEngine,
    ReturnCode, SearchOutput, SubjectSamples, TemplateType,
};

/// Four-quadrant image with per-quadrant intensities; distinct layouts give
/// subjects clearly separated grid codes.
fn quadrant_image(levels: [u8; 4]) -> IrisImage {
    let width = 64u16;
    let height = 64u16;
    let mut data = Vec::with_capacity(64 * 64);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let quadrant = usize::from(y >= 32) * 2 + usize::from(x >= 32);
            data.push(levels[quadrant]);
        }
    }
    IrisImage::new(width, height, PixelFormat::Grayscale, data)
}

fn flat_image() -> IrisImage {
    IrisImage::new(64, 64, PixelFormat::Grayscale, vec![127u8; 64 * 64])
}

fn noisy(mut iris: IrisImage) -> IrisImage {
    for byte in iris.data.iter_mut() {
        *byte = byte.saturating_add(3);
    }
    iris
}

const SUBJECT_A: [u8; 4] = [0, 80, 160, 240];
const SUBJECT_B: [u8; 4] = [240, 160, 80, 0];
const SUBJECT_C: [u8; 4] = [40, 200, 120, 60];

fn enrollment_subjects() -> Vec<SubjectSamples> {
    vec![
        SubjectSamples::new("A", vec![quadrant_image(SUBJECT_A)]),
        SubjectSamples::new("B", vec![quadrant_image(SUBJECT_B)]),
        SubjectSamples::new("C", vec![quadrant_image(SUBJECT_C)]),
    ]
}

fn harness_config(store: &TempDir, config: &TempDir, num_candidates: u32) -> HarnessConfig {
    HarnessConfig {
        config_dir: config.path().to_path_buf(),
        enroll_dir: store.path().to_path_buf(),
        num_candidates,
    }
}

fn collect_run(
    enrollment: Vec<SubjectSamples>,
    searches: Vec<SubjectSamples>,
    num_candidates: u32,
) -> Vec<SearchOutput> {
    let store = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    let mut harness = Harness::new(
        ReferenceEngine::new(),
        harness_config(&store, &config, num_candidates),
    );

    let (tx, rx) = mpsc::channel();
    harness.run(&enrollment, &searches, &tx, None).unwrap();
    drop(tx);
    rx.into_iter().collect()
}

#[test]
fn round_trip_identifies_the_enrolled_subject() {
    let searches = vec![SubjectSamples::new(
        "probe-A",
        vec![noisy(quadrant_image(SUBJECT_A))],
    )];
    let outputs = collect_run(enrollment_subjects(), searches, 3);

    assert_eq!(outputs.len(), 1);
    let output = &outputs[0];
    assert!(output.status.is_success());
    assert_eq!(output.candidates.len(), 3);
    assert_eq!(output.candidates[0].id, "A");
    assert!(output.candidates[0].distance < output.candidates[1].distance);
}

#[test]
fn candidate_distances_are_non_decreasing() {
    let searches = vec![SubjectSamples::new(
        "probe-B",
        vec![noisy(quadrant_image(SUBJECT_B))],
    )];
    let outputs = collect_run(enrollment_subjects(), searches, 3);

    let distances: Vec<f64> = outputs[0].candidates.iter().map(|c| c.distance).collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(outputs[0].candidates[0].id, "B");
}

#[test]
fn requesting_more_candidates_than_records_pads_the_list() {
    let searches = vec![SubjectSamples::new(
        "probe-A",
        vec![noisy(quadrant_image(SUBJECT_A))],
    )];
    let outputs = collect_run(enrollment_subjects(), searches, 5);

    let candidates = &outputs[0].candidates;
    assert_eq!(candidates.len(), 5);
    assert_eq!(candidates.iter().filter(|c| c.is_valid()).count(), 3);
    assert!(candidates[3].id.is_empty() && candidates[3].distance.is_infinite());
}

#[test]
fn undetectable_probe_fails_the_query_only() {
    let searches = vec![
        SubjectSamples::new("blank-probe", vec![flat_image()]),
        SubjectSamples::new("probe-C", vec![noisy(quadrant_image(SUBJECT_C))]),
    ];
    let outputs = collect_run(enrollment_subjects(), searches, 2);

    // The blank probe produced a degraded template (DetectError at creation
    // time) that carries no matchable data, so its query reports IdentError
    // and placeholder candidates, while the next probe still runs.
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].status.code, ReturnCode::IdentError);
    assert_eq!(outputs[0].candidates.len(), 2);
    assert!(outputs[0].candidates.iter().all(|c| !c.is_valid()));

    assert!(outputs[1].status.is_success());
    assert_eq!(outputs[1].candidates[0].id, "C");
}

#[test]
fn degraded_enrollment_records_are_kept_but_never_match() {
    let mut enrollment = enrollment_subjects();
    enrollment.push(SubjectSamples::new("blank", vec![flat_image()]));

    let searches = vec![SubjectSamples::new(
        "probe-A",
        vec![noisy(quadrant_image(SUBJECT_A))],
    )];
    let outputs = collect_run(enrollment, searches, 4);

    let candidates = &outputs[0].candidates;
    assert_eq!(candidates.len(), 4);
    // Three matchable subjects; the degraded record pads out as invalid.
    assert_eq!(candidates.iter().filter(|c| c.is_valid()).count(), 3);
    assert!(candidates.iter().all(|c| c.id != "blank"));
}

#[test]
fn two_eye_probe_with_explicit_labels_is_accepted() {
    use iris_1n::EyeLabel;

    let left = quadrant_image(SUBJECT_A).with_label(EyeLabel::Left);
    let right = quadrant_image(SUBJECT_B).with_label(EyeLabel::Right);
    let searches = vec![SubjectSamples::new("two-eye", vec![left, right])];

    let outputs = collect_run(enrollment_subjects(), searches, 3);
    assert!(outputs[0].status.is_success());
    // Both eyes are searched; the best comparable pair wins.
    assert!(outputs[0].candidates[0].is_valid());
}

#[test]
fn database_construction_is_idempotent() {
    let store = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();

    let mut harness = Harness::new(
        ReferenceEngine::new(),
        harness_config(&store, &config, 3),
    );
    let records = harness
        .create_templates(TemplateType::Enrollment, &enrollment_subjects())
        .unwrap();

    harness.enroll(&records).unwrap();
    // Second construction against the same store is a Success no-op.
    harness.enroll(&records).unwrap();

    let probes = harness
        .create_templates(
            TemplateType::Search,
            &[SubjectSamples::new("probe-A", vec![noisy(quadrant_image(SUBJECT_A))])],
        )
        .unwrap();
    harness.initialize_identification().unwrap();

    let (tx, rx) = mpsc::channel();
    harness.run_identification(&probes, &tx, None).unwrap();
    drop(tx);

    let outputs: Vec<SearchOutput> = rx.into_iter().collect();
    assert_eq!(outputs[0].candidates[0].id, "A");
}

#[test]
fn identification_works_from_a_fresh_engine_instance() {
    let store = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();

    // Build templates and the database with one engine instance.
    let mut harness = Harness::new(
        ReferenceEngine::new(),
        harness_config(&store, &config, 2),
    );
    let records = harness
        .create_templates(TemplateType::Enrollment, &enrollment_subjects())
        .unwrap();
    harness.enroll(&records).unwrap();
    let probes = harness
        .create_templates(
            TemplateType::Search,
            &[SubjectSamples::new("probe-B", vec![noisy(quadrant_image(SUBJECT_B))])],
        )
        .unwrap();

    // Identify with a brand-new instance, as a separate process would.
    let mut searcher = ReferenceEngine::new();
    assert!(searcher
        .initialize_identification(store.path(), config.path())
        .is_success());

    let mut candidates = Vec::new();
    let status = searcher.identify(&probes[0].template, 2, &mut candidates);
    assert!(status.is_success());
    assert_eq!(candidates[0].id, "B");
}

#[test]
fn enrolling_against_an_unwritable_store_is_fatal() {
    let config = TempDir::new().unwrap();
    let mut engine = ReferenceEngine::new();

    let missing = std::path::Path::new("/nonexistent/iris-store");
    let entries = [DatabaseEntry::new("A", vec![1, 2, 3])];
    let status = engine.create_database(missing, config.path(), &entries);
    assert_eq!(status.code, ReturnCode::EnrollDirError);
}
