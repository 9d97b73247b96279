//! Integration Tests
//!
//! End-to-end tests for the processing pipeline against a real session store.

use std::fs;
use std::sync::Arc;
use std::thread;

use approx::assert_relative_eq;

use spectra::dsp::{equalize_buffer, BandDescriptor};
use spectra::engine::{calculate_rms, generate_test_tone, AudioBuffer, AudioCodec, WavCodec};
use spectra::pipeline::{Limits, Processor};
use spectra::session::{ArtifactKind, FsSessionStore, SessionStore};
use spectra::SpectraError;

fn setup() -> (tempfile::TempDir, Arc<FsSessionStore>, Processor) {
    let temp = tempfile::tempdir().unwrap();
    let store = Arc::new(FsSessionStore::new(temp.path()).unwrap());
    let processor = Processor::new(store.clone(), Arc::new(WavCodec::default()), Limits::default());
    (temp, store, processor)
}

fn wav(buffer: &AudioBuffer) -> Vec<u8> {
    WavCodec::default().encode(buffer).unwrap()
}

fn decode(bytes: &[u8]) -> AudioBuffer {
    WavCodec::default().decode(bytes).unwrap()
}

// === Full Pipeline Tests ===

#[test]
fn test_silence_stays_silent() {
    let (_temp, store, processor) = setup();
    let upload = wav(&AudioBuffer::silence(1, 44100, 44100));

    let session = processor
        .process(&upload, r#"[{"frequency": 1000, "gain": 6}]"#)
        .unwrap();

    let output = decode(&store.read_artifact(&session, ArtifactKind::Processed).unwrap());
    assert_eq!(output.num_samples(), 44100);
    assert_eq!(output.sample_rate, 44100);
    assert_eq!(calculate_rms(&output), 0.0);
}

#[test]
fn test_processed_absent_is_not_found() {
    let (_temp, store, processor) = setup();
    let session = store.create_session().unwrap();
    store
        .write_artifact(&session, ArtifactKind::Input, b"pending")
        .unwrap();

    let result = processor.retrieve(&session, ArtifactKind::Processed);
    assert!(matches!(result, Err(SpectraError::NotFound { .. })));
}

#[test]
fn test_malformed_bands_leave_no_session() {
    let (temp, _store, processor) = setup();
    let upload = wav(&generate_test_tone(440.0, 0.1, 44100));

    let result = processor.process(&upload, "{not valid");
    assert!(matches!(result, Err(SpectraError::Validation { .. })));
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_empty_band_list_preserves_audio() {
    let (_temp, store, processor) = setup();
    let input = AudioBuffer::from_channels(
        vec![
            generate_test_tone(220.0, 0.25, 22050).samples.remove(0),
            generate_test_tone(3300.0, 0.25, 22050).samples.remove(0),
        ],
        22050,
    )
    .unwrap();

    let session = processor.process(&wav(&input), "[]").unwrap();
    let output = decode(&store.read_artifact(&session, ArtifactKind::Processed).unwrap());

    assert_eq!(output.num_channels(), 2);
    for ch in 0..2 {
        for (a, b) in input.channel(ch).iter().zip(output.channel(ch)) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_stereo_channels_processed_independently() {
    let (_temp, store, processor) = setup();
    let left = generate_test_tone(1000.0, 0.5, 8000).samples.remove(0);
    let right = vec![0.0f32; left.len()];
    let input = AudioBuffer::from_channels(vec![left, right], 8000).unwrap();

    let session = processor
        .process(&wav(&input), r#"[{"frequency": 1000, "gain": 12, "type": "peaking"}]"#)
        .unwrap();
    let output = decode(&store.read_artifact(&session, ArtifactKind::Processed).unwrap());

    assert!(output.channel(1).iter().all(|s| *s == 0.0));
    let boost = spectra::engine::rms_linear(output.channel(0)) / spectra::engine::rms_linear(input.channel(0));
    assert_relative_eq!(boost, 10f64.powf(12.0 / 20.0), epsilon = 0.05);
}

#[test]
fn test_concurrent_sessions_are_isolated() {
    let (_temp, store, processor) = setup();
    let processor = Arc::new(processor);
    let frequencies = [200.0, 450.0, 900.0, 1800.0, 3600.0, 5000.0, 6400.0, 7000.0];

    let handles: Vec<_> = frequencies
        .iter()
        .map(|&freq| {
            let processor = processor.clone();
            thread::spawn(move || {
                let tone = generate_test_tone(freq, 0.25, 16000);
                let bands = format!(r#"[{{"frequency": {}, "gain": -9}}]"#, freq);
                let session = processor.process(&wav(&tone), &bands).unwrap();
                (freq, tone, session)
            })
        })
        .collect();

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        let (freq, tone, session) = handle.join().unwrap();
        assert!(seen.insert(session), "session id reused");

        let expected = equalize_buffer(&tone, &[BandDescriptor::new(freq, -9.0).unwrap()]).unwrap();
        let output = decode(&store.read_artifact(&session, ArtifactKind::Processed).unwrap());
        assert_eq!(output, expected);
        assert_eq!(store.read_artifact(&session, ArtifactKind::Input).unwrap(), wav(&tone));
    }
}

#[test]
fn test_unknown_artifact_kind_rejected() {
    let result = "stems".parse::<ArtifactKind>();
    assert!(matches!(result, Err(SpectraError::Validation { .. })));
}
