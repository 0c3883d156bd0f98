use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use core_types::config::PathsConfig;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_embedding::{ColorHistogramEncoder, EmbeddingProvider};
use matcher::{AnswerImageResolver, CandidateSet, MatchError, match_candidates};
use tempfile::tempdir;

fn jpeg(rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(24, 24, |x, y| {
        if (x / 6 + y / 6) % 2 == 0 { Rgb(rgb) } else { Rgb([255, 255, 255]) }
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// Lookups confined to the temp dir: no parent prefixes or fallbacks.
fn contained_paths() -> PathsConfig {
    PathsConfig {
        legacy_asset_dirs: Vec::new(),
        relative_prefixes: vec![PathBuf::new()],
        fallback_dirs: vec![PathBuf::new()],
        ..PathsConfig::default()
    }
}

#[test]
fn quest_folder_photos_are_matched_end_to_end() {
    let dir = tempdir().unwrap();
    let quest = dir.path().join("quests").join("Library");
    fs::create_dir_all(&quest).unwrap();
    let probe = jpeg([180, 20, 20]);
    fs::write(quest.join("a.jpg"), &probe).unwrap();
    fs::write(quest.join("b.jpg"), jpeg([20, 20, 180])).unwrap();

    let resolver = AnswerImageResolver::with_base(dir.path(), &contained_paths());
    let provider = EmbeddingProvider::with_encoder(ColorHistogramEncoder::default());
    let candidates: CandidateSet = vec!["b.jpg".to_string(), "a.jpg".to_string()].into();

    let report = match_candidates(&provider, &resolver, &probe, &candidates).unwrap();
    assert_eq!(report.result.best_candidate_id.as_deref(), Some("a.jpg"));
    assert!((report.result.score - 1.0).abs() < 1e-5);
}

#[test]
fn unknown_answer_is_no_valid_candidates() {
    let dir = tempdir().unwrap();
    let resolver = AnswerImageResolver::with_base(dir.path(), &contained_paths());
    let provider = EmbeddingProvider::with_encoder(ColorHistogramEncoder::default());

    let err = match_candidates(
        &provider,
        &resolver,
        &jpeg([1, 2, 3]),
        &CandidateSet::from("missing.jpg"),
    )
    .unwrap_err();
    assert!(matches!(err, MatchError::NoValidCandidates(_)));
}
