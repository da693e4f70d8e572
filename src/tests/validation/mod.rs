use crate::{
    candidate::CandidateImage,
    config::{Bounds, PolicySource, ValidationConfig},
    probe::Dimensions,
    quick_validate,
    sniff::SniffedFormat,
    tests::{encode, jpeg, png_header_only, svg_with_script, tiny_png},
    validate,
};

#[tokio::test]
async fn undersized_file_has_one_error() {
    let verdict = validate(Some(&tiny_png()), &ValidationConfig::default()).await;
    assert!(!verdict.is_valid());
    assert_eq!(verdict.errors().len(), 1);
    assert!(verdict.errors()[0].contains("too small"));
    // The signature is right but there is nothing to decode.
    assert!(
        verdict
            .warnings()
            .iter()
            .any(|w| w.contains("could not read image dimensions"))
    );
}

#[tokio::test]
async fn well_formed_jpeg_is_clean() {
    let verdict = validate(
        Some(&jpeg(800, 600, "portrait.jpg")),
        &ValidationConfig::default(),
    )
    .await;
    assert!(verdict.is_valid());
    assert!(verdict.errors().is_empty());
    assert!(verdict.warnings().is_empty(), "{:?}", verdict.warnings());
    let metadata = verdict.metadata();
    assert_eq!(
        metadata.dimensions,
        Dimensions::Measured {
            width: 800,
            height: 600
        }
    );
    assert_eq!(metadata.sniffed_format, Some(SniffedFormat::Jpeg));
    let ratio = metadata.aspect_ratio.unwrap();
    assert!((ratio - 4.0 / 3.0).abs() < 1e-3);
}

#[tokio::test]
async fn oversized_dimensions_are_an_error() {
    let config = ValidationConfig {
        min_size_bytes: 1,
        max_dimensions: Bounds {
            width: 4096,
            height: 4096,
        },
        ..Default::default()
    };
    let candidate = CandidateImage::new(png_header_only(9000, 9000), "image/png", "map.png");
    let verdict = validate(Some(&candidate), &config).await;
    assert!(!verdict.is_valid());
    assert_eq!(
        verdict.errors(),
        &["image is 9000x9000 pixels, maximum is 4096x4096".to_string()]
    );
    assert!(!verdict.warnings().iter().any(|w| w.contains("aspect ratio")));
}

#[tokio::test]
async fn undersized_dimensions_are_an_error() {
    let candidate = CandidateImage::new(
        encode(8, 8, image::ImageFormat::Png),
        "image/png",
        "icon.png",
    );
    let config = ValidationConfig {
        min_size_bytes: 1,
        ..Default::default()
    };
    let verdict = validate(Some(&candidate), &config).await;
    assert!(!verdict.is_valid());
    assert_eq!(
        verdict.errors(),
        &["image is 8x8 pixels, minimum is 16x16".to_string()]
    );
    assert!(verdict.warnings().is_empty(), "{:?}", verdict.warnings());
}

#[tokio::test]
async fn elongated_image_only_warns() {
    let candidate = CandidateImage::new(
        encode(500, 50, image::ImageFormat::Png),
        "image/png",
        "banner.png",
    );
    let config = ValidationConfig {
        min_size_bytes: 1,
        ..Default::default()
    };
    let verdict = validate(Some(&candidate), &config).await;
    assert!(verdict.is_valid(), "{:?}", verdict.errors());
    assert_eq!(verdict.warnings().len(), 1);
    assert!(verdict.warnings()[0].contains("aspect ratio 10.00:1"));
}

#[tokio::test]
async fn svg_with_script_is_accepted_with_warning() {
    let verdict = validate(Some(&svg_with_script()), &ValidationConfig::default()).await;
    assert!(verdict.is_valid(), "{:?}", verdict.errors());
    assert_eq!(verdict.metadata().dimensions, Dimensions::NotApplicable);
    assert_eq!(verdict.metadata().aspect_ratio, None);
    assert!(
        verdict
            .warnings()
            .iter()
            .any(|w| w.contains("executable script"))
    );
}

#[tokio::test]
async fn oversized_files_are_always_rejected() {
    let config = ValidationConfig {
        max_size_bytes: 1000,
        ..Default::default()
    };
    for size in [1001, 1500, 4096, 65536] {
        let mut body = vec![0xFF, 0xD8, 0xFF];
        body.resize(size, 0);
        let candidate = CandidateImage::new(body, "image/jpeg", "big.jpg");
        let verdict = validate(Some(&candidate), &config).await;
        assert!(!verdict.is_valid());
        assert!(verdict.errors().iter().any(|e| e.contains("too large")));
    }
}

#[tokio::test]
async fn sniffing_ignores_metadata() {
    let body = encode(64, 64, image::ImageFormat::Jpeg);
    let candidate = CandidateImage::new(body, "image/png", "avatar.gif");
    let verdict = validate(Some(&candidate), &ValidationConfig::default()).await;
    assert_eq!(verdict.metadata().sniffed_format, Some(SniffedFormat::Jpeg));
    // Declared type is trusted for acceptance.
    assert!(verdict.is_valid());
    assert!(
        verdict
            .warnings()
            .contains(&"content looks like image/jpeg but was declared as image/png".to_string())
    );
}

#[tokio::test]
async fn unknown_content_is_a_warning() {
    let candidate = CandidateImage::new(vec![0x42; 512], "image/webp", "noise.webp");
    let verdict = validate(Some(&candidate), &ValidationConfig::default()).await;
    assert!(verdict.is_valid(), "{:?}", verdict.errors());
    assert_eq!(verdict.metadata().sniffed_format, Some(SniffedFormat::Unknown));
    assert!(
        verdict
            .warnings()
            .iter()
            .any(|w| w.contains("could not determine image format"))
    );
}

#[tokio::test]
async fn missing_candidate() {
    let config = ValidationConfig::default();
    let verdict = validate(None, &config).await;
    assert_eq!(verdict.errors(), &["no image provided".to_string()]);
    assert_eq!(quick_validate(None, &config).errors(), verdict.errors());
}

#[tokio::test]
async fn policy_violations_accumulate() {
    let candidate = CandidateImage::new(vec![0u8; 10], "application/pdf", "notes.pdf");
    let verdict = validate(Some(&candidate), &ValidationConfig::default()).await;
    assert_eq!(verdict.errors().len(), 3, "{:?}", verdict.errors());
    assert!(verdict.errors()[0].contains("too small"));
    assert!(verdict.errors()[1].contains(".pdf"));
    assert!(verdict.errors()[2].contains("application/pdf"));
}

#[tokio::test]
async fn quick_validation_is_never_laxer() {
    let config = PolicySource::File("src/tests/validation/policy.yaml".into())
        .load()
        .await
        .unwrap();
    let candidates = [
        tiny_png(),
        jpeg(800, 600, "too-wide.jpg"),
        jpeg(64, 64, "small.jpg"),
        jpeg(64, 64, "small.JPEG"),
        jpeg(64, 64, "small.webp"),
        CandidateImage::new(encode(64, 64, image::ImageFormat::Jpeg), "image/gif", "x.jpg"),
        CandidateImage::new(vec![0u8; 4096], "image/png", "huge.png"),
        svg_with_script(),
    ];
    for candidate in &candidates {
        let quick = quick_validate(Some(candidate), &config);
        let full = validate(Some(candidate), &config).await;
        if !quick.is_valid() {
            assert!(!full.is_valid(), "{}", candidate.file_name);
        }
        for error in quick.errors() {
            assert!(full.errors().contains(error), "{}: {error}", candidate.file_name);
        }
    }
    // The policy file narrows what the default accepts.
    assert!(!quick_validate(Some(&svg_with_script()), &config).is_valid());
    assert!(!validate(Some(&jpeg(800, 600, "wide.jpg")), &config).await.is_valid());
}
