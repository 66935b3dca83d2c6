use persuasion_core::domain::*;
use persuasion_core::CoreError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use validator::Validate;

fn headers() -> Vec<String> {
    [
        "Reziprozität",
        "Verpfl. & Konsistenz",
        "Sozl. Bewährtheit",
        "Sympathie",
        "Autorität",
        "Knappheit",
        "Kompromittierrate",
        "Methode",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// ===== AnalysisConfig Tests =====

#[test]
fn test_analysis_config_default() {
    let config = AnalysisConfig::default();

    assert_eq!(config.block_size, 30);
    assert_eq!(config.start_row, 0);
    assert_eq!(config.alpha, 0.05);
    assert_eq!(config.vif_threshold, 5.0);
    assert!(config.validate_labels);
    assert_eq!(config.scale, RatingScale { min: 0.0, max: 5.0 });
    assert!(config.validate().is_ok());
}

#[rstest]
#[case(AnalysisConfig::default().with_block_size(0))]
#[case(AnalysisConfig::default().with_alpha(0.0))]
#[case(AnalysisConfig::default().with_alpha(1.0))]
#[case(AnalysisConfig { vif_threshold: 0.5, ..AnalysisConfig::default() })]
#[case(AnalysisConfig { scale: RatingScale { min: 5.0, max: 0.0 }, ..AnalysisConfig::default() })]
fn test_analysis_config_invalid(#[case] config: AnalysisConfig) {
    let err = config.validated().unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn test_analysis_config_partial_json_uses_defaults() {
    let config: AnalysisConfig = serde_json::from_str(r#"{"block_size": 25}"#).unwrap();

    assert_eq!(config.block_size, 25);
    assert_eq!(config.alpha, 0.05);
    assert_eq!(config.schema, TableSchema::default());
}

// ===== Schema Tests =====

#[test]
fn test_default_schema_resolves_against_survey_header() {
    let resolved = TableSchema::default().resolve(&headers()).unwrap();

    assert_eq!(resolved.principle_indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(resolved.principle_names[4], "Autorität");
    assert_eq!(resolved.method_index, 7);
    assert_eq!(resolved.rate_index, 6);
}

#[test]
fn test_schema_missing_rate_column() {
    let mut headers = headers();
    headers[6] = "Rate".to_string();

    let err = TableSchema::default().resolve(&headers).unwrap_err();
    assert!(matches!(err, CoreError::Schema(_)));
}

#[test]
fn test_schema_rejects_overlapping_columns() {
    let schema = TableSchema {
        principles: vec![ColumnRef::Index(0), ColumnRef::Index(7)],
        ..TableSchema::default()
    };

    assert!(schema.resolve(&headers()).is_err());
}

#[test]
fn test_schema_rejects_duplicate_principles() {
    let schema = TableSchema {
        principles: vec![ColumnRef::Index(0), ColumnRef::from("Reziprozität")],
        ..TableSchema::default()
    };

    assert!(schema.resolve(&headers()).is_err());
}

#[test]
fn test_column_ref_deserializes_name_or_index() {
    let refs: Vec<ColumnRef> = serde_json::from_str(r#"[3, "Methode"]"#).unwrap();

    assert_eq!(refs, vec![ColumnRef::Index(3), ColumnRef::Name("Methode".to_string())]);
}
