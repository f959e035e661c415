use expmat_core::errors::{ErrorInfo, ExpmatError};
use expmat_core::schema::{ConfigDoc, MatrixDecl};

#[test]
fn error_json_roundtrip() {
    let err = ExpmatError::Matrix(
        ErrorInfo::new("settings-conflict", "two overrides")
            .with_context("experiment", "bench")
            .with_hint("remove one override"),
    );
    let encoded = serde_json::to_string(&err).unwrap();
    let decoded: ExpmatError = serde_json::from_str(&encoded).unwrap();
    assert_eq!(err, decoded);
}

#[test]
fn matrix_decl_json_roundtrip() {
    let decl = MatrixDecl {
        experiments: Some(vec!["bench".into()]),
        variants: Some(vec!["big".into()]),
        repetitions: Some(4),
        include: Some(vec![MatrixDecl::default()]),
        ..MatrixDecl::default()
    };
    let encoded = serde_json::to_string(&decl).unwrap();
    let decoded: MatrixDecl = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decl, decoded);
}

#[test]
fn empty_doc_roundtrip_keeps_defaults() {
    let doc = ConfigDoc::default();
    let encoded = serde_json::to_string(&doc).unwrap();
    let decoded: ConfigDoc = serde_json::from_str(&encoded).unwrap();
    assert_eq!(doc, decoded);
}
