use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        GraphError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        GraphError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        GraphError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(GraphError::disposed("x").to_string().contains("disposed:"));
}

#[test]
fn type_mismatch_names_both_sides() {
    let err = GraphError::TypeMismatch {
        input: "Image".to_string(),
        input_type: ValueType::Texture,
        output: "Value".to_string(),
        output_type: ValueType::Float,
    };
    let msg = err.to_string();
    assert!(msg.contains("Image"));
    assert!(msg.contains("Float"));
    assert!(err.is_structural());
    assert!(!GraphError::evaluation("cycle").is_structural());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = GraphError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
