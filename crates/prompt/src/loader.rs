//! Instruction template loading and validation.

use crate::types::{InstructionTemplate, ESCALATION_MARKER};
use safedrop_core::{AppError, AppResult};
use std::path::Path;

/// Load the instruction template from a file.
///
/// A missing, unreadable or blank template is a configuration error; the
/// pipeline must not start without one. A template that never mentions the
/// escalation marker is accepted with a warning, since escalation detection
/// depends on the model being told about it.
///
/// # Example
/// ```no_run
/// use safedrop_prompt::load_template;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let template = load_template(Path::new("prompts/policy_aware.txt"))?;
/// println!("{} chars", template.text().len());
/// # Ok(())
/// # }
/// ```
pub fn load_template(path: &Path) -> AppResult<InstructionTemplate> {
    tracing::debug!("Loading instruction template from: {:?}", path);

    if !path.is_file() {
        return Err(AppError::Config(format!(
            "Instruction template not found at {:?}",
            path
        )));
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to read instruction template {:?}: {}",
            path, e
        ))
    })?;

    let template = InstructionTemplate::new(text, Some(path.to_path_buf()));
    validate_template(&template)?;

    tracing::info!("Loaded instruction template {:?}", path);
    Ok(template)
}

/// Build a template from in-memory text, with the same validation as files.
pub fn template_from_text(text: impl Into<String>) -> AppResult<InstructionTemplate> {
    let template = InstructionTemplate::new(text.into(), None);
    validate_template(&template)?;
    Ok(template)
}

fn validate_template(template: &InstructionTemplate) -> AppResult<()> {
    if template.text().trim().is_empty() {
        return Err(AppError::Config(match template.source() {
            Some(path) => format!("Instruction template {:?} is empty", path),
            None => "Instruction template is empty".to_string(),
        }));
    }

    if !template.mentions_escalation_marker() {
        tracing::warn!(
            "Instruction template does not mention the '{}' marker; escalations will not be detected",
            ESCALATION_MARKER
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_template() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("policy_aware.txt");
        let text = "Answer only from the policy context.\nOtherwise reply with \"escalate: <reason>\".\n";
        fs::write(&path, text).unwrap();

        let template = load_template(&path).unwrap();
        assert_eq!(template.text(), text);
        assert_eq!(template.source(), Some(&path));
    }

    #[test]
    fn test_missing_template_is_config_error() {
        let temp = TempDir::new().unwrap();
        let err = load_template(&temp.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_blank_template_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.txt");
        fs::write(&path, "  \n\t\n").unwrap();

        let err = load_template(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_template_without_marker_still_loads() {
        let template = template_from_text("Be helpful.").unwrap();
        assert!(!template.mentions_escalation_marker());
    }
}
