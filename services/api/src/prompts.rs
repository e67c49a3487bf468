//! Prompt Templates
//!
//! Prompts are kept as Markdown files so they can be edited without a
//! rebuild. Every `*.md` file in the prompts directory is loaded under its
//! file stem, e.g. `generate_sentences.md` becomes `"generate_sentences"`.

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};

/// Loads all Markdown prompt templates from a directory.
pub fn load_prompts(prompts_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content.trim().to_string());
        }
    }
    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_prompts_reads_markdown_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("generate_sentences.md"),
            "\nEach sentence must start with \"There is\" or \"There are\".\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = load_prompts(dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts["generate_sentences"],
            "Each sentence must start with \"There is\" or \"There are\"."
        );
    }

    #[test]
    fn test_load_prompts_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_prompts(&dir.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("Could not read prompts directory"));
    }

    #[test]
    fn test_repository_prompts_are_complete() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../prompts");
        let prompts = load_prompts(&path).unwrap();
        let instructions = &prompts[thereis_core::content::GENERATE_SENTENCES_PROMPT];
        assert!(instructions.contains("exactly 5 sentences"));
    }
}
