// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};
use crate::extractors::quote::QuoteDraft;
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
    overwrite: bool,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P, overwrite: bool) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path, overwrite })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Reads the plain-text rendering of a quote document.
    pub async fn load_document<P: AsRef<Path>>(path: P) -> Result<String, StorageError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        tracing::info!("Loaded {} bytes from {}", text.len(), path.display());
        Ok(text)
    }

    /// Saves the extracted draft as pretty-printed JSON
    pub fn save_draft(&self, draft: &QuoteDraft, stem: &str) -> Result<PathBuf, StorageError> {
        let file_path = self.target_path(&format!("{}_draft.json", stem))?;

        let json = serde_json::to_string_pretty(draft)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, json)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved draft to {}", file_path.display());

        Ok(file_path)
    }

    /// Saves metadata about the extraction run in JSON format
    pub fn save_draft_metadata(&self, draft: &QuoteDraft, stem: &str, source: &Path) -> Result<PathBuf, StorageError> {
        let file_path = self.target_path(&format!("{}_meta.json", stem))?;

        let metadata = serde_json::json!({
            "source": source.display().to_string(),
            "account_name": draft.customer.account_name,
            "service_count": draft.services.len(),
            "service_codes": draft.services.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(),
            "pricing_found": !draft.pricing.is_empty(),
            "equipment": draft.equipment_signature,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());

        Ok(file_path)
    }

    fn target_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(filename);
        if file_path.exists() && !self.overwrite {
            return Err(StorageError::FileExists(file_path.display().to_string()));
        }
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::quote::{ExtractorConfig, QuoteExtractor};

    fn sample_draft() -> QuoteDraft {
        let lines: Vec<String> = [
            "Routine Management Services",
            "General Pest Control Service Frequency - Monthly",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        QuoteExtractor::new(ExtractorConfig::default()).extract_lines(&lines)
    }

    #[test]
    fn test_save_draft_and_metadata() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = StorageManager::new(dir.path().join("out"), false).expect("storage");
        let draft = sample_draft();

        let draft_path = storage.save_draft(&draft, "quote").expect("draft saved");
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&draft_path).unwrap()).unwrap();
        assert_eq!(saved["services"][0]["code"], "GPC");
        assert!(saved["pricing"]["avg_monthly_cost"].is_null());

        let meta_path = storage
            .save_draft_metadata(&draft, "quote", Path::new("quote.txt"))
            .expect("metadata saved");
        let meta: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&meta_path).unwrap()).unwrap();
        assert_eq!(meta["service_count"], 1);
        assert_eq!(meta["pricing_found"], false);
    }

    #[test]
    fn test_existing_file_requires_overwrite() {
        let dir = tempfile::tempdir().expect("temp dir");
        let draft = sample_draft();

        let storage = StorageManager::new(dir.path(), false).expect("storage");
        storage.save_draft(&draft, "quote").expect("first save");
        assert!(matches!(storage.save_draft(&draft, "quote"), Err(StorageError::FileExists(_))));

        let storage = StorageManager::new(dir.path(), true).expect("storage");
        assert!(storage.save_draft(&draft, "quote").is_ok());
    }

    #[test]
    fn test_load_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("quote.txt");
        fs::write(&path, "Investment Summary\n").unwrap();

        let text = tokio_test::block_on(StorageManager::load_document(&path)).expect("document loads");
        assert_eq!(text, "Investment Summary\n");

        let missing = tokio_test::block_on(StorageManager::load_document(dir.path().join("missing.txt")));
        assert!(matches!(missing, Err(StorageError::IoError(_))));
    }
}
