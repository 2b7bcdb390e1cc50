use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::FinalReview;

/// `{company}_reviews.json` in the working directory.
pub fn output_filename(company: &str) -> PathBuf {
    PathBuf::from(format!("{}_reviews.json", company.trim()))
}

/// Writes the reviews as a pretty-printed JSON array.
pub fn write_reviews(path: &Path, reviews: &[FinalReview]) -> Result<()> {
    let json = serde_json::to_string_pretty(reviews).context("serializing reviews")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceId;

    #[test]
    fn filename_follows_company() {
        assert_eq!(output_filename("Acme"), PathBuf::from("Acme_reviews.json"));
    }

    #[test]
    fn writes_readable_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let reviews = vec![FinalReview {
            source: SourceId::TrustRadius,
            title: "Good".into(),
            description: "Works".into(),
            date: "March 3, 2023".into(),
            rating: None,
        }];
        write_reviews(&path, &reviews).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n"));
        let back: Vec<FinalReview> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reviews);
    }
}
