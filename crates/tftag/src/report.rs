//! what happened to each block of each file
//!
//! Serializes to the structure printed by `tftag --output-format <json|yaml>`.
use crate::config::TagSource;
use std::path::PathBuf;

#[derive(derive_new::new, Debug, Clone, PartialEq, serde::Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// content differs from what was read (written unless it is a dry run)
    pub changed: bool,
    pub blocks: Vec<BlockReport>,
}

impl FileReport {
    pub fn tagged(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block.outcome, Outcome::Tagged { .. }))
            .count()
    }
}

#[derive(derive_new::new, Debug, Clone, PartialEq, serde::Serialize)]
pub struct BlockReport {
    pub resource_type: String,
    pub name: String,
    pub outcome: Outcome,
}

impl BlockReport {
    /// `type.name`, the way terraform addresses the resource
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Tagged {
        attribute: String,
        applied: TagSource,
        /// keys written, in output order
        keys: Vec<String>,
    },
    NotTaggable,
    UnknownProvider,
    /// attribute exists but is not an object literal
    NotAMap { attribute: String },
    /// resolved tag set is empty
    NoTags,
}

/// Summary over a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub files: usize,
    pub changed_files: usize,
    pub tagged_blocks: usize,
    pub skipped_blocks: usize,
}

impl<'a> FromIterator<&'a FileReport> for Totals {
    fn from_iter<T: IntoIterator<Item = &'a FileReport>>(iter: T) -> Self {
        iter.into_iter().fold(Totals::default(), |mut totals, file| {
            let tagged = file.tagged();
            totals.files += 1;
            totals.changed_files += usize::from(file.changed);
            totals.tagged_blocks += tagged;
            totals.skipped_blocks += file.blocks.len() - tagged;
            totals
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> FileReport {
        FileReport::new(
            "main.tf".into(),
            true,
            vec![
                BlockReport::new(
                    "aws_s3_bucket".into(),
                    "logs".into(),
                    Outcome::Tagged {
                        attribute: "tags".into(),
                        applied: TagSource::Group("audit".into()),
                        keys: vec!["Retention".into()],
                    },
                ),
                BlockReport::new("random_id".into(), "x".into(), Outcome::UnknownProvider),
            ],
        )
    }

    #[test]
    fn serialize_json() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "path": "main.tf",
                "changed": true,
                "blocks": [
                    {
                        "resource_type": "aws_s3_bucket",
                        "name": "logs",
                        "outcome": {
                            "outcome": "tagged",
                            "attribute": "tags",
                            "applied": { "group": "audit" },
                            "keys": ["Retention"]
                        }
                    },
                    {
                        "resource_type": "random_id",
                        "name": "x",
                        "outcome": { "outcome": "unknown_provider" }
                    }
                ]
            })
        );
    }

    #[test]
    fn totals() {
        let reports = [sample(), FileReport::new("empty.tf".into(), false, vec![])];

        assert_eq!(
            reports.iter().collect::<Totals>(),
            Totals {
                files: 2,
                changed_files: 1,
                tagged_blocks: 1,
                skipped_blocks: 1,
            }
        );
        assert_eq!(sample().blocks[0].address(), "aws_s3_bucket.logs");
    }
}
