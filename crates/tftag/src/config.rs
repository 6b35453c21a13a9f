//! tag configuration (`.tftag.hcl`)
//!
//! ```hcl
//! tftag "all" {
//!   tags = {
//!     Owner = "platform"
//!   }
//! }
//!
//! tftag "audit" {
//!   tags = {
//!     Retention = "7y"
//!   }
//! }
//! ```
//!
//! Groups keep their declaration order. It decides which value wins when all groups are merged
//! (see [Config::resolve]).
use crate::tags::Tags;
use hcl::eval::Evaluate;
use std::path::{Path, PathBuf};

/// A named set of tags
#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct TagGroup {
    pub name: String,
    pub tags: Tags,
}

/// All configured tag groups, in declaration order
#[derive(derive_new::new, Debug, Clone, Default, PartialEq)]
pub struct Config {
    groups: Vec<TagGroup>,
}

/// Where resolved tags came from
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    /// a single group selected by a filter directive
    Group(String),
    /// no directive or no matching group: every group, merged
    AllGroups,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub source: TagSource,
    pub tags: Tags,
}

impl Config {
    /// Conventional file name, looked up in the working directory
    pub const FILE_NAME: &'static str = ".tftag.hcl";

    /// Block identifier of a tag group
    pub const GROUP_BLOCK: &'static str = "tftag";

    pub fn groups(&self) -> &[TagGroup] {
        &self.groups
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path=%path.display(), "loading tag configuration");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        contents.parse()
    }

    /// Select the tags for a block
    ///
    /// A filter that equals a group name (both trimmed, case-sensitive) selects that group
    /// alone. Otherwise, and this includes blocks without a directive, **all** groups apply:
    /// their tags are merged in declaration order and later groups override earlier ones on
    /// key collisions. An empty directive (`#tftag:`) counts as no directive.
    pub fn resolve(&self, filter: Option<&str>) -> Resolved {
        if let Some(filter) = filter.map(str::trim).filter(|filter| !filter.is_empty()) {
            if let Some(group) = self.groups.iter().find(|group| group.name.trim() == filter) {
                return Resolved {
                    source: TagSource::Group(group.name.clone()),
                    tags: group.tags.clone(),
                };
            }

            tracing::debug!(filter, "no tag group matches filter, applying all groups");
        }

        let mut tags = Tags::new();
        for group in &self.groups {
            tags.extend(group.tags.iter());
        }

        Resolved {
            source: TagSource::AllGroups,
            tags,
        }
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = hcl::parse(s)?;
        let mut groups = vec![];

        for structure in body.iter() {
            let block = match structure {
                hcl::Structure::Attribute(attribute) => {
                    return Err(ConfigError::RootAttribute(attribute.key().to_string()))
                }
                hcl::Structure::Block(block) => block,
            };

            if block.identifier() != Self::GROUP_BLOCK {
                return Err(ConfigError::UnknownBlock(block.identifier().to_string()));
            }

            let name = match block.labels() {
                [] => return Err(ConfigError::LabelMissing),
                [label] => label.as_str().to_string(),
                [label, ..] => return Err(ConfigError::TooManyLabels(label.as_str().to_string())),
            };

            let tags = group_tags(&name, block.body())?;
            tracing::trace!(group = %name, count = tags.len(), "tag group loaded");
            groups.push(TagGroup::new(name, tags));
        }

        Ok(Config::new(groups))
    }
}

fn group_tags(group: &str, body: &hcl::Body) -> Result<Tags, ConfigError> {
    let mut tags_attribute = None;
    for attribute in body.attributes() {
        if attribute.key() == "tags" {
            tags_attribute = Some(attribute);
        } else {
            tracing::warn!(group, attribute = attribute.key(), "ignoring unknown attribute");
        }
    }

    let Some(attribute) = tags_attribute else {
        return Err(ConfigError::TagsMissing(group.to_string()));
    };

    let value = attribute
        .expr()
        .evaluate(&hcl::eval::Context::new())
        .map_err(|source| ConfigError::Evaluate {
            group: group.to_string(),
            source,
        })?;

    let hcl::Value::Object(object) = value else {
        return Err(ConfigError::TagsNotAnObject(group.to_string()));
    };

    object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                hcl::Value::String(string) => string,
                hcl::Value::Number(number) => number.to_string(),
                hcl::Value::Bool(bool) => bool.to_string(),
                _ => {
                    return Err(ConfigError::TagValueNotScalar {
                        group: group.to_string(),
                        key,
                    })
                }
            };
            Ok((key, value))
        })
        .collect()
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unable to read tag configuration {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse tag configuration")]
    Parse(#[from] hcl::Error),
    #[error("unexpected root attribute `{0}` in tag configuration")]
    RootAttribute(String),
    #[error("unexpected block `{0}` in tag configuration, expected `tftag`")]
    UnknownBlock(String),
    #[error("`tftag` block without a group name")]
    LabelMissing,
    #[error("`tftag` block `{0}` has more than one label")]
    TooManyLabels(String),
    #[error("tag group `{0}` has no `tags` attribute")]
    TagsMissing(String),
    #[error("unable to evaluate tags of group `{group}`")]
    Evaluate {
        group: String,
        #[source]
        source: hcl::eval::Error,
    },
    #[error("tags of group `{0}` must be an object")]
    TagsNotAnObject(String),
    #[error("tag `{key}` of group `{group}` must be a string, number or bool")]
    TagValueNotScalar { group: String, key: String },
}

/// Utility macro to create a [Config]
///
/// ```
/// # use tftag::tag_config;
/// let config = tag_config! {
///     "all" => { "Owner" => "platform", "Env" => "prod" },
///     "audit" => { "Retention" => "7y" },
/// };
///
/// assert_eq!(config.groups().len(), 2);
/// assert_eq!(config.groups()[0].tags.get("Env"), Some("prod"));
/// ```
#[macro_export]
macro_rules! tag_config {
    { $($name:expr => { $($key:expr => $value:expr),* $(,)? }),* $(,)? } => {
        $crate::config::Config::new(vec![
            $(
                $crate::config::TagGroup::new($name.to_string(), {
                    #[allow(unused_mut)]
                    let mut tags = $crate::tags::Tags::new();
                    $( tags.insert($key, $value); )*
                    tags
                }),
            )*
        ])
    };
}
