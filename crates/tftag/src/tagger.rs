//! apply tags to the resource blocks of terraform files
//!
//! For each root `resource "<type>" "<name>"` block:
//!
//! 1. ask the [Taxonomy] for the tag attribute (`tags`, `labels`) and whether the type is
//!    taggable at all
//! 2. scan the block for a `#tftag:<group>` directive and [resolve](Config::resolve) the tags
//! 3. [extract] the existing attribute value (or start from an empty one) and [merge] the tags
//!    into it
//!
//! The merged value is spliced back into the original text at the span hcl-edit reports for the
//! attribute, so every byte outside of it stays as it was. A file is only written when its
//! content changed.
use crate::config::Config;
use crate::directive;
use crate::extract::{self, ExtractError};
use crate::merge::{self, Layout};
use crate::report::{BlockReport, FileReport, Outcome};
use crate::taxonomy::{Providers, Taxonomy};
use crate::tf_files::{self, LoadError};
use crate::token::{self, LexError};
use hcl_edit::structure::{Block, Body};
use hcl_edit::Span;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const RESOURCE_BLOCK: &str = "resource";

pub struct Tagger<T = Providers> {
    config: Config,
    taxonomy: T,
}

impl Tagger<Providers> {
    pub fn new(config: Config) -> Self {
        Self::with_taxonomy(config, Providers)
    }
}

/// Result of tagging a source text
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged {
    pub output: String,
    pub blocks: Vec<BlockReport>,
}

/// Replace `range` of the source with `replacement`
#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    replacement: String,
}

impl<T: Taxonomy> Tagger<T> {
    pub fn with_taxonomy(config: Config, taxonomy: T) -> Self {
        Self { config, taxonomy }
    }

    /// Tag all `.tf` files of a directory, in file name order
    ///
    /// The first error aborts: files processed before it stay written.
    pub fn tag_directory(
        &self,
        dir_path: &Path,
        dry_run: bool,
    ) -> Result<Vec<FileReport>, TagError> {
        tf_files::discover(dir_path)?
            .iter()
            .map(|file_path| self.tag_file(file_path, dry_run))
            .collect()
    }

    pub fn tag_file(&self, file_path: &Path, dry_run: bool) -> Result<FileReport, TagError> {
        let _span = tracing::info_span!("file", path = %file_path.display()).entered();
        tracing::debug!("tagging file");

        let contents = std::fs::read_to_string(file_path).map_err(|source| TagError::Read {
            path: file_path.to_owned(),
            source,
        })?;

        let tagged = self
            .tag_source(&contents)
            .map_err(|source| TagError::Source {
                path: file_path.to_owned(),
                source,
            })?;

        let changed = tagged.output != contents;
        if changed && !dry_run {
            // writing through the existing path keeps its permissions
            std::fs::write(file_path, &tagged.output).map_err(|source| TagError::Write {
                path: file_path.to_owned(),
                source,
            })?;
            tracing::debug!("file written");
        } else if changed {
            tracing::info!("dry run, file not written");
        }

        let report = FileReport::new(file_path.to_owned(), changed, tagged.blocks);
        let resources: Vec<String> = report.blocks.iter().map(BlockReport::address).collect();
        tracing::debug!(tagged = report.tagged(), ?resources, "file done");

        Ok(report)
    }

    /// Tag every resource block of `src`
    pub fn tag_source(&self, src: &str) -> Result<Tagged, SourceError> {
        let body = hcl_edit::parser::parse_body(src).map_err(SourceError::Parse)?;
        let newline = if src.contains("\r\n") { "\r\n" } else { "\n" };

        let mut edits = vec![];
        let mut blocks = vec![];

        for block in body.blocks() {
            if block.ident.as_str() != RESOURCE_BLOCK {
                continue;
            }

            let [resource_type, name, ..] = block.labels.as_slice() else {
                tracing::debug!("skipping resource block with less than two labels");
                continue;
            };

            let (resource_type, name) = (resource_type.as_str(), name.as_str());
            let address = format!("{resource_type}.{name}");
            let outcome =
                self.tag_block(src, block, resource_type, &address, newline, &mut edits)?;
            blocks.push(BlockReport::new(resource_type.to_string(), name.to_string(), outcome));
        }

        let output = apply_edits(src, edits);
        if let Err(err) = hcl_edit::parser::parse_body(&output) {
            return Err(SourceError::Rewrite(err));
        }

        Ok(Tagged { output, blocks })
    }

    fn tag_block(
        &self,
        src: &str,
        block: &Block,
        resource_type: &str,
        address: &str,
        newline: &str,
        edits: &mut Vec<Edit>,
    ) -> Result<Outcome, SourceError> {
        let attribute_name = match self.taxonomy.attribute_name(resource_type) {
            Ok(attribute_name) => attribute_name,
            Err(err) => {
                tracing::warn!(resource = address, "{err}, skipping");
                return Ok(Outcome::UnknownProvider);
            }
        };

        if !self.taxonomy.is_taggable(resource_type) {
            tracing::warn!(resource = address, "resource isn't taggable");
            return Ok(Outcome::NotTaggable);
        }

        let block_range = span_of(block, address)?;
        let block_tokens = token::lex(&src[block_range.clone()]).map_err(|source| {
            SourceError::Lex {
                address: address.to_string(),
                source,
            }
        })?;

        let resolved = self.config.resolve(directive::scan(&block_tokens));
        if resolved.tags.is_empty() {
            tracing::debug!(resource = address, "no tags to apply");
            return Ok(Outcome::NoTags);
        }

        let edit = match block.body.get_attribute(attribute_name) {
            Some(attribute) => {
                let attribute_range = span_of(attribute, address)?;
                let tokens = token::lex(&src[attribute_range.clone()]).map_err(|source| {
                    SourceError::Lex {
                        address: address.to_string(),
                        source,
                    }
                })?;

                let span = match extract::extract(&tokens) {
                    Ok(span) => span,
                    Err(ExtractError::NotAMap) => {
                        tracing::warn!(
                            resource = address,
                            attribute = attribute_name,
                            "attribute is not an object literal, skipping"
                        );
                        return Ok(Outcome::NotAMap {
                            attribute: attribute_name.to_string(),
                        });
                    }
                    Err(source) => {
                        return Err(SourceError::Extract {
                            address: address.to_string(),
                            source,
                        })
                    }
                };

                let closing_indent = line_indent(src, attribute_range.start);
                let layout = Layout::detect(&span, closing_indent, newline);
                let merged = merge::merge(&span, &resolved.tags, &layout);

                // key and `=` before the value, trivia after its closing brace
                let (head, value) = tokens.split_at(2);
                let trailing = &value[span.len() + 1..];

                Edit {
                    replacement: [head, merged.as_slice(), trailing]
                        .map(token::render)
                        .concat(),
                    range: attribute_range,
                }
            }
            None => {
                let close = block_range
                    .end
                    .checked_sub(1)
                    .filter(|close| src.as_bytes()[*close] == b'}')
                    .ok_or_else(|| SourceError::Span(address.to_string()))?;

                let block_indent = line_indent(src, block_range.start);
                let indent = body_indent(src, &block.body, block_indent);
                let span = extract::empty_span(newline);
                let layout = Layout::detect(&span, &indent, newline);
                let merged = token::render(&merge::merge(&span, &resolved.tags, &layout));

                let insert_at = block_range.start + src[block_range.start..close].trim_end().len();

                // `{ cidr = "a" }` can only hold one attribute, break it up first
                let one_line_body = block
                    .body
                    .iter()
                    .find_map(|structure| structure.span())
                    .filter(|first| !starts_line(src, first.start));
                let (start, head) = match one_line_body {
                    Some(first) => {
                        let open = src[block_range.start..first.start]
                            .rfind('{')
                            .map(|idx| block_range.start + idx + 1)
                            .ok_or_else(|| SourceError::Span(address.to_string()))?;
                        let body = src[open..insert_at].trim();
                        (open, format!("{newline}{indent}{body}"))
                    }
                    None => (insert_at, String::new()),
                };

                Edit {
                    range: start..close,
                    replacement: format!(
                        "{head}{newline}{indent}{attribute_name} ={merged}{newline}{block_indent}"
                    ),
                }
            }
        };

        tracing::trace!(resource = address, replacement = %edit.replacement, "edit");
        edits.push(edit);

        let keys: Vec<String> = resolved.tags.keys().map(str::to_string).collect();
        tracing::info!(resource = address, attribute = attribute_name, ?keys, "tagged");

        Ok(Outcome::Tagged {
            attribute: attribute_name.to_string(),
            applied: resolved.source,
            keys,
        })
    }
}

fn span_of(spanned: &impl Span, address: &str) -> Result<Range<usize>, SourceError> {
    spanned
        .span()
        .ok_or_else(|| SourceError::Span(address.to_string()))
}

/// Non-overlapping edits, applied back to front so earlier ranges stay valid
fn apply_edits(src: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| std::cmp::Reverse(edit.range.start));

    let mut output = src.to_string();
    for edit in edits {
        output.replace_range(edit.range, &edit.replacement);
    }
    output
}

/// Leading whitespace of the line containing `offset`
fn line_indent(src: &str, offset: usize) -> &str {
    let line_start = src[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    let line = &src[line_start..];
    &line[..line.len() - line.trim_start_matches([' ', '\t']).len()]
}

fn starts_line(src: &str, offset: usize) -> bool {
    let line_start = src[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    src[line_start..offset].trim().is_empty()
}

/// Indentation of the block's structures, `block_indent` plus two spaces if there is none
fn body_indent(src: &str, body: &Body, block_indent: &str) -> String {
    body.iter()
        .filter_map(|structure| structure.span())
        .find(|range| starts_line(src, range.start))
        .map_or_else(
            || format!("{block_indent}  "),
            |range| line_indent(src, range.start).to_string(),
        )
}

/// Problems with a single source text
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("unable to parse terraform file")]
    Parse(#[source] hcl_edit::parser::Error),
    #[error("unable to locate `{0}` in source")]
    Span(String),
    #[error("unable to tokenize `{address}`")]
    Lex {
        address: String,
        #[source]
        source: LexError,
    },
    #[error("unable to extract tags of `{address}`")]
    Extract {
        address: String,
        #[source]
        source: ExtractError,
    },
    #[error("tagged output is not valid HCL")]
    Rewrite(#[source] hcl_edit::parser::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum TagError {
    #[error(transparent)]
    Discover(#[from] LoadError),
    #[error("unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to tag {}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: SourceError,
    },
    #[error("unable to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::TagSource;
    use crate::tag_config;
    use pretty_assertions::assert_eq;

    fn pine_apple() -> Tagger {
        Tagger::new(tag_config! { "all" => { "Pine" => "Apple" } })
    }

    fn tag(tagger: &Tagger, src: &str) -> String {
        tagger.tag_source(src).unwrap().output
    }

    #[test]
    fn add_tags_to_resource_without_tags() {
        let src = r#"
resource "aws_s3_bucket" "users" {
  bucket = "users-bucket"
}
"#;

        assert_eq!(
            tag(&pine_apple(), src),
            r#"
resource "aws_s3_bucket" "users" {
  bucket = "users-bucket"
  tags = {
    Pine = "Apple"
  }
}
"#
        );
    }

    #[test]
    fn add_tags_to_resource_with_tags() {
        let src = r#"
resource "aws_s3_bucket" "users" {
  bucket = "users-bucket"
  tags = {
    BusinessUnit = "Finance"
  }
}
"#;

        assert_eq!(
            tag(&pine_apple(), src),
            r#"
resource "aws_s3_bucket" "users" {
  bucket = "users-bucket"
  tags = {
    BusinessUnit = "Finance"
    Pine = "Apple"
  }
}
"#
        );
    }

    #[test]
    fn override_tags_on_resource_with_tags() {
        let src = r#"
resource "aws_s3_bucket" "users" {
  bucket = "users-bucket"
  tags = {
    Pine = "Tree"
    BusinessUnit = "Finance"
  }
}
"#;

        assert_eq!(
            tag(&pine_apple(), src),
            r#"
resource "aws_s3_bucket" "users" {
  bucket = "users-bucket"
  tags = {
    BusinessUnit = "Finance"
    Pine = "Apple"
  }
}
"#
        );
    }

    #[test]
    fn directive_selects_a_single_group() {
        let tagger = Tagger::new(tag_config! {
            "prod-only" => { "Tier" => "1" },
            "all" => { "Env" => "x" },
        });
        let src = r#"resource "aws_instance" "web" {
  #tftag:prod-only
  ami = "ami-123"
}
"#;

        let tagged = tagger.tag_source(src).unwrap();
        assert_eq!(
            tagged.output,
            r#"resource "aws_instance" "web" {
  #tftag:prod-only
  ami = "ami-123"
  tags = {
    Tier = "1"
  }
}
"#
        );
        assert_eq!(
            tagged.blocks[0].outcome,
            Outcome::Tagged {
                attribute: "tags".into(),
                applied: TagSource::Group("prod-only".into()),
                keys: vec!["Tier".into()],
            }
        );
    }

    #[test]
    fn google_resources_get_labels() {
        let src = "resource \"google_storage_bucket\" \"b\" {\n  name = \"b\"\n}\n";

        assert_eq!(
            tag(&pine_apple(), src),
            "resource \"google_storage_bucket\" \"b\" {\n  name = \"b\"\n  labels = {\n    Pine = \"Apple\"\n  }\n}\n"
        );
    }

    #[test]
    fn skipped_blocks_are_untouched() {
        let src = r#"resource "random_id" "suffix" {
  byte_length = 4
}

resource "aws_iam_role_policy_attachment" "attach" {
  role = "r"
}

resource "aws_sqs_queue" "q" {
  tags = var.tags
}

data "aws_s3_bucket" "existing" {
  bucket = "x"
}

resource "aws_vpc" {
}
"#;

        let tagged = pine_apple().tag_source(src).unwrap();
        assert_eq!(tagged.output, src);
        assert_eq!(
            tagged.blocks.iter().map(|b| b.outcome.clone()).collect::<Vec<_>>(),
            vec![
                Outcome::UnknownProvider,
                Outcome::NotTaggable,
                Outcome::NotAMap {
                    attribute: "tags".into()
                },
            ]
        );
    }

    #[test]
    fn no_configured_groups_leave_blocks_alone() {
        let src = "resource \"aws_vpc\" \"main\" {}\n";
        let tagged = Tagger::new(Config::default()).tag_source(src).unwrap();

        assert_eq!(tagged.output, src);
        assert_eq!(tagged.blocks[0].outcome, Outcome::NoTags);
    }

    #[test]
    fn one_line_and_nested_blocks() {
        let src = "resource \"aws_vpc\" \"main\" {}\n\nmodule \"m\" {\n  source = \"./m\"\n}\n\nresource \"aws_instance\" \"web\" {\n\tami = \"x\"\n\n\tebs_block_device {\n\t\tdevice_name = \"sdb\"\n\t}\n}\n";

        assert_eq!(
            tag(&pine_apple(), src),
            "resource \"aws_vpc\" \"main\" {\n  tags = {\n    Pine = \"Apple\"\n  }\n}\n\nmodule \"m\" {\n  source = \"./m\"\n}\n\nresource \"aws_instance\" \"web\" {\n\tami = \"x\"\n\n\tebs_block_device {\n\t\tdevice_name = \"sdb\"\n\t}\n\ttags = {\n\t  Pine = \"Apple\"\n\t}\n}\n"
        );
    }

    #[test]
    fn one_line_block_with_an_attribute_is_broken_up() {
        let src = "resource \"aws_vpc\" \"m\" { cidr = \"a\" }\n\n  resource \"aws_subnet\" \"s\" { vpc_id = aws_vpc.m.id }\n";

        assert_eq!(
            tag(&pine_apple(), src),
            "resource \"aws_vpc\" \"m\" {\n  cidr = \"a\"\n  tags = {\n    Pine = \"Apple\"\n  }\n}\n\n  resource \"aws_subnet\" \"s\" {\n    vpc_id = aws_vpc.m.id\n    tags = {\n      Pine = \"Apple\"\n    }\n  }\n"
        );
    }

    #[test]
    fn for_expressions_are_left_alone() {
        let src = "resource \"aws_vpc\" \"m\" {\n  tags = { for k, v in var.m : k => v }\n}\n";
        let tagged = pine_apple().tag_source(src).unwrap();

        assert_eq!(tagged.output, src);
        assert_eq!(
            tagged.blocks[0].outcome,
            Outcome::NotAMap {
                attribute: "tags".into()
            }
        );
    }

    #[test]
    fn crlf_files_stay_crlf() {
        let src = "resource \"aws_vpc\" \"main\" {\r\n  cidr_block = \"10.0.0.0/16\"\r\n}\r\n";

        assert_eq!(
            tag(&pine_apple(), src),
            "resource \"aws_vpc\" \"main\" {\r\n  cidr_block = \"10.0.0.0/16\"\r\n  tags = {\r\n    Pine = \"Apple\"\r\n  }\r\n}\r\n"
        );
    }

    #[test]
    fn tagging_is_idempotent() {
        let once = tag(
            &pine_apple(),
            "resource \"aws_vpc\" \"main\" {\n  tags = {\n    Name = \"main\" # keep\n  }\n}\n",
        );

        assert_eq!(tag(&pine_apple(), &once), once);
    }

    #[test]
    fn parse_errors_are_fatal() {
        let err = pine_apple().tag_source("resource \"aws_vpc\" {").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn indentation_helpers() {
        let src = "a {\n\t  b = 1\n}";
        assert_eq!(line_indent(src, 7), "\t  ");
        assert_eq!(line_indent(src, 0), "");
        assert!(starts_line(src, 6));
        assert!(!starts_line(src, 8));
    }
}
