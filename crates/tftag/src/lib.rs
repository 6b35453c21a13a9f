//! # tftag - tags for terraform resources
//!
//! Keep tags in one place (`.tftag.hcl`) and write them into every taggable resource of a
//! terraform directory, without touching anything else in the files.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tftag` works internally.
//!
//! ### HCL Terms
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! We only care about root blocks with the identifier `resource` and at least two labels: the
//! resource type and the resource name.
//!
//! ```hcl
//! resource "aws_s3_bucket" "logs" {
//!   #tftag:audit
//!   bucket = "logs"
//!
//!   tags = {
//!     Name = "logs"
//!   }
//! }
//! ```
//!
//! ### Configuration
//!
//! see [config::Config]
//!
//! Tags are declared in named groups. A resource picks a group with a directive comment
//! ([directive]). Without a directive, or if the directive names no known group, **every** group
//! applies: that is the normal case, not a fallback. Groups are merged in declaration order and
//! later groups win on key collisions ([config::Config::resolve]).
//!
//! ### Which attribute
//!
//! see [taxonomy]
//!
//! The resource type prefix tells us the provider and with it the attribute name (`tags` for
//! AWS and Azure, `labels` for Google). Each provider also has a list of resource types that
//! support tagging. Everything else is skipped with a warning.
//!
//! ### Editing without reformatting
//!
//! [hcl_edit] parses the file and tells us where the block and its tag attribute are (byte
//! spans). It does not give us tokens, so we [token::lex] the attribute's source range ourselves.
//!
//! | step | module | input | output |
//! |------|--------|-------|--------|
//! | extract | [extract] | `tags = { a = "1" }` | ` { a = "1"` (value without its closing brace) |
//! | remove | [merge::remove_superseded] | span, tags | span without pairs we are about to write |
//! | append | [merge::append_tags] | span, tags | span with one `key = "value"` line per tag |
//! | close | [merge::merge] | | the finished value, including `}` |
//!
//! Nesting is tracked by [delimiter]: only keys at depth 1 (direct keys of the object) can be
//! replaced. Anything that is not written by us keeps its exact bytes and position.
//!
//! The result is spliced back into the original text ([tagger::Tagger]) and parsed again
//! before anything is written.
//!
pub mod config;
pub mod delimiter;
pub mod directive;
pub mod extract;
pub mod merge;
pub mod report;
pub mod tags;
pub mod tagger;
pub mod taxonomy;
pub mod tf_files;
pub mod token;
