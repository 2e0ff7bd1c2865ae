//! Configuration types for the conversion worker.
//!
//! All worker behaviour is controlled through [`WorkerConfig`], built via its
//! [`WorkerConfigBuilder`]. The config is read-only once built and is the only
//! state shared between records of a batch.

use crate::error::Md2HtmlError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default upper bound for a source object: 100 MiB.
pub const DEFAULT_MAX_OBJECT_SIZE: u64 = 104_857_600;

/// Configuration for the conversion worker.
///
/// Built via [`WorkerConfig::builder()`].
///
/// # Example
/// ```rust
/// use edgequake_md2html::{MarkdownFlavor, WorkerConfig};
///
/// let config = WorkerConfig::builder()
///     .target_bucket("rendered-docs")
///     .queue_url("https://sqs.eu-west-1.amazonaws.com/123456789012/conversion")
///     .flavor(MarkdownFlavor::Gfm)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_object_size, 104_857_600);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Bucket that receives the rendered `.html` objects. Required.
    pub target_bucket: String,

    /// URL of the queue that delivers the notifications. Used by the SQS
    /// adapter for acknowledgment and by the poller for receiving.
    pub queue_url: Option<String>,

    /// Source objects of this many bytes or more are rejected before download.
    /// Default: [`DEFAULT_MAX_OBJECT_SIZE`].
    pub max_object_size: u64,

    /// Markdown dialect. Default: [`MarkdownFlavor::CommonMark`].
    pub flavor: MarkdownFlavor,

    /// Shape of the produced HTML. Default: [`HtmlTemplate::Fragment`].
    pub template: HtmlTemplate,

    /// Parent directory for per-record working directories.
    /// If None, uses the system temp directory.
    pub scratch_root: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            target_bucket: String::new(),
            queue_url: None,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            flavor: MarkdownFlavor::default(),
            template: HtmlTemplate::default(),
            scratch_root: None,
        }
    }
}

impl WorkerConfig {
    /// Create a new builder for `WorkerConfig`.
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WorkerConfig`].
#[derive(Debug)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    pub fn target_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.target_bucket = bucket.into();
        self
    }

    pub fn queue_url(mut self, url: impl Into<String>) -> Self {
        self.config.queue_url = Some(url.into());
        self
    }

    pub fn max_object_size(mut self, bytes: u64) -> Self {
        self.config.max_object_size = bytes;
        self
    }

    pub fn flavor(mut self, flavor: MarkdownFlavor) -> Self {
        self.config.flavor = flavor;
        self
    }

    pub fn template(mut self, template: HtmlTemplate) -> Self {
        self.config.template = template;
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkerConfig, Md2HtmlError> {
        let c = &self.config;
        if c.target_bucket.trim().is_empty() {
            return Err(Md2HtmlError::invalid_config(
                "target bucket must not be empty",
            ));
        }
        if c.max_object_size == 0 {
            return Err(Md2HtmlError::invalid_config(
                "max object size must be ≥ 1 byte",
            ));
        }
        if let Some(ref url) = c.queue_url {
            if url.trim().is_empty() {
                return Err(Md2HtmlError::invalid_config(
                    "queue URL must not be empty when set",
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Markdown dialect handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownFlavor {
    /// Plain CommonMark, no extensions. (default)
    #[default]
    CommonMark,
    /// CommonMark plus GFM tables, strikethrough, task lists and footnotes.
    Gfm,
}

/// How the rendered HTML is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlTemplate {
    /// Renderer output as-is, e.g. `<h1>Hi</h1>\n`. (default)
    #[default]
    Fragment,
    /// Complete HTML5 document with charset and title.
    Standalone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = WorkerConfig::default();
        assert_eq!(c.max_object_size, 104_857_600);
        assert_eq!(c.flavor, MarkdownFlavor::CommonMark);
        assert_eq!(c.template, HtmlTemplate::Fragment);
        assert!(c.queue_url.is_none());
        assert!(c.scratch_root.is_none());
    }

    #[test]
    fn build_requires_target_bucket() {
        let err = WorkerConfig::builder().build().unwrap_err();
        assert!(matches!(err, Md2HtmlError::InvalidConfig { .. }));
        assert!(err.to_string().contains("target bucket"));
    }

    #[test]
    fn build_rejects_zero_limit() {
        let err = WorkerConfig::builder()
            .target_bucket("target")
            .max_object_size(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max object size"));
    }

    #[test]
    fn build_rejects_blank_queue_url() {
        assert!(WorkerConfig::builder()
            .target_bucket("target")
            .queue_url("  ")
            .build()
            .is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let c = WorkerConfig::builder()
            .target_bucket("target")
            .queue_url("https://queue")
            .max_object_size(1024)
            .flavor(MarkdownFlavor::Gfm)
            .template(HtmlTemplate::Standalone)
            .scratch_root("/var/tmp/md2html")
            .build()
            .expect("valid config");
        assert_eq!(c.target_bucket, "target");
        assert_eq!(c.queue_url.as_deref(), Some("https://queue"));
        assert_eq!(c.max_object_size, 1024);
        assert_eq!(c.flavor, MarkdownFlavor::Gfm);
        assert_eq!(c.template, HtmlTemplate::Standalone);
        assert_eq!(c.scratch_root, Some(PathBuf::from("/var/tmp/md2html")));
    }

    #[test]
    fn flavor_serde_names() {
        assert_eq!(
            serde_json::to_string(&MarkdownFlavor::Gfm).unwrap(),
            "\"gfm\""
        );
        let t: HtmlTemplate = serde_json::from_str("\"standalone\"").unwrap();
        assert_eq!(t, HtmlTemplate::Standalone);
    }
}
