//! Tracing configuration for debugging attachment decisions.
//!
//! The pre-pass traces each claim it makes at `trace` level and each pass
//! logs a per-file summary at `debug`. `TRIVIA_LOG` selects what to see,
//! `TRIVIA_LOG_FORMAT` selects how: `text` (flat `tracing-subscriber`
//! lines, the default), `tree` (indented spans via `tracing-tree`) or
//! `json` (one object per event).
//!
//! Typical invocations while chasing a misplaced comment:
//!
//! ```bash
//! # Watch one scenario claim its comments, span by span
//! TRIVIA_LOG=trivia::pre_pass=trace TRIVIA_LOG_FORMAT=tree \
//!     cargo test license_header_survives
//!
//! # Pass summaries across the whole suite
//! TRIVIA_LOG=debug cargo test
//! ```
//!
//! The subscriber is only installed when `TRIVIA_LOG` (or `RUST_LOG`) is
//! set, so an unconfigured run pays nothing.

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

static INIT: OnceCell<()> = OnceCell::new();

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse from the `TRIVIA_LOG_FORMAT` environment variable.
    fn from_env() -> Self {
        match std::env::var("TRIVIA_LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Build an `EnvFilter` from `TRIVIA_LOG`, falling back to `RUST_LOG`.
///
/// `TRIVIA_LOG` takes precedence when both are set. Values use the same
/// syntax as `RUST_LOG` (e.g. `debug`, `trivia::pre_pass=trace`).
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("TRIVIA_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        // RUST_LOG is set (caller already checked).  Use it as-is.
        EnvFilter::from_default_env()
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `TRIVIA_LOG` nor `RUST_LOG` is set. Safe to
/// call more than once; only the first call installs a subscriber.
///
/// All output goes to stderr so it never interferes with emitted code on
/// stdout.
pub fn init_tracing() {
    INIT.get_or_init(|| {
        let has_trivia_log = std::env::var("TRIVIA_LOG").is_ok();
        let has_rust_log = std::env::var("RUST_LOG").is_ok();
        if !has_trivia_log && !has_rust_log {
            return;
        }

        let filter = build_filter();
        let format = LogFormat::from_env();

        match format {
            LogFormat::Tree => {
                let tree_layer = tracing_tree::HierarchicalLayer::default()
                    .with_indent_amount(2)
                    .with_indent_lines(true)
                    .with_deferred_spans(true)
                    .with_span_retrace(true)
                    .with_targets(true);

                Registry::default().with(filter).with(tree_layer).init();
            }
            LogFormat::Json => {
                let json_layer = fmt::layer().json().with_writer(std::io::stderr);

                Registry::default().with(filter).with(json_layer).init();
            }
            LogFormat::Text => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
    });
}
