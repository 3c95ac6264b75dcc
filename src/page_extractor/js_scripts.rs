//! JavaScript evaluation scripts
//!
//! This module contains the JavaScript code evaluated inside a page context.

/// Serialize the loaded page into a `PageSnapshot`
pub const SNAPSHOT_SCRIPT: &str = r#"
    (() => {
        return {
            url: window.location.href,
            title: document.title || '',
            html: document.documentElement ? document.documentElement.outerHTML : ''
        };
    })()
"#;

/// Whether the document has finished loading
pub const READY_STATE_SCRIPT: &str = r#"
    (() => document.readyState === 'complete' && document.body !== null)()
"#;
