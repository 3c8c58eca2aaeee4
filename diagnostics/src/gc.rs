//! Garbage-collector analysis diagnostic builders
//!
//! Helper constructors for the diagnostics emitted by the backend GC passes:
//! the escape rewriter's user error and the liveness analyzer's debug-level
//! warnings.

use crate::{Diagnostic, DiagnosticBuilder, SourceSpan};

/// Provides common GC-pass diagnostic builders
pub struct GcDiagnostics;

impl GcDiagnostics {
    /// A variable escaped to the heap inside a region where heap allocation
    /// is forbidden (the runtime package itself).
    pub fn heap_escape_forbidden(span: SourceSpan, var_name: &str) -> Diagnostic {
        DiagnosticBuilder::error(
            format!("{} escapes to heap, not allowed in runtime.", var_name),
            span,
        )
        .code("E0701")
        .label(span, "address of this variable escapes")
        .help("runtime code must not allocate; restructure to avoid taking the address")
        .build()
    }

    /// A variable is initialized on some but not all paths reaching a call;
    /// its slot will be zeroed at function entry.
    pub fn ambiguously_live(span: SourceSpan, fn_name: &str, var_name: &str) -> Diagnostic {
        DiagnosticBuilder::warning(
            format!("{}: {} is ambiguously live", fn_name, var_name),
            span,
        )
        .build()
    }

    /// Debug-level report of the variables live at a safe point.
    /// `site` reads like "entry to f:" or "call to g:".
    pub fn live_at(span: SourceSpan, site: &str, live: &[&str]) -> Diagnostic {
        let mut msg = format!("live at {}", site);
        for name in live {
            msg.push(' ');
            msg.push_str(name);
        }
        DiagnosticBuilder::warning(msg, span).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiagnosticSeverity, FileId, SourcePosition};

    fn span() -> SourceSpan {
        SourceSpan::single_position(SourcePosition::new(3, 9, 20), FileId::new(0))
    }

    #[test]
    fn test_heap_escape_forbidden() {
        let d = GcDiagnostics::heap_escape_forbidden(span(), "buf");
        assert_eq!(d.severity, DiagnosticSeverity::Error);
        assert_eq!(d.message, "buf escapes to heap, not allowed in runtime.");
    }

    #[test]
    fn test_live_at() {
        let d = GcDiagnostics::live_at(span(), "call to free:", &["p", "q"]);
        assert_eq!(d.severity, DiagnosticSeverity::Warning);
        assert_eq!(d.message, "live at call to free: p q");
    }
}
