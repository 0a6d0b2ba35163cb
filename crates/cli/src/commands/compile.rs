use std::path::Path;
use std::process;

use crate::{report_error, OutputFormat};

/// Compile a policy file and print its by-name JSON AST.
pub(crate) fn cmd_compile(file: &Path, output: OutputFormat, quiet: bool) {
    match arbiter_core::compile_file(file) {
        Ok(rule_set) => {
            tracing::info!(
                file = %file.display(),
                attributes = rule_set.attributes.len(),
                rules = rule_set.rules.len(),
                "compiled policy"
            );
            let doc = arbiter_interchange::encode_resolved(&rule_set);
            let pretty = serde_json::to_string_pretty(&doc)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
