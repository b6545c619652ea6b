//! The `check` command: inspect a policy set without converting it.

use std::fs;
use std::path::Path;

use crate::cli::{Cli, OutputFormat};
use ufconvert_core::convert::load_policy_set;
use ufconvert_core::error::Result;
use ufconvert_core::query;
use ufconvert_core::split::DEFAULT_MAX_POLICY_SIZE;

pub fn execute(cli: &Cli, file: &Path, max_policy_size: Option<usize>) -> Result<()> {
    let xml = fs::read_to_string(file)?;
    let doc = load_policy_set(&xml)?;
    let max_size = max_policy_size.unwrap_or(DEFAULT_MAX_POLICY_SIZE);

    let policies = query::policies(&doc);

    match cli.format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = policies
                .iter()
                .map(|&policy| {
                    let size = doc.node_size(policy);
                    serde_json::json!({
                        "policy_id": doc.attr(policy, "PolicyId"),
                        "tenant_id": doc.attr(policy, "TenantId"),
                        "size_bytes": size,
                        "over_budget": size >= max_size,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "policies": entries,
                    "max_policy_size": max_size,
                })
            );
        }
        OutputFormat::Human => {
            if !cli.quiet {
                println!("{} policies in this policy set", policies.len());
            }
            for &policy in &policies {
                let size = doc.node_size(policy);
                let flag = if size >= max_size { "  OVER BUDGET" } else { "" };
                println!(
                    "{}  tenant={}  {} bytes{}",
                    doc.attr(policy, "PolicyId").unwrap_or("(no id)"),
                    doc.attr(policy, "TenantId").unwrap_or("(no tenant)"),
                    size,
                    flag
                );
            }
        }
    }
    Ok(())
}
