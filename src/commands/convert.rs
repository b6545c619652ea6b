//! The `convert` command: run the conversion pipeline over a file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, OutputFormat};
use ufconvert_core::convert::{convert_policy_set, ConvertOptions};
use ufconvert_core::error::Result;
use ufconvert_core::split::DEFAULT_MAX_POLICY_SIZE;

pub fn execute(
    cli: &Cli,
    file: &Path,
    remove_unreferenced_objects: bool,
    tokenize_tenant_id: bool,
    max_policy_size: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let xml = fs::read_to_string(file)?;

    let options = ConvertOptions {
        remove_unreferenced_objects,
        tokenize_tenant_id,
        max_policy_size: max_policy_size.unwrap_or(DEFAULT_MAX_POLICY_SIZE),
    };
    let converted = convert_policy_set(&xml, &options)?;

    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => converted_path(file),
    };
    fs::write(&out_path, converted)?;

    match cli.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "output": out_path.display().to_string() })
            );
        }
        OutputFormat::Human => {
            if !cli.quiet {
                println!("Converted policy set written to '{}'", out_path.display());
            }
        }
    }
    Ok(())
}

/// Default output path: the input with `.xml` swapped for `.converted.xml`
fn converted_path(file: &Path) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "policyset.xml".to_string());
    let converted = match name.to_ascii_lowercase().strip_suffix(".xml") {
        Some(_) => format!("{}.converted.xml", &name[..name.len() - ".xml".len()]),
        None => format!("{name}.converted.xml"),
    };
    file.with_file_name(converted)
}
