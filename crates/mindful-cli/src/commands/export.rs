use std::path::Path;

use mindful_core::export::{render_entries_export, suggested_export_file_name};
use mindful_core::util::unix_millis_now;

use crate::cli::ExportFormat;
use crate::commands::common::{open_journal, AppContext};
use crate::error::CliError;

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    context: &AppContext,
) -> Result<(), CliError> {
    let session = open_journal(context).await?;
    let entries = session.service.entries();
    let format = format.into();
    let rendered = render_entries_export(&entries, format)?;

    if let Some(path) = output_path {
        let path = if path.is_dir() {
            path.join(suggested_export_file_name(format, unix_millis_now()))
        } else {
            path.to_path_buf()
        };
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
