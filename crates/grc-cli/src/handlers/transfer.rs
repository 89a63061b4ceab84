use crate::cli::{ExportArgs, ImportArgs};
use crate::context::CliContext;
use crate::output;
use grc_domain::converters::{read_csv_data, ExportConverter, ExportQuery, ImportConverter, ImportJob};
use std::path::Path;

pub async fn handle_import(ctx: &mut CliContext, args: ImportArgs) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.csv)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", args.csv, e))?;
    let csv_data = read_csv_data(&content)?;

    let title = Path::new(&args.csv)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.csv.clone());
    let mut converter = ImportConverter::new(ImportJob::new(title, args.user), args.dry_run, csv_data, &ctx.config);
    converter.import_csv_data(&mut ctx.data);

    if !args.dry_run {
        ctx.save().await?;
    }
    output::output_success(serde_json::json!({
        "dry_run": args.dry_run,
        "blocks": converter.get_info(),
        "revisions": converter.revision_ids(),
    }));
    Ok(())
}

pub async fn handle_export(ctx: &CliContext, args: ExportArgs) -> anyhow::Result<()> {
    let queries: Vec<ExportQuery> = serde_json::from_str(&args.query)
        .map_err(|e| anyhow::anyhow!("Invalid export query: {}", e))?;
    let mut converter = ExportConverter::new(queries, args.exportable);
    let csv = converter.export_csv_data(&ctx.data)?;
    let blocks = converter.get_info();

    match args.output {
        Some(path) => {
            std::fs::write(&path, &csv).map_err(|e| anyhow::anyhow!("Failed to write file {}: {}", path, e))?;
            output::output_success(serde_json::json!({ "path": path, "blocks": blocks }));
        }
        None => output::output_success(serde_json::json!({ "csv": csv, "blocks": blocks })),
    }
    Ok(())
}
