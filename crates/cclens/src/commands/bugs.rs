use anyhow::Result;
use diagnostics_engine::{CheckerContext, ReproductionPath};
use std::path::PathBuf;
use tracing::warn;

pub struct BugsArgs {
    pub files: Vec<PathBuf>,
    pub steps: bool,
    pub json: bool,
    pub expand: Option<usize>,
}

pub async fn run(context: &CheckerContext, args: BugsArgs) -> Result<()> {
    context.reload().await?;
    let diagnostics = context.diagnostics();
    diagnostics.set_open_files(args.files.iter().cloned()).await;

    if let (Some(index), Some(first)) = (args.expand, args.files.first()) {
        if !context.navigation().toggle_steps(first, index, Some(true)) {
            warn!("No diagnostic {index} in {}", first.display());
        }
    }

    if args.json {
        let rendered = context.renderer().render(&args.files);
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    let active = diagnostics.active_selection();
    for file in &args.files {
        let entries = diagnostics.diagnostics_for(file);
        println!("{} ({} bugs)", file.display(), entries.len());

        for (idx, entry) in entries.iter().enumerate() {
            let location = entry
                .file_of(&entry.location)
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            println!(
                "  [{idx}] {location}:{}:{} {}",
                entry.location.line, entry.location.col, entry.description
            );

            let expanded = active
                .as_ref()
                .is_some_and(|active| active.source_file == *file && active.diagnostic_index == idx);
            if !args.steps && !expanded {
                continue;
            }

            let path = ReproductionPath::new(entry);
            for (step, event) in path.events().iter().enumerate() {
                let step_file = entry
                    .file_of(&event.location)
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                println!(
                    "      {}. {step_file}:{}:{} {}",
                    step + 1,
                    event.location.line,
                    event.location.col,
                    event.message
                );
            }
        }
    }
    Ok(())
}
