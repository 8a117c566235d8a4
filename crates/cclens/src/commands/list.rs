use anyhow::Result;
use diagnostics_engine::{CheckerContext, SortKey};

pub async fn run(context: &CheckerContext, sort: SortKey) -> Result<()> {
    context.reload().await?;

    let data = context.aggregate().data();
    let Some(summary) = data.summary() else {
        println!("No analyzer run found");
        return Ok(());
    };

    println!("{} bugs grouped by {sort}", summary.bug_count());
    for (group, entries) in summary.group_by(sort) {
        println!("{group} ({})", entries.len());
        for (_, entry) in entries {
            println!(
                "  {}:{}:{} [{}] {}",
                entry.location.file.display(),
                entry.location.line,
                entry.location.col,
                entry.check_name.as_deref().unwrap_or(&entry.category),
                entry.description
            );
        }
    }
    Ok(())
}
