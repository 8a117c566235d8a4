use anyhow::Result;
use diagnostics_engine::{AggregateData, CheckerContext, format_build_length};

pub async fn run(context: &CheckerContext) -> Result<()> {
    context.reload().await?;

    let data = context.aggregate().data();
    let AggregateData::Summary(summary) = data else {
        println!("No analyzer run found");
        return Ok(());
    };

    // We're printing to stdout, so we don't need to use tracing
    println!("Run: {}", summary.name);
    if !summary.analyzers.is_empty() {
        println!("Analyzers: {}", summary.analyzers.join(", "));
    }
    println!("Build length: {}", format_build_length(summary.build_length()));
    println!(
        "Actions: {} analyzed, {} skipped",
        summary.action_num, summary.skipped
    );
    println!("Bugs: {}", summary.bug_count());
    Ok(())
}
