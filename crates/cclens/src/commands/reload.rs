use anyhow::Result;
use diagnostics_engine::CheckerContext;

/// Prints the events of one reload, including those of a failed one
pub async fn run(context: &CheckerContext) -> Result<()> {
    let mut receiver = context.events().subscribe();
    let result = context.reload().await;

    while let Ok(event) = receiver.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }

    result?;
    Ok(())
}
