use anyhow::Result;
use diagnostics_engine::{CheckerContext, JumpStatus};
use std::path::Path;
use tracing::warn;

pub async fn run(
    context: &CheckerContext,
    file: &Path,
    bug: usize,
    step: Option<usize>,
) -> Result<()> {
    context.reload().await?;
    context
        .diagnostics()
        .set_open_files([file.to_path_buf()])
        .await;

    let navigation = context.navigation();
    let jump = match step {
        Some(step) => navigation.jump_to_step(file, bug, step, false).await,
        None => navigation.jump_to_bug(file, bug, false).await,
    };
    if jump.status != JumpStatus::Found {
        warn!("Jump resolved with status {:?}", jump.status);
    }

    println!("{}", serde_json::to_string(&jump)?);
    Ok(())
}
