// `donelist ls`: list the caller's todos.

use clap::Args;
use donelist_client::ListSnapshot;

use crate::client;
use crate::output::{self, OutputFormat};

use super::render_row;

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(_args: LsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let controller = client::connect().await?;
    let snapshot = controller.snapshot();
    output::print_output(format, &snapshot, format_human)?;
    Ok(())
}

fn format_human(snapshot: &ListSnapshot) -> String {
    if snapshot.items.is_empty() {
        return "No todos yet. Add one with: donelist add <title>".into();
    }
    let done = snapshot.items.iter().filter(|item| item.completed).count();
    let mut lines = vec![format!("{} todo(s), {done} done", snapshot.items.len())];
    lines.extend(snapshot.items.iter().map(|item| format!("  {}", render_row(item))));
    lines.join("\n")
}
