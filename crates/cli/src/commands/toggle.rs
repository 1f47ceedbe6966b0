// `donelist toggle`: flip a todo's completion.

use anyhow::Context;
use clap::Args;
use donelist_client::{EntryKey, Resolution};
use donelist_common::{error::MutationError, types::TodoId};
use serde::Serialize;

use crate::client;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ToggleArgs {
    /// Id of the todo, as printed by `donelist ls`.
    pub id: String,

    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ToggleResult {
    id: TodoId,
    completed: bool,
    /// Another client changed the row first and its value was kept.
    overridden: bool,
}

pub async fn run(args: ToggleArgs, format: OutputFormat) -> anyhow::Result<()> {
    // Placeholder ids and typos are indistinguishable from rows we cannot see.
    let id: TodoId = args.id.parse().map_err(|_| MutationError::NotFoundOrForbidden)?;
    let controller = client::connect().await?;
    let task = controller.toggle(id)?;

    let result = match task.await.map_err(client::task_failed)? {
        Resolution::Confirmed { completed, overridden } => {
            ToggleResult { id, completed, overridden }
        }
        Resolution::Reverted { error, .. } => return Err(error).context("toggle was reverted"),
        Resolution::Stale => {
            let view = controller
                .snapshot()
                .items
                .into_iter()
                .find(|item| item.key == EntryKey::Confirmed(id))
                .ok_or(MutationError::NotFoundOrForbidden)?;
            ToggleResult { id, completed: view.completed, overridden: true }
        }
    };
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &ToggleResult) -> String {
    let state = if result.completed { "done" } else { "not done" };
    if result.overridden {
        format!("{} is {state} (changed elsewhere)", result.id)
    } else {
        format!("{} is {state}", result.id)
    }
}
