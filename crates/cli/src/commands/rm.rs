// `donelist rm`: delete a todo.

use anyhow::Context;
use clap::Args;
use donelist_common::{error::MutationError, types::TodoId};
use serde_json::json;

use crate::client;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Id of the todo, as printed by `donelist ls`.
    pub id: String,

    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RmArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id: TodoId = args.id.parse().map_err(|_| MutationError::NotFoundOrForbidden)?;
    let controller = client::connect().await?;
    controller
        .delete(id)?
        .await
        .map_err(client::task_failed)?
        .context("delete was rejected")?;
    output::print_output(format, &json!({ "deleted": id }), |_| format!("Deleted {id}"))?;
    Ok(())
}
