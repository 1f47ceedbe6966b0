// `donelist add`: create a todo.

use clap::Args;
use donelist_common::types::Todo;

use crate::client;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Title of the new todo.
    pub title: String,

    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: AddArgs, format: OutputFormat) -> anyhow::Result<()> {
    let controller = client::connect().await?;
    let pending = controller.create(&args.title)?;
    let todo = pending.task.await.map_err(client::task_failed)??;
    output::print_output(format, &todo, format_human)?;
    Ok(())
}

fn format_human(todo: &Todo) -> String {
    format!("Added {}  {}", todo.id, todo.title)
}
