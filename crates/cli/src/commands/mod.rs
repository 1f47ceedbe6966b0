// CLI subcommand dispatch.

use clap::Subcommand;

use crate::output::OutputFormat;

pub mod add;
pub mod ls;
pub mod rm;
pub mod toggle;

#[derive(Subcommand)]
pub enum Command {
    /// List your todos, newest first
    Ls(ls::LsArgs),
    /// Create a todo
    Add(add::AddArgs),
    /// Flip a todo between done and not done
    Toggle(toggle::ToggleArgs),
    /// Delete a todo (admins only)
    Rm(rm::RmArgs),
}

impl Command {
    pub fn output_format(&self) -> OutputFormat {
        let json = match self {
            Self::Ls(args) => args.json,
            Self::Add(args) => args.json,
            Self::Toggle(args) => args.json,
            Self::Rm(args) => args.json,
        };
        OutputFormat::detect(json)
    }
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    let format = cmd.output_format();
    match cmd {
        Command::Ls(args) => ls::run(args, format).await,
        Command::Add(args) => add::run(args, format).await,
        Command::Toggle(args) => toggle::run(args, format).await,
        Command::Rm(args) => rm::run(args, format).await,
    }
}

/// Human rendering of one row, shared by every command.
pub(crate) fn render_row(view: &donelist_client::TodoView) -> String {
    let mark = if view.completed { "x" } else { " " };
    let busy = if view.busy { " (syncing)" } else { "" };
    format!("[{mark}] {}  {}{busy}", view.key, view.title)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use donelist_client::{EntryKey, TodoView};
    use donelist_common::types::TodoId;

    use super::render_row;

    #[test]
    fn completed_rows_are_checked() {
        let id = TodoId::new_v4();
        let view = TodoView {
            key: EntryKey::Confirmed(id),
            title: "Buy milk".into(),
            completed: true,
            busy: false,
            created_at: Utc::now(),
        };
        assert_eq!(render_row(&view), format!("[x] {id}  Buy milk"));
    }
}
