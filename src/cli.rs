use anyhow::{bail, Context, Result};

use crate::cancel::{run_cancellable, CancelToken};
use crate::model::{WorkItem, WorkItemState};
use crate::repository::WorkItemRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List {
        filter: Option<String>,
        include_closed: bool,
    },
    Show {
        id: String,
    },
    States {
        id: String,
    },
    SetState {
        id: String,
        state: String,
        revision: Option<u32>,
    },
    Start {
        id: String,
    },
    Close {
        id: String,
    },
    Ping,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub json: bool,
}

fn take_id(args: &[String], usage: &str) -> Result<String> {
    match args.first() {
        Some(raw) => {
            let id = WorkItemRepository::extract_id(raw);
            if id.is_empty() {
                bail!("Work item id cannot be empty\n\nUsage: {usage}");
            }
            Ok(id.to_string())
        }
        None => bail!("Missing work item id\n\nUsage: {usage}"),
    }
}

/// Parse command-line arguments (without the program name).
///
/// Supported forms:
///   azwork list [filter words...] [--closed]
///   azwork show <id>
///   azwork set-state <id> <state words...> [--rev <n>]
///   azwork <command> ... --json
pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let json = args.iter().any(|a| a == "--json");
    let args: Vec<String> = args.iter().filter(|a| *a != "--json").cloned().collect();

    let Some((name, rest)) = args.split_first() else {
        return Ok(Invocation {
            command: Command::Help,
            json,
        });
    };

    let command = match name.as_str() {
        "list" | "ls" => {
            let include_closed = rest.iter().any(|a| a == "--closed" || a == "-a");
            let words: Vec<&str> = rest
                .iter()
                .filter(|a| *a != "--closed" && *a != "-a")
                .map(String::as_str)
                .collect();
            let filter = if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            };
            Command::List {
                filter,
                include_closed,
            }
        }
        "show" => Command::Show {
            id: take_id(rest, "azwork show <id>")?,
        },
        "states" => Command::States {
            id: take_id(rest, "azwork states <id>")?,
        },
        "set-state" => {
            let usage = "azwork set-state <id> <state> [--rev <n>]";
            let id = take_id(rest, usage)?;
            let mut state_parts: Vec<String> = Vec::new();
            let mut revision = None;
            let mut i = 1;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--rev" | "-r" => {
                        i += 1;
                        let value = rest.get(i).context("Missing value for --rev flag")?;
                        revision = Some(
                            value
                                .parse::<u32>()
                                .with_context(|| format!("Invalid revision '{value}'"))?,
                        );
                    }
                    other => state_parts.push(other.to_string()),
                }
                i += 1;
            }
            let state = state_parts.join(" ");
            if state.is_empty() {
                bail!("Missing target state\n\nUsage: {usage}");
            }
            Command::SetState {
                id,
                state,
                revision,
            }
        }
        "start" => Command::Start {
            id: take_id(rest, "azwork start <id>")?,
        },
        "close" => Command::Close {
            id: take_id(rest, "azwork close <id>")?,
        },
        "ping" => Command::Ping,
        "help" | "--help" | "-h" => Command::Help,
        other => bail!("Unknown command '{other}'. Run `azwork help` for usage."),
    };

    Ok(Invocation { command, json })
}

pub fn print_help() {
    println!("azwork: Azure DevOps work items from the terminal\n");
    println!("USAGE:");
    println!("  azwork list [filter] [--closed]          List work items assigned to you");
    println!("  azwork show <id>                         Show one work item");
    println!("  azwork states <id>                       List the states a work item can move to");
    println!("  azwork set-state <id> <state> [--rev n]  Change state (guarded by revision if given)");
    println!("  azwork start <id>                        Move to the preferred open state");
    println!("  azwork close <id>                        Move to the preferred close state");
    println!("  azwork ping                              Check the connection");
    println!();
    println!("OPTIONS:");
    println!("  --json  Print results as JSON");
    println!();
    println!("CONFIG:");
    println!("  ~/.azwork/config.toml (team, project, access_token, ...)");
    println!("  AZWORK_TEAM, AZWORK_PROJECT, AZWORK_TOKEN override the file");
}

fn format_item_line(item: &WorkItem) -> String {
    let state = item
        .state
        .as_ref()
        .map(|s| s.label.as_str())
        .unwrap_or("-");
    format!("{:>7}  {:<12} {:<10} {}", item.id, state, item.kind, item.summary)
}

fn print_item(item: &WorkItem) {
    println!("{}: {}", item.id, item.summary);
    println!("  type:     {}", item.kind);
    if let Some(state) = &item.state {
        println!("  state:    {state}");
    }
    println!("  revision: {}", item.revision);
    if let Some(created) = item.created {
        println!("  created:  {}", created.to_rfc3339());
    }
    if let Some(updated) = item.updated {
        println!("  updated:  {}", updated.to_rfc3339());
    }
    if let Some(url) = &item.issue_url {
        println!("  {url}");
    }
    if let Some(desc) = &item.description {
        let preview: String = desc.chars().take(500).collect();
        println!();
        println!("{preview}");
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn apply_state(repo: &WorkItemRepository, id: &str, state: &WorkItemState) -> Result<()> {
    if repo.set_task_state(id, state).await? {
        println!("{id} → {state}");
        Ok(())
    } else {
        bail!("Work item {id} not found")
    }
}

async fn execute(repo: &WorkItemRepository, invocation: Invocation) -> Result<()> {
    let json = invocation.json;
    match invocation.command {
        Command::Help => print_help(),
        Command::Ping => {
            repo.connection_test()?.run().await?;
            println!("Connected to {}", repo.url());
        }
        Command::List {
            filter,
            include_closed,
        } => {
            let items = repo.get_issues(filter.as_deref(), include_closed).await?;
            if json {
                print_json(&items)?;
            } else if items.is_empty() {
                println!("No work items found");
            } else {
                for item in &items {
                    println!("{}", format_item_line(item));
                }
            }
        }
        Command::Show { id } => {
            let item = repo
                .find_task(&id)
                .await?
                .with_context(|| format!("Work item {id} not found"))?;
            if json {
                print_json(&item)?;
            } else {
                print_item(&item);
            }
        }
        Command::States { id } => {
            let states = repo.available_states(&id).await?;
            if json {
                print_json(&states)?;
            } else {
                for state in &states {
                    let marker = if state.is_closed() { " (closed)" } else { "" };
                    println!("{state}{marker}");
                }
            }
        }
        Command::SetState {
            id,
            state,
            revision,
        } => {
            let target = WorkItemState::from_name(state);
            let applied = match revision {
                Some(rev) => repo.set_task_state_if_unchanged(&id, &target, rev).await?,
                None => repo.set_task_state(&id, &target).await?,
            };
            if !applied {
                bail!("Work item {id} was not updated: it does not exist or its revision has changed");
            }
            println!("{id} → {target}");
        }
        Command::Start { id } => {
            let state = repo
                .preferred_open_state()
                .cloned()
                .context("No preferred_open_state configured")?;
            apply_state(repo, &id, &state).await?;
        }
        Command::Close { id } => {
            let state = repo
                .preferred_close_state()
                .cloned()
                .context("No preferred_close_state configured")?;
            apply_state(repo, &id, &state).await?;
        }
    }
    Ok(())
}

/// Runs one command, aborting it cleanly if `token` fires.
pub async fn run(
    repo: &WorkItemRepository,
    invocation: Invocation,
    token: &CancelToken,
) -> Result<()> {
    if invocation.command != Command::Help && !repo.is_configured() {
        bail!(
            "The repository is not fully configured. Set team, project and access_token in ~/.azwork/config.toml"
        );
    }
    run_cancellable(execute(repo, invocation), token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    fn command(strs: &[&str]) -> Command {
        parse_args(&args(strs)).unwrap().command
    }

    #[test]
    fn no_args_shows_help() {
        assert_eq!(command(&[]), Command::Help);
    }

    #[test]
    fn list_without_filter() {
        assert_eq!(
            command(&["list"]),
            Command::List {
                filter: None,
                include_closed: false
            }
        );
    }

    #[test]
    fn list_joins_filter_words_and_reads_closed_flag() {
        assert_eq!(
            command(&["list", "login", "--closed", "bug"]),
            Command::List {
                filter: Some("login bug".into()),
                include_closed: true
            }
        );
    }

    #[test]
    fn json_flag_is_global() {
        let invocation = parse_args(&args(&["show", "--json", "42"])).unwrap();
        assert!(invocation.json);
        assert_eq!(invocation.command, Command::Show { id: "42".into() });
    }

    #[test]
    fn task_names_are_reduced_to_ids() {
        assert_eq!(
            command(&["show", "123: Fix the login bug"]),
            Command::Show { id: "123".into() }
        );
    }

    #[test]
    fn set_state_with_multi_word_state_and_revision() {
        assert_eq!(
            command(&["set-state", "7", "In", "Progress", "--rev", "5"]),
            Command::SetState {
                id: "7".into(),
                state: "In Progress".into(),
                revision: Some(5)
            }
        );
    }

    #[test]
    fn set_state_without_revision() {
        assert_eq!(
            command(&["set-state", "7", "Closed"]),
            Command::SetState {
                id: "7".into(),
                state: "Closed".into(),
                revision: None
            }
        );
    }

    #[test]
    fn set_state_requires_a_state() {
        let err = parse_args(&args(&["set-state", "7"])).unwrap_err();
        assert!(err.to_string().contains("Missing target state"));
    }

    #[test]
    fn set_state_rejects_bad_revision() {
        let err = parse_args(&args(&["set-state", "7", "New", "--rev", "x"])).unwrap_err();
        assert!(err.to_string().contains("Invalid revision"));

        let err = parse_args(&args(&["set-state", "7", "New", "--rev"])).unwrap_err();
        assert!(err.to_string().contains("Missing value"));
    }

    #[test]
    fn missing_id_fails() {
        let err = parse_args(&args(&["show"])).unwrap_err();
        assert!(err.to_string().contains("Missing work item id"));
    }

    #[test]
    fn unknown_command_fails() {
        let err = parse_args(&args(&["frobnicate"])).unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }

    #[test]
    fn start_close_and_ping() {
        assert_eq!(command(&["start", "9"]), Command::Start { id: "9".into() });
        assert_eq!(command(&["close", "9"]), Command::Close { id: "9".into() });
        assert_eq!(command(&["ping"]), Command::Ping);
    }

    #[tokio::test]
    async fn unconfigured_repository_is_rejected_before_running() {
        use crate::repository::RepositoryConfig;

        let repo = WorkItemRepository::new(RepositoryConfig::default());
        let invocation = parse_args(&args(&["list"])).unwrap();
        let err = run(&repo, invocation, &CancelToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("not fully configured"));
    }
}
