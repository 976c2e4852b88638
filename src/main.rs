use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use courier::config::{Settings, config_path};
use courier::http::builder::{normalize_url, resolve_url};
use courier::http::executor::ExecutionRecorder;
use courier::storage::history::{history_path, load_history, save_history};
use courier::storage::workspace::{list_workspaces, load_tree, save_tree, tree_path};
use courier::{
    BodyEncoding, ExecutionResult, HttpMethod, Item, ItemId, ItemTree, KeyValueEntry, Outcome,
    PathSegment, ReqwestTransport, RequestDocument, logging,
};

#[derive(Debug, Parser)]
#[command(name = "courier", version, about = "Compose, organise and send HTTP requests")]
struct Cli {
    /// Workspace to operate on (defaults to the one in config.toml)
    #[arg(short, long, global = true)]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the folder/request tree
    Tree,
    /// List workspaces
    Workspaces,
    /// Add a folder
    AddFolder {
        #[arg(long)]
        parent: Option<ItemId>,
    },
    /// Add a request
    AddRequest {
        #[arg(long)]
        parent: Option<ItemId>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, default_value = "GET")]
        method: HttpMethod,
        /// Path segment appended to the URL (repeatable)
        #[arg(long = "segment")]
        segments: Vec<String>,
        /// Query parameter as KEY=VALUE (repeatable)
        #[arg(long = "query")]
        queries: Vec<String>,
        /// Header as NAME:VALUE (repeatable)
        #[arg(long = "header")]
        headers: Vec<String>,
        /// Request body text, enables the body
        #[arg(long)]
        body: Option<String>,
        #[arg(long, default_value = "UTF-8")]
        encoding: BodyEncoding,
    },
    Rename {
        id: ItemId,
        name: String,
    },
    /// Move items into a folder, or to the top level without --to
    Mv {
        #[arg(required = true)]
        ids: Vec<ItemId>,
        #[arg(long)]
        to: Option<ItemId>,
    },
    /// Reorder the children of a folder (or the top level)
    Reorder {
        #[arg(long)]
        parent: Option<ItemId>,
        #[arg(required = true)]
        ids: Vec<ItemId>,
    },
    Rm {
        id: ItemId,
    },
    Dup {
        id: ItemId,
    },
    /// Print the resolved URL of a request
    Url {
        id: ItemId,
    },
    /// Send a request, print the result and add it to the history
    Send {
        id: ItemId,
        #[arg(long)]
        json: bool,
    },
    /// Show recorded results, newest first
    History {
        /// Only results of this request
        id: Option<ItemId>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&config_path())?;
    logging::init_tracing(&settings.log_filter)?;

    let workspace = cli.workspace.clone().unwrap_or_else(|| settings.workspace.clone());
    let path = tree_path(&workspace);
    let mut tree = load_tree(&path).with_context(|| format!("failed to load {}", path.display()))?;

    if run(cli.command, &mut tree, &settings, &workspace).await? {
        save_tree(&path, &tree)?;
    }
    Ok(())
}

/// Execute one command. Returns whether the tree changed and needs saving.
async fn run(
    command: Command,
    tree: &mut ItemTree,
    settings: &Settings,
    workspace: &str,
) -> anyhow::Result<bool> {
    match command {
        Command::Tree => {
            print_tree(tree, None, 0);
            Ok(false)
        }
        Command::Workspaces => {
            for name in list_workspaces()? {
                println!("{name}");
            }
            Ok(false)
        }
        Command::AddFolder { parent } => {
            let folder = tree.create_folder(parent)?;
            println!("{}  {}", folder.id, folder.name);
            Ok(true)
        }
        Command::AddRequest {
            parent,
            name,
            url,
            method,
            segments,
            queries,
            headers,
            body,
            encoding,
        } => {
            let mut doc = RequestDocument::new(name.unwrap_or_default()).with_method(method);
            if let Some(url) = url {
                doc.set_base_url(normalize_url(&url));
            }
            doc.edit_path_segments(|list| {
                for segment in segments {
                    list.push(PathSegment::new(segment));
                }
            });
            for raw in queries {
                let (key, value) = raw.split_once('=').unwrap_or((raw.as_str(), ""));
                doc.edit_query_params(|list| list.push(KeyValueEntry::new(key, value)));
            }
            for raw in headers {
                let Some((key, value)) = raw.split_once(':') else {
                    bail!("header `{raw}` is not NAME:VALUE");
                };
                doc.edit_headers(|list| list.push(KeyValueEntry::new(key.trim(), value.trim())));
            }
            doc.set_body_encoding(encoding);
            if let Some(body) = body {
                doc.set_body_text(&body)?;
                doc.set_body_enabled(true);
            }
            let file = tree.create_file(parent, Some(doc))?;
            println!("{}  {}", file.id(), file.name());
            Ok(true)
        }
        Command::Rename { id, name } => {
            tree.rename(id, name)?;
            Ok(true)
        }
        Command::Mv { ids, to } => {
            let moved = tree.move_items(ids, to)?;
            println!("moved {moved} item(s)");
            Ok(true)
        }
        Command::Reorder { parent, ids } => {
            tree.reorder_siblings(parent, &ids)?;
            Ok(true)
        }
        Command::Rm { id } => {
            let removed = tree.delete(id)?;
            println!("removed {} item(s)", removed.len());
            Ok(true)
        }
        Command::Dup { id } => {
            let copy = tree.duplicate(id)?;
            println!("{}  {}", copy.id(), copy.name());
            Ok(true)
        }
        Command::Url { id } => {
            let doc = find_request(tree, id)?;
            println!("{}", resolve_url(doc)?);
            Ok(false)
        }
        Command::Send { id, json } => {
            let snapshot = find_request(tree, id)?.clone();
            let transport = ReqwestTransport::with_timeout(settings.timeout())?;
            let recorder = Arc::new(ExecutionRecorder::new(transport, settings.header_policy));

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let path = history_path(workspace);
            let mut history = load_history(&path, settings.history_capacity)
                .with_context(|| format!("failed to load {}", path.display()))?;
            let result = recorder.execute_with_cancel(&snapshot, &cancel).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&ResultReport::from(&result))?);
            } else {
                print_result(&result);
            }
            history.record(snapshot.id(), result);
            save_history(&path, &history)?;
            Ok(false)
        }
        Command::History { id } => {
            let path = history_path(workspace);
            let history = load_history(&path, settings.history_capacity)
                .with_context(|| format!("failed to load {}", path.display()))?;
            for entry in history.iter().filter(|e| id.is_none_or(|id| e.request_id == id)) {
                let name = tree.get(entry.request_id).map_or("(deleted)", Item::name);
                let summary = match entry.result.outcome() {
                    Outcome::Success { response, .. } => {
                        format!("{} {}", response.status, response.status_text())
                    }
                    Outcome::Failure { message } => format!("error: {message}"),
                };
                println!(
                    "{}  {name}  {summary}  ({} ms)",
                    entry.result.start_time().to_rfc3339(),
                    entry.result.elapsed().num_milliseconds()
                );
            }
            Ok(false)
        }
    }
}

fn find_request(tree: &ItemTree, id: ItemId) -> anyhow::Result<&RequestDocument> {
    match tree.get(id) {
        Some(Item::File(file)) => Ok(&file.request),
        Some(Item::Folder(_)) => bail!("{id} is a folder, not a request"),
        None => bail!("no item with id {id}"),
    }
}

fn print_tree(tree: &ItemTree, parent: Option<ItemId>, depth: usize) {
    for item in tree.children(parent) {
        let indent = "  ".repeat(depth);
        match item {
            Item::Folder(folder) => {
                println!("{indent}{}/  [{}]", folder.name, folder.id);
                print_tree(tree, Some(folder.id), depth + 1);
            }
            Item::File(file) => {
                println!(
                    "{indent}{:<7} {}  [{}]",
                    file.request.method().as_str(),
                    file.name(),
                    file.id()
                );
            }
        }
    }
}

fn print_result(result: &ExecutionResult) {
    let elapsed = result.elapsed().num_milliseconds();
    match result.outcome() {
        Outcome::Success { body, response } => {
            println!("{} {}  ({elapsed} ms, {} bytes)", response.status, response.status_text(), body.len());
            for (name, value) in &response.headers {
                println!("{name}: {value}");
            }
            println!();
            println!("{}", display_body(result).unwrap_or_default());
        }
        Outcome::Failure { message } => println!("error: {message}  ({elapsed} ms)"),
    }
}

/// Response body as text in the response charset (UTF-8 if none), or a note
/// saying why it could not be decoded.
fn display_body(result: &ExecutionResult) -> Option<String> {
    let Outcome::Success { body, .. } = result.outcome() else {
        return None;
    };
    result.body_text(BodyEncoding::Utf8).map(|decoded| {
        decoded.unwrap_or_else(|err| format!("<{} bytes, {err}>", body.len()))
    })
}

#[derive(Serialize)]
struct ResultReport<'a> {
    started_at: String,
    elapsed_ms: i64,
    status: Option<u16>,
    headers: Option<&'a [(String, String)]>,
    body: Option<String>,
    error: Option<&'a str>,
}

impl<'a> From<&'a ExecutionResult> for ResultReport<'a> {
    fn from(result: &'a ExecutionResult) -> Self {
        let (status, headers, body, error) = match result.outcome() {
            Outcome::Success { response, .. } => (
                Some(response.status),
                Some(response.headers.as_slice()),
                display_body(result),
                None,
            ),
            Outcome::Failure { message } => (None, None, None, Some(message.as_str())),
        };
        Self {
            started_at: result.start_time().to_rfc3339(),
            elapsed_ms: result.elapsed().num_milliseconds(),
            status,
            headers,
            body,
            error,
        }
    }
}
