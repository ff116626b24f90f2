//! Line-oriented interactive shell over the sheet store client and the
//! local table view.

use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::client::SheetStoreClient;
use crate::error::ViewerError;
use crate::filter::FilterRow;
use crate::view::TableView;

const PROMPT: &str = "sheets> ";

const HELP: &str = "\
Commands:
  datasets                      list uploaded datasets, newest first
  upload <path>                 upload a spreadsheet file
  load <id>                     fetch a dataset's rows into the table
  delete <id>                   delete a dataset and its file
  show                          print the table
  columns                       list the table's columns
  filter add <column> [query]   add a filter row (quote columns with spaces)
  filter remove <n>             remove filter row n
  filter list                   list filter rows
  filter apply                  show rows matching every filter
  filter clear                  drop all filters and show every row
  help                          show this text
  quit | exit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Datasets,
    Upload(PathBuf),
    Load(i64),
    Delete(i64),
    Show,
    Columns,
    FilterAdd { column: String, query: String },
    FilterRemove(usize),
    FilterList,
    FilterApply,
    FilterClear,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>, ViewerError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = split_word(line);
        let command = match word {
            "help" | "?" => Command::Help,
            "datasets" | "ls" => Command::Datasets,
            "upload" => {
                if rest.is_empty() {
                    return Err(ViewerError::command("Usage: upload <path>"));
                }
                Command::Upload(PathBuf::from(rest))
            }
            "load" => Command::Load(parse_dataset_id(rest)?),
            "delete" | "rm" => Command::Delete(parse_dataset_id(rest)?),
            "show" => Command::Show,
            "columns" => Command::Columns,
            "filter" => parse_filter(rest)?,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(ViewerError::command(format!(
                    "Unknown command '{}'. Type 'help' for a list of commands.",
                    other
                )))
            }
        };

        Ok(Some(command))
    }
}

fn parse_filter(args: &str) -> Result<Command, ViewerError> {
    let (action, rest) = split_word(args);
    match action {
        "add" => {
            let (column, query) = split_column(rest)?;
            Ok(Command::FilterAdd { column, query })
        }
        "remove" | "rm" => {
            let index = rest
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ViewerError::command("Usage: filter remove <n>"))?;
            Ok(Command::FilterRemove(index))
        }
        "list" | "" => Ok(Command::FilterList),
        "apply" => Ok(Command::FilterApply),
        "clear" => Ok(Command::FilterClear),
        other => Err(ViewerError::command(format!(
            "Unknown filter action '{}'",
            other
        ))),
    }
}

fn parse_dataset_id(raw: &str) -> Result<i64, ViewerError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ViewerError::command(format!("Invalid dataset id '{}'", raw)))
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

/// Column name is the first word, or a double-quoted string.
fn split_column(input: &str) -> Result<(String, String), ViewerError> {
    if let Some(quoted) = input.strip_prefix('"') {
        let (column, rest) = quoted
            .split_once('"')
            .ok_or_else(|| ViewerError::command("Unterminated quoted column name"))?;
        return Ok((column.to_string(), rest.trim().to_string()));
    }

    let (column, query) = split_word(input);
    if column.is_empty() {
        return Err(ViewerError::command("Usage: filter add <column> [query]"));
    }
    Ok((column.to_string(), query.to_string()))
}

/// Shell session state: the loaded view plus the pending filter rows.
pub struct Shell {
    client: SheetStoreClient,
    view: TableView,
    filters: Vec<FilterRow>,
    loaded_dataset: Option<i64>,
}

impl Shell {
    pub fn new(client: SheetStoreClient) -> Self {
        Self {
            client,
            view: TableView::new(),
            filters: Vec::new(),
            loaded_dataset: None,
        }
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn filters(&self) -> &[FilterRow] {
        &self.filters
    }

    pub fn loaded_dataset(&self) -> Option<i64> {
        self.loaded_dataset
    }

    /// Read commands from `input` until EOF or `quit`, writing results to
    /// `output`. Command failures are printed and the loop continues.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<(), ViewerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\n").await?;
                break;
            };

            let command = match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    output.write_all(format!("{}\n", e).as_bytes()).await?;
                    continue;
                }
            };

            let text = match self.execute(command).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Command failed: {}", e);
                    format!("Error: {}", e)
                }
            };
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }

        output.flush().await?;
        info!("Shell session ended");
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> Result<String, ViewerError> {
        debug!("Executing {:?}", command);

        match command {
            Command::Help => Ok(HELP.to_string()),
            Command::Datasets => self.list_datasets().await,
            Command::Upload(path) => self.upload(path).await,
            Command::Load(id) => self.load(id).await,
            Command::Delete(id) => self.delete(id).await,
            Command::Show => {
                self.require_loaded()?;
                Ok(self.view.render())
            }
            Command::Columns => {
                self.require_loaded()?;
                if self.view.columns().is_empty() {
                    return Ok("No columns".to_string());
                }
                Ok(self.view.columns().join("\n"))
            }
            Command::FilterAdd { column, query } => self.add_filter(column, query),
            Command::FilterRemove(index) => self.remove_filter(index),
            Command::FilterList => Ok(self.list_filters()),
            Command::FilterApply => Ok(self.apply_filters()),
            Command::FilterClear => {
                self.filters.clear();
                self.view.clear_filters();
                Ok(format!("Filters cleared. {}", self.view.render()))
            }
            Command::Quit => Ok(String::new()),
        }
    }

    async fn list_datasets(&self) -> Result<String, ViewerError> {
        let datasets = self.client.list_datasets().await?;

        let mut out = String::new();
        for dataset in &datasets {
            out.push_str(&format!(
                "{:>6}  {}  {}\n",
                dataset.id, dataset.uploaded_at, dataset.originalname
            ));
        }
        out.push_str(&format!("Found {} dataset(s).", datasets.len()));
        Ok(out)
    }

    async fn upload(&self, path: PathBuf) -> Result<String, ViewerError> {
        let summary = self.client.upload_file(&path).await?;
        Ok(format!(
            "Uploaded {} as dataset {} (sheet '{}'). Rows saved: {}",
            path.display(),
            summary.dataset_id,
            summary.sheet_name,
            summary.rows_saved
        ))
    }

    async fn load(&mut self, dataset_id: i64) -> Result<String, ViewerError> {
        let rows = self.client.fetch_rows(dataset_id).await?;

        self.view.load(rows);
        self.filters.clear();
        self.loaded_dataset = Some(dataset_id);

        info!(
            "Loaded dataset {} with {} rows",
            dataset_id,
            self.view.loaded_len()
        );
        Ok(format!(
            "Loaded dataset {}: {} column(s).\n{}",
            dataset_id,
            self.view.columns().len(),
            self.view.render()
        ))
    }

    async fn delete(&mut self, dataset_id: i64) -> Result<String, ViewerError> {
        let message = self.client.delete_dataset(dataset_id).await?;

        if self.loaded_dataset == Some(dataset_id) {
            self.view.reset();
            self.filters.clear();
            self.loaded_dataset = None;
            return Ok(format!("{} (view cleared)", message));
        }
        Ok(message)
    }

    fn add_filter(&mut self, column: String, query: String) -> Result<String, ViewerError> {
        self.require_loaded()?;
        // An empty dataset has nothing to filter on
        if !self.view.is_loaded() {
            return Err(ViewerError::command("Load data first"));
        }
        if !self.view.has_column(&column) {
            return Err(ViewerError::command(format!(
                "Unknown column '{}'. Available: {}",
                column,
                self.view.columns().join(", ")
            )));
        }

        self.filters.push(FilterRow::new(column, query));
        Ok(format!("Added filter #{}", self.filters.len()))
    }

    fn remove_filter(&mut self, index: usize) -> Result<String, ViewerError> {
        if index == 0 || index > self.filters.len() {
            return Err(ViewerError::command(format!("No filter #{}", index)));
        }
        let removed = self.filters.remove(index - 1);
        Ok(format!("Removed filter on '{}'", removed.column))
    }

    fn list_filters(&self) -> String {
        if self.filters.is_empty() {
            return "No filters added".to_string();
        }
        self.filters
            .iter()
            .enumerate()
            .map(|(idx, filter)| {
                format!("#{}  {} contains \"{}\"", idx + 1, filter.column, filter.query)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn apply_filters(&mut self) -> String {
        if self.filters.is_empty() {
            return "No filters added".to_string();
        }
        let matches = self.view.apply_filters(&self.filters);
        format!(
            "Applied {} filter(s). {} match(es).\n{}",
            self.filters.len(),
            matches,
            self.view.render()
        )
    }

    fn require_loaded(&self) -> Result<(), ViewerError> {
        match self.loaded_dataset {
            Some(_) => Ok(()),
            None => Err(ViewerError::command("Load data first")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    fn offline_shell() -> Shell {
        Shell::new(SheetStoreClient::new("http://127.0.0.1:9").unwrap())
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("help"), Command::Help);
        assert_eq!(parse("  datasets "), Command::Datasets);
        assert_eq!(parse("load 7"), Command::Load(7));
        assert_eq!(parse("delete 3"), Command::Delete(3));
        assert_eq!(parse("exit"), Command::Quit);
        assert_eq!(
            parse("upload ./data/people list.xlsx"),
            Command::Upload(PathBuf::from("./data/people list.xlsx"))
        );
        assert!(Command::parse("   ").unwrap().is_none());
    }

    #[test]
    fn parses_filter_commands() {
        assert_eq!(
            parse("filter add name an"),
            Command::FilterAdd {
                column: "name".to_string(),
                query: "an".to_string()
            }
        );
        assert_eq!(
            parse("filter add \"First Name\" mary ann"),
            Command::FilterAdd {
                column: "First Name".to_string(),
                query: "mary ann".to_string()
            }
        );
        assert_eq!(
            parse("filter add city"),
            Command::FilterAdd {
                column: "city".to_string(),
                query: String::new()
            }
        );
        assert_eq!(parse("filter remove 2"), Command::FilterRemove(2));
        assert_eq!(parse("filter"), Command::FilterList);
        assert_eq!(parse("filter apply"), Command::FilterApply);
        assert_eq!(parse("filter clear"), Command::FilterClear);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(Command::parse("load abc").is_err());
        assert!(Command::parse("load 0").is_err());
        assert!(Command::parse("upload").is_err());
        assert!(Command::parse("filter add").is_err());
        assert!(Command::parse("filter add \"open").is_err());
        assert!(Command::parse("filter remove 0").is_err());
        assert!(Command::parse("filter sort").is_err());
        assert!(Command::parse("select * from rows").is_err());
    }

    #[tokio::test]
    async fn filter_commands_require_loaded_data() {
        let mut shell = offline_shell();

        let err = shell
            .execute(Command::FilterAdd {
                column: "name".to_string(),
                query: "an".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Load data first");
        assert!(shell.filters().is_empty());

        let err = shell.execute(Command::Show).await.unwrap_err();
        assert_eq!(err.to_string(), "Load data first");
    }

    #[tokio::test]
    async fn filter_add_on_empty_dataset_asks_for_data() {
        let mut shell = offline_shell();
        shell.view.load(Vec::new());
        shell.loaded_dataset = Some(1);

        let err = shell
            .execute(Command::FilterAdd {
                column: "name".to_string(),
                query: "an".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Load data first");
        assert!(shell.filters().is_empty());
    }

    #[tokio::test]
    async fn applying_without_filters_is_reported() {
        let mut shell = offline_shell();

        let text = shell.execute(Command::FilterApply).await.unwrap();
        assert_eq!(text, "No filters added");
        assert_eq!(shell.execute(Command::FilterList).await.unwrap(), "No filters added");
    }
}
