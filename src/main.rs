use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

use crudkit::config::Config;
use crudkit::crud::{CrudService, Dispatch, Operation, Record, Relation, SearchCriteria};
use crudkit::http::ReqwestTransport;
use crudkit::logging;
use crudkit::notify::TracingNotifier;

#[derive(Parser, Debug)]
#[command(name = "crudkit")]
#[command(about = "Typed CRUD client for REST APIs")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/crudkit/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Also write logs to stderr
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List records of a table
  List {
    table: String,
    /// Filter as key=value, repeatable
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
    /// Relation to expand (`comments.author` for nested), repeatable
    #[arg(short, long = "relation")]
    relations: Vec<String>,
    /// Wait for the debounce window before sending
    #[arg(long)]
    debounce: bool,
  },
  /// Show one record
  Show {
    table: String,
    id: String,
    #[arg(short, long = "relation")]
    relations: Vec<String>,
  },
  /// Show a relation sub-resource of a record
  Relation {
    table: String,
    id: String,
    name: String,
  },
  /// Show the index of a table
  Index { table: String },
  /// Create a record from a JSON object
  Create {
    table: String,
    #[arg(short, long)]
    data: String,
  },
  /// Update a record from a JSON object
  Update {
    table: String,
    id: String,
    #[arg(short, long)]
    data: String,
    #[arg(long, default_value = "id")]
    key_field: String,
  },
  /// Delete a record
  Delete {
    table: String,
    id: String,
    #[arg(long, default_value = "id")]
    key_field: String,
  },
  /// Link records by posting to a relation path (e.g. users 7 roles 3)
  Link { path: Vec<String> },
  /// Remove a record from a relation path (e.g. --table roles --id 3 users 7)
  Unlink {
    #[arg(long)]
    table: String,
    #[arg(long)]
    id: String,
    parents: Vec<String>,
  },
  /// Send a YAML or JSON list of operations as one bulk transaction
  Bulk {
    file: PathBuf,
    /// Message shown when the transaction succeeds
    #[arg(short, long)]
    message: Option<String>,
  },
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
  s.split_once('=')
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn parse_object(data: &str) -> Result<Value> {
  let value: Value =
    serde_json::from_str(data).map_err(|e| eyre!("--data is not valid JSON: {}", e))?;
  if !value.is_object() {
    return Err(eyre!("--data must be a JSON object"));
  }
  Ok(value)
}

fn print<T: Serialize>(dispatch: Dispatch<T>) -> Result<()> {
  match dispatch.immediate() {
    Some(value) => print_json(&value),
    None => Err(eyre!("Call was queued in a transaction")),
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = logging::init(args.verbose)?;

  let config = Config::load(args.config.as_deref())?;
  let transport = ReqwestTransport::new(config.timeout())?;
  let service = CrudService::new(config.crud_settings(), transport, TracingNotifier);
  debug!(
    api = service.settings().api_url(),
    cache_tables = service.settings().cache_tables().len(),
    "Client ready"
  );

  match args.command {
    Command::List {
      table,
      filters,
      relations,
      debounce,
    } => {
      let criteria = filters
        .into_iter()
        .fold(SearchCriteria::new(), |c, (k, v)| c.filter(k, v));
      let criteria = (!criteria.is_empty()).then_some(criteria);
      let relations: Vec<Relation> = relations.iter().map(|r| Relation::from(r.as_str())).collect();
      let relations = (!relations.is_empty()).then_some(relations.as_slice());

      let result = if debounce {
        service
          .get_debounced(&table, criteria.as_ref(), relations)
          .await?
      } else {
        service.get(&table, criteria.as_ref(), relations).await?
      };
      print(result)
    }
    Command::Show {
      table,
      id,
      relations,
    } => {
      let relations: Vec<Relation> = relations.iter().map(|r| Relation::from(r.as_str())).collect();
      let relations = (!relations.is_empty()).then_some(relations.as_slice());
      print(service.get_by_id(&table, &id, relations).await?)
    }
    Command::Relation { table, id, name } => print(service.get_relation(&table, &id, &name).await?),
    Command::Index { table } => print(service.index(&table).await?),
    Command::Create { table, data } => {
      let record = Record::new(&table, parse_object(&data)?);
      print(service.post(&record, None).await?)
    }
    Command::Update {
      table,
      id,
      data,
      key_field,
    } => {
      let mut data = parse_object(&data)?;
      data[&key_field] = Value::String(id);
      let record = Record::new(&table, data).with_key_field(key_field);
      print(service.put(&record, None).await?)
    }
    Command::Delete {
      table,
      id,
      key_field,
    } => {
      let mut data = serde_json::Map::new();
      data.insert(key_field.clone(), Value::String(id));
      let record = Record::new(&table, Value::Object(data)).with_key_field(key_field);
      print(service.delete(&record, None).await?)
    }
    Command::Link { path } => {
      let parents: Vec<&str> = path.iter().map(String::as_str).collect();
      print(service.create_relation(&parents).await?)
    }
    Command::Unlink { table, parents, id } => {
      let parents: Vec<&str> = parents.iter().map(String::as_str).collect();
      let record = Record::new(&table, serde_json::json!({ "id": id }));
      print(service.delete_relation(&record, &parents, None).await?)
    }
    Command::Bulk { file, message } => {
      let contents = std::fs::read_to_string(&file)
        .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
      let operations: Vec<Operation> = serde_yaml::from_str(&contents)
        .map_err(|e| eyre!("Failed to parse {}: {}", file.display(), e))?;

      info!(file = %file.display(), operations = operations.len(), "Running bulk file");
      service.begin_transaction();
      for operation in operations {
        service.add_operation(operation);
      }
      let results = service.end_transaction(message.as_deref()).await?;
      print_json(&results)
    }
  }
}
