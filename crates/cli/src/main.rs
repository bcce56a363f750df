use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kdash_api::{InProcApi, ListApi, ListRequest};
use kdash_core::ResourceKind;
use kdash_dataselect::DataSelectQuery;
use kdash_kubehub::NamespaceQuery;
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "kdashctl", version, about = "kdash CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Namespace to list in; repeat for several (default: all)
    #[arg(long = "ns", global = true)]
    namespaces: Vec<String>,

    /// Per-request read timeout against the API server
    #[arg(long = "timeout-secs", env = "KDASH_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Serve Prometheus metrics on host:port
    #[arg(long = "metrics-addr", env = "KDASH_METRICS_ADDR", global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the kinds that can be listed
    Kinds,
    /// List one kind, filtered, sorted and paginated
    List {
        /// Kind or plural, e.g. "pod" or "priorityclasses"
        kind: String,
        #[command(flatten)]
        select: SelectArgs,
    },
}

/// Data-select flags, in the same encoding as the request parameters.
#[derive(clap::Args, Debug, Default)]
struct SelectArgs {
    /// `prop,value[,prop,value...]`
    #[arg(long = "filter-by")]
    filter_by: Option<String>,
    /// `a|d,prop[,a|d,prop...]`
    #[arg(long = "sort-by")]
    sort_by: Option<String>,
    #[arg(long = "items-per-page")]
    items_per_page: Option<String>,
    /// 1-indexed page
    #[arg(long = "page")]
    page: Option<String>,
    /// Numeric properties to aggregate, comma separated
    #[arg(long = "metric-names")]
    metric_names: Option<String>,
    /// sum, max, min or avg, comma separated (default: sum)
    #[arg(long = "aggregations")]
    aggregations: Option<String>,
}

impl SelectArgs {
    fn query(&self) -> Result<DataSelectQuery> {
        let params = [
            ("filterBy", &self.filter_by),
            ("sortBy", &self.sort_by),
            ("itemsPerPage", &self.items_per_page),
            ("page", &self.page),
            ("metricNames", &self.metric_names),
            ("aggregations", &self.aggregations),
        ];
        let present = params.iter().filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)));
        Ok(DataSelectQuery::from_params(present)?)
    }
}

fn init_tracing() {
    let env = std::env::var("KDASH_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics(addr: Option<&str>) {
    let Some(addr) = addr else { return };
    if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        match builder.with_http_listener(sock).install() {
            Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
            Err(e) => warn!(error = %e, "failed to install metrics exporter"),
        }
    } else {
        warn!(addr = %addr, "invalid KDASH_METRICS_ADDR; expected host:port");
    }
}

/// Kind-specific column for the human table.
fn detail(kind: ResourceKind, item: &Value) -> String {
    let field = |ptr: &str| match item.pointer(ptr) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    match kind {
        ResourceKind::ConfigMap => format!("{} keys", field("/dataKeys")),
        ResourceKind::Event => format!("{} {}: {}", field("/type"), field("/reason"), field("/message")),
        ResourceKind::Namespace => field("/phase"),
        ResourceKind::Pod => {
            let warnings = item.pointer("/warnings").and_then(Value::as_array).map_or(0, Vec::len);
            format!("{} restarts={} warnings={}", field("/status"), field("/restartCount"), warnings)
        }
        ResourceKind::PriorityClass => {
            let default = if item.pointer("/globalDefault") == Some(&Value::Bool(true)) { " (default)" } else { "" };
            format!("{}{}", field("/value"), default)
        }
        ResourceKind::ResourceQuota => {
            let used = item.pointer("/statusList").and_then(Value::as_object).map_or(0, |m| m.len());
            format!("{} resources", used)
        }
    }
}

fn kinds_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(&ResourceKind::ALL.map(ResourceKind::info))?)
}

fn print_human(kind: ResourceKind, envelope: &Value) {
    let items = envelope.get("items").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    if kind.namespaced() {
        println!("{:<20} {:<40} {}", "NAMESPACE", "NAME", "DETAIL");
    } else {
        println!("{:<40} {}", "NAME", "DETAIL");
    }
    for item in items {
        let name = item.pointer("/objectMeta/name").and_then(Value::as_str).unwrap_or("-");
        if kind.namespaced() {
            let ns = item.pointer("/objectMeta/namespace").and_then(Value::as_str).unwrap_or("-");
            println!("{:<20} {:<40} {}", ns, name, detail(kind, item));
        } else {
            println!("{:<40} {}", name, detail(kind, item));
        }
    }
    let total = envelope.pointer("/listMeta/totalItems").and_then(Value::as_u64).unwrap_or(0);
    println!("{} of {} shown", items.len(), total);
    for m in envelope.get("cumulativeMetrics").and_then(Value::as_array).into_iter().flatten() {
        println!("{} {}: {}", m["aggregation"].as_str().unwrap_or("?"), m["metricName"].as_str().unwrap_or("?"), m["value"]);
    }
    for e in envelope.get("errors").and_then(Value::as_array).into_iter().flatten() {
        eprintln!("warning: {}: {}", e["reason"].as_str().unwrap_or("?"), e["message"].as_str().unwrap_or(""));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    init_metrics(cli.metrics_addr.as_deref());

    match cli.command {
        Commands::Kinds => match cli.output {
            Output::Human => {
                for k in ResourceKind::ALL {
                    let scope = if k.namespaced() { "namespaced" } else { "cluster" };
                    println!("{} • {}", k.gvk_key(), scope);
                }
            }
            Output::Json => println!("{}", kinds_json()?),
        },
        Commands::List { kind, select } => {
            let kind: ResourceKind = kind.parse()?;
            let query = select.query().context("invalid data-select flags")?;
            let namespaces = NamespaceQuery::new(cli.namespaces.iter().map(String::as_str));
            info!(%kind, ns = ?namespaces, "list invoked");
            let t0 = Instant::now();
            let api = InProcApi::connect(cli.timeout_secs.map(Duration::from_secs)).await?;
            let envelope = match api.list(ListRequest::new(kind).namespaces(namespaces).query(query)).await {
                Ok(v) => v,
                Err(e) => {
                    error!(error = %e, status = e.status_code(), "list failed");
                    return Err(e.into());
                }
            };
            info!(took_ms = %t0.elapsed().as_millis(), "list done");
            match cli.output {
                Output::Human => print_human(kind, &envelope),
                Output::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_flags_build_the_query() {
        let args = SelectArgs {
            filter_by: Some("name,web".into()),
            sort_by: Some("d,creationTimestamp".into()),
            items_per_page: Some("10".into()),
            page: Some("2".into()),
            ..Default::default()
        };
        let q = args.query().unwrap();
        assert_eq!(q.filter_by.filter_by.len(), 1);
        assert_eq!(q.sort_by.sort_by.len(), 1);
        assert_eq!(q.pagination.items_per_page, Some(10));
        assert_eq!(q.pagination.page, Some(2));
    }

    #[test]
    fn malformed_flags_are_rejected() {
        let args = SelectArgs { sort_by: Some("sideways,name".into()), ..Default::default() };
        assert!(args.query().is_err());
        let args = SelectArgs { page: Some("two".into()), ..Default::default() };
        assert!(args.query().is_err());
    }

    #[test]
    fn no_flags_means_no_data_select() {
        assert_eq!(SelectArgs::default().query().unwrap(), DataSelectQuery::no_data_select());
    }

    #[test]
    fn detail_columns() {
        let pod = json!({ "status": "Running", "restartCount": 3, "warnings": [{}] });
        assert_eq!(detail(ResourceKind::Pod, &pod), "Running restarts=3 warnings=1");
        let pc = json!({ "value": 1000, "globalDefault": true });
        assert_eq!(detail(ResourceKind::PriorityClass, &pc), "1000 (default)");
    }

    #[test]
    fn kinds_json_carries_group_version_and_scope() {
        let v: Value = serde_json::from_str(&kinds_json().unwrap()).unwrap();
        let kinds = v.as_array().unwrap();
        assert_eq!(kinds.len(), ResourceKind::ALL.len());
        let pc = kinds.iter().find(|k| k["kind"] == "PriorityClass").unwrap();
        assert_eq!(pc["group"], "scheduling.k8s.io");
        assert_eq!(pc["version"], "v1");
        assert_eq!(pc["namespaced"], false);
    }

    #[test]
    fn cli_parses_repeated_namespaces() {
        let cli = Cli::try_parse_from(["kdashctl", "--ns", "a", "--ns", "b", "list", "pods", "--page", "1"]).unwrap();
        assert_eq!(cli.namespaces, vec!["a", "b"]);
        assert!(matches!(cli.command, Commands::List { .. }));
    }
}
