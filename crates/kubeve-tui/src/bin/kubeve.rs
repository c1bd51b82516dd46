use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kubeve_core::{config, Scope};
use kubeve_kube::{ClusterSource, KubectlClient, KubectlConfig};
use kubeve_tui::logging::{self, LogConfig, LogLevel};
use kubeve_tui::{runtime, App, RuntimeError, Session};

#[derive(Parser, Debug)]
#[command(name = "kubeve", version, about = "Live Kubernetes event viewer")]
struct Cli {
    /// Namespace to watch (defaults to the current context's namespace).
    #[arg(long, short = 'n', conflicts_with = "all_namespaces")]
    namespace: Option<String>,

    /// Watch events across every namespace.
    #[arg(long, short = 'A')]
    all_namespaces: bool,

    /// Kubeconfig context to use.
    #[arg(long)]
    context: Option<String>,

    /// Path to a kubeconfig file.
    #[arg(long)]
    kubeconfig: Option<String>,

    /// kubectl executable.
    #[arg(long, default_value = "kubectl")]
    kubectl: String,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Write logs to this file. Nothing is logged without one.
    #[arg(long, env = "KUBEVE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("kubeve: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RuntimeError> {
    logging::init(&LogConfig {
        level: cli.log_level,
        file: cli.log_file.clone(),
    })?;

    let config = config::load();
    let client = Arc::new(KubectlClient::new(KubectlConfig {
        program: cli.kubectl.clone(),
        context: cli.context.clone(),
        kubeconfig: cli.kubeconfig.clone(),
    }));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let (cluster, namespaces) = rt.block_on(async {
        let cluster = client.cluster_info().await?;
        let namespaces = match client.namespaces().await {
            Ok(namespaces) => namespaces,
            Err(err) => {
                tracing::warn!(error = %err, "namespace listing failed");
                Vec::new()
            }
        };
        Ok::<_, RuntimeError>((cluster, namespaces))
    })?;
    tracing::info!(
        context = %cluster.context,
        server = %cluster.server_version,
        "connected"
    );

    let scope = initial_scope(&cli, &cluster.default_namespace);
    let mut app = App::new(cluster, &config);
    app.set_namespaces(namespaces);

    let result = {
        let _guard = rt.enter();
        let mut session = Session::new(app, client.clone(), client, config);
        session.start(scope);
        runtime::run(&mut session)
    };
    rt.shutdown_background();
    result.map_err(RuntimeError::from)
}

fn initial_scope(cli: &Cli, default_namespace: &str) -> Scope {
    if cli.all_namespaces {
        return Scope::All;
    }
    match cli.namespace.as_deref() {
        Some(namespace) => Scope::from_namespace(namespace),
        None => Scope::from_namespace(default_namespace),
    }
}
