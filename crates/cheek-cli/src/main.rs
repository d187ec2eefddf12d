use std::sync::Arc;

use cheek_dashboard::{
    field::wait_settled, ApiClient, DashboardConfig, DashboardEvent, EventQueue, FetchStatus,
    FieldState, JobName, JobRun, JobSpec, JobStore, JobsListStore, LogsComponent,
    SelectedJobStore, TextSlot, TriggerAction, VersionBadge, DEFAULT_EVENT_QUEUE_SIZE,
};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing::debug;

#[derive(Parser)]
#[command(name = "cheek", version, about = "cheek dashboard client")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Load a job page, e.g. /jobs/nightly-build/latest
    Job {
        #[arg(long, default_value_t = default_url())]
        url: String,
        location: String,
        /// Print every spec/run update until both have settled
        #[arg(long)]
        follow: bool,
    },
    /// List configured jobs
    Jobs {
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
    /// Trigger a run of a job
    Trigger {
        #[arg(long, default_value_t = default_url())]
        url: String,
        job: String,
    },
    /// Print the scheduler's core log
    Logs {
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
    /// Print the backend version
    Version {
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
    /// Print the last status of every job
    Status {
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
    /// Check that the backend is up
    Health {
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
    /// Remember a job as the selected one
    Select {
        #[arg(long, default_value_t = default_url())]
        url: String,
        job: String,
    },
    /// Print the selected job
    Selected {
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
}

impl Cmd {
    fn name(&self) -> &'static str {
        match self {
            Cmd::Job { .. } => "job",
            Cmd::Jobs { .. } => "jobs",
            Cmd::Trigger { .. } => "trigger",
            Cmd::Logs { .. } => "logs",
            Cmd::Version { .. } => "version",
            Cmd::Status { .. } => "status",
            Cmd::Health { .. } => "health",
            Cmd::Select { .. } => "select",
            Cmd::Selected { .. } => "selected",
        }
    }
}

fn default_url() -> String {
    DashboardConfig::load().base_url_or_default().to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    cheek_util::init_tracing()?;
    let cli = Cli::parse();
    let cfg = DashboardConfig::load();
    cheek_util::init_client_telemetry(
        "cheek-cli",
        env!("CARGO_PKG_VERSION"),
        cfg.base_url_or_default(),
    );
    cheek_telemetry::event("cli.command", &[("command", cli.cmd.name())]);

    let (queue, _notify) = EventQueue::new(DEFAULT_EVENT_QUEUE_SIZE);
    let events = queue.sink();

    match cli.cmd {
        Cmd::Job {
            url,
            location,
            follow,
        } => {
            let api = connect(&cfg, &url)?;
            let store = JobStore::new(api, events);
            let handle = store.init(&location)?;
            DashboardConfig::update(|stored| stored.last_location = location)?;

            if follow {
                follow_job(&store).await;
            }
            handle.settled().await;
            print_job(&store);
        }

        Cmd::Jobs { url } => {
            let store = JobsListStore::new(connect(&cfg, &url)?, events);
            store.fetch_jobs().await;
            fail_on_error(&store.status())?;
            for (name, spec) in store.jobs_or_empty().iter() {
                let cron = spec.cron.as_deref().unwrap_or("-");
                let last = spec
                    .last_status()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{name}\tcron={cron}\tlast_status={last}");
            }
        }

        Cmd::Trigger { url, job } => {
            let job: JobName = job.parse()?;
            let action = TriggerAction::new(connect(&cfg, &url)?, events);
            let reply = action.trigger(job).await??;
            println!(
                "job={}\tstatus={}",
                reply.job.unwrap_or_default(),
                reply.status.unwrap_or_default()
            );
        }

        Cmd::Logs { url } => {
            let logs = LogsComponent::new(connect(&cfg, &url)?, events);
            logs.fetch_logs().await;
            fail_on_error(&logs.status())?;
            for entry in logs.logs().unwrap_or_default() {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.timestamp.unwrap_or_default(),
                    entry.level.unwrap_or_default(),
                    entry.job.unwrap_or_default(),
                    entry.message
                );
            }
        }

        Cmd::Version { url } => {
            let slot = Arc::new(TextSlot::default());
            let badge = VersionBadge::new(connect(&cfg, &url)?, events, Arc::clone(&slot));
            let info = badge.mount().await?;
            println!("{}", slot.text().unwrap_or_default());
            if !info.commit_sha.is_empty() {
                println!("commit={}", info.commit_sha);
            }
        }

        Cmd::Status { url } => {
            let status = connect(&cfg, &url)?.schedule_status().await?;
            for (job, code) in &status.status {
                println!("{job}\t{code}");
            }
            println!(
                "failed_run_count={}\thas_failed_runs={}",
                status.failed_run_count, status.has_failed_runs
            );
        }

        Cmd::Health { url } => {
            let reply = connect(&cfg, &url)?.health().await?;
            println!("status={}", reply.status.unwrap_or_default());
        }

        Cmd::Select { url: _, job } => {
            let job: JobName = job.parse()?;
            let selected = SelectedJobStore::new();
            selected.set(job.clone());
            DashboardConfig::update(|stored| stored.selected_job = job.to_string())?;
            println!("selected={job}");
        }

        Cmd::Selected { url } => {
            let selected = SelectedJobStore::new();
            if let Ok(job) = cfg.selected_job.parse() {
                selected.set(job);
            }
            match selected.get() {
                Some(job) => println!("selected={job}\turl={url}"),
                None => println!("selected=-\turl={url}"),
            }
        }
    }

    report_failures(&queue.drain());
    Ok(())
}

fn connect(cfg: &DashboardConfig, url: &str) -> Result<ApiClient, Box<dyn std::error::Error>> {
    let cfg = DashboardConfig {
        base_url: url.to_string(),
        ..cfg.clone()
    };
    let transport = cfg.transport()?;
    debug!("using backend {}", transport.base_url());
    Ok(ApiClient::from_transport(transport))
}

fn fail_on_error(status: &FetchStatus) -> Result<(), Box<dyn std::error::Error>> {
    match status.error() {
        Some(err) => Err(err.clone().into()),
        None => Ok(()),
    }
}

async fn follow_job(store: &JobStore) {
    let mut spec_rx = store.subscribe_spec();
    let mut updates = store.run_updates();
    while let Some(state) = updates.next().await {
        print_run_state(&state);
        if state.status.is_settled() {
            break;
        }
    }
    print_spec_state(&wait_settled(&mut spec_rx).await);
}

fn print_run_state(state: &FieldState<JobRun>) {
    match (&state.status, &state.value) {
        (FetchStatus::Ready, Some(run)) => println!("run: id={} status={:?}", run.id, run.status),
        (FetchStatus::Failed(err), _) => println!("run: failed ({err})"),
        (status, _) => println!("run: {status:?}"),
    }
}

fn print_spec_state(state: &FieldState<JobSpec>) {
    match (&state.status, &state.value) {
        (FetchStatus::Ready, Some(spec)) => println!("spec: {}", spec.name),
        (FetchStatus::Failed(err), _) => println!("spec: failed ({err})"),
        (status, _) => println!("spec: {status:?}"),
    }
}

fn print_job(store: &JobStore) {
    let snapshot = store.snapshot();
    let job = snapshot
        .job_name
        .as_ref()
        .map(|name| name.to_string())
        .unwrap_or_default();
    let run = snapshot
        .run_id
        .as_ref()
        .map(|run| run.to_string())
        .unwrap_or_default();
    println!("job={job}\trun={run}\tphase={:?}", snapshot.phase());

    if let Some(spec) = &snapshot.spec.value {
        println!("cron={}", spec.cron.as_deref().unwrap_or("-"));
        if !spec.command.is_empty() {
            println!("command={}", spec.command.join(" "));
        }
    }
    if let Some(run) = &snapshot.run.value {
        if let Ok(body) = serde_json::to_string_pretty(run) {
            println!("{body}");
        }
    }
}

fn report_failures(events: &[DashboardEvent]) {
    for event in events.iter().filter(|event| event.is_failure()) {
        eprintln!("{event:?}");
    }
}
