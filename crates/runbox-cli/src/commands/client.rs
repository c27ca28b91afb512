//! Client subcommands: talk to a running job server over mTLS.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use runbox_server::proto;
use runbox_server::proto::jobs_client::JobsClient;
use runbox_server::tls::TlsMaterial;
use tonic::transport::{Channel, Endpoint};

/// Connection options shared by all client subcommands.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Server address as host:port.
    #[arg(long, default_value = "127.0.0.1:9898")]
    pub server: String,

    /// CA certificate used to verify the server certificate.
    #[arg(long, default_value = "ssl/ca.crt")]
    pub ca_cert: PathBuf,

    /// Client certificate; its subject CN is your identity.
    #[arg(long, default_value = "ssl/client.crt")]
    pub cert: PathBuf,

    /// Client private key.
    #[arg(long, default_value = "ssl/client.key")]
    pub key: PathBuf,

    /// Domain name the server certificate was issued for.
    #[arg(long, default_value = "runbox")]
    pub tls_domain: String,
}

async fn connect(args: &ConnectArgs) -> anyhow::Result<JobsClient<Channel>> {
    let tls = TlsMaterial::load(&args.ca_cert, &args.cert, &args.key).await?;
    let channel = Endpoint::from_shared(format!("https://{}", args.server))?
        .tls_config(tls.client_tls_config(&args.tls_domain))?
        .connect()
        .await?;
    Ok(JobsClient::new(channel))
}

fn status_label(status: i32) -> &'static str {
    match proto::JobStatus::try_from(status) {
        Ok(proto::JobStatus::Running) => "RUNNING",
        Ok(proto::JobStatus::Stopped) => "STOPPED",
        Ok(proto::JobStatus::Killed) => "KILLED",
        _ => "UNKNOWN",
    }
}

/// Arguments for `runbox start`.
#[derive(Args, Debug)]
pub struct StartArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// CPU limit as a percentage of one core, 1-100.
    #[arg(long, default_value_t = 100)]
    pub cpu: i32,

    /// Memory limit in kilobytes, 0 for unlimited.
    #[arg(long, default_value_t = 0)]
    pub memory: i64,

    /// Block I/O weight, 10-100.
    #[arg(long, default_value_t = 100)]
    pub io: i32,

    /// Command to run.
    pub command: String,

    /// Arguments for the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Starts a job and prints its id.
///
/// # Errors
///
/// Returns an error if the connection or the RPC fails.
pub async fn start(args: StartArgs) -> anyhow::Result<()> {
    let mut client = connect(&args.connect).await?;
    let response = client
        .start(proto::StartRequest {
            command: args.command,
            args: args.args,
            cpu_percent: args.cpu,
            memory_kb: args.memory,
            io_weight: args.io,
        })
        .await?
        .into_inner();
    println!("{}", response.job_id);
    Ok(())
}

/// Arguments for `runbox stop`.
#[derive(Args, Debug)]
pub struct StopArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Job to stop.
    pub job_id: String,

    /// Seconds to wait for the job to terminate.
    #[arg(long, default_value_t = 5)]
    pub timeout: u32,
}

/// Stops a job and exits with the job's exit code.
///
/// # Errors
///
/// Returns an error if the connection or the RPC fails.
pub async fn stop(args: StopArgs) -> anyhow::Result<()> {
    let mut client = connect(&args.connect).await?;
    let response = client
        .stop(proto::StopRequest {
            job_id: args.job_id,
            timeout_seconds: args.timeout,
        })
        .await?
        .into_inner();
    std::process::exit(response.exit_code);
}

/// Arguments for `runbox status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Job to inspect.
    pub job_id: String,
}

/// Prints a job's status and exit code.
///
/// # Errors
///
/// Returns an error if the connection or the RPC fails.
pub async fn status(args: StatusArgs) -> anyhow::Result<()> {
    let mut client = connect(&args.connect).await?;
    let response = client
        .status(proto::StatusRequest {
            job_id: args.job_id,
        })
        .await?
        .into_inner();
    println!(
        "{}\texit_code:{}",
        status_label(response.status),
        response.exit_code
    );
    Ok(())
}

/// Arguments for `runbox monitor`.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Job to stream output from.
    pub job_id: String,
}

/// Streams a job's output to stdout until the server ends the stream.
///
/// # Errors
///
/// Returns an error if the connection or the RPC fails.
pub async fn monitor(args: MonitorArgs) -> anyhow::Result<()> {
    let mut client = connect(&args.connect).await?;
    let mut stream = client
        .monitor(proto::MonitorRequest {
            job_id: args.job_id,
        })
        .await?
        .into_inner();

    let mut stdout = std::io::stdout();
    while let Some(response) = stream.message().await? {
        stdout.write_all(&response.chunk)?;
        stdout.flush()?;
    }
    Ok(())
}

/// Arguments for `runbox list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    connect: ConnectArgs,
}

/// Lists the caller's jobs.
///
/// # Errors
///
/// Returns an error if the connection or the RPC fails.
pub async fn list(args: ListArgs) -> anyhow::Result<()> {
    let mut client = connect(&args.connect).await?;
    let response = client.list(proto::ListRequest {}).await?.into_inner();
    for job in response.jobs {
        println!(
            "{}\t{}\texit_code:{}\t{}",
            job.job_id,
            status_label(job.status),
            job.exit_code,
            job.started_at
        );
    }
    Ok(())
}
