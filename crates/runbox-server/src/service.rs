//! The Jobs RPC service.
//!
//! Thin translation layer: extract the caller's identity, hand the
//! request to the registry, and map domain errors onto gRPC status
//! codes. All job semantics live below this crate.

use std::pin::Pin;
use std::sync::Arc;

use runbox_common::error::RunboxError;
use runbox_common::types::{JobStatus, ResourceLimits};
use runbox_runtime::registry::JobRegistry;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tonic::{Request, Response, Status};

use crate::proto;
use crate::proto::jobs_server::Jobs;
use crate::tls;

/// gRPC handler set backed by a shared job registry.
pub struct JobsService {
    registry: Arc<JobRegistry>,
}

impl JobsService {
    /// Creates the service over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }
}

#[tonic::async_trait]
impl Jobs for JobsService {
    async fn start(
        &self,
        request: Request<proto::StartRequest>,
    ) -> Result<Response<proto::StartResponse>, Status> {
        let identity = require_identity(&request)?;
        let req = request.into_inner();
        let limits = ResourceLimits {
            cpu_percent: req.cpu_percent,
            memory_kb: req.memory_kb,
            io_weight: req.io_weight,
        };
        tracing::debug!(identity, command = %req.command, "start requested");

        let id = self
            .registry
            .start_job(&req.command, &req.args, limits, &identity)
            .await
            .map_err(to_status)?;
        Ok(Response::new(proto::StartResponse {
            job_id: id.to_string(),
        }))
    }

    async fn stop(
        &self,
        request: Request<proto::StopRequest>,
    ) -> Result<Response<proto::StopResponse>, Status> {
        let identity = require_identity(&request)?;
        let req = request.into_inner();

        let exit_code = self
            .registry
            .stop_job(&req.job_id, &identity, u64::from(req.timeout_seconds))
            .await
            .map_err(to_status)?;
        Ok(Response::new(proto::StopResponse { exit_code }))
    }

    async fn status(
        &self,
        request: Request<proto::StatusRequest>,
    ) -> Result<Response<proto::StatusResponse>, Status> {
        let identity = require_identity(&request)?;
        let req = request.into_inner();

        let (status, exit_code) = self
            .registry
            .job_status(&req.job_id, &identity)
            .await
            .map_err(to_status)?;
        Ok(Response::new(proto::StatusResponse {
            status: proto_status(status).into(),
            exit_code: exit_code.unwrap_or(0),
        }))
    }

    type MonitorStream =
        Pin<Box<dyn Stream<Item = Result<proto::MonitorResponse, Status>> + Send>>;

    async fn monitor(
        &self,
        request: Request<proto::MonitorRequest>,
    ) -> Result<Response<Self::MonitorStream>, Status> {
        let identity = require_identity(&request)?;
        let req = request.into_inner();

        let rx = self
            .registry
            .monitor(&req.job_id, &identity)
            .await
            .map_err(to_status)?;
        let stream = ReceiverStream::new(rx)
            .map(|chunk| Ok(proto::MonitorResponse { chunk }));
        Ok(Response::new(Box::pin(stream)))
    }

    async fn list(
        &self,
        request: Request<proto::ListRequest>,
    ) -> Result<Response<proto::ListResponse>, Status> {
        let identity = require_identity(&request)?;

        let jobs = self
            .registry
            .list(&identity)
            .await
            .into_iter()
            .map(|summary| proto::JobSummary {
                job_id: summary.id.to_string(),
                status: proto_status(summary.status).into(),
                exit_code: summary.exit_code.unwrap_or(0),
                started_at: summary.started_at,
            })
            .collect();
        Ok(Response::new(proto::ListResponse { jobs }))
    }
}

fn require_identity<T>(request: &Request<T>) -> Result<String, Status> {
    tls::peer_identity(request)
        .ok_or_else(|| Status::unauthenticated("client identity unavailable"))
}

fn proto_status(status: JobStatus) -> proto::JobStatus {
    match status {
        JobStatus::Running => proto::JobStatus::Running,
        JobStatus::Stopped => proto::JobStatus::Stopped,
        JobStatus::Killed => proto::JobStatus::Killed,
    }
}

fn to_status(err: RunboxError) -> Status {
    match &err {
        RunboxError::Config { .. } => Status::invalid_argument(err.to_string()),
        RunboxError::NotFound { .. } => Status::not_found(err.to_string()),
        RunboxError::NotRunning { .. } => Status::failed_precondition(err.to_string()),
        RunboxError::StillRunning { .. } => Status::deadline_exceeded(err.to_string()),
        RunboxError::Isolation { .. } => Status::internal(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn domain_errors_map_to_expected_status_codes() {
        let cases = [
            (
                RunboxError::Config {
                    message: "bad".into(),
                },
                tonic::Code::InvalidArgument,
            ),
            (
                RunboxError::NotFound {
                    kind: "job",
                    id: "x".into(),
                },
                tonic::Code::NotFound,
            ),
            (
                RunboxError::NotRunning { id: "x".into() },
                tonic::Code::FailedPrecondition,
            ),
            (
                RunboxError::StillRunning { id: "x".into() },
                tonic::Code::DeadlineExceeded,
            ),
            (
                RunboxError::Isolation {
                    message: "boom".into(),
                },
                tonic::Code::Internal,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(to_status(err).code(), code);
        }
    }

    #[test]
    fn job_status_maps_onto_proto_enum() {
        assert_eq!(proto_status(JobStatus::Running), proto::JobStatus::Running);
        assert_eq!(proto_status(JobStatus::Stopped), proto::JobStatus::Stopped);
        assert_eq!(proto_status(JobStatus::Killed), proto::JobStatus::Killed);
    }

    #[test]
    fn requests_without_identity_are_unauthenticated() {
        let request = Request::new(proto::ListRequest {});
        let err = require_identity(&request).expect_err("no TLS session");
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }
}
