//! Synthetic FreeSWITCH call-detail-record traffic.
//!
//! Each iteration draws a random [`record::Record`], renders it into a payload
//! [`template::Template`], POSTs it through [`transport::Transport`] and feeds the
//! [`reporter::RateReporter`]. [`runner::Runner`] drives the loop, strictly one
//! request at a time.

use std::{future::Future, io::Write};

pub mod config;
pub mod record;
pub mod reporter;
pub mod runner;
pub mod template;
pub mod transport;

pub use config::{ConfigError, Effective, GenArgs};
pub use record::{Record, Synthesizer};
pub use reporter::RateReporter;
pub use runner::{OnError, RunSummary, Runner};
pub use template::{Template, TemplateError};
pub use transport::{PostMetric, StatusPolicy, Transport, TransportError};

pub use reqwest::Url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Generator(#[from] record::EmptySetError),

    #[error("cannot write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds a runner from merged settings, loading the template from disk.
pub fn runner_from<W: Write>(eff: &Effective, out: W) -> Result<Runner<W>, Error> {
    let template = Template::load(&eff.template)?;
    let synthesizer = Synthesizer::new(eff.prefixes.clone(), eff.codes.clone(), eff.seed)?;
    let transport = Transport::builder()
        .url(eff.url.clone())
        .status_policy(eff.status_policy)
        .timeout(eff.timeout)
        .build();

    Ok(Runner::builder()
        .template(template)
        .synthesizer(synthesizer)
        .transport(transport)
        .iterations(eff.iterations)
        .report_every(eff.report_every)
        .on_error(eff.on_error)
        .out(out)
        .build())
}

/// Exit status for a run that could not start or ended on a fatal error.
pub const EXIT_FAILURE: u8 = 1;

/// Runs the tool for parsed arguments and returns the process exit status:
/// 0 for a completed or cancelled run, [`EXIT_FAILURE`] otherwise.
pub async fn execute<W, F>(args: &GenArgs, out: W, shutdown: F) -> u8
where
    W: Write,
    F: Future<Output = ()>,
{
    match run_with(args, out, shutdown).await {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_FAILURE
        }
    }
}

async fn run_with<W, F>(args: &GenArgs, out: W, shutdown: F) -> Result<RunSummary, Error>
where
    W: Write,
    F: Future<Output = ()>,
{
    let eff = Effective::new(args)?;
    runner_from(&eff, out)?.run(shutdown).await
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn missing_template_fails_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let eff = Effective::merge(
            &GenArgs {
                template: Some(dir.path().join("Generator_json.txt")),
                ..Default::default()
            },
            Default::default(),
        )
        .unwrap();
        assert!(matches!(
            runner_from(&eff, Vec::new()),
            Err(Error::Template(TemplateError::Read { .. }))
        ));
    }

    #[tokio::test]
    async fn bundled_template_renders_and_sends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let args = GenArgs {
            iterations: Some(3),
            url: Some(format!("{}/freeswitch_json", server.uri())),
            template: Some(concat!(env!("CARGO_MANIFEST_DIR"), "/Generator_json.txt").into()),
            seed: Some(8),
            ..Default::default()
        };
        let eff = Effective::merge(&args, Default::default()).unwrap();
        let summary = runner_from(&eff, Vec::new())
            .unwrap()
            .run(pending())
            .await
            .unwrap();
        assert_eq!(summary.sent, 3);

        for req in server.received_requests().await.unwrap() {
            let body = String::from_utf8(req.body).unwrap();
            assert!(!body.contains("%("));
            assert!(body.contains("\"sip_to_user\": \"9023"));
        }
    }

    const BUNDLED_TEMPLATE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/Generator_json.txt");

    fn args_for(url: String, iterations: Option<u64>) -> GenArgs {
        GenArgs {
            iterations,
            url: Some(url),
            template: Some(BUNDLED_TEMPLATE.into()),
            ..Default::default()
        }
    }

    async fn accepting_endpoint() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn completed_run_exits_zero() {
        let server = accepting_endpoint().await;
        let args = args_for(format!("{}/freeswitch_json", server.uri()), Some(2));
        assert_eq!(execute(&args, Vec::new(), pending()).await, 0);
    }

    #[tokio::test]
    async fn cancelled_run_exits_zero() {
        let server = accepting_endpoint().await;
        let args = args_for(format!("{}/freeswitch_json", server.uri()), None);
        assert_eq!(execute(&args, Vec::new(), std::future::ready(())).await, 0);
    }

    #[tokio::test]
    async fn startup_failures_exit_one() {
        let dir = tempfile::tempdir().unwrap();
        let missing_template = GenArgs {
            iterations: Some(1),
            template: Some(dir.path().join("Generator_json.txt")),
            ..Default::default()
        };
        assert_eq!(
            execute(&missing_template, Vec::new(), pending()).await,
            EXIT_FAILURE
        );

        let missing_config = GenArgs {
            config: Some(dir.path().join("absent.toml")),
            ..Default::default()
        };
        assert_eq!(
            execute(&missing_config, Vec::new(), pending()).await,
            EXIT_FAILURE
        );
    }

    #[tokio::test]
    async fn render_failure_exits_one() {
        let server = accepting_endpoint().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        std::fs::write(&path, r#"{"caller":"%(caller_id)s"}"#).unwrap();
        let args = GenArgs {
            template: Some(path),
            ..args_for(format!("{}/freeswitch_json", server.uri()), Some(1))
        };
        assert_eq!(execute(&args, Vec::new(), pending()).await, EXIT_FAILURE);
    }

    #[tokio::test]
    async fn unreachable_endpoint_exits_one() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let args = args_for(format!("http://127.0.0.1:{port}/freeswitch_json"), None);
        assert_eq!(execute(&args, Vec::new(), pending()).await, EXIT_FAILURE);
    }
}
