use cdr_loadgen::{OnError, Runner, Synthesizer, Template, Transport, Url};
use std::num::NonZeroU64;

const TEMPLATE: &str = include_str!("../Generator_json.txt");

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let transport = Transport::builder()
        .url(Url::parse("http://localhost:2080/freeswitch_json").unwrap())
        .build();
    let synthesizer = Synthesizer::new(
        vec!["9023".into(), "9024".into(), "9025".into()],
        vec!["220".into(), "2557".into(), "38160".into()],
        None,
    )
    .unwrap();

    let summary = Runner::builder()
        .template(Template::from_text(TEMPLATE))
        .synthesizer(synthesizer)
        .transport(transport)
        .iterations(Some(1_000))
        .report_every(NonZeroU64::new(250).unwrap())
        .on_error(OnError::Continue)
        .out(std::io::stdout())
        .build()
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("cannot listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
        .unwrap();

    println!("{summary:#?}");
}
