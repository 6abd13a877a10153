use std::{fs, time::Duration};

use bytes::Bytes;
use testpoint::{sources::DirectorySource, *};

// Expected responses live on disk, one file per message, in file-name order.
fn write_fixtures(dir: &std::path::Path) -> std::io::Result<()> {
    fs::write(dir.join("01-greeting.txt"), "hello")?;
    fs::write(dir.join("02-name.txt"), "world")?;
    fs::write(dir.join("03-farewell.txt"), "bye")?;
    Ok(())
}

// Stand-in for the system under test: it emits its responses one by one.
async fn system_under_test(sink: std::sync::Arc<ComparisonSink<Bytes, Utf8>>, last: &'static str) -> Result {
    for body in ["hello", "world", last] {
        tokio::time::sleep(Duration::from_millis(10)).await;
        sink.accept(Bytes::from_static(body.as_bytes()))?;
    }
    Ok(())
}

async fn run(dir: &std::path::Path, last: &'static str) -> Result {
    let mut registry = SourceRegistry::new();
    registry.register(DirectorySource::new("responses", dir))?;

    let config = Config::new("responses").with_timeout_millis(500);
    let mut endpoint = TestEndpoint::with_extractor(config, &registry, Utf8)?;
    endpoint.initialize()?;
    endpoint.start().await?;
    println!("Loaded {} expected messages", endpoint.sink().expected().map_or(0, |e| e.len()));

    let producer = tokio::spawn(system_under_test(endpoint.sink(), last));
    let outcome = endpoint.verify_within(Duration::from_secs(1)).await;
    producer.await.map_err(|e| Error::SourceUnavailable {
        name: "responses".into(),
        reason: e.to_string(),
    })??;
    outcome
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let dir = tempfile::tempdir()?;
    write_fixtures(dir.path())?;

    run(dir.path(), "bye").await?;
    println!("Matching run verified");

    match run(dir.path(), "see you").await {
        Err(Error::ExpectationMismatch(mismatch)) => println!("Diverging run rejected: {mismatch}"),
        other => println!("Unexpected outcome: {other:?}"),
    }
    Ok(())
}
