use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;
use xenia_dom::TreeDocument;
use xenia_inject::{Injector, InjectorConfig};

/// End-to-end run against an in-memory document: the watermark container
/// appears a little while after the poll starts, carrying a placeholder
/// spinner that the injection replaces.
pub async fn run_demo(
    appear_after: Duration,
    config: InjectorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = Arc::new(TreeDocument::new());
    let header = doc.create_element("header", &[], "Xenia");
    doc.append_child(doc.root(), header)?;

    println!("before: {}", doc.to_html());

    let handle = Injector::start(doc.clone(), config);

    let mutator = doc.clone();
    tokio::spawn(async move {
        sleep(appear_after).await;
        let watermark = mutator.create_element("div", &["watermark"], "");
        if mutator.append_child(mutator.root(), watermark).is_ok() {
            let spinner = mutator.create_element("div", &["spinner"], "loading...");
            let _ = mutator.append_child(watermark, spinner);
            info!(watermark, "container appeared");
        }
    });

    let report = handle.wait().await?;

    println!("after:  {}", doc.to_html());
    println!("report: {}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
