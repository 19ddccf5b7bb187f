use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use xenia_core::{ClassSelector, InjectorPhase};
use xenia_dom::TreeDocument;
use xenia_inject::{Injector, InjectorConfig};

/// The container shows up a few periods after the poll starts, with a
/// placeholder child that must not survive the injection.
#[tokio::test(start_paused = true)]
async fn injects_once_after_late_appearance() {
    let doc = Arc::new(TreeDocument::new());
    let header = doc.create_element("header", &[], "Xenia");
    doc.append_child(doc.root(), header).unwrap();

    let handle = Injector::start(doc.clone(), InjectorConfig::default());

    let mutator_doc = doc.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(1_700)).await;
        let watermark = mutator_doc.create_element("div", &["watermark"], "");
        mutator_doc
            .append_child(mutator_doc.root(), watermark)
            .unwrap();
        let spinner = mutator_doc.create_element("div", &["spinner"], "loading...");
        mutator_doc.append_child(watermark, spinner).unwrap();
    });

    let report = handle.wait().await.unwrap();

    assert_eq!(report.phase, InjectorPhase::Done);
    assert!(report.injected);
    // ticks at 500/1000/1500 miss, the container lands at 1700, tick 4 hits
    assert_eq!(report.attempts, 4);

    assert_eq!(doc.count_by_class(&ClassSelector::badge()), 1);
    let html = doc.to_html();
    assert!(html.contains(
        "<div class=\"watermark\"><span class=\"powered-by-xenia\">Powered by DMI</span></div>"
    ));
    assert!(!html.contains("spinner"));
}

/// Once the badge is in, nothing the embedder does restarts the poll.
#[tokio::test(start_paused = true)]
async fn finished_poll_never_touches_the_document_again() {
    let doc = Arc::new(TreeDocument::new());
    let watermark = doc.create_element("div", &["watermark"], "");
    doc.append_child(doc.root(), watermark).unwrap();

    let handle = Injector::start(doc.clone(), InjectorConfig::default());
    let report = handle.wait().await.unwrap();
    assert!(report.injected);

    // the embedder replaces the badge with its own content after the fact
    let badge = doc.children_of(watermark)[0];
    doc.set_text(badge, "edited by host").unwrap();

    sleep(Duration::from_millis(3_000)).await;
    assert_eq!(doc.element(badge).unwrap().text, "edited by host");
    assert_eq!(doc.count_by_class(&ClassSelector::badge()), 1);
}
