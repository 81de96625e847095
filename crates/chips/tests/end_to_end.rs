use chips::{CandidateState, Chips, ChipsConfig, LoadFailureReason, MemoryFetcher};
use dom::{Document, DomError, NodeKey, Rect, ScriptKind, ScriptRun, ShadowRootMode};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Mutex, Once};
use std::time::Duration;

const IDLE: Duration = Duration::from_secs(2);

fn on_screen() -> Option<Rect> {
    Some(Rect::new(0.0, 20.0, 200.0, 40.0))
}

fn off_screen() -> Option<Rect> {
    Some(Rect::new(0.0, 5000.0, 200.0, 40.0))
}

fn first(doc: &Document, root: NodeKey, tag: &str) -> NodeKey {
    doc.elements_by_tag_name(root, tag)[0]
}

/// Defines `tag` with a constructor that attaches an open shadow root holding `markup`.
fn define_with_shadow(doc: &mut Document, tag: &str, markup: &str) -> Result<(), DomError> {
    let markup = markup.to_string();
    doc.define_custom_element(
        tag,
        Some(Rc::new(move |doc: &mut Document, key: NodeKey| -> Result<(), DomError> {
            let root = doc.attach_shadow(key, ShadowRootMode::Open)?;
            doc.set_inner_html(root, &markup)
        })),
    )
}

/// A stand-in script engine. `define <tag> <markup>` defines a shadow-hosting custom
/// element; anything else is appended to the returned log.
fn install_scripts(doc: &mut Document) -> Rc<RefCell<Vec<(String, ScriptKind)>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    doc.set_script_host(Box::new(
        move |doc: &mut Document, run: &ScriptRun| -> Result<(), DomError> {
            let source = run.source.trim();
            if let Some(rest) = source.strip_prefix("define ") {
                let (tag, markup) = rest.split_once(' ').unwrap_or((rest, ""));
                return define_with_shadow(doc, tag, markup);
            }
            sink.borrow_mut().push((source.to_string(), run.kind));
            Ok(())
        },
    ));
    log
}

/// Collects every warning logged by any test in this binary.
struct WarnCapture;

static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());
static CAPTURE: WarnCapture = WarnCapture;

impl log::Log for WarnCapture {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            WARNINGS.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

fn capture_warnings() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(log::LevelFilter::Warn);
    });
}

fn warned(text: &str) -> bool {
    WARNINGS.lock().unwrap().iter().any(|w| w.contains(text))
}

fn start(doc: &mut Document, fetcher: &MemoryFetcher) -> Chips {
    let config = ChipsConfig::default().with_path("/parts");
    Chips::start(doc, config, Box::new(fetcher.clone())).unwrap()
}

#[test]
fn widget_loads_once_it_intersects() {
    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    let widget = first(&doc, doc.document(), "a-widget");
    doc.set_layout_box(widget, off_screen());
    let fetcher = MemoryFetcher::new();
    fetcher.route("/parts/a-widget.html", "<span>hi</span>");
    let mut chips = start(&mut doc, &fetcher);

    assert!(chips.run_until_idle(&mut doc, IDLE));
    assert!(fetcher.requests().is_empty());
    assert_eq!(chips.candidate_state(widget), Some(CandidateState::Gated));

    doc.set_layout_box(widget, on_screen());
    assert!(chips.run_until_idle(&mut doc, IDLE));

    let container = doc.get_element_by_id("_chips").unwrap();
    assert_eq!(doc.inner_html(container), "<span>hi</span>");
    assert!(chips.registry().contains("a-widget"));
    assert_eq!(chips.candidate_state(widget), Some(CandidateState::Injected));
    assert!(chips.failures().is_empty());
}

#[test]
fn rejected_fetch_leaves_the_container_empty_and_is_not_retried() {
    capture_warnings();
    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    let widget = first(&doc, doc.document(), "a-widget");
    doc.set_layout_box(widget, on_screen());
    let fetcher = MemoryFetcher::new();
    fetcher.fail("/parts/a-widget.html", "connection refused");
    let mut chips = start(&mut doc, &fetcher);

    assert!(chips.run_until_idle(&mut doc, IDLE));
    let container = doc.get_element_by_id("_chips").unwrap();
    assert!(doc.children(container).is_empty());
    assert_eq!(chips.failures().len(), 1);
    assert_eq!(chips.failures()[0].tag, "a-widget");
    assert_eq!(
        chips.failures()[0].reason,
        LoadFailureReason::Fetch("connection refused".to_string())
    );
    assert!(warned("Component <a-widget> could not be fetched: connection refused"));
    assert!(chips.registry().contains("a-widget"));

    // A later instance of the same tag is discovered but never fetched again.
    let body = doc.body().unwrap();
    let again = doc.create_element("a-widget");
    doc.set_layout_box(again, on_screen());
    doc.append_child(body, again).unwrap();
    assert!(chips.run_until_idle(&mut doc, IDLE));
    assert_eq!(chips.candidate_state(again), Some(CandidateState::Skipped));
    assert_eq!(fetcher.requests().len(), 1);
}

#[test]
fn nested_widget_loads_into_a_container_scoped_to_its_host() {
    let mut doc = Document::with_body_html("<outer-widget></outer-widget>").unwrap();
    install_scripts(&mut doc);
    let outer = first(&doc, doc.document(), "outer-widget");
    doc.set_layout_box(outer, on_screen());
    let fetcher = MemoryFetcher::new();
    fetcher.route(
        "/parts/outer-widget.html",
        "<p>outer</p><script>define outer-widget <inner-widget></inner-widget></script>",
    );
    fetcher.route("/parts/inner-widget.html", "<em>inner</em>");
    let mut chips = start(&mut doc, &fetcher);

    assert!(chips.run_until_idle(&mut doc, IDLE));
    let shadow = doc.shadow_root(outer).expect("constructor attached a shadow root");
    assert!(chips.is_monitoring(shadow));
    let inner = first(&doc, shadow, "inner-widget");
    assert_eq!(chips.candidate_state(inner), Some(CandidateState::Gated));
    assert_eq!(fetcher.requests(), vec!["/parts/outer-widget.html"]);

    doc.set_layout_box(inner, on_screen());
    assert!(chips.run_until_idle(&mut doc, IDLE));

    let root_container = doc.get_element_by_id("_chips").unwrap();
    let nested_container = doc.get_element_by_id("_chips_outer-widget").unwrap();
    assert_ne!(root_container, nested_container);
    assert_eq!(doc.inner_html(nested_container), "<em>inner</em>");
    assert!(doc.inner_html(root_container).starts_with("<p>outer</p>"));
    assert_eq!(
        chips.registry().iter().collect::<Vec<_>>(),
        ["outer-widget", "inner-widget"]
    );
}

#[test]
fn shadow_root_found_once_the_tag_is_defined() {
    let mut doc = Document::with_body_html("<x-host></x-host>").unwrap();
    let host = first(&doc, doc.document(), "x-host");
    let fetcher = MemoryFetcher::new();
    let mut chips = start(&mut doc, &fetcher);
    assert!(chips.run_until_idle(&mut doc, IDLE));
    assert_eq!(chips.monitored_scopes(), 1);

    define_with_shadow(&mut doc, "x-host", "<inner-widget></inner-widget>").unwrap();
    assert!(chips.run_until_idle(&mut doc, IDLE));

    let shadow = doc.shadow_root(host).unwrap();
    assert!(chips.is_monitoring(shadow));
    let inner = first(&doc, shadow, "inner-widget");
    assert_eq!(chips.candidate_state(inner), Some(CandidateState::Gated));
    assert!(doc.get_element_by_id("_chips_x-host").is_some());
}

#[test]
fn shadow_roots_are_monitored_once_each() {
    let mut doc =
        Document::with_body_html("<x-host></x-host><x-host></x-host>").unwrap();
    let fetcher = MemoryFetcher::new();
    let mut chips = start(&mut doc, &fetcher);

    define_with_shadow(&mut doc, "x-host", "<p></p>").unwrap();
    assert!(chips.run_until_idle(&mut doc, IDLE));
    assert_eq!(chips.monitored_scopes(), 3);
    assert_eq!(doc.mutation_observer_count(), 3);

    // Re-reporting the hosts does not attach anything new.
    let body = doc.body().unwrap();
    let hosts = doc.elements_by_tag_name(body, "x-host");
    for host in hosts {
        doc.append_child(body, host).unwrap();
    }
    assert!(chips.run_until_idle(&mut doc, IDLE));
    assert_eq!(chips.monitored_scopes(), 3);

    // Both shadow trees feed the one per-tag container.
    let holders = doc
        .descendants(doc.document())
        .into_iter()
        .filter(|k| doc.attribute(*k, "id") == Some("_chips_x-host"))
        .count();
    assert_eq!(holders, 1);
}

#[test]
fn element_that_never_intersects_never_loads() {
    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    let widget = first(&doc, doc.document(), "a-widget");
    doc.set_layout_box(widget, off_screen());
    let fetcher = MemoryFetcher::new();
    let mut chips = start(&mut doc, &fetcher);

    for _ in 0..5 {
        chips.pump(&mut doc);
    }
    assert!(fetcher.requests().is_empty());
    assert_eq!(chips.pending_gates(), 1);
    assert_eq!(chips.candidate_state(widget), Some(CandidateState::Gated));
}

#[test]
fn repeated_intersections_load_exactly_once() {
    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    let widget = first(&doc, doc.document(), "a-widget");
    doc.set_layout_box(widget, on_screen());
    let fetcher = MemoryFetcher::new();
    fetcher.route("/parts/a-widget.html", "<span>hi</span>");
    let mut chips = start(&mut doc, &fetcher);
    assert!(chips.run_until_idle(&mut doc, IDLE));

    for rect in [off_screen(), on_screen(), off_screen(), on_screen()] {
        doc.set_layout_box(widget, rect);
        chips.pump(&mut doc);
    }
    assert_eq!(fetcher.requests().len(), 1);
    let container = chips.root_container();
    assert_eq!(doc.children(container).len(), 1);
}

#[test]
fn preload_margin_loads_just_below_the_fold() {
    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    doc.set_viewport(Rect::new(0.0, 0.0, 800.0, 600.0));
    let widget = first(&doc, doc.document(), "a-widget");
    // 30px below the fold; the default margin grows the viewport by 60px.
    doc.set_layout_box(widget, Some(Rect::new(0.0, 630.0, 100.0, 20.0)));
    let fetcher = MemoryFetcher::new();
    let mut chips = start(&mut doc, &fetcher);
    chips.run_until_idle(&mut doc, IDLE);
    assert_eq!(fetcher.requests(), vec!["/parts/a-widget.html"]);

    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    let widget = first(&doc, doc.document(), "a-widget");
    doc.set_layout_box(widget, Some(Rect::new(0.0, 630.0, 100.0, 20.0)));
    let fetcher = MemoryFetcher::new();
    let mut config = ChipsConfig::default();
    config.root_margin = "0px".to_string();
    let mut chips = Chips::start(&mut doc, config, Box::new(fetcher.clone())).unwrap();
    chips.run_until_idle(&mut doc, IDLE);
    assert!(fetcher.requests().is_empty());
}

#[test]
fn fragment_scripts_run_in_document_order() {
    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    let log = install_scripts(&mut doc);
    let widget = first(&doc, doc.document(), "a-widget");
    doc.set_layout_box(widget, on_screen());
    let fetcher = MemoryFetcher::new();
    fetcher.route(
        "/parts/a-widget.html",
        "<script>first</script><div><script type=\"module\">second</script></div><script>third</script>",
    );
    let mut chips = start(&mut doc, &fetcher);
    assert!(chips.run_until_idle(&mut doc, IDLE));

    assert_eq!(
        *log.borrow(),
        vec![
            ("first".to_string(), ScriptKind::Classic),
            ("second".to_string(), ScriptKind::Module),
            ("third".to_string(), ScriptKind::Classic),
        ]
    );
    let container = chips.root_container();
    let scripts = doc.elements_by_tag_name(container, "script");
    assert_eq!(scripts.len(), 3);
    assert!(scripts.iter().all(|s| doc.script_already_started(*s)));
}

#[test]
fn loaded_content_is_scanned_for_more_placeholders() {
    let mut doc = Document::with_body_html("<a-widget></a-widget>").unwrap();
    let widget = first(&doc, doc.document(), "a-widget");
    doc.set_layout_box(widget, on_screen());
    let fetcher = MemoryFetcher::new();
    fetcher.route("/parts/a-widget.html", "<section><b-widget></b-widget></section>");
    fetcher.route("/parts/b-widget.html", "<i>b</i>");
    let mut chips = start(&mut doc, &fetcher);
    assert!(chips.run_until_idle(&mut doc, IDLE));

    let b = first(&doc, chips.root_container(), "b-widget");
    assert_eq!(chips.candidate_state(b), Some(CandidateState::Gated));
    doc.set_layout_box(b, on_screen());
    assert!(chips.run_until_idle(&mut doc, IDLE));
    assert_eq!(
        doc.inner_html(chips.root_container()),
        "<section><b-widget></b-widget></section><i>b</i>"
    );
}
