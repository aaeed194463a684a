//! Log levels of WAPI session setup
//!
//! Captures events with a recording layer installed as the thread's
//! default subscriber; `#[tokio::test]` runs on the current thread.

use ibx_common::GridProfile;
use ibx_nios::WapiSession;
use serde_json::json;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Level and message of every event seen
#[derive(Debug, Clone, Default)]
struct EventStore(Arc<Mutex<Vec<(Level, String)>>>);

impl EventStore {
    fn events(&self) -> Vec<(Level, String)> {
        self.0.lock().unwrap().clone()
    }
}

struct EventCaptureLayer {
    store: EventStore,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for EventCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.store
            .0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

#[tokio::test]
async fn test_unverified_certificate_is_not_a_warning() {
    let store = EventStore::default();
    let subscriber = tracing_subscriber::registry().with(EventCaptureLayer {
        store: store.clone(),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wapi/v2.11/grid"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "ibapauth=abc123token; Path=/")
                .set_body_json(json!([{ "_ref": "grid/b25lLmNsdXN0ZXIkMA:Infoblox" }])),
        )
        .mount(&server)
        .await;

    let profile = GridProfile {
        url: format!("{}/wapi/v2.11/", server.uri()),
        valid_cert: false,
        userid: "admin".to_string(),
        password: "infoblox".to_string(),
    };
    let session = WapiSession::authenticate(&profile).await.unwrap();
    assert!(!session.valid_cert());

    let events = store.events();
    assert!(events
        .iter()
        .any(|(level, message)| *level == Level::DEBUG
            && message.contains("TLS certificate verification disabled")));
    assert!(
        events
            .iter()
            .all(|(level, _)| *level != Level::WARN && *level != Level::ERROR),
        "unexpected warnings: {:?}",
        events
    );
}
