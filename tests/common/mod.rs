#![allow(dead_code)]

use async_trait::async_trait;
use campfire::storage::Statement;
use campfire::{
    Dependencies, FieldSpec, LruObjectCache, MemoryBackend, ObjectEvent, ObjectEventKind,
    ObjectObserver, ObjectPolicy, Record, persistent_object,
};
use std::sync::Arc;
use tokio::sync::Mutex;

persistent_object! {
    /// A display screen in the venue.
    pub struct Screen {
        table: "screen",
        key: "intScreenID",
        timestamp: "lastChange",
        demo: r#"[
            {"strScreen": "Base of Stairs"},
            {"strScreen": "Top of Stairs"},
            {"strScreen": "Main Hall"}
        ]"#,
        fields {
            str_screen: String = "strScreen" => FieldSpec::varchar(255).unique(),
        }
    }
}

persistent_object! {
    pub struct Room {
        table: "room",
        key: "intRoomID",
        fields {
            str_room: String = "strRoom" => FieldSpec::varchar(64).unique(),
            int_capacity: Option<i64> = "intCapacity" => FieldSpec::integer().nullable(),
        }
    }
}

persistent_object! {
    pub struct Notice {
        table: "notice",
        key: "intNoticeID",
        timestamp: "lastChange",
        policy: ObjectPolicy::admin_only(),
        fields {
            str_notice: String = "strNotice" => FieldSpec::text(),
        }
    }
}

persistent_object! {
    pub struct Talk {
        table: "talk",
        key: "intTalkID",
        timestamp: "lastChange",
        owner: "intUserID",
        policy: ObjectPolicy::creator_only(),
        fields {
            str_talk: String = "strTalk" => FieldSpec::varchar(255),
            int_user_id: i64 = "intUserID" => FieldSpec::integer(),
        }
    }
}

persistent_object! {
    pub struct Attendance {
        table: "attendance",
        key: ["intUserID", "intTalkID"],
        fields {
            int_user_id: i64 = "intUserID" => FieldSpec::integer(),
            int_talk_id: i64 = "intTalkID" => FieldSpec::integer(),
            enum_role: String = "enumRole" => FieldSpec::enumeration(&["speaker", "attendee"]),
        }
    }
}

/// Collects every event it is notified with.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObjectEvent>>,
}

impl RecordingObserver {
    pub async fn events(&self) -> Vec<ObjectEvent> {
        self.events.lock().await.clone()
    }

    pub async fn kinds(&self) -> Vec<ObjectEventKind> {
        self.events.lock().await.iter().map(|event| event.kind).collect()
    }
}

#[async_trait]
impl ObjectObserver for RecordingObserver {
    async fn notify(&self, event: &ObjectEvent) {
        self.events.lock().await.push(event.clone());
    }
}

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub cache: Arc<LruObjectCache>,
    pub observer: Arc<RecordingObserver>,
    pub deps: Dependencies,
}

impl Harness {
    /// Fresh backend, cache and observer, with every fixture table created.
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let cache = Arc::new(LruObjectCache::new(64));
        let observer = Arc::new(RecordingObserver::default());
        let deps = Dependencies::default()
            .with_backend(backend.clone())
            .unwrap()
            .with_cache(cache.clone())
            .unwrap()
            .with_observer(observer.clone())
            .unwrap();

        Record::<Screen>::initialize(&deps).await.unwrap();
        Record::<Room>::initialize(&deps).await.unwrap();
        Record::<Notice>::initialize(&deps).await.unwrap();
        Record::<Talk>::initialize(&deps).await.unwrap();
        Record::<Attendance>::initialize(&deps).await.unwrap();

        Self {
            backend,
            cache,
            observer,
            deps,
        }
    }

    pub async fn statements(&self) -> usize {
        self.backend.statement_count().await
    }

    pub async fn last_statement(&self) -> Statement {
        self.backend.journal().await.pop().unwrap()
    }

    pub async fn create_screen(&self, name: &str) -> Record<Screen> {
        let mut screen = Record::<Screen>::new(self.deps.clone());
        assert!(screen.set_key(Screen::STR_SCREEN, name).is_changed());
        screen.create(None).await.unwrap();
        screen
    }
}
